//! JSON wire codec shared by every service.
//!
//! Timestamps travel as `yyyy-MM-ddTHH:mm:ss` without a timezone and are
//! interpreted as the producer's local clock as carried in the event.
//! Unknown fields are ignored on read.

use chrono::{NaiveDateTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Wire timestamp format, second resolution, no timezone.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Current UTC wall clock truncated to whole seconds (the wire format's
/// resolution), so events round-trip bit-identically through the codec.
pub fn now() -> NaiveDateTime {
    let dt = Utc::now().naive_utc();
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Serializes a value to its wire JSON form.
pub fn encode<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Decodes a value from its wire JSON form.
pub fn decode<T: DeserializeOwned>(json: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serde adapter for required `NaiveDateTime` fields in wire format.
pub mod datetime {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `NaiveDateTime` fields in wire format.
pub mod datetime_opt {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            Some(s) => NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
