//! Client for the partitioned, durable message log that connects the
//! pipeline's services.
//!
//! The log exposes named topics; records carry a partition key (the
//! service name) so that all records for one service land on one partition
//! and are delivered to a single consumer of a group in publish order.
//! Delivery is at-least-once: a record is only past the log once its
//! consumer acknowledges it, and an unacknowledged record is redelivered.
//!
//! Two implementations exist: [`kafka::KafkaBus`] for production and
//! [`memory::MemoryBus`] for development and tests.

pub mod error;
pub mod kafka;
pub mod memory;


use async_trait::async_trait;

pub use error::BusError;

/// Where a consumer group without committed offsets starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    /// Replay the full retained log.
    Earliest,
    /// Start at the head; never replay history. Used by the streaming
    /// groups feeding live dashboards.
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

/// Placement of a successfully produced record, for logging.
#[derive(Debug, Clone)]
pub struct RecordMeta {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// A record fetched from a topic, owned by the consumer.
#[derive(Debug, Clone)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

/// A consumer-group subscription to one topic.
///
/// `next` suspends until a record is available. `ack` commits the record's
/// offset; records that are never acknowledged are redelivered to the
/// group after the subscription is re-established.
#[async_trait]
pub trait Subscription: Send {
    async fn next(&mut self) -> error::Result<Record>;

    async fn ack(&mut self, record: &Record) -> error::Result<()>;
}

/// Handle to the message log.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Appends a record to `topic`. Records with equal `key` hash to the
    /// same partition.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8])
        -> error::Result<RecordMeta>;

    /// Joins `group` on `topic` with the given offset-reset policy.
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        reset: OffsetReset,
    ) -> error::Result<Box<dyn Subscription>>;
}
