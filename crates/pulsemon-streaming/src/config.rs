use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub kafka: KafkaSection,
    #[serde(default)]
    pub redis: RedisSection,
    #[serde(default)]
    pub streaming: StreamingSection,
    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSection {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_metrics_raw_topic")]
    pub metrics_raw_topic: String,
    #[serde(default = "default_alerts_topic")]
    pub alerts_topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSection {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingSection {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
}

impl Default for KafkaSection {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            metrics_raw_topic: default_metrics_raw_topic(),
            alerts_topic: default_alerts_topic(),
        }
    }
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for StreamingSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

fn default_http_port() -> u16 {
    8082
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_client_id() -> String {
    "pulsemon-streaming".to_string()
}

fn default_metrics_raw_topic() -> String {
    "metrics.raw".to_string()
}

fn default_alerts_topic() -> String {
    "alerts".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1/".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_buffer_size() -> usize {
    256
}

fn default_ttl_minutes() -> u64 {
    10
}

impl StreamingConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
