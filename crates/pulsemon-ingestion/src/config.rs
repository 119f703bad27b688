use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub kafka: KafkaSection,
    #[serde(default)]
    pub ingestion: IngestionSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSection {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_metrics_raw_topic")]
    pub metrics_raw_topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSection {
    /// Metrics above this value are rejected outright.
    #[serde(default = "default_max_metric_value")]
    pub max_metric_value: f64,
    #[serde(default = "default_allowed_environments")]
    pub allowed_environments: Vec<String>,
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,
}

impl Default for KafkaSection {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            metrics_raw_topic: default_metrics_raw_topic(),
        }
    }
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            max_metric_value: default_max_metric_value(),
            allowed_environments: default_allowed_environments(),
            rate_limit_per_sec: default_rate_limit_per_sec(),
        }
    }
}

fn default_http_port() -> u16 {
    8081
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_client_id() -> String {
    "pulsemon-ingestion".to_string()
}

fn default_metrics_raw_topic() -> String {
    "metrics.raw".to_string()
}

fn default_max_metric_value() -> f64 {
    1_000_000.0
}

fn default_allowed_environments() -> Vec<String> {
    vec![
        "dev".to_string(),
        "staging".to_string(),
        "production".to_string(),
        "unknown".to_string(),
    ]
}

fn default_rate_limit_per_sec() -> u32 {
    100
}

impl IngestionConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
