use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub kafka: KafkaSection,
    #[serde(default)]
    pub notifications: NotificationsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSection {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_alerts_topic")]
    pub alerts_topic: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsSection {
    /// Subset of {slack, email, webhook} to route alerts through.
    #[serde(default)]
    pub enabled_channels: Vec<String>,
    #[serde(default)]
    pub throttling: ThrottlingSection,
    #[serde(default)]
    pub slack: SlackSection,
    #[serde(default)]
    pub email: EmailSection,
    #[serde(default)]
    pub webhook: WebhookSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottlingSection {
    #[serde(default = "default_throttling_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_notifications_per_hour")]
    pub max_notifications_per_hour: u32,
    #[serde(default = "default_duplicate_suppression_minutes")]
    pub duplicate_suppression_minutes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackSection {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    #[serde(default)]
    pub mention_on_critical: bool,
    pub critical_user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailSection {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookSection {
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Default for KafkaSection {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            alerts_topic: default_alerts_topic(),
            group_id: default_group_id(),
        }
    }
}

impl Default for ThrottlingSection {
    fn default() -> Self {
        Self {
            enabled: default_throttling_enabled(),
            max_notifications_per_hour: default_max_notifications_per_hour(),
            duplicate_suppression_minutes: default_duplicate_suppression_minutes(),
        }
    }
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_client_id() -> String {
    "pulsemon-notification".to_string()
}

fn default_alerts_topic() -> String {
    "alerts".to_string()
}

fn default_group_id() -> String {
    "notification.alerts".to_string()
}

fn default_throttling_enabled() -> bool {
    true
}

fn default_max_notifications_per_hour() -> u32 {
    10
}

fn default_duplicate_suppression_minutes() -> i64 {
    5
}

fn default_smtp_port() -> u16 {
    587
}

impl NotificationConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
