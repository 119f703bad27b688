use anyhow::Result;
use pulsemon_bus::kafka::{KafkaBus, KafkaConfig};
use pulsemon_bus::MessageBus;
use pulsemon_ingestion::api::AppState;
use pulsemon_ingestion::app;
use pulsemon_ingestion::config::IngestionConfig;
use pulsemon_ingestion::publisher::MetricsEventPublisher;
use pulsemon_ingestion::ratelimit::RateLimiter;
use pulsemon_ingestion::service::MetricsPublishService;
use pulsemon_ingestion::validator::MetricValidator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsemon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/ingestion.toml".to_string());
    let config = IngestionConfig::load(&config_path)?;

    tracing::info!(
        http_port = config.http_port,
        brokers = %config.kafka.brokers,
        max_metric_value = config.ingestion.max_metric_value,
        "pulsemon-ingestion starting"
    );

    let bus: Arc<dyn MessageBus> = Arc::new(KafkaBus::new(KafkaConfig {
        brokers: config.kafka.brokers.clone(),
        client_id: config.kafka.client_id.clone(),
        ..KafkaConfig::default()
    })?);

    let validator = MetricValidator::new(
        config.ingestion.max_metric_value,
        config.ingestion.allowed_environments.clone(),
    );
    let publisher = MetricsEventPublisher::new(bus, config.kafka.metrics_raw_topic.clone());
    let service = Arc::new(MetricsPublishService::new(validator, publisher));
    let limiter = Arc::new(RateLimiter::new(config.ingestion.rate_limit_per_sec));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let router = app::build_router(AppState { service }, limiter);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "pulsemon-ingestion started");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        signal::ctrl_c().await.ok();
    })
    .await?;

    tracing::info!("Ingestion service stopped");
    Ok(())
}
