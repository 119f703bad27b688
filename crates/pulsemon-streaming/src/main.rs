use anyhow::Result;
use pulsemon_bus::kafka::{KafkaBus, KafkaConfig};
use pulsemon_bus::MessageBus;
use pulsemon_cache::redis::RedisMetricsCache;
use pulsemon_cache::MetricsCache;
use pulsemon_streaming::app::{self, AppState};
use pulsemon_streaming::config::StreamingConfig;
use pulsemon_streaming::hub::StreamHub;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsemon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/streaming.toml".to_string());
    let config = StreamingConfig::load(&config_path)?;

    tracing::info!(
        http_port = config.http_port,
        brokers = %config.kafka.brokers,
        buffer_size = config.streaming.buffer_size,
        "pulsemon-streaming starting"
    );

    let cache: Arc<dyn MetricsCache> = Arc::new(
        RedisMetricsCache::connect(&config.redis.url, config.cache.ttl_minutes).await?,
    );

    let bus: Arc<dyn MessageBus> = Arc::new(KafkaBus::new(KafkaConfig {
        brokers: config.kafka.brokers.clone(),
        client_id: config.kafka.client_id.clone(),
        ..KafkaConfig::default()
    })?);

    let hub = Arc::new(StreamHub::new(
        cache,
        config.streaming.buffer_size,
        Duration::from_secs(config.streaming.heartbeat_interval_secs),
    ));
    hub.start(
        bus,
        config.kafka.metrics_raw_topic.clone(),
        config.kafka.alerts_topic.clone(),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let router = app::build_router(AppState { hub });
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "pulsemon-streaming started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("Streaming service stopped");
    Ok(())
}
