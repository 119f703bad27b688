use anyhow::Result;
use pulsemon_bus::kafka::{KafkaBus, KafkaConfig};
use pulsemon_bus::MessageBus;
use pulsemon_cache::redis::RedisMetricsCache;
use pulsemon_cache::MetricsCache;
use pulsemon_processing::aggregator::MetricsAggregator;
use pulsemon_processing::config::ProcessingConfig;
use pulsemon_processing::consumer::MetricConsumer;
use pulsemon_processing::engine::AlertEngine;
use pulsemon_processing::publisher::AlertPublisher;
use pulsemon_processing::rule_seed;
use pulsemon_storage::MonitorStore;
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
        .unwrap_or_else(|| "config/processing.toml".to_string());
    let config = ProcessingConfig::load(&config_path)?;

    tracing::info!(
        brokers = %config.kafka.brokers,
        group = %config.kafka.group_id,
        "pulsemon-processing starting"
    );

    let store = Arc::new(MonitorStore::connect(&config.database.url).await?);
    if let Err(e) = rule_seed::init_default_rules(&store).await {
        tracing::error!(error = %e, "Failed to seed default alert rules");
    }

    let cache: Arc<dyn MetricsCache> = Arc::new(
        RedisMetricsCache::connect(&config.redis.url, config.cache.ttl_minutes).await?,
    );

    let bus: Arc<dyn MessageBus> = Arc::new(KafkaBus::new(KafkaConfig {
        brokers: config.kafka.brokers.clone(),
        client_id: config.kafka.client_id.clone(),
        ..KafkaConfig::default()
    })?);

    let publisher = AlertPublisher::new(bus.clone(), config.kafka.alerts_topic.clone());
    let aggregator = Arc::new(MetricsAggregator::new(cache.clone(), store.clone()));
    let engine = Arc::new(AlertEngine::new(
        store.clone(),
        store.clone(),
        cache,
        publisher,
    ));

    let consumer = MetricConsumer::new(
        bus,
        aggregator,
        engine,
        config.kafka.metrics_raw_topic.clone(),
        config.kafka.group_id.clone(),
    );
    let consumer_handle = tokio::spawn(async move {
        loop {
            if let Err(e) = consumer.run().await {
                tracing::error!(error = %e, "Metric consumer stopped, restarting");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    });

    tracing::info!("pulsemon-processing started");

    signal::ctrl_c().await.ok();
    tracing::info!("Shutting down gracefully");
    consumer_handle.abort();
    Ok(())
}
