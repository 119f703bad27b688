use crate::error::{BusError, Result};
use crate::{MessageBus, OffsetReset, Record, RecordMeta, Subscription};
use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use std::time::Duration;

/// Producer/consumer settings for the Kafka-backed bus.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub client_id: String,
    /// Per-send delivery timeout; a send that exceeds it is a failure.
    pub send_timeout_secs: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            client_id: "pulsemon".to_string(),
            send_timeout_secs: 5,
        }
    }
}

/// Kafka-backed message bus.
///
/// The producer requires acknowledgement from all in-sync replicas;
/// consumers run with auto-commit disabled so offsets only advance through
/// explicit [`Subscription::ack`].
pub struct KafkaBus {
    producer: FutureProducer,
    config: KafkaConfig,
}

impl KafkaBus {
    pub fn new(config: KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("acks", "all")
            .set("retries", "3")
            .set("compression.type", "lz4")
            .set(
                "message.timeout.ms",
                (config.send_timeout_secs * 1000).to_string(),
            )
            .create()
            .map_err(|e| BusError::Connection(e.to_string()))?;

        tracing::info!(brokers = %config.brokers, "Kafka producer initialized");
        Ok(Self { producer, config })
    }
}

#[async_trait]
impl MessageBus for KafkaBus {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<RecordMeta> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        let timeout = Timeout::After(Duration::from_secs(self.config.send_timeout_secs));

        match self.producer.send(record, timeout).await {
            Ok((partition, offset)) => Ok(RecordMeta {
                topic: topic.to_string(),
                partition,
                offset,
            }),
            Err((e, _)) => Err(BusError::Produce(e.to_string())),
        }
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        reset: OffsetReset,
    ) -> Result<Box<dyn Subscription>> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.config.brokers)
            .set("client.id", &self.config.client_id)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", reset.as_str())
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| BusError::Connection(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| BusError::Connection(e.to_string()))?;

        tracing::info!(topic, group, reset = reset.as_str(), "Kafka consumer subscribed");
        Ok(Box::new(KafkaSubscription { consumer }))
    }
}

struct KafkaSubscription {
    consumer: StreamConsumer,
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn next(&mut self) -> Result<Record> {
        let msg = self
            .consumer
            .recv()
            .await
            .map_err(|e| BusError::Consume(e.to_string()))?;

        Ok(Record {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    async fn ack(&mut self, record: &Record) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &record.topic,
            record.partition,
            Offset::Offset(record.offset + 1),
        )
        .map_err(|e| BusError::Commit(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| BusError::Commit(e.to_string()))
    }
}
