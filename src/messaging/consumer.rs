use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lapin::{acker::Acker, options::*, types::FieldTable, Channel};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::handler::{HandlerError, TaskHandler};
use crate::metrics::Metrics;

/// Consumer tag unique to this worker process.
pub fn generate_consumer_tag() -> String {
    format!("worker-{}", Uuid::new_v4())
}

/// Acknowledges one delivery.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn acknowledge(&self) -> Result<(), ConsumerError>;
}

#[async_trait]
impl Acknowledge for Acker {
    async fn acknowledge(&self) -> Result<(), ConsumerError> {
        self.ack(BasicAckOptions { multiple: false })
            .await
            .map_err(|e| ConsumerError::AckFailed(e.to_string()))
    }
}

/// Runs the task handler for a single delivery and acknowledges it once the
/// handler has finished.
pub struct DeliveryProcessor {
    queue_name: String,
    handler: Arc<dyn TaskHandler>,
    metrics: Arc<Metrics>,
}

impl DeliveryProcessor {
    pub fn new(queue_name: String, handler: Arc<dyn TaskHandler>, metrics: Arc<Metrics>) -> Self {
        Self {
            queue_name,
            handler,
            metrics,
        }
    }

    pub async fn process<A>(&self, delivery_tag: u64, body: &[u8], acker: &A) -> Result<(), ConsumerError>
    where
        A: Acknowledge + ?Sized,
    {
        let queue = self.queue_name.as_str();

        info!(
            delivery_tag,
            body = %String::from_utf8_lossy(body),
            "Received a message"
        );
        self.metrics
            .messages_received_total
            .with_label_values(&[queue])
            .inc();

        let start = Instant::now();
        if let Err(e) = self.handler.handle(body).await {
            error!(
                delivery_tag,
                error = %e,
                error_type = e.error_type(),
                "Task failed, leaving delivery unacknowledged"
            );
            return Err(ConsumerError::Handler(e));
        }
        let duration = start.elapsed();

        self.metrics
            .task_duration_seconds
            .with_label_values(&[queue])
            .observe(duration.as_secs_f64());
        info!(delivery_tag, duration_ms = duration.as_millis() as u64, "Done");

        acker.acknowledge().await.map_err(|e| {
            error!(error = %e, delivery_tag, "Failed to acknowledge delivery");
            e
        })?;

        self.metrics
            .messages_acked_total
            .with_label_values(&[queue])
            .inc();

        Ok(())
    }

    /// Processes `(delivery_tag, body, acker)` items one at a time until
    /// `shutdown` is notified. A notification that arrives mid-task takes
    /// effect once that delivery has been acknowledged. The stream failing or
    /// ending on its own is an error.
    pub async fn run<S, A, E>(&self, mut deliveries: S, shutdown: &Notify) -> Result<(), ConsumerError>
    where
        S: Stream<Item = Result<(u64, Vec<u8>, A), E>> + Unpin,
        A: Acknowledge,
        E: Display,
    {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.notified() => {
                    info!(queue = %self.queue_name, "Shutdown signal received, stopping consumer");
                    return Ok(());
                }

                delivery = deliveries.next() => {
                    match delivery {
                        Some(Ok((delivery_tag, body, acker))) => {
                            self.process(delivery_tag, &body, &acker).await?;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Error receiving message from broker");
                            return Err(ConsumerError::DeliveryFailed(e.to_string()));
                        }
                        None => {
                            error!(queue = %self.queue_name, "Delivery stream ended without a shutdown signal");
                            return Err(ConsumerError::StreamEnded);
                        }
                    }
                }
            }
        }
    }
}

pub struct Consumer {
    channel: Channel,
    queue_name: String,
    consumer_tag: String,
    processor: DeliveryProcessor,
    shutdown: Arc<Notify>,
    metrics: Arc<Metrics>,
}

impl Consumer {
    pub fn new(
        channel: Channel,
        queue_name: String,
        consumer_tag: String,
        handler: Arc<dyn TaskHandler>,
        shutdown: Arc<Notify>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let processor = DeliveryProcessor::new(queue_name.clone(), handler, metrics.clone());

        Self {
            channel,
            queue_name,
            consumer_tag,
            processor,
            shutdown,
            metrics,
        }
    }

    /// Consumes deliveries one at a time until shutdown is signalled. Any
    /// broker, task or acknowledgment failure stops the loop with an error.
    pub async fn start(self) -> Result<(), ConsumerError> {
        info!(
            queue = %self.queue_name,
            consumer_tag = %self.consumer_tag,
            "Starting consumer"
        );

        let consumer = self
            .channel
            .basic_consume(
                &self.queue_name,
                &self.consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                error!(error = %e, queue = %self.queue_name, "Failed to register consumer");
                ConsumerError::ConsumeFailed(e.to_string())
            })?;

        info!(
            queue = %self.queue_name,
            consumer_tag = %self.consumer_tag,
            "Waiting for messages. To exit press CTRL+C"
        );

        self.metrics.active_consumers.inc();

        let deliveries = consumer
            .map(|delivery| delivery.map(|d| (d.delivery_tag, d.data, d.acker)));
        let result = self.processor.run(deliveries, &self.shutdown).await;
        if result.is_ok() {
            self.cancel().await;
        }

        self.metrics.active_consumers.dec();
        info!(consumer_tag = %self.consumer_tag, "Consumer stopped");
        result
    }

    async fn cancel(&self) {
        if let Err(e) = self
            .channel
            .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
            .await
        {
            warn!(error = %e, consumer_tag = %self.consumer_tag, "Failed to cancel consumer");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Failed to register consumer: {0}")]
    ConsumeFailed(String),

    #[error("Failed to receive delivery: {0}")]
    DeliveryFailed(String),

    #[error("Delivery stream ended unexpectedly")]
    StreamEnded,

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("Failed to acknowledge delivery: {0}")]
    AckFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::FakeWork;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingAcker {
        acks: Mutex<Vec<Instant>>,
        fail: bool,
    }

    #[async_trait]
    impl Acknowledge for RecordingAcker {
        async fn acknowledge(&self) -> Result<(), ConsumerError> {
            if self.fail {
                return Err(ConsumerError::AckFailed("channel closed".to_string()));
            }
            self.acks.lock().unwrap().push(Instant::now());
            Ok(())
        }
    }

    struct FailingTask(HandlerError);

    #[async_trait]
    impl TaskHandler for FailingTask {
        async fn handle(&self, _body: &[u8]) -> Result<(), HandlerError> {
            Err(self.0.clone())
        }
    }

    fn processor(handler: Arc<dyn TaskHandler>) -> (DeliveryProcessor, Arc<Metrics>) {
        let metrics = Metrics::new().unwrap();
        let processor = DeliveryProcessor::new("task_queue".to_string(), handler, metrics.clone());
        (processor, metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_happens_once_after_simulated_work() {
        let (processor, metrics) = processor(Arc::new(FakeWork::default()));
        let acker = RecordingAcker::default();

        let start = Instant::now();
        processor.process(1, b"Hello...", &acker).await.unwrap();

        let acks = acker.acks.lock().unwrap();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0] - start, Duration::from_secs(3));
        assert_eq!(
            metrics.messages_acked_total.with_label_values(&["task_queue"]).get(),
            1.0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_without_dots_is_acked_immediately() {
        let (processor, _metrics) = processor(Arc::new(FakeWork::default()));
        let acker = RecordingAcker::default();

        let start = Instant::now();
        processor.process(7, b"quick", &acker).await.unwrap();

        let acks = acker.acks.lock().unwrap();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0] - start, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_failed_task_is_not_acked() {
        let (processor, metrics) =
            processor(Arc::new(FailingTask(HandlerError::permanent("bad body"))));
        let acker = RecordingAcker::default();

        let err = processor.process(2, b"x", &acker).await.unwrap_err();

        assert!(matches!(err, ConsumerError::Handler(HandlerError::Permanent(_))));
        assert!(acker.acks.lock().unwrap().is_empty());
        assert_eq!(
            metrics.messages_received_total.with_label_values(&["task_queue"]).get(),
            1.0
        );
        assert_eq!(
            metrics.messages_acked_total.with_label_values(&["task_queue"]).get(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_ack_failure_is_reported() {
        let (processor, metrics) = processor(Arc::new(FakeWork::new(Duration::ZERO)));
        let acker = RecordingAcker {
            fail: true,
            ..Default::default()
        };

        let err = processor.process(3, b"a.b..", &acker).await.unwrap_err();

        assert!(matches!(err, ConsumerError::AckFailed(_)));
        assert_eq!(
            metrics.messages_acked_total.with_label_values(&["task_queue"]).get(),
            0.0
        );
    }

    type AckLog = Arc<Mutex<Vec<(u64, Instant)>>>;

    struct TaggedAcker {
        delivery_tag: u64,
        log: AckLog,
    }

    #[async_trait]
    impl Acknowledge for TaggedAcker {
        async fn acknowledge(&self) -> Result<(), ConsumerError> {
            self.log.lock().unwrap().push((self.delivery_tag, Instant::now()));
            Ok(())
        }
    }

    fn delivery(delivery_tag: u64, body: &str, log: &AckLog) -> Result<(u64, Vec<u8>, TaggedAcker), String> {
        Ok((
            delivery_tag,
            body.as_bytes().to_vec(),
            TaggedAcker {
                delivery_tag,
                log: log.clone(),
            },
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_task_acks_in_flight_delivery_then_stops() {
        let (processor, metrics) = processor(Arc::new(FakeWork::default()));
        let log = AckLog::default();
        let deliveries = futures::stream::iter(vec![
            delivery(1, "first..", &log),
            delivery(2, "second", &log),
        ]);
        let shutdown = Notify::new();

        let start = Instant::now();
        let (result, _) = tokio::join!(processor.run(deliveries, &shutdown), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            shutdown.notify_one();
        });

        result.unwrap();
        let acks = log.lock().unwrap();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].0, 1);
        assert_eq!(acks[0].1 - start, Duration::from_secs(2));
        assert_eq!(
            metrics.messages_received_total.with_label_values(&["task_queue"]).get(),
            1.0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliveries_are_processed_in_order_until_stream_error() {
        let (processor, _metrics) = processor(Arc::new(FakeWork::default()));
        let log = AckLog::default();
        let deliveries = futures::stream::iter(vec![
            delivery(1, "a.", &log),
            delivery(2, "b..", &log),
            Err("connection reset".to_string()),
            delivery(3, "never", &log),
        ]);
        let shutdown = Notify::new();

        let start = Instant::now();
        let err = processor.run(deliveries, &shutdown).await.unwrap_err();

        assert!(matches!(err, ConsumerError::DeliveryFailed(ref reason) if reason == "connection reset"));
        let acks = log.lock().unwrap();
        let tags: Vec<u64> = acks.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, vec![1, 2]);
        assert_eq!(acks[1].1 - start, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_stream_ending_without_shutdown_is_an_error() {
        let (processor, _metrics) = processor(Arc::new(FakeWork::new(Duration::ZERO)));
        let log = AckLog::default();
        let deliveries = futures::stream::iter(vec![delivery(1, "only", &log)]);
        let shutdown = Notify::new();

        let err = processor.run(deliveries, &shutdown).await.unwrap_err();

        assert!(matches!(err, ConsumerError::StreamEnded));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_consumer_tags_are_unique() {
        let first = generate_consumer_tag();
        let second = generate_consumer_tag();
        assert!(first.starts_with("worker-"));
        assert_ne!(first, second);
    }
}
