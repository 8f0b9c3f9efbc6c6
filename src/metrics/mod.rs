use prometheus::{CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

pub mod server;

pub struct Metrics {
    pub messages_received_total: CounterVec,
    pub messages_acked_total: CounterVec,
    pub task_duration_seconds: HistogramVec,
    pub active_consumers: Gauge,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let messages_received_total = CounterVec::new(
            Opts::new(
                "worker_messages_received_total",
                "Total number of deliveries received from the broker",
            ),
            &["queue"],
        )?;

        let messages_acked_total = CounterVec::new(
            Opts::new(
                "worker_messages_acked_total",
                "Total number of deliveries acknowledged after their task completed",
            ),
            &["queue"],
        )?;

        let task_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "worker_task_duration_seconds",
                "Time spent working on a task before acknowledging it",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 30.0, 60.0]),
            &["queue"],
        )?;

        let active_consumers = Gauge::new(
            "worker_active_consumers",
            "Number of active consumer loops",
        )?;

        registry.register(Box::new(messages_received_total.clone()))?;
        registry.register(Box::new(messages_acked_total.clone()))?;
        registry.register(Box::new(task_duration_seconds.clone()))?;
        registry.register(Box::new(active_consumers.clone()))?;

        Ok(Arc::new(Self {
            messages_received_total,
            messages_acked_total,
            task_duration_seconds,
            active_consumers,
            registry,
        }))
    }
}
