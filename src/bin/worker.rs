use std::sync::Arc;

use amqp_work_queues::messaging::{
    declare_queue, generate_consumer_tag, BrokerConnection, ChannelProvider, Consumer,
};
use amqp_work_queues::metrics::{server::start_metrics_server, Metrics};
use amqp_work_queues::tasks::FakeWork;
use amqp_work_queues::telemetry::{setup_logging, setup_panic_handler};
use amqp_work_queues::{Config, WorkQueueError, TASK_QUEUE};
use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Hand out one unacknowledged task at a time so busy workers are skipped.
const PREFETCH_COUNT: u16 = 1;

#[derive(Parser, Debug)]
#[command(name = "worker", version)]
#[command(about = "Consume tasks from the durable task queue, one second per dot", long_about = None)]
struct Args {}

#[tokio::main]
async fn main() {
    setup_panic_handler();
    let _args = Args::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    setup_logging(&config.rust_log);

    info!(version = env!("CARGO_PKG_VERSION"), "Worker starting");

    if let Err(e) = run(&config).await {
        error!(error = %e, retryable = e.is_retryable(), "Worker failed");
        std::process::exit(1);
    }

    info!("Worker stopped");
}

async fn run(config: &Config) -> Result<(), WorkQueueError> {
    let broker = BrokerConnection::connect(&config.amqp_url).await?;
    let channel = ChannelProvider::create_channel(broker.get_connection()).await?;

    // The worker may start before any producer, so it declares the queue too.
    let queue = declare_queue(&channel, &TASK_QUEUE).await?;
    ChannelProvider::set_prefetch(&channel, PREFETCH_COUNT).await?;

    let metrics = Metrics::new()?;

    if let Some(port) = config.metrics_port {
        let metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(metrics, port).await {
                error!(error = %e, port, "Metrics server stopped");
            }
        });
    }

    let shutdown = Arc::new(Notify::new());
    let consumer = Consumer::new(
        channel,
        queue.name().as_str().to_string(),
        generate_consumer_tag(),
        Arc::new(FakeWork::default()),
        shutdown.clone(),
        metrics,
    );

    let mut consumer_handle = tokio::spawn(consumer.start());

    tokio::select! {
        finished = &mut consumer_handle => {
            finished??;
            warn!("Consumer finished without a shutdown signal");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(WorkQueueError::Signal)?;
            warn!("Shutdown signal received, finishing in-flight task");

            shutdown.notify_one();

            match tokio::time::timeout(config.shutdown_timeout, &mut consumer_handle).await {
                Ok(finished) => finished??,
                Err(_) => {
                    warn!(
                        timeout_secs = config.shutdown_timeout.as_secs(),
                        "Consumer shutdown timeout, in-flight task will be redelivered"
                    );
                    consumer_handle.abort();
                }
            }
        }
    }

    if let Err(e) = broker.shutdown().await {
        warn!(error = %e, "Connection close failed during shutdown");
    }

    Ok(())
}
