use amqp_work_queues::messaging::{
    declare_queue, BrokerConnection, ChannelProvider, DeliveryMode, Publisher,
};
use amqp_work_queues::tasks::body_from_args;
use amqp_work_queues::telemetry::{setup_logging, setup_panic_handler};
use amqp_work_queues::{Config, WorkQueueError, TASK_QUEUE};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "new_task", version)]
#[command(about = "Publish a persistent task to the durable task queue", long_about = None)]
struct Args {
    /// Task words; every `.` costs the worker one second. Defaults to a
    /// timestamped greeting.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

#[tokio::main]
async fn main() {
    setup_panic_handler();
    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    setup_logging(&config.rust_log);

    if let Err(e) = run(&config, &args.words).await {
        error!(error = %e, retryable = e.is_retryable(), "Failed to send task");
        std::process::exit(1);
    }
}

async fn run(config: &Config, words: &[String]) -> Result<(), WorkQueueError> {
    let broker = BrokerConnection::connect(&config.amqp_url).await?;
    let channel = ChannelProvider::create_channel(broker.get_connection()).await?;
    let queue = declare_queue(&channel, &TASK_QUEUE).await?;

    let body = body_from_args(words);
    Publisher::new(&channel)
        .publish_text(
            queue.name().as_str(),
            body.as_bytes(),
            DeliveryMode::Persistent,
        )
        .await?;
    info!(queue = TASK_QUEUE.name, body = %body, " [x] Sent");

    if let Err(e) = ChannelProvider::close_channel(channel).await {
        warn!(error = %e, "Channel close failed after publish");
    }
    if let Err(e) = broker.shutdown().await {
        warn!(error = %e, "Connection close failed after publish");
    }

    Ok(())
}
