use amqp_work_queues::messaging::{
    declare_queue, BrokerConnection, ChannelProvider, DeliveryMode, Publisher,
};
use amqp_work_queues::telemetry::{setup_logging, setup_panic_handler};
use amqp_work_queues::{Config, WorkQueueError, HELLO_QUEUE};
use clap::Parser;
use tracing::{error, info, warn};

const GREETING: &str = "Wassup world!";

#[derive(Parser, Debug)]
#[command(name = "send", version)]
#[command(about = "Publish a single greeting to the hello queue", long_about = None)]
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

    if let Err(e) = run(&config).await {
        error!(error = %e, retryable = e.is_retryable(), "Failed to send greeting");
        std::process::exit(1);
    }
}

async fn run(config: &Config) -> Result<(), WorkQueueError> {
    let broker = BrokerConnection::connect(&config.amqp_url).await?;
    let channel = ChannelProvider::create_channel(broker.get_connection()).await?;
    let queue = declare_queue(&channel, &HELLO_QUEUE).await?;

    Publisher::new(&channel)
        .publish_text(
            queue.name().as_str(),
            GREETING.as_bytes(),
            DeliveryMode::Transient,
        )
        .await?;
    info!(queue = HELLO_QUEUE.name, body = GREETING, " [x] Sent");

    if let Err(e) = ChannelProvider::close_channel(channel).await {
        warn!(error = %e, "Channel close failed after publish");
    }
    if let Err(e) = broker.shutdown().await {
        warn!(error = %e, "Connection close failed after publish");
    }

    Ok(())
}
