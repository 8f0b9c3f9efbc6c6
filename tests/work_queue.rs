//! Round trip through a real broker. Run with a local RabbitMQ:
//! `cargo test -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use amqp_work_queues::config::DEFAULT_AMQP_URL;
use amqp_work_queues::messaging::{
    declare_queue, generate_consumer_tag, BrokerConnection, ChannelProvider, Consumer,
    DeliveryMode, Publisher,
};
use amqp_work_queues::metrics::Metrics;
use amqp_work_queues::tasks::FakeWork;
use amqp_work_queues::QueueSpec;
use lapin::options::QueueDeleteOptions;
use tokio::sync::Notify;

fn broker_url() -> String {
    std::env::var("AMQP_URL").unwrap_or_else(|_| DEFAULT_AMQP_URL.to_string())
}

fn scratch_queue() -> QueueSpec {
    let name = format!("task_queue.test.{}", uuid::Uuid::new_v4());
    QueueSpec {
        name: Box::leak(name.into_boxed_str()),
        durable: true,
    }
}

#[tokio::test]
#[ignore = "requires a running AMQP broker"]
async fn test_redeclare_is_idempotent() {
    let spec = scratch_queue();
    let broker = BrokerConnection::connect(&broker_url()).await.unwrap();
    let channel = ChannelProvider::create_channel(broker.get_connection())
        .await
        .unwrap();

    let first = declare_queue(&channel, &spec).await.unwrap();
    let second = declare_queue(&channel, &spec).await.unwrap();

    assert_eq!(first.name(), second.name());
    assert_eq!(second.message_count(), 0);

    channel
        .queue_delete(spec.name, QueueDeleteOptions::default())
        .await
        .unwrap();
    broker.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running AMQP broker"]
async fn test_published_task_is_worked_and_acked() {
    let spec = scratch_queue();
    let broker = BrokerConnection::connect(&broker_url()).await.unwrap();
    let channel = ChannelProvider::create_channel(broker.get_connection())
        .await
        .unwrap();

    declare_queue(&channel, &spec).await.unwrap();
    Publisher::new(&channel)
        .publish_text(spec.name, b"a.b..", DeliveryMode::Persistent)
        .await
        .unwrap();

    let worker_channel = ChannelProvider::create_channel(broker.get_connection())
        .await
        .unwrap();
    ChannelProvider::set_prefetch(&worker_channel, 1).await.unwrap();

    let metrics = Metrics::new().unwrap();
    let shutdown = Arc::new(Notify::new());
    let consumer = Consumer::new(
        worker_channel,
        spec.name.to_string(),
        generate_consumer_tag(),
        Arc::new(FakeWork::new(Duration::from_millis(20))),
        shutdown.clone(),
        metrics.clone(),
    );
    let handle = tokio::spawn(consumer.start());

    let acked = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let acked = metrics
                .messages_acked_total
                .with_label_values(&[spec.name])
                .get();
            if acked >= 1.0 {
                return acked;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(acked, 1.0);

    shutdown.notify_one();
    handle.await.unwrap().unwrap();

    let depth = declare_queue(&channel, &spec).await.unwrap();
    assert_eq!(depth.message_count(), 0);

    channel
        .queue_delete(spec.name, QueueDeleteOptions::default())
        .await
        .unwrap();
    broker.shutdown().await.unwrap();
}
