pub mod channel;
pub mod connection;
pub mod consumer;
pub mod handler;
pub mod publisher;
pub mod queue;

pub use channel::{ChannelError, ChannelProvider};
pub use connection::{BrokerConnection, ConnectionError};
pub use consumer::{generate_consumer_tag, Acknowledge, Consumer, ConsumerError, DeliveryProcessor};
pub use handler::{HandlerError, TaskHandler};
pub use publisher::{DeliveryMode, PublishError, Publisher};
pub use queue::{declare_queue, QueueError};
