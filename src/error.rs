use crate::config::ConfigError;
use crate::messaging::{
    ChannelError, ConnectionError, ConsumerError, HandlerError, PublishError, QueueError,
};

/// Every failure the three programs can hit. All of them end the process.
#[derive(Debug, thiserror::Error)]
pub enum WorkQueueError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    #[error("Failed to create metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Consumer task aborted: {0}")]
    ConsumerTask(#[from] tokio::task::JoinError),
}

impl WorkQueueError {
    /// Whether running the program again could succeed without changing its
    /// input or the broker's queue definitions.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(ConnectionError::ConnectionFailed(_)) => true,
            Self::Channel(ChannelError::CreationFailed(_)) => true,
            Self::Publish(_) => true,
            Self::Consumer(ConsumerError::DeliveryFailed(_)) => true,
            Self::Consumer(ConsumerError::StreamEnded) => true,
            Self::Consumer(ConsumerError::Handler(err)) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<HandlerError> for WorkQueueError {
    fn from(err: HandlerError) -> Self {
        Self::Consumer(ConsumerError::Handler(err))
    }
}
