//! Hello-world publisher, work-queue producer and work-queue worker for an
//! AMQP 0-9-1 broker.
//!
//! The `send`, `new_task` and `worker` binaries are thin wrappers over the
//! pieces exported here.

pub mod config;
pub mod error;
pub mod messaging;
pub mod metrics;
pub mod tasks;
pub mod telemetry;

pub use config::{Config, QueueSpec, HELLO_QUEUE, TASK_QUEUE};
pub use error::WorkQueueError;
