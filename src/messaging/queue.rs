use lapin::{options::QueueDeclareOptions, types::FieldTable, Channel, Queue};
use tracing::{error, info};

use crate::config::QueueSpec;

/// Declare options for `spec`. Only durability varies between queues.
pub fn declare_options(spec: &QueueSpec) -> QueueDeclareOptions {
    QueueDeclareOptions {
        passive: false,
        durable: spec.durable,
        exclusive: false,
        auto_delete: false,
        nowait: false,
    }
}

/// Declares `spec` on the broker. Redeclaring an existing queue with the same
/// parameters leaves it untouched.
pub async fn declare_queue(channel: &Channel, spec: &QueueSpec) -> Result<Queue, QueueError> {
    let queue = channel
        .queue_declare(spec.name, declare_options(spec), FieldTable::default())
        .await
        .map_err(|e| {
            error!(error = %e, queue = spec.name, "Failed to declare queue");
            QueueError::DeclareFailed {
                queue: spec.name,
                reason: e.to_string(),
            }
        })?;

    info!(
        queue = spec.name,
        durable = spec.durable,
        messages = queue.message_count(),
        consumers = queue.consumer_count(),
        "Queue declared"
    );

    Ok(queue)
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to declare queue {queue}: {reason}")]
    DeclareFailed { queue: &'static str, reason: String },
}
