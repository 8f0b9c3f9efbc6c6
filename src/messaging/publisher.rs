use lapin::{options::BasicPublishOptions, BasicProperties, Channel};
use tracing::{error, info};

pub const TEXT_PLAIN: &str = "text/plain";

/// AMQP delivery mode of a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Broker default; the message is lost if the broker restarts.
    Transient,
    /// Asks the broker to write the message to disk.
    Persistent,
}

impl DeliveryMode {
    pub fn as_amqp(self) -> u8 {
        match self {
            Self::Transient => 1,
            Self::Persistent => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Persistent => "persistent",
        }
    }
}

/// Properties for a `text/plain` message. Transient messages leave the
/// delivery mode unset so the broker default applies.
pub fn text_properties(mode: DeliveryMode) -> BasicProperties {
    let properties = BasicProperties::default().with_content_type(TEXT_PLAIN.into());

    match mode {
        DeliveryMode::Transient => properties,
        DeliveryMode::Persistent => properties.with_delivery_mode(mode.as_amqp()),
    }
}

/// Publishes plain-text messages through the default exchange, routed by
/// queue name.
pub struct Publisher<'a> {
    channel: &'a Channel,
}

impl<'a> Publisher<'a> {
    pub fn new(channel: &'a Channel) -> Self {
        Self { channel }
    }

    pub async fn publish_text(
        &self,
        queue: &str,
        body: &[u8],
        mode: DeliveryMode,
    ) -> Result<(), PublishError> {
        let confirm = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                body,
                text_properties(mode),
            )
            .await
            .map_err(|e| {
                error!(error = %e, queue, "Failed to publish message");
                PublishError::PublishFailed(e.to_string())
            })?;

        confirm.await.map_err(|e| {
            error!(error = %e, queue, "Broker did not accept published message");
            PublishError::ConfirmFailed(e.to_string())
        })?;

        info!(
            queue,
            payload_size = body.len(),
            delivery_mode = mode.name(),
            "Message published"
        );

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to publish message: {0}")]
    PublishFailed(String),

    #[error("Failed to confirm published message: {0}")]
    ConfirmFailed(String),
}
