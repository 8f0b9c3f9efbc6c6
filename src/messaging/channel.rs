use lapin::{options::BasicQosOptions, Channel, Connection};
use tracing::{error, info};

pub struct ChannelProvider;

impl ChannelProvider {
    pub async fn create_channel(connection: &Connection) -> Result<Channel, ChannelError> {
        info!("Opening channel");

        let channel = connection.create_channel().await.map_err(|e| {
            error!(error = %e, "Failed to open channel");
            ChannelError::CreationFailed(e.to_string())
        })?;

        info!(channel_id = channel.id(), "Channel opened");
        Ok(channel)
    }

    /// Limits the broker to `prefetch_count` unacknowledged deliveries for
    /// each consumer on this channel.
    pub async fn set_prefetch(channel: &Channel, prefetch_count: u16) -> Result<(), ChannelError> {
        info!(channel_id = channel.id(), prefetch_count, "Configuring channel QoS");

        channel
            .basic_qos(prefetch_count, BasicQosOptions { global: false })
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to configure channel QoS");
                ChannelError::QoSConfigurationFailed(e.to_string())
            })?;

        info!(
            channel_id = channel.id(),
            prefetch_count,
            "Channel QoS configured"
        );

        Ok(())
    }

    pub async fn close_channel(channel: Channel) -> Result<(), ChannelError> {
        let channel_id = channel.id();
        info!(channel_id, "Closing channel");

        channel.close(200, "Normal shutdown").await.map_err(|e| {
            error!(error = %e, channel_id, "Failed to close channel gracefully");
            ChannelError::CloseFailed(e.to_string())
        })?;

        info!(channel_id, "Channel closed");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to open channel: {0}")]
    CreationFailed(String),

    #[error("Failed to configure channel QoS: {0}")]
    QoSConfigurationFailed(String),

    #[error("Failed to close channel: {0}")]
    CloseFailed(String),
}
