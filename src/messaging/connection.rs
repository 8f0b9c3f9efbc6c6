use lapin::{Connection, ConnectionProperties};
use tracing::{error, info};

pub struct BrokerConnection {
    connection: Connection,
    url: String,
}

impl BrokerConnection {
    pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
        info!(url = %url, "Connecting to broker");

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Failed to connect to broker");
                ConnectionError::ConnectionFailed(e.to_string())
            })?;

        info!(url = %url, "Connected to broker");

        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }

    pub fn get_connection(&self) -> &Connection {
        &self.connection
    }

    pub async fn shutdown(self) -> Result<(), ConnectionError> {
        info!(url = %self.url, "Closing broker connection");

        self.connection
            .close(200, "Normal shutdown")
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to close broker connection gracefully");
                ConnectionError::ShutdownFailed(e.to_string())
            })?;

        info!("Broker connection closed");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to connect to broker: {0}")]
    ConnectionFailed(String),

    #[error("Failed to shutdown connection gracefully: {0}")]
    ShutdownFailed(String),
}
