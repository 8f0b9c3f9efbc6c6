use async_trait::async_trait;

/// Performs the work a task body describes. The consumer acknowledges the
/// delivery only after `handle` returns `Ok`.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError>;
}

/// Failure classification for task handlers.
///
/// - `Transient`: the same body could succeed on redelivery (a dependency was down).
/// - `Permanent`: the body itself can never be processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("Transient task failure: {0}")]
    Transient(String),

    #[error("Permanent task failure: {0}")]
    Permanent(String),
}

impl HandlerError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient(reason.into())
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent(reason.into())
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Transient(reason) | Self::Permanent(reason) => reason,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
        }
    }
}
