//! Message Publisher Port
//!
//! Outbound port to the message bus.

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize message: {0}")]
    Serialize(String),
    #[error("message bus unavailable: {0}")]
    Unavailable(String),
}

/// Publishes messages to named topics.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, topic: &str, message: serde_json::Value) -> Result<(), PublishError>;
}
