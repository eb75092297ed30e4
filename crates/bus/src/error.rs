//! Typed transport errors
//!
//! Every variant is recoverable by the reconnect loop; none is fatal to
//! the process.

use thiserror::Error;

/// Transport error feeding the connection state machine
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// Connect attempt failed
    #[error("connect failed on '{leg}': {message}")]
    ConnectFailed { leg: String, message: String },

    /// Subscribe request failed
    #[error("subscribe failed for '{filter}': {message}")]
    SubscribeFailed { filter: String, message: String },

    /// Live connection dropped mid-stream
    #[error("connection lost: {message}")]
    ConnectionLost { message: String },

    /// Publish call failed
    #[error("publish failed to '{topic}': {message}")]
    PublishFailed { topic: String, message: String },
}

impl ConnectionError {
    /// Create connect failure
    pub fn connect_failed(leg: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectFailed {
            leg: leg.into(),
            message: message.into(),
        }
    }

    /// Create subscribe failure
    pub fn subscribe_failed(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubscribeFailed {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// Create connection-lost error
    pub fn lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    /// Create publish failure
    pub fn publish_failed(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PublishFailed {
            topic: topic.into(),
            message: message.into(),
        }
    }
}
