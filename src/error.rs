//! Bridge error types

use std::time::Duration;

use thiserror::Error;

use crate::message::{ChannelType, MessageId};

/// Errors that can occur while moving work between the tactical and
/// operational levels
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No correlated reply arrived before the deadline
    #[error("Request {message_id} timed out after {timeout:?}")]
    Timeout {
        message_id: MessageId,
        timeout: Duration,
    },

    /// Channel queue is full, the message was rejected
    #[error("Channel {channel} is at capacity ({capacity} queued messages)")]
    Backpressure {
        channel: ChannelType,
        capacity: usize,
    },

    /// The bus backing an adapter has been dropped
    #[error("Message bus is closed")]
    BusClosed,

    /// A reply channel was dropped before answering
    #[error("Reply channel closed")]
    ChannelClosed,

    /// Dependency index rejected an edge
    #[error("Invalid dependency: {0}")]
    InvalidDependency(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// True for the transient conditions a caller may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Backpressure { .. })
    }
}
