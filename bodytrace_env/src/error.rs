//! Error types for the BodyTrace environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// The frame-side receiver has been dropped
    #[error("Toggle channel closed")]
    ChannelClosed,

    /// The toggle queue is at capacity (non-blocking send only)
    #[error("Toggle queue full")]
    QueueFull,

    /// A remote message arrived on a topic nobody listens on
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
}

impl EnvError {
    /// Creates an unknown-topic error.
    pub fn unknown_topic(topic: impl Into<String>) -> Self {
        Self::UnknownTopic(topic.into())
    }
}
