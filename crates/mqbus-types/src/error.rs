//! Error types for MqBus
//!
//! Defines all error types used throughout the bus.

use thiserror::Error;

/// Main error type for MqBus operations
#[derive(Error, Debug)]
pub enum Error {
    /// Topic string violates the topic grammar
    #[error("Malformed topic {topic:?}: {reason}")]
    MalformedTopic { topic: String, reason: TopicError },

    /// A wildcard filter was given where a concrete topic is required
    #[error("Wildcard topic not allowed here: {0}")]
    WildcardTopic(String),

    /// No subscription with a structurally equal filter
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// The bus has been closed
    #[error("Bus is closed")]
    Closed,

    /// QoS level outside 0..=2
    #[error("Invalid QoS level: {0}")]
    InvalidQos(u8),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reason a topic string was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic is empty")]
    Empty,

    #[error("topic is {0} bytes long, the limit is 65535")]
    TooLong(usize),

    #[error("topic contains a NUL character")]
    ContainsNul,

    #[error("topic is not valid UTF-8")]
    InvalidUtf8,

    #[error("'#' must be the last segment")]
    MisplacedMultiLevelWildcard,

    #[error("segment {0:?} ends with a wildcard character")]
    InvalidWildcard(String),
}

/// Result type alias for MqBus operations
pub type Result<T> = std::result::Result<T, Error>;
