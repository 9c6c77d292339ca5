//! MqBus Types - Core domain types for the in-process message bus
//!
//! This crate contains all shared types used across MqBus components.

pub mod config;
pub mod error;
pub mod message;
pub mod topic;

// Re-export commonly used types
pub use config::BusConfig;
pub use error::{Error, Result, TopicError};
pub use message::{Message, Qos, SubscriptionId};
pub use topic::TopicFilter;
