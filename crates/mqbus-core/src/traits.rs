//! Bus trait definition
//!
//! Defines the interface that all bus implementations provide, so callers
//! can swap the in-process bus for another transport.

use async_trait::async_trait;
use mqbus_types::{Message, Qos, Result};

use crate::subscription::Receiver;

/// Bus trait - publish/subscribe with MQTT topic semantics
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish a message to a concrete topic.
    ///
    /// An empty payload deletes the retained entry for the topic and is not
    /// delivered. Returns once delivery is submitted, not completed.
    async fn publish(&self, message: Message, qos: Qos, retained: bool) -> Result<()>;

    /// Subscribe to a topic filter, wildcards allowed
    async fn subscribe(&self, filter: &str, qos: Qos) -> Result<Receiver>;

    /// Remove the subscription whose filter is structurally equal to `filter`
    async fn unsubscribe(&self, filter: &str) -> Result<()>;

    /// Get every retained message matching the filter
    async fn get(&self, filter: &str, qos: Qos) -> Result<Vec<Message>>;

    /// Terminate every subscription
    async fn close(&self) -> Result<()>;
}
