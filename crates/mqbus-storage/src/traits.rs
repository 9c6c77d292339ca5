//! Retained store trait definition
//!
//! Defines the interface that all retained message stores implement.
//! Stores are not internally synchronized; the bus owns its store behind
//! the same lock that guards its subscriptions.

use bytes::Bytes;
use mqbus_types::{Message, TopicFilter};

/// Retained store trait - maps a concrete topic to its last retained payload
pub trait RetainedStore: Send + Sync {
    /// Insert or replace the payload retained for a concrete topic
    fn retain(&mut self, topic: &str, payload: Bytes);

    /// Remove the entry for exactly this topic, returning the old payload
    fn remove(&mut self, topic: &str) -> Option<Bytes>;

    /// Get the payload retained for exactly this topic
    fn get(&self, topic: &str) -> Option<Bytes>;

    /// Every retained message whose topic matches the filter, in no particular order
    fn matching(&self, filter: &TopicFilter) -> Vec<Message>;

    /// Number of retained topics
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
