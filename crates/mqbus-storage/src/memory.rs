//! In-memory retained store
//!
//! Fast, non-persistent storage. All retained messages are lost when the
//! process exits.

use std::collections::HashMap;

use bytes::Bytes;
use mqbus_types::{Message, TopicFilter};
use tracing::{debug, trace};

use crate::traits::RetainedStore;

/// In-memory retained store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Retained payloads keyed by concrete topic
    topics: HashMap<String, Bytes>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetainedStore for MemoryStore {
    fn retain(&mut self, topic: &str, payload: Bytes) {
        let size = payload.len();
        if self.topics.insert(topic.to_string(), payload).is_some() {
            trace!(topic = %topic, size, "Retained message replaced");
        } else {
            debug!(topic = %topic, size, "Retained message stored");
        }
    }

    fn remove(&mut self, topic: &str) -> Option<Bytes> {
        let removed = self.topics.remove(topic);
        if removed.is_some() {
            debug!(topic = %topic, "Retained message removed");
        }
        removed
    }

    fn get(&self, topic: &str) -> Option<Bytes> {
        self.topics.get(topic).cloned()
    }

    fn matching(&self, filter: &TopicFilter) -> Vec<Message> {
        self.topics
            .iter()
            .filter(|(topic, _)| filter.matches(topic))
            .map(|(topic, payload)| Message::new(topic.clone(), payload.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(s: &str) -> TopicFilter {
        TopicFilter::parse(s).unwrap()
    }

    #[test]
    fn test_retain_and_get() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.retain("a/b", Bytes::from_static(b"one"));
        store.retain("a/b", Bytes::from_static(b"two"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a/b"), Some(Bytes::from_static(b"two")));
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_remove_exact_topic_only() {
        let mut store = MemoryStore::new();
        store.retain("a/b", Bytes::from_static(b"1"));
        store.retain("a/c", Bytes::from_static(b"2"));

        assert_eq!(store.remove("a/+"), None);
        assert_eq!(store.remove("a/b"), Some(Bytes::from_static(b"1")));
        assert_eq!(store.remove("a/b"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_matching() {
        let mut store = MemoryStore::new();
        store.retain("sensors/1/temp", Bytes::from_static(b"20"));
        store.retain("sensors/2/temp", Bytes::from_static(b"21"));
        store.retain("sensors/2/humidity", Bytes::from_static(b"40"));
        store.retain("$SYS/uptime", Bytes::from_static(b"9"));

        let mut temps = store.matching(&filter("sensors/+/temp"));
        temps.sort_by(|a, b| a.topic().cmp(b.topic()));
        assert_eq!(
            temps,
            vec![
                Message::new("sensors/1/temp", "20"),
                Message::new("sensors/2/temp", "21"),
            ]
        );

        assert_eq!(store.matching(&filter("sensors/#")).len(), 3);
        assert_eq!(store.matching(&filter("#")).len(), 3);
        assert_eq!(store.matching(&filter("$SYS/#")).len(), 1);
        assert!(store.matching(&filter("actuators/#")).is_empty());
    }
}
