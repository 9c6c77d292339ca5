//! Bus configuration
//!
//! Tunables for a bus instance. Every field has a serde default so partial
//! JSON documents deserialize into a complete config.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Capacity of each subscriber's outbound channel (at least 1)
    ///
    /// Messages beyond this wait in the subscription's internal queue, so a
    /// full channel never blocks the publisher.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl BusConfig {
    /// Set the outbound channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BusConfig::default();
        assert_eq!(config.channel_capacity, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BusConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BusConfig::default());

        let config: BusConfig = serde_json::from_str(r#"{"channel_capacity": 16}"#).unwrap();
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = BusConfig::default().with_channel_capacity(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
