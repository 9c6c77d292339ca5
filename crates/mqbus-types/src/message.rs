//! Message types for MqBus
//!
//! Defines the Message struct and related types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new random SubscriptionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quality of service requested by a caller
///
/// Accepted for parity with MQTT brokers. The local bus always delivers
/// at most once, whatever the requested level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qos {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for Qos {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(Error::InvalidQos(other)),
        }
    }
}

/// A message on the bus
///
/// Messages are immutable once built. The payload is reference counted so
/// the same bytes can be shared by several subscribers and the retained
/// store at once. An empty payload is a tombstone: publishing it removes
/// the retained entry for its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    topic: String,

    #[serde(with = "payload_serde")]
    payload: Bytes,
}

impl Message {
    /// Create a new message
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Create an empty-payload message that deletes a retained topic
    pub fn tombstone(topic: impl Into<String>) -> Self {
        Self::new(topic, Bytes::new())
    }

    /// Create a new message with a JSON payload
    pub fn json<T: Serialize>(topic: impl Into<String>, data: &T) -> Result<Self> {
        let payload = serde_json::to_vec(data)?;
        Ok(Self::new(topic, payload))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Check if this message is a tombstone
    pub fn is_tombstone(&self) -> bool {
        self.payload.is_empty()
    }

    /// Get the payload as a string (if valid UTF-8)
    pub fn payload_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Deserialize the payload as JSON
    pub fn payload_as_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Split the message into its topic and payload
    pub fn into_parts(self) -> (String, Bytes) {
        (self.topic, self.payload)
    }
}

/// Payloads serialize as a plain string when they are valid UTF-8 and as
/// `{"base64": "..."}` otherwise.
mod payload_serde {
    use base64::Engine;
    use bytes::Bytes;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Binary { base64: String },
    }

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match std::str::from_utf8(bytes) {
            Ok(s) => Repr::Text(s.to_string()).serialize(serializer),
            Err(_) => Repr::Binary {
                base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            }
            .serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Ok(Bytes::from(s)),
            Repr::Binary { base64: encoded } => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(Bytes::from)
                .map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new("sensors/1/temp", "21.5");
        assert_eq!(msg.topic(), "sensors/1/temp");
        assert_eq!(msg.payload_as_str(), Some("21.5"));
        assert!(!msg.is_tombstone());
        assert!(Message::tombstone("sensors/1/temp").is_tombstone());
    }

    #[test]
    fn test_json_message() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Reading {
            celsius: f32,
        }

        let msg = Message::json("sensors/1", &Reading { celsius: 20.0 }).unwrap();
        let parsed: Reading = msg.payload_as_json().unwrap();
        assert_eq!(parsed, Reading { celsius: 20.0 });
    }

    #[test]
    fn test_payload_serialization() {
        let text = serde_json::to_value(Message::new("a", "hi")).unwrap();
        assert_eq!(text, serde_json::json!({"topic": "a", "payload": "hi"}));

        let binary = Message::new("a", vec![0xff, 0x00]);
        let value = serde_json::to_value(&binary).unwrap();
        assert_eq!(value["payload"]["base64"], "/wA=");
        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, binary);
    }

    #[test]
    fn test_qos_from_u8() {
        assert_eq!(Qos::try_from(0).unwrap(), Qos::AtMostOnce);
        assert_eq!(Qos::try_from(2).unwrap(), Qos::ExactlyOnce);
        assert!(Qos::try_from(3).is_err());
        assert_eq!(Qos::default(), Qos::AtMostOnce);
    }
}
