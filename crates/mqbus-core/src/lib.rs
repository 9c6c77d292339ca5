//! MqBus Core - In-process publish/subscribe bus with MQTT topic semantics
//!
//! This crate contains the bus implementation including:
//! - Bus: the trait every bus transport implements
//! - LocalBus: the in-memory implementation
//! - Receiver: the receiving end handed out by `subscribe`

pub mod bus;
pub mod subscription;
pub mod traits;

// Re-exports
pub use bus::{BusStats, LocalBus};
pub use subscription::Receiver;
pub use traits::Bus;
