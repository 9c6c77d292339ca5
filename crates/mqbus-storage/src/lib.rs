//! MqBus Storage - Retained message stores
//!
//! This crate provides pluggable stores for retained messages.
//! Currently supports:
//! - In-memory storage (default), retained for the process lifetime only

pub mod traits;

#[cfg(feature = "memory")]
pub mod memory;

// Re-exports
pub use traits::RetainedStore;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
