//! LocalBus - in-process bus implementation
//!
//! One lock guards all structural state: the subscription list and the
//! retained store. Delivery happens outside of it. Publishing scans the
//! subscriptions under the lock and hands each match to that subscription's
//! worker, which never blocks, so a stalled subscriber cannot hold up a
//! publisher or any other subscriber.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use mqbus_storage::{MemoryStore, RetainedStore};
use mqbus_types::{BusConfig, Error, Message, Qos, Result, TopicFilter};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::subscription::{Receiver, Shared, Subscription};
use crate::traits::Bus;

/// Point-in-time counters for a bus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Number of live subscriptions
    pub subscriptions: usize,

    /// Number of retained topics
    pub retained_topics: usize,

    /// Deliveries submitted but not yet handed to a receiver
    pub in_flight: usize,
}

struct State {
    retained: Box<dyn RetainedStore>,
    /// Live subscriptions in subscribe order
    subscriptions: Vec<Subscription>,
    closed: bool,
}

/// In-process message bus
///
/// Every instance is independent. After [`Bus::close`], `publish` and
/// `subscribe` fail with [`Error::Closed`] while `get` keeps serving the
/// retained messages.
pub struct LocalBus {
    config: BusConfig,
    state: Mutex<State>,
}

impl LocalBus {
    /// Create a new bus with default configuration and in-memory retention
    pub fn new() -> Self {
        Self::build(BusConfig::default(), Box::new(MemoryStore::new()))
    }

    /// Create a new bus with custom configuration
    pub fn with_config(config: BusConfig) -> Result<Self> {
        Self::with_store(config, MemoryStore::new())
    }

    /// Create a new bus with custom configuration and retained store
    pub fn with_store(config: BusConfig, store: impl RetainedStore + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Box::new(store)))
    }

    fn build(config: BusConfig, retained: Box<dyn RetainedStore>) -> Self {
        info!(
            channel_capacity = config.channel_capacity,
            "Initializing MqBus local bus"
        );
        Self {
            config,
            state: Mutex::new(State {
                retained,
                subscriptions: Vec::new(),
                closed: false,
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Publish raw bytes to a concrete topic
    pub async fn publish_bytes(
        &self,
        topic: &str,
        payload: impl Into<Bytes>,
        retained: bool,
    ) -> Result<()> {
        self.publish(Message::new(topic, payload), Qos::AtMostOnce, retained)
            .await
    }

    /// Wait until every delivery submitted so far has reached its receiver
    /// or been discarded.
    ///
    /// Only subscriptions live at the time of the call are considered. A
    /// receiver that stops reading keeps this pending until it reads again
    /// or its subscription is terminated.
    pub async fn settle(&self) {
        let pending: Vec<Arc<Shared>> = {
            let state = self.state.lock();
            state.subscriptions.iter().map(Subscription::shared).collect()
        };

        for shared in pending {
            shared.in_flight.wait().await;
        }
    }

    /// Get current counters
    pub fn stats(&self) -> BusStats {
        let state = self.state.lock();
        BusStats {
            subscriptions: state.subscriptions.len(),
            retained_topics: state.retained.len(),
            in_flight: state
                .subscriptions
                .iter()
                .map(|s| s.shared().in_flight.get())
                .sum(),
        }
    }

    /// Check if the bus has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn publish(&self, message: Message, _qos: Qos, retained: bool) -> Result<()> {
        TopicFilter::parse_concrete(message.topic())?;

        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }

        if message.is_tombstone() {
            state.retained.remove(message.topic());
            return Ok(());
        }

        if retained {
            state
                .retained
                .retain(message.topic(), message.payload().clone());
        }

        let mut matched = 0usize;
        for subscription in &state.subscriptions {
            if subscription.filter().matches(message.topic())
                && subscription.publish(message.clone())
            {
                matched += 1;
            }
        }

        debug!(
            topic = %message.topic(),
            size = message.payload().len(),
            retained,
            matched,
            "Message published"
        );
        Ok(())
    }

    async fn subscribe(&self, filter: &str, _qos: Qos) -> Result<Receiver> {
        let filter = TopicFilter::parse(filter)?;

        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }

        let (subscription, receiver) =
            Subscription::spawn(filter, self.config.channel_capacity);
        debug!(
            subscription = %subscription.id(),
            filter = %subscription.filter(),
            "Subscribed"
        );
        state.subscriptions.push(subscription);

        Ok(receiver)
    }

    async fn unsubscribe(&self, filter: &str) -> Result<()> {
        let filter = TopicFilter::parse(filter)?;

        let mut state = self.state.lock();
        let position = state
            .subscriptions
            .iter()
            .position(|s| s.filter() == &filter)
            .ok_or_else(|| Error::SubscriptionNotFound(filter.to_string()))?;

        let subscription = state.subscriptions.remove(position);
        subscription.close();
        debug!(
            subscription = %subscription.id(),
            filter = %filter,
            "Unsubscribed"
        );
        Ok(())
    }

    async fn get(&self, filter: &str, _qos: Qos) -> Result<Vec<Message>> {
        let filter = TopicFilter::parse(filter)?;
        let state = self.state.lock();
        Ok(state.retained.matching(&filter))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        let count = state.subscriptions.len();
        for subscription in state.subscriptions.drain(..) {
            subscription.close();
        }

        info!(subscriptions = count, "Local bus closed");
        Ok(())
    }
}
