//! Subscriptions and their delivery workers
//!
//! Each subscription owns one worker task. Publishing only pushes onto the
//! subscription's unbounded internal queue; the worker forwards queued
//! messages, in order, into the bounded channel read by the [`Receiver`].
//! A subscriber that stops reading therefore stalls only its own worker.
//!
//! Shutdown never closes a channel under a concurrent sender. Closing sets a
//! flag and wakes the worker, which stops forwarding, discards whatever is
//! still queued and exits, dropping its end of the outbound channel.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use mqbus_types::{Message, SubscriptionId, TopicFilter};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, trace};

/// Count of deliveries submitted but not yet handed over or discarded
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn end(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub(crate) fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Wait until the count drops to zero.
    pub(crate) async fn wait(&self) {
        loop {
            // Registered before the check so a concurrent `end` is not missed.
            let idle = self.idle.notified();
            if self.get() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// State shared between the bus, the worker and the receiver
#[derive(Debug, Default)]
pub(crate) struct Shared {
    closed: AtomicBool,
    shutdown: Notify,
    pub(crate) in_flight: InFlight,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// One live subscription, owned by the bus
#[derive(Debug)]
pub(crate) struct Subscription {
    id: SubscriptionId,
    filter: TopicFilter,
    queue: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
}

impl Subscription {
    /// Create a subscription and spawn its delivery worker.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(filter: TopicFilter, channel_capacity: usize) -> (Self, Receiver) {
        let id = SubscriptionId::new();
        let shared = Arc::new(Shared::default());
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (outbox_tx, outbox_rx) = mpsc::channel(channel_capacity);

        tokio::spawn(run_worker(id, queue_rx, outbox_tx, Arc::clone(&shared)));

        let subscription = Self {
            id,
            filter: filter.clone(),
            queue: queue_tx,
            shared: Arc::clone(&shared),
        };
        let receiver = Receiver {
            id,
            filter,
            inbox: outbox_rx,
            shared,
        };
        (subscription, receiver)
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    /// Submit a message for delivery without waiting for it.
    ///
    /// Returns false if the subscription no longer accepts messages.
    pub(crate) fn publish(&self, message: Message) -> bool {
        if self.shared.is_closed() {
            return false;
        }
        self.shared.in_flight.begin();
        if self.queue.send(message).is_err() {
            // Worker already gone, its receiver was dropped.
            self.shared.in_flight.end();
            return false;
        }
        true
    }

    /// Stop accepting deliveries and let the worker drain its queue.
    pub(crate) fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // notify_one stores a permit if the worker is not parked right now.
        self.shared.shutdown.notify_one();
        debug!(subscription = %self.id, filter = %self.filter, "Subscription closed");
    }
}

async fn run_worker(
    id: SubscriptionId,
    mut queue: mpsc::UnboundedReceiver<Message>,
    outbox: mpsc::Sender<Message>,
    shared: Arc<Shared>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shared.shutdown.notified() => break,
            message = queue.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if shared.is_closed() {
            shared.in_flight.end();
            break;
        }

        let delivered = tokio::select! {
            biased;
            _ = shared.shutdown.notified() => false,
            sent = outbox.send(message) => sent.is_ok(),
        };
        shared.in_flight.end();

        if !delivered {
            break;
        }
        trace!(subscription = %id, "Message delivered");
    }

    queue.close();
    let mut discarded = 0usize;
    while queue.try_recv().is_ok() {
        shared.in_flight.end();
        discarded += 1;
    }

    debug!(subscription = %id, discarded, "Delivery worker stopped");
}

/// Receiving end of a subscription
///
/// Messages arrive in the order they were published to this subscription.
/// Once the subscription is terminated by `unsubscribe` or `close`, anything
/// still buffered is discarded and [`Receiver::recv`] returns `None`.
#[derive(Debug)]
pub struct Receiver {
    id: SubscriptionId,
    filter: TopicFilter,
    inbox: mpsc::Receiver<Message>,
    shared: Arc<Shared>,
}

impl Receiver {
    /// Wait for the next message.
    ///
    /// Returns `None` once the subscription has been terminated.
    pub async fn recv(&mut self) -> Option<Message> {
        if self.shared.is_closed() {
            self.discard();
            return None;
        }
        let message = self.inbox.recv().await?;
        if self.shared.is_closed() {
            self.discard();
            return None;
        }
        Some(message)
    }

    /// Take the next message if one is ready.
    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        if self.shared.is_closed() {
            self.discard();
            return Err(TryRecvError::Disconnected);
        }
        self.inbox.try_recv()
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The filter this receiver was subscribed with
    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// True once the subscription has been terminated
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    fn discard(&mut self) {
        self.inbox.close();
        while self.inbox.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use tokio::time::timeout;

    fn subscription(filter: &str, capacity: usize) -> (Subscription, Receiver) {
        Subscription::spawn(TopicFilter::parse(filter).unwrap(), capacity)
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let (sub, mut rx) = subscription("a/#", 1);
        for i in 0..10 {
            assert!(sub.publish(Message::new("a/b", format!("{i}"))));
        }
        for i in 0..10 {
            let msg = rx.recv().await.unwrap();
            assert_eq!(msg.payload_as_str(), Some(format!("{i}").as_str()));
        }
        sub.shared().in_flight.wait().await;
        assert_eq!(sub.shared().in_flight.get(), 0);
    }

    #[tokio::test]
    async fn test_publish_does_not_wait_for_reader() {
        let (sub, _rx) = subscription("a", 1);
        for _ in 0..1000 {
            assert!(sub.publish(Message::new("a", "x")));
        }
        // One message sits in the channel, the rest wait in the queue.
        assert!(sub.shared().in_flight.get() >= 999);
    }

    #[tokio::test]
    async fn test_close_discards_pending_and_ends_stream() {
        let (sub, mut rx) = subscription("a", 1);
        for _ in 0..5 {
            sub.publish(Message::new("a", "x"));
        }
        sub.close();

        assert!(rx.is_closed());
        assert!(rx.recv().await.is_none());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
        assert!(!sub.publish(Message::new("a", "late")));

        let shared = sub.shared();
        timeout(Duration::from_secs(1), shared.in_flight.wait())
            .await
            .expect("in-flight deliveries must drain after close");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (sub, _rx) = subscription("a", 1);
        sub.close();
        sub.close();
        assert!(!sub.publish(Message::new("a", "x")));
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_leak_in_flight() {
        let (sub, rx) = subscription("a", 1);
        drop(rx);
        for _ in 0..3 {
            sub.publish(Message::new("a", "x"));
        }
        let shared = sub.shared();
        timeout(Duration::from_secs(1), shared.in_flight.wait())
            .await
            .expect("worker must account for undeliverable messages");
    }
}
