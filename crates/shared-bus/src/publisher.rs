//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::callbacks::{CallbackSlot, EventHandler, SubscriptionHandle};
use crate::filter::EventFilter;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::ChannelEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
///
/// Publishing never blocks on subscribers and never fails.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// Returns the number of subscribers (callbacks and streams) it was
    /// handed to.
    async fn publish(&self, event: ChannelEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Callback subscribers are served in registration order through their own
/// queues; stream subscribers read from a `tokio::sync::broadcast` channel.
pub struct InMemoryEventBus {
    /// Broadcast sender for stream subscriptions.
    sender: broadcast::Sender<ChannelEvent>,

    /// Callback subscribers in registration order.
    callbacks: RwLock<Vec<CallbackSlot>>,

    next_handle: AtomicU64,

    /// Total events published.
    events_published: AtomicU64,

    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus whose stream subscribers buffer at
    /// most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            callbacks: RwLock::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a callback. Must be called from within a tokio runtime.
    pub fn subscribe(&self, handler: impl EventHandler) -> SubscriptionHandle {
        self.subscribe_arc(Arc::new(handler))
    }

    /// Register a shared callback.
    pub fn subscribe_arc(&self, handler: Arc<dyn EventHandler>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.callbacks
            .write()
            .push(CallbackSlot::spawn(handle, handler));
        debug!(subscriber = %handle, "Callback subscriber registered");
        handle
    }

    /// Remove a callback. Events already queued for it are still delivered.
    ///
    /// Returns `false` for an unknown handle.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|slot| slot.handle != handle);
        let removed = callbacks.len() != before;
        if removed {
            debug!(subscriber = %handle, "Callback subscriber removed");
        }
        removed
    }

    /// Subscribe to events matching a filter, pull-style.
    #[must_use]
    pub fn subscribe_stream(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        debug!(codes = ?filter.codes, "New stream subscription created");
        Subscription::new(receiver, filter)
    }

    /// Number of callback subscribers.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Number of live stream subscriptions.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ChannelEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        {
            let callbacks = self.callbacks.read();
            for slot in callbacks.iter() {
                if slot.enqueue(event.clone()) {
                    delivered += 1;
                }
            }
        }

        let code = event.code;
        let channel_id = event.channel_id().to_string();
        // No stream receivers is the normal case.
        delivered += self.sender.send(event).unwrap_or(0);

        trace!(
            channel_id = %channel_id,
            code = %code,
            receivers = delivered,
            "Event published"
        );
        delivered
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
