//! # Shared Bus - Channel Event Bus
//!
//! Fans every persisted channel transition out to interested parties.
//!
//! ```text
//! ┌────────────────┐                    ┌──────────────┐
//! │ Channel actor  │                    │ Application  │
//! │                │    publish()       │  callbacks   │
//! │                │ ──────┐            │              │
//! └────────────────┘       │            └──────────────┘
//!                          ▼                    ↑
//!                    ┌──────────────┐          │ subscribe()
//!                    │  Event Bus   │ ─────────┤
//!                    │              │          │ subscribe_stream()
//!                    └──────────────┘          ↓
//!                                       ┌──────────────┐
//!                                       │   Streams    │
//!                                       └──────────────┘
//! ```
//!
//! ## Delivery Guarantees
//!
//! - Callbacks see events in publish order, and each publish enqueues to
//!   callbacks in registration order.
//! - A callback that errors or panics is logged and keeps its registration.
//! - Publishing never waits on a subscriber.
//! - Stream subscribers that fall behind lose the oldest events.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod callbacks;
pub mod filter;
pub mod publisher;
pub mod subscriber;

pub use callbacks::{EventHandler, HandlerError, SubscriptionHandle};
pub use filter::EventFilter;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events buffered per stream subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
