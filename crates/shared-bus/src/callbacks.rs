//! # Callback Subscribers
//!
//! Push-based delivery. Each registered callback owns an unbounded queue and
//! a worker task, so a slow or failing callback only ever delays itself.
//!
//! ```text
//!   publish() ──┬──► queue #1 ──► worker #1 ──► callback #1
//!               ├──► queue #2 ──► worker #2 ──► callback #2
//!               └──► queue #3 ──► worker #3 ──► callback #3
//! ```

use shared_types::ChannelEvent;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Error a callback may return. Logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives channel events.
pub trait EventHandler: Send + Sync + 'static {
    fn on_event(&self, event: &ChannelEvent) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&ChannelEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &ChannelEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(pub(crate) u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Queue side of one callback subscriber.
pub(crate) struct CallbackSlot {
    pub(crate) handle: SubscriptionHandle,
    queue: mpsc::UnboundedSender<ChannelEvent>,
}

impl CallbackSlot {
    /// Register a handler and spawn its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(handle: SubscriptionHandle, handler: Arc<dyn EventHandler>) -> Self {
        let (queue, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(handle, handler.as_ref(), &event);
            }
        });

        Self { handle, queue }
    }

    /// Enqueue without waiting. Returns `false` if the worker is gone.
    pub(crate) fn enqueue(&self, event: ChannelEvent) -> bool {
        self.queue.send(event).is_ok()
    }
}

fn deliver(handle: SubscriptionHandle, handler: &dyn EventHandler, event: &ChannelEvent) {
    match catch_unwind(AssertUnwindSafe(|| handler.on_event(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(
            subscriber = %handle,
            channel_id = %event.channel_id(),
            code = %event.code,
            error = %e,
            "Event subscriber returned an error"
        ),
        Err(_) => error!(
            subscriber = %handle,
            channel_id = %event.channel_id(),
            code = %event.code,
            "Event subscriber panicked"
        ),
    }
}
