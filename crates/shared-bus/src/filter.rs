//! # Event Filters
//!
//! Narrow a stream subscription to particular channels or event codes.

use shared_types::{ChannelEvent, ChannelId, EventCode};

/// Filter for stream subscriptions.
///
/// Empty lists match everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Channels to include.
    pub channel_ids: Vec<ChannelId>,
    /// Event codes to include.
    pub codes: Vec<EventCode>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific event codes.
    #[must_use]
    pub fn codes(codes: Vec<EventCode>) -> Self {
        Self {
            channel_ids: Vec::new(),
            codes,
        }
    }

    /// Create a filter for a single channel.
    #[must_use]
    pub fn channel(channel_id: ChannelId) -> Self {
        Self {
            channel_ids: vec![channel_id],
            codes: Vec::new(),
        }
    }

    /// Restrict an existing filter to the given codes.
    #[must_use]
    pub fn with_codes(mut self, codes: Vec<EventCode>) -> Self {
        self.codes = codes;
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ChannelEvent) -> bool {
        let channel_match =
            self.channel_ids.is_empty() || self.channel_ids.contains(event.channel_id());
        let code_match = self.codes.is_empty() || self.codes.contains(&event.code);

        channel_match && code_match
    }
}
