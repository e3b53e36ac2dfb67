//! # Topic Registry
//!
//! The working set of topic names the dispatcher long-polls for.
//!
//! The set starts from the configured static topics and grows through discovery
//! when automatic discovery is enabled. Once the invalidation interval has elapsed
//! the whole set is cleared (static topics included) so topics that no longer have
//! open tasks drop out; the next discovery pass repopulates it.
//!
//! Time is passed in explicitly so callers and tests control the clock.

use crate::models::TopicDescriptor;
use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
struct TopicState {
    topics: Vec<String>,
    last_invalidation: Instant,
}

/// Ordered, duplicate-free set of topic names with time-based invalidation
#[derive(Debug)]
pub struct TopicRegistry {
    state: RwLock<TopicState>,
    auto_discover: bool,
    invalidation_interval: Duration,
}

impl TopicRegistry {
    pub fn new(static_topics: &[String], auto_discover: bool, invalidation_interval: Duration) -> Self {
        Self::new_at(static_topics, auto_discover, invalidation_interval, Instant::now())
    }

    /// Create the registry with an explicit start time for the invalidation clock
    pub fn new_at(
        static_topics: &[String],
        auto_discover: bool,
        invalidation_interval: Duration,
        now: Instant,
    ) -> Self {
        let mut topics = Vec::with_capacity(static_topics.len());
        for topic in static_topics {
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }

        Self {
            state: RwLock::new(TopicState {
                topics,
                last_invalidation: now,
            }),
            auto_discover,
            invalidation_interval,
        }
    }

    pub fn auto_discover(&self) -> bool {
        self.auto_discover
    }

    /// Snapshot of the current topics in insertion order
    pub fn current_topics(&self) -> Vec<String> {
        self.state.read().topics.clone()
    }

    /// Add discovered topic names, returning how many were new
    pub fn discover<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.write();
        let mut added = 0;
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || state.topics.iter().any(|t| t == name) {
                continue;
            }
            info!(topic = %name, "Discovered new topic");
            state.topics.push(name.to_string());
            added += 1;
        }
        added
    }

    /// Clear the set when the invalidation interval has elapsed since the last clear.
    ///
    /// Only applies with automatic discovery; returns whether a clear happened.
    pub fn maybe_invalidate(&self, now: Instant) -> bool {
        if !self.auto_discover {
            return false;
        }

        let mut state = self.state.write();
        if now.saturating_duration_since(state.last_invalidation) < self.invalidation_interval {
            return false;
        }

        debug!(
            cleared = state.topics.len(),
            interval_ms = self.invalidation_interval.as_millis() as u64,
            "Invalidating topic cache"
        );
        state.topics.clear();
        state.last_invalidation = now;
        true
    }

    /// Fetch-and-lock descriptors for every current topic
    pub fn descriptors(&self, lock_duration_ms: i64) -> Vec<TopicDescriptor> {
        self.state
            .read()
            .topics
            .iter()
            .map(|name| TopicDescriptor::new(name.clone(), lock_duration_ms))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().topics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.read().topics.len()
    }
}
