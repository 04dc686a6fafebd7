// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, in-memory, multi-channel recent-message cache.
//!
//! [`MessageCache`] is a best-effort buffer, not a queue: once it is full,
//! every [`add`](MessageCache::add) silently evicts the oldest-inserted
//! message, whether or not anyone has read it. Eviction order is strict
//! insertion order, independent of message timestamps.
//!
//! All operations take a single mutex and never suspend, so an `add` (append
//! plus trim) is atomic with respect to concurrent reads.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use confluo_core::{ChannelType, Message};
use tracing::trace;

/// Default number of messages retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity FIFO store of normalized messages.
#[derive(Debug)]
pub struct MessageCache {
    capacity: usize,
    messages: Mutex<VecDeque<Message>>,
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCache {
    /// Create a cache holding at most [`DEFAULT_CAPACITY`] messages.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` messages.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: Mutex::new(VecDeque::with_capacity(capacity + 1)),
        }
    }

    /// Maximum number of retained messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a message, evicting the oldest-inserted one if over capacity.
    pub fn add(&self, message: Message) {
        let mut messages = self.lock();
        self.push(&mut messages, message);
    }

    /// Append each message unless one with the same channel and id is cached.
    ///
    /// Pull-based channels return overlapping snapshots on every fetch; this
    /// keeps each provider message cached once. Returns how many were added.
    pub fn add_new(&self, batch: impl IntoIterator<Item = Message>) -> usize {
        let mut messages = self.lock();
        let mut added = 0;
        for message in batch {
            if !contains(&messages, message.channel, &message.id) {
                self.push(&mut messages, message);
                added += 1;
            }
        }
        added
    }

    fn push(&self, messages: &mut VecDeque<Message>, message: Message) {
        messages.push_back(message);
        if messages.len() <= self.capacity {
            return;
        }
        if let Some(evicted) = messages.pop_front() {
            trace!(
                channel = %evicted.channel,
                id = %evicted.id,
                "message cache full, evicted oldest entry"
            );
        }
    }

    /// Messages matching the optional filters, newest first.
    ///
    /// `since` keeps messages with `timestamp >= since`; `channel` keeps
    /// messages from that channel only. The sort is stable, so messages with
    /// equal timestamps keep their insertion order.
    pub fn get(&self, since: Option<DateTime<Utc>>, channel: Option<ChannelType>) -> Vec<Message> {
        let mut matched: Vec<Message> = self
            .lock()
            .iter()
            .filter(|m| since.is_none_or(|since| m.timestamp >= since))
            .filter(|m| channel.is_none_or(|channel| m.channel == channel))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }

    /// Copy of every stored message in insertion order.
    pub fn get_all(&self) -> Vec<Message> {
        self.lock().iter().cloned().collect()
    }

    /// Look up a message by channel and provider id.
    pub fn find(&self, channel: ChannelType, id: &str) -> Option<Message> {
        self.lock()
            .iter()
            .rev()
            .find(|m| m.channel == channel && m.id == id)
            .cloned()
    }

    /// Remove every stored message.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no messages.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The guarded data is a plain buffer with no cross-field invariants, so a
    // panic in another holder cannot leave it inconsistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn contains(messages: &VecDeque<Message>, channel: ChannelType, id: &str) -> bool {
    messages.iter().any(|m| m.channel == channel && m.id == id)
}
