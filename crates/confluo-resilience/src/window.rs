// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bucketed rolling statistics.
//!
//! The window is split into fixed-length buckets aligned to the window's
//! origin. A bucket is dropped once it is `rolling_buckets` buckets old, so
//! the totals always cover the most recent `rolling_window` (rounded up to a
//! whole bucket).

use std::collections::VecDeque;
use std::ops::AddAssign;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Call counters, either for one bucket or summed over the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    /// Every call attempt, rejected ones included.
    pub fires: u64,
    pub successes: u64,
    /// Calls whose action returned an error.
    pub failures: u64,
    /// Calls whose action did not settle within the timeout.
    pub timeouts: u64,
    /// Calls refused without invoking the action.
    pub rejects: u64,
}

impl WindowStats {
    /// Calls that actually ran the action.
    pub fn volume(&self) -> u64 {
        self.successes + self.failures + self.timeouts
    }

    /// Failed runs, timeouts included.
    pub fn failed(&self) -> u64 {
        self.failures + self.timeouts
    }

    /// Whether the failure ratio meets `threshold_pct`, given at least
    /// `volume_threshold` runs.
    pub fn exceeds(&self, volume_threshold: u32, threshold_pct: u32) -> bool {
        let volume = self.volume();
        if volume == 0 || volume < u64::from(volume_threshold) {
            return false;
        }
        self.failed() * 100 >= u64::from(threshold_pct) * volume
    }
}

impl AddAssign for WindowStats {
    fn add_assign(&mut self, rhs: Self) {
        self.fires += rhs.fires;
        self.successes += rhs.successes;
        self.failures += rhs.failures;
        self.timeouts += rhs.timeouts;
        self.rejects += rhs.rejects;
    }
}

/// A single counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Fire,
    Success,
    Failure,
    Timeout,
    Reject,
}

#[derive(Debug)]
struct Bucket {
    epoch: u64,
    stats: WindowStats,
}

/// Rolling window of [`WindowStats`] buckets.
#[derive(Debug)]
pub struct RollingWindow {
    origin: Instant,
    bucket_len: Duration,
    bucket_count: u64,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    pub fn new(origin: Instant, bucket_len: Duration, bucket_count: u32) -> Self {
        let bucket_count = u64::from(bucket_count.max(1));
        Self {
            origin,
            bucket_len: bucket_len.max(Duration::from_nanos(1)),
            bucket_count,
            buckets: VecDeque::with_capacity(bucket_count as usize),
        }
    }

    /// Increment `counter` in the bucket covering `now`.
    pub fn record(&mut self, counter: Counter, now: Instant) {
        let epoch = self.epoch(now);
        self.evict(epoch);

        let needs_bucket = self.buckets.back().is_none_or(|b| b.epoch < epoch);
        if needs_bucket {
            self.buckets.push_back(Bucket {
                epoch,
                stats: WindowStats::default(),
            });
        }
        // `now` never runs backwards, so the current bucket is always last.
        if let Some(bucket) = self.buckets.back_mut() {
            let stats = &mut bucket.stats;
            match counter {
                Counter::Fire => stats.fires += 1,
                Counter::Success => stats.successes += 1,
                Counter::Failure => stats.failures += 1,
                Counter::Timeout => stats.timeouts += 1,
                Counter::Reject => stats.rejects += 1,
            }
        }
    }

    /// Totals over the buckets still inside the window at `now`.
    pub fn totals(&self, now: Instant) -> WindowStats {
        let epoch = self.epoch(now);
        let mut total = WindowStats::default();
        for bucket in self.buckets.iter().filter(|b| self.is_live(b.epoch, epoch)) {
            total += bucket.stats;
        }
        total
    }

    /// Drop every bucket.
    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    fn epoch(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin);
        (elapsed.as_nanos() / self.bucket_len.as_nanos()) as u64
    }

    fn is_live(&self, bucket_epoch: u64, current: u64) -> bool {
        bucket_epoch + self.bucket_count > current
    }

    fn evict(&mut self, current: u64) {
        while let Some(front) = self.buckets.front() {
            if self.is_live(front.epoch, current) {
                break;
            }
            self.buckets.pop_front();
        }
    }
}
