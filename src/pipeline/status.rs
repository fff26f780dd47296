//! In-memory generation status, keyed by [`TaskKey`].
//!
//! The status map is a volatile hint layered over the filesystem: an artifact
//! on disk is ready no matter what the map says, and a map entry without an
//! artifact only describes work in flight. Entries survive neither restarts
//! nor cache wipes, which is exactly right — readiness is re-derived from
//! disk on the next query.

use crate::media::TaskKey;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifecycle state of one generation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    /// Queued or actively rendering.
    Generating,
    /// Artifact confirmed on disk.
    Ready,
    /// Last attempt failed; retried only after the cooldown.
    Error,
}

/// One status entry with the time of its last transition.
#[derive(Debug, Clone, Copy)]
pub struct StatusRecord {
    pub state: MediaState,
    pub since: Instant,
}

/// What a status query reports to the caller.
///
/// `reload` is set when a key the record still considered generating is
/// observed ready on disk, telling the UI to swap its placeholder for the
/// fresh artifact. A key that was never watched being generated reads ready
/// without the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: MediaState,
    pub reload: bool,
}

/// Concurrent status map shared between the facade and the worker tasks.
#[derive(Debug)]
pub struct StatusTracker {
    records: DashMap<TaskKey, StatusRecord>,
    retry_cooldown: Duration,
}

impl StatusTracker {
    pub fn new(retry_cooldown: Duration) -> Self {
        Self {
            records: DashMap::new(),
            retry_cooldown,
        }
    }

    /// Current record for a key, if any.
    pub fn get(&self, key: &TaskKey) -> Option<StatusRecord> {
        self.records.get(key).map(|r| *r)
    }

    pub fn mark_generating(&self, key: &TaskKey) {
        self.set(key, MediaState::Generating);
    }

    pub fn mark_ready(&self, key: &TaskKey) {
        self.set(key, MediaState::Ready);
    }

    pub fn mark_error(&self, key: &TaskKey) {
        self.set(key, MediaState::Error);
    }

    /// Whether the key failed recently enough that a retry must wait.
    pub fn in_error_cooldown(&self, key: &TaskKey) -> bool {
        self.get(key)
            .map(|r| r.state == MediaState::Error && r.since.elapsed() < self.retry_cooldown)
            .unwrap_or(false)
    }

    fn set(&self, key: &TaskKey, state: MediaState) {
        debug!(key = %key, ?state, "status transition");
        self.records.insert(
            key.clone(),
            StatusRecord {
                state,
                since: Instant::now(),
            },
        );
    }
}
