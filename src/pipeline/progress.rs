//! Batch progress reporting.
//!
//! A batch enqueue names a list of catalogue items; the UI polls a snapshot
//! of how many of them have actually produced their thumbnail. Only items of
//! the current batch count, and only on a successful render — failed items
//! stay uncounted, so the batch reads as incomplete rather than lying about
//! artifacts that do not exist.

use crate::media::ItemId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Phase of the most recent batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No batch has run yet.
    Idle,
    /// A batch is in flight.
    Running,
    /// Every item of the last batch produced its thumbnail.
    Done,
}

#[derive(Debug)]
struct ProgressInner {
    state: BatchState,
    total: usize,
    completed: usize,
    message: String,
    /// Batch items whose thumbnail has not completed yet.
    outstanding: HashSet<String>,
    /// Item ids in completion order.
    items: Vec<String>,
    /// Item id → thumbnail artifact name, for the grid view.
    thumbnails: HashMap<String, String>,
}

/// Point-in-time copy handed to callers.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub state: BatchState,
    pub total: usize,
    pub completed: usize,
    pub message: String,
    pub items: Vec<String>,
    pub thumbnails: HashMap<String, String>,
}

/// Shared progress state for the current batch.
#[derive(Debug)]
pub struct BatchProgress {
    inner: Mutex<ProgressInner>,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ProgressInner {
                state: BatchState::Idle,
                total: 0,
                completed: 0,
                message: String::new(),
                outstanding: HashSet::new(),
                items: Vec::new(),
                thumbnails: HashMap::new(),
            }),
        }
    }

    /// Starts tracking a new batch, resetting any previous one.
    pub fn begin(&self, items: &[ItemId]) {
        let mut inner = self.inner.lock();
        inner.state = if items.is_empty() {
            BatchState::Done
        } else {
            BatchState::Running
        };
        inner.total = items.len();
        inner.completed = 0;
        inner.message = format!("Generating media for {} items", items.len());
        inner.outstanding = items.iter().map(ItemId::to_string).collect();
        inner.items.clear();
        inner.thumbnails.clear();
    }

    /// Records one successful thumbnail render. Items outside the current
    /// batch, repeats, and anything after the batch finished are ignored.
    pub fn item_completed(&self, item: &ItemId, thumbnail_name: &str) {
        let mut inner = self.inner.lock();
        if inner.state != BatchState::Running || !inner.outstanding.remove(item.as_str()) {
            return;
        }
        inner.completed += 1;
        inner.message = format!("Generated media for {item}");
        inner.items.push(item.to_string());
        inner
            .thumbnails
            .insert(item.to_string(), thumbnail_name.to_string());
        if inner.completed >= inner.total {
            inner.state = BatchState::Done;
            inner.message = format!("Media generation complete for {} items", inner.total);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.inner.lock();
        ProgressSnapshot {
            state: inner.state,
            total: inner.total,
            completed: inner.completed,
            message: inner.message.clone(),
            items: inner.items.clone(),
            thumbnails: inner.thumbnails.clone(),
        }
    }
}
