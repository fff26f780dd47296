//! Pending work queue.
//!
//! Holds work that has been requested but not yet admitted to the worker
//! pool. Entries are either whole items (expanded to every passive media
//! kind at admission) or a single key, used for on-demand frame sets.
//!
//! Priority is positional: an urgent request goes to the front of the queue,
//! and re-requesting something already queued promotes it instead of
//! duplicating it.

use crate::media::{ItemId, TaskKey};
use std::collections::VecDeque;

/// One unit of queued work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// A catalogue item; expands to the passive media kinds at admission.
    ///
    /// `explicit` marks a direct user request: such items run even for kinds
    /// whose source root is unconfigured, so the user sees an error status
    /// instead of silence. Background batch items skip unconfigured kinds.
    Item { item: ItemId, explicit: bool },

    /// A single generation key, used for on-demand frame sets.
    Single { key: TaskKey },
}

impl Pending {
    fn same_work(&self, other: &Pending) -> bool {
        match (self, other) {
            (Pending::Item { item: a, .. }, Pending::Item { item: b, .. }) => a == b,
            (Pending::Single { key: a }, Pending::Single { key: b }) => a == b,
            _ => false,
        }
    }
}

/// FIFO queue with front insertion for priority work.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<Pending>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry unless equivalent work is already queued.
    pub fn push_back(&mut self, entry: Pending) {
        if self.position(&entry).is_none() {
            self.entries.push_back(entry);
        }
    }

    /// Inserts at the front; equivalent queued work is promoted, not
    /// duplicated. An explicit request upgrades a queued background item.
    pub fn push_front(&mut self, entry: Pending) {
        let entry = match self.position(&entry).and_then(|i| self.entries.remove(i)) {
            Some(existing) => merge(existing, entry),
            None => entry,
        };
        self.entries.push_front(entry);
    }

    /// Removes and returns up to `count` entries from the front.
    pub fn pop(&mut self, count: usize) -> Vec<Pending> {
        let take = count.min(self.entries.len());
        self.entries.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, entry: &Pending) -> Option<usize> {
        self.entries.iter().position(|e| e.same_work(entry))
    }
}

fn merge(existing: Pending, incoming: Pending) -> Pending {
    match (existing, incoming) {
        (Pending::Item { item, explicit: a }, Pending::Item { explicit: b, .. }) => Pending::Item {
            item,
            explicit: a || b,
        },
        (_, incoming) => incoming,
    }
}
