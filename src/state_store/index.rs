use std::{collections::HashMap, rc::Rc};

use crate::stream::StreamHandle;

use super::subscription::ValueCallback;

/// One live registration at a path.
pub(super) struct IndexEntry {
    pub(super) id: u64,
    pub(super) callback: ValueCallback,
    pub(super) handle: StreamHandle,
}

/// Per-path bookkeeping of active subscriptions.
///
/// Entries keep insertion order within a path. Removal always goes through
/// the stable id assigned at registration, never through a remembered
/// position, so removing an earlier sibling cannot strand or misdelete a
/// later one.
#[derive(Default)]
pub(super) struct PathIndex {
    entries: HashMap<String, Vec<IndexEntry>>,
    next_id: u64,
}

impl PathIndex {
    /// Hands out the next subscription id.
    pub(super) fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Appends an entry at the end of `path`'s sequence, creating it if
    /// needed.
    pub(super) fn append(&mut self, path: &str, entry: IndexEntry) {
        self.entries.entry(path.to_string()).or_default().push(entry);
    }

    /// Removes and returns the entry with the given id.
    ///
    /// Unknown paths and ids yield `None`; both are expected when the
    /// caller's `unsubscribe` raced an `off` for the same registration.
    pub(super) fn remove(&mut self, path: &str, id: u64) -> Option<IndexEntry> {
        let entries = self.entries.get_mut(path)?;
        let position = entries.iter().position(|entry| entry.id == id)?;
        Some(entries.remove(position))
    }

    /// Finds the first entry at `path` holding the same callback
    /// allocation.
    ///
    /// When a callback is registered twice at one path, only the earliest
    /// registration matches.
    pub(super) fn find_by_callback(&self, path: &str, callback: &ValueCallback) -> Option<u64> {
        self.entries
            .get(path)?
            .iter()
            .find(|entry| Rc::ptr_eq(&entry.callback, callback))
            .map(|entry| entry.id)
    }

    /// Number of live entries at `path`.
    pub(super) fn len_at(&self, path: &str) -> usize {
        self.entries.get(path).map_or(0, Vec::len)
    }
}
