// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Append-only arena of raw event records.
//!
//! Every partial match refers to its events through [`EventHandle`]s into
//! one shared [`EventHandleStore`], so an event that takes part in many
//! partial matches is stored exactly once. Nothing is ever removed during a
//! run, which keeps every handle valid for the lifetime of the store.

use std::fmt;

/// Stable index of a record in an [`EventHandleStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(usize);

impl EventHandle {
    /// Position of the record in insertion order.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Contiguous byte arena with one offset per record.
///
/// Records may differ in length; `offsets[i]..offsets[i + 1]` spans record
/// `i`.
#[derive(Debug, Clone)]
pub struct EventHandleStore {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl Default for EventHandleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0],
        }
    }

    /// Appends a copy of `record` and returns its handle.
    pub fn insert(&mut self, record: &[u8]) -> EventHandle {
        let handle = EventHandle(self.len());
        self.data.extend_from_slice(record);
        self.offsets.push(self.data.len());
        handle
    }

    /// Record behind `handle`, or `None` if the handle came from another store.
    #[must_use]
    #[inline]
    pub fn get(&self, handle: EventHandle) -> Option<&[u8]> {
        let idx = handle.index();
        let start = *self.offsets.get(idx)?;
        let end = *self.offsets.get(idx + 1)?;
        self.data.get(start..end)
    }

    /// Handle of the most recent insert.
    #[must_use]
    pub fn last_handle(&self) -> Option<EventHandle> {
        self.len().checked_sub(1).map(EventHandle)
    }

    /// Number of stored records.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// True if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EventHandle, &[u8])> {
        self.offsets
            .windows(2)
            .enumerate()
            .map(|(idx, w)| (EventHandle(idx), &self.data[w[0]..w[1]]))
    }
}
