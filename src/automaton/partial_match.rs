// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! In-flight matches and the per-state buffers that hold them.

use crate::automaton::event_cache::EventHandle;

/// A sequence of bound events with the timestamps of its first and last
/// event.
///
/// Never empty: a partial match starts as a singleton and only grows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialMatch {
    start_time: i64,
    end_time: i64,
    handles: Vec<EventHandle>,
}

impl PartialMatch {
    /// One-event match starting and ending at `timestamp`.
    #[must_use]
    pub fn singleton(timestamp: i64, handle: EventHandle) -> Self {
        Self {
            start_time: timestamp,
            end_time: timestamp,
            handles: vec![handle],
        }
    }

    /// Copy of `self` with `handle` appended at `timestamp`.
    #[must_use]
    pub fn extended(&self, timestamp: i64, handle: EventHandle) -> Self {
        let mut handles = Vec::with_capacity(self.handles.len() + 1);
        handles.extend_from_slice(&self.handles);
        handles.push(handle);
        Self {
            start_time: self.start_time,
            end_time: timestamp,
            handles,
        }
    }

    /// Timestamp of the first bound event.
    #[must_use]
    #[inline]
    pub const fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Timestamp of the most recently bound event.
    #[must_use]
    #[inline]
    pub const fn end_time(&self) -> i64 {
        self.end_time
    }

    /// `end_time - start_time`.
    #[must_use]
    pub const fn span(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Bound events in variable order.
    #[must_use]
    pub fn handles(&self) -> &[EventHandle] {
        &self.handles
    }

    /// Number of bound events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no event is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// True once an event at `now` can no longer fit in the window.
    #[must_use]
    #[inline]
    pub const fn is_expired(&self, now: i64, window: i64) -> bool {
        now.saturating_sub(self.start_time) > window
    }
}

/// The partial matches of one state, all of the same shape.
///
/// `var_names[i]` names the variable bound at `handles()[i]` of every match
/// in the buffer, so a variable resolves to a position once and that
/// position is valid for the whole buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchBuffer {
    var_names: Vec<String>,
    matches: Vec<PartialMatch>,
}

impl MatchBuffer {
    /// Empty buffer for matches binding `var_names` in order.
    #[must_use]
    pub const fn new(var_names: Vec<String>) -> Self {
        Self {
            var_names,
            matches: Vec::new(),
        }
    }

    /// Variable names by position.
    #[must_use]
    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    /// Position of `var` in every match of this buffer.
    #[must_use]
    pub fn position_of(&self, var: &str) -> Option<usize> {
        self.var_names.iter().position(|v| v == var)
    }

    /// Number of bound events per match.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.var_names.len()
    }

    /// Buffered matches in arrival order.
    #[must_use]
    pub fn matches(&self) -> &[PartialMatch] {
        &self.matches
    }

    /// Number of buffered matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// True if no match is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Appends a match.
    pub fn push(&mut self, m: PartialMatch) {
        debug_assert_eq!(m.len(), self.depth());
        self.matches.push(m);
    }

    /// Removes and returns all matches, leaving the buffer empty.
    pub(crate) fn take_matches(&mut self) -> Vec<PartialMatch> {
        std::mem::take(&mut self.matches)
    }

    /// Replaces the buffered matches.
    pub(crate) fn set_matches(&mut self, matches: Vec<PartialMatch>) {
        self.matches = matches;
    }

    /// Drops matches whose start is more than `window` before `now`.
    /// Returns how many were dropped.
    pub fn evict_expired(&mut self, now: i64, window: i64) -> usize {
        let before = self.matches.len();
        self.matches.retain(|m| !m.is_expired(now, window));
        before - self.matches.len()
    }

    /// Drops every match.
    pub fn clear(&mut self) {
        self.matches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::event_cache::EventHandleStore;

    fn handles(n: usize) -> Vec<EventHandle> {
        let mut store = EventHandleStore::new();
        (0..n).map(|_| store.insert(b"")).collect()
    }

    #[test]
    fn test_extend_keeps_start() {
        let h = handles(3);
        let m = PartialMatch::singleton(4, h[0]);
        assert_eq!((m.start_time(), m.end_time(), m.span()), (4, 4, 0));
        let m2 = m.extended(7, h[1]).extended(9, h[2]);
        assert_eq!((m2.start_time(), m2.end_time(), m2.span()), (4, 9, 5));
        assert_eq!(m2.handles(), &h[..]);
        // The source is untouched.
        assert_eq!(m.len(), 1);
        assert!(!m2.is_empty());
    }

    #[test]
    fn test_expiry_boundary() {
        let h = handles(1);
        let m = PartialMatch::singleton(1, h[0]);
        assert!(!m.is_expired(6, 5));
        assert!(m.is_expired(7, 5));
        assert!(!m.is_expired(i64::MAX, i64::MAX));
    }

    #[test]
    fn test_buffer_positions() {
        let buffer = MatchBuffer::new(vec!["a".into(), "b".into()]);
        assert_eq!(buffer.position_of("a"), Some(0));
        assert_eq!(buffer.position_of("b"), Some(1));
        assert_eq!(buffer.position_of("c"), None);
        assert_eq!(buffer.depth(), 2);
    }

    #[test]
    fn test_buffer_evict() {
        let h = handles(2);
        let mut buffer = MatchBuffer::new(vec!["a".into()]);
        buffer.push(PartialMatch::singleton(1, h[0]));
        buffer.push(PartialMatch::singleton(8, h[1]));
        assert_eq!(buffer.evict_expired(10, 5), 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.matches()[0].start_time(), 8);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
