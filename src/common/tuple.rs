// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Output rows produced from completed matches.

use std::fmt;

/// One completed match, rendered event by event in sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tuple {
    events: Vec<String>,
}

impl Tuple {
    /// Creates an empty tuple with room for `len` events.
    #[must_use]
    pub fn with_capacity(len: usize) -> Self {
        Self {
            events: Vec::with_capacity(len),
        }
    }

    /// Appends a rendered event.
    pub fn push(&mut self, event: String) {
        self.events.push(event);
    }

    /// Rendered events in match order.
    #[must_use]
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Number of events in the tuple.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if the tuple holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Concatenation of all events, usable as a deduplication key.
    #[must_use]
    pub fn key(&self) -> String {
        self.events.concat()
    }
}

impl From<Vec<String>> for Tuple {
    fn from(events: Vec<String>) -> Self {
        Self { events }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(event)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let tuple = Tuple::from(vec!["A,1".to_string(), "B,3".to_string()]);
        assert_eq!(tuple.to_string(), "[A,1|B,3]");
        assert_eq!(Tuple::default().to_string(), "[]");
    }

    #[test]
    fn test_key_and_len() {
        let mut tuple = Tuple::with_capacity(2);
        assert!(tuple.is_empty());
        tuple.push("x".to_string());
        tuple.push("y".to_string());
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.key(), "xy");
        assert_eq!(tuple.events(), ["x", "y"]);
    }
}
