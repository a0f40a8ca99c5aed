// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Edges of the automaton.

use std::fmt;

use crate::automaton::state::StateId;
use crate::common::schema::RecordSchema;
use crate::condition::dependent::DependentConstraint;
use crate::condition::independent::IndependentConstraint;
use crate::error::Result;

/// An edge into `destination`, taken by events of `event_type` that pass the
/// independent constraints and, against the already-bound events, the
/// dependent constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    event_type: String,
    variable: String,
    independent: Vec<IndependentConstraint>,
    dependent: Vec<DependentConstraint>,
    destination: StateId,
}

impl Transition {
    pub(crate) fn new(
        event_type: String,
        variable: String,
        independent: Vec<IndependentConstraint>,
        dependent: Vec<DependentConstraint>,
        destination: StateId,
    ) -> Self {
        Self {
            event_type,
            variable,
            independent,
            dependent,
            destination,
        }
    }

    /// Event type this edge accepts.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Variable the accepted event binds to; the destination state's name.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Range checks on the candidate event.
    #[must_use]
    pub fn independent(&self) -> &[IndependentConstraint] {
        &self.independent
    }

    /// Comparisons against events bound earlier on the path.
    #[must_use]
    pub fn dependent(&self) -> &[DependentConstraint] {
        &self.dependent
    }

    /// State the edge leads to.
    #[must_use]
    pub const fn destination(&self) -> StateId {
        self.destination
    }

    /// True if `record` has this edge's event type and passes every
    /// independent constraint.
    pub fn accepts<S: RecordSchema + ?Sized>(&self, schema: &S, record: &[u8]) -> Result<bool> {
        if schema.event_type(record)? != self.event_type {
            return Ok(false);
        }
        for ic in &self.independent {
            if !ic.check(schema, record)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "--{} {}--> {}",
            self.event_type, self.variable, self.destination
        )?;
        let constraints: Vec<String> = self
            .independent
            .iter()
            .map(ToString::to_string)
            .chain(self.dependent.iter().map(ToString::to_string))
            .collect();
        if !constraints.is_empty() {
            write!(f, " where {}", constraints.join(" and "))?;
        }
        Ok(())
    }
}
