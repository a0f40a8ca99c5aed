// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Automaton states and the per-record transfer step.
//!
//! A state never writes into another state. [`State::transfer`] reports the
//! partial matches it produced as emissions, and the driver applies them
//! once every active state has seen the record. A record therefore cannot
//! extend a match that the same record created.

use std::fmt;

use log::trace;

use crate::automaton::event_cache::{EventHandle, EventHandleStore};
use crate::automaton::partial_match::{MatchBuffer, PartialMatch};
use crate::automaton::transition::Transition;
use crate::common::schema::RecordSchema;
use crate::condition::dependent::DependentConstraint;
use crate::error::{CepError, Result};
use crate::pattern::MatchStrategy;

/// Index of a state in its automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// The start state, created first by every automaton.
    pub const START: Self = Self(0);

    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in [`crate::automaton::Nfa::states`].
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a state in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Entry point; always active, holds no buffer.
    Start,
    /// Holds partial matches waiting for their next event.
    Intermediate,
    /// Holds completed matches; has no outgoing transitions.
    Final,
}

/// A partial match produced by a transfer, bound for `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Emission {
    pub(crate) source: StateId,
    pub(crate) destination: StateId,
    pub(crate) matched: PartialMatch,
}

/// The record being consumed, and its handle once something needs one.
///
/// The record enters the store on the first call to [`RecordSlot::handle`]
/// and every later call reuses that handle.
pub(crate) struct RecordSlot<'a> {
    store: &'a mut EventHandleStore,
    record: &'a [u8],
    timestamp: i64,
    handle: Option<EventHandle>,
}

impl<'a> RecordSlot<'a> {
    pub(crate) fn new(store: &'a mut EventHandleStore, record: &'a [u8], timestamp: i64) -> Self {
        Self {
            store,
            record,
            timestamp,
            handle: None,
        }
    }

    pub(crate) const fn record(&self) -> &'a [u8] {
        self.record
    }

    pub(crate) const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub(crate) fn handle(&mut self) -> EventHandle {
        if let Some(handle) = self.handle {
            return handle;
        }
        let handle = self.store.insert(self.record);
        self.handle = Some(handle);
        handle
    }

    pub(crate) const fn allocated(&self) -> Option<EventHandle> {
        self.handle
    }

    fn stored(&self, handle: EventHandle) -> Result<&[u8]> {
        self.store.get(handle).ok_or_else(|| {
            CepError::defect(
                format!("event {handle}"),
                "handle does not belong to this automaton's store",
            )
        })
    }
}

/// A dependent constraint tied to buffer positions for one scan.
struct BoundCheck<'t> {
    constraint: &'t DependentConstraint,
    position: usize,
    candidate_on_left: bool,
}

/// A node of the automaton.
#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    name: String,
    kind: StateKind,
    transitions: Vec<Transition>,
    buffer: Option<MatchBuffer>,
}

impl State {
    pub(crate) const fn new(id: StateId, name: String, kind: StateKind) -> Self {
        Self {
            id,
            name,
            kind,
            transitions: Vec::new(),
            buffer: None,
        }
    }

    /// Index of this state.
    #[must_use]
    pub const fn id(&self) -> StateId {
        self.id
    }

    /// Variable name bound on entry to this state (`"start"` for the start state).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of this state.
    #[must_use]
    pub const fn kind(&self) -> StateKind {
        self.kind
    }

    /// True for the start state.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.kind == StateKind::Start
    }

    /// True for final states.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.kind == StateKind::Final
    }

    /// Outgoing edges in insertion order.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Buffered partial matches; `None` until the first match arrives.
    #[must_use]
    pub const fn buffer(&self) -> Option<&MatchBuffer> {
        self.buffer.as_ref()
    }

    /// Number of buffered partial matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, MatchBuffer::len)
    }

    pub(crate) fn add_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Creates the buffer with `prefix` followed by this state's name.
    pub(crate) fn ensure_buffer(&mut self, prefix: &[String]) -> &MatchBuffer {
        let name = &self.name;
        self.buffer.get_or_insert_with(|| {
            let mut var_names = Vec::with_capacity(prefix.len() + 1);
            var_names.extend_from_slice(prefix);
            var_names.push(name.clone());
            MatchBuffer::new(var_names)
        })
    }

    pub(crate) fn push_match(&mut self, matched: PartialMatch) -> Result<()> {
        let buffer = self.buffer.as_mut().ok_or_else(|| {
            CepError::defect(
                format!("state '{}' ({})", self.name, self.id),
                "match delivered before the buffer was created",
            )
        })?;
        if matched.len() != buffer.depth() {
            return Err(CepError::defect(
                format!("state '{}' ({})", self.name, self.id),
                format!(
                    "match binds {} events but the buffer holds [{}]",
                    matched.len(),
                    buffer.var_names().join(", ")
                ),
            ));
        }
        buffer.push(matched);
        Ok(())
    }

    pub(crate) fn evict_expired(&mut self, now: i64, window: i64) -> usize {
        self.buffer
            .as_mut()
            .map_or(0, |buffer| buffer.evict_expired(now, window))
    }

    pub(crate) fn clear_buffer(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
    }

    /// Resolves the dependent constraints of every transition that accepts
    /// `record` against the current buffer without changing anything.
    ///
    /// A state that passes this check cannot fail [`State::transfer`] on
    /// constraint resolution for the same record.
    pub(crate) fn check_transfer<S: RecordSchema + ?Sized>(
        &self,
        schema: &S,
        record: &[u8],
    ) -> Result<()> {
        if self.kind != StateKind::Intermediate {
            return Ok(());
        }
        let Some(buffer) = self.buffer.as_ref().filter(|b| !b.is_empty()) else {
            return Ok(());
        };
        for transition in &self.transitions {
            if transition.accepts(schema, record)? {
                resolve_checks(transition, buffer, schema, &self.name)?;
            }
        }
        Ok(())
    }

    /// Runs every outgoing transition against the record in `slot` and
    /// appends the resulting partial matches to `out`.
    ///
    /// The start state turns each accepting transition into a singleton
    /// match. Other states scan their buffer once per accepting transition:
    /// matches that started more than `window` before the record are
    /// dropped, the rest are extended when every dependent constraint holds.
    /// Under [`MatchStrategy::SkipTillNextMatch`] an extended match leaves
    /// the buffer; under [`MatchStrategy::SkipTillAnyMatch`] it stays.
    ///
    /// Returns the number of emissions.
    pub(crate) fn transfer<S: RecordSchema + ?Sized>(
        &mut self,
        schema: &S,
        slot: &mut RecordSlot<'_>,
        window: i64,
        strategy: MatchStrategy,
        out: &mut Vec<Emission>,
    ) -> Result<usize> {
        let retain_extended = matches!(
            strategy.ensure_supported()?,
            MatchStrategy::SkipTillAnyMatch
        );
        let now = slot.timestamp();
        let mut emitted = 0;

        match self.kind {
            StateKind::Final => {}
            StateKind::Start => {
                for transition in &self.transitions {
                    if transition.accepts(schema, slot.record())? {
                        out.push(Emission {
                            source: self.id,
                            destination: transition.destination(),
                            matched: PartialMatch::singleton(now, slot.handle()),
                        });
                        emitted += 1;
                    }
                }
            }
            StateKind::Intermediate => {
                let Some(buffer) = self.buffer.as_mut() else {
                    return Ok(0);
                };
                for transition in &self.transitions {
                    if buffer.is_empty() {
                        break;
                    }
                    if !transition.accepts(schema, slot.record())? {
                        continue;
                    }
                    let checks = resolve_checks(transition, buffer, schema, &self.name)?;

                    let mut pending = buffer.take_matches().into_iter();
                    let mut kept = Vec::with_capacity(pending.len());
                    let mut evicted = 0_usize;
                    while let Some(m) = pending.next() {
                        if m.is_expired(now, window) {
                            evicted += 1;
                            continue;
                        }
                        match checks_hold(&checks, schema, slot, &m) {
                            Ok(true) => {
                                out.push(Emission {
                                    source: self.id,
                                    destination: transition.destination(),
                                    matched: m.extended(now, slot.handle()),
                                });
                                emitted += 1;
                                if retain_extended {
                                    kept.push(m);
                                }
                            }
                            Ok(false) => kept.push(m),
                            Err(e) => {
                                kept.push(m);
                                kept.extend(pending);
                                buffer.set_matches(kept);
                                return Err(e);
                            }
                        }
                    }
                    buffer.set_matches(kept);
                    if evicted > 0 {
                        trace!(
                            "state '{}' evicted {evicted} expired matches at t={now}",
                            self.name
                        );
                    }
                }
            }
        }
        Ok(emitted)
    }
}

/// Resolves each dependent constraint of `transition` to the buffer position
/// of its already-bound variable and checks that its attribute is comparable.
fn resolve_checks<'t, S: RecordSchema + ?Sized>(
    transition: &'t Transition,
    buffer: &MatchBuffer,
    schema: &S,
    state: &str,
) -> Result<Vec<BoundCheck<'t>>> {
    transition
        .dependent()
        .iter()
        .map(|dc| -> Result<BoundCheck<'t>> {
            let context = || format!("transition '{}' from state '{state}'", transition.variable());
            let (bound_var, candidate_on_left) = if dc.left_var == transition.variable() {
                (dc.right_var.as_str(), true)
            } else if dc.right_var == transition.variable() {
                (dc.left_var.as_str(), false)
            } else {
                return Err(CepError::defect(
                    context(),
                    format!("constraint '{dc}' does not involve the bound variable"),
                ));
            };
            let position = buffer.position_of(bound_var).ok_or_else(|| {
                CepError::defect(
                    context(),
                    format!(
                        "constraint '{dc}' names '{bound_var}' which is not in [{}]",
                        buffer.var_names().join(", ")
                    ),
                )
            })?;
            let ty = schema.attr_type(&dc.attr)?;
            if !ty.is_comparable() {
                return Err(CepError::defect(
                    context(),
                    format!("constraint '{dc}' compares '{}' of type {ty}", dc.attr),
                ));
            }
            Ok(BoundCheck {
                constraint: dc,
                position,
                candidate_on_left,
            })
        })
        .collect()
}

/// True if every check holds between the candidate record and `m`. Stops at
/// the first check that fails.
fn checks_hold<S: RecordSchema + ?Sized>(
    checks: &[BoundCheck<'_>],
    schema: &S,
    slot: &RecordSlot<'_>,
    m: &PartialMatch,
) -> Result<bool> {
    for check in checks {
        let handle = m.handles().get(check.position).copied().ok_or_else(|| {
            CepError::defect(
                format!("constraint '{}'", check.constraint),
                format!(
                    "position {} is outside a match of {} events",
                    check.position,
                    m.len()
                ),
            )
        })?;
        let bound = slot.stored(handle)?;
        let candidate = slot.record();
        let holds = if check.candidate_on_left {
            check.constraint.check(schema, candidate, bound)?
        } else {
            check.constraint.check(schema, bound, candidate)?
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}
