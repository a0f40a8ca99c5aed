// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! The automaton driver: construction, `consume`, and result extraction.

use std::collections::HashSet;
use std::fmt;

use log::{debug, trace};

use crate::automaton::event_cache::EventHandleStore;
use crate::automaton::partial_match::PartialMatch;
use crate::automaton::state::{Emission, RecordSlot, State, StateId, StateKind};
use crate::automaton::transition::Transition;
use crate::common::schema::RecordSchema;
use crate::common::tuple::Tuple;
use crate::condition::dependent::DependentConstraint;
use crate::condition::independent::IndependentConstraint;
use crate::error::{CepError, Result};
use crate::pattern::{CompiledPattern, MatchStrategy, OutputMode};

const START_STATE_NAME: &str = "start";

/// Result of a query, shaped by its [`OutputMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutput {
    /// Number of completed matches.
    Count(usize),
    /// One rendered tuple per completed match.
    Tuples(Vec<Tuple>),
}

/// Incremental sequence-matching automaton.
///
/// States live in a vector indexed by [`StateId`]; the start state is
/// always index 0 and always active. Records must arrive in non-decreasing
/// timestamp order.
///
/// ```
/// use cep::automaton::Nfa;
/// use cep::common::schema::EventSchema;
/// use cep::pattern::{CompiledPattern, MatchStrategy};
///
/// let mut schema = EventSchema::new("s", &[("k", "TYPE"), ("t", "TIMESTAMP")]).unwrap();
/// let pattern = CompiledPattern::new(5, MatchStrategy::SkipTillNextMatch)
///     .with_sequence(&[("A", "a"), ("B", "b")]);
/// let mut nfa = Nfa::from_pattern(&pattern).unwrap();
///
/// for (ty, t) in [("A", "1"), ("B", "3"), ("B", "10")] {
///     let record = schema.encode(&[ty, t]).unwrap();
///     nfa.consume(&schema, &record).unwrap();
/// }
/// assert_eq!(nfa.count_tuples(), 1);
/// assert_eq!(nfa.get_tuples(&schema).unwrap()[0].to_string(), "[A,1|B,3]");
/// ```
#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<State>,
    active: Vec<StateId>,
    is_active: Vec<bool>,
    store: EventHandleStore,
    window: i64,
    strategy: MatchStrategy,
}

impl Nfa {
    /// Creates an automaton holding only the start state.
    ///
    /// Fails with [`CepError::Unsupported`] for
    /// [`MatchStrategy::StrictContiguous`].
    pub fn new(window: i64, strategy: MatchStrategy) -> Result<Self> {
        let strategy = strategy.ensure_supported()?;
        if window < 0 {
            return Err(CepError::pattern(format!(
                "window must be non-negative, got {window}"
            )));
        }
        Ok(Self {
            states: vec![State::new(
                StateId::START,
                START_STATE_NAME.to_string(),
                StateKind::Start,
            )],
            active: vec![StateId::START],
            is_active: vec![true],
            store: EventHandleStore::new(),
            window,
            strategy,
        })
    }

    /// Builds one path per sequence of `pattern`.
    ///
    /// Each variable gets its own state, the last of each sequence being
    /// final. A variable's transition carries its independent constraints
    /// and every dependent constraint relating it to a variable bound
    /// earlier on the same path.
    pub fn from_pattern(pattern: &CompiledPattern) -> Result<Self> {
        pattern.validate()?;
        let mut nfa = Self::new(pattern.window, pattern.strategy)?;

        for sequence in &pattern.sequences {
            let mut prev = StateId::START;
            let mut bound: HashSet<&str> = HashSet::with_capacity(sequence.len());
            for (idx, var) in sequence.iter().enumerate() {
                let kind = if idx + 1 == sequence.len() {
                    StateKind::Final
                } else {
                    StateKind::Intermediate
                };
                let id = nfa.create_state(&var.var, kind)?;
                nfa.add_transition(
                    prev,
                    id,
                    &var.event_type,
                    pattern.independent_for(&var.var).to_vec(),
                    pattern.dependent_between(&bound, &var.var),
                )?;
                bound.insert(var.var.as_str());
                prev = id;
            }
        }

        debug!(
            "built automaton: {} states over {} paths, window {}, strategy {}",
            nfa.states.len(),
            pattern.sequences.len(),
            nfa.window,
            nfa.strategy
        );
        Ok(nfa)
    }

    /// Adds a non-start state and returns its id.
    pub fn create_state(&mut self, name: &str, kind: StateKind) -> Result<StateId> {
        if kind == StateKind::Start {
            return Err(CepError::pattern(format!(
                "cannot add start state '{name}': the automaton already has one"
            )));
        }
        let id = StateId::new(self.states.len());
        self.states.push(State::new(id, name.to_string(), kind));
        self.is_active.push(false);
        Ok(id)
    }

    /// Adds an edge `from -> to` for events of `event_type`.
    ///
    /// The destination's name is the variable the accepted event binds to.
    pub fn add_transition(
        &mut self,
        from: StateId,
        to: StateId,
        event_type: &str,
        independent: Vec<IndependentConstraint>,
        dependent: Vec<DependentConstraint>,
    ) -> Result<()> {
        let missing = |id: StateId| {
            CepError::defect(
                format!("transition {from} -> {to}"),
                format!("state {id} does not exist"),
            )
        };
        let source = self.states.get(from.index()).ok_or_else(|| missing(from))?;
        let destination = self.states.get(to.index()).ok_or_else(|| missing(to))?;

        if source.is_final() {
            return Err(CepError::pattern(format!(
                "final state '{}' cannot have outgoing transitions",
                source.name()
            )));
        }
        if destination.is_start() || from == to {
            return Err(CepError::pattern(format!(
                "transition {from} -> {to} would form a cycle"
            )));
        }

        let transition = Transition::new(
            event_type.to_string(),
            destination.name().to_string(),
            independent,
            dependent,
            to,
        );
        self.states[from.index()].add_transition(transition);
        Ok(())
    }

    /// Advances the automaton by one record.
    ///
    /// Every active non-final state runs its transfer against the record;
    /// the partial matches they produce are delivered afterwards, and their
    /// destinations join the active set. The record is copied into the
    /// event store at most once, and only if some transition accepts it.
    ///
    /// Dependent constraints of every active state are resolved before any
    /// buffer changes, so a [`CepError::Defect`] from resolution leaves the
    /// automaton and its event store as they were.
    pub fn consume<S: RecordSchema + ?Sized>(&mut self, schema: &S, record: &[u8]) -> Result<()> {
        let timestamp = schema.timestamp(record)?;
        for &id in &self.active {
            self.states[id.index()].check_transfer(schema, record)?;
        }
        let mut slot = RecordSlot::new(&mut self.store, record, timestamp);
        let mut emissions = Vec::new();

        for &id in &self.active {
            let state = &mut self.states[id.index()];
            if state.is_final() {
                continue;
            }
            state.transfer(schema, &mut slot, self.window, self.strategy, &mut emissions)?;
        }

        if let Some(handle) = slot.allocated() {
            trace!(
                "t={timestamp}: stored record as {handle}, {} new partial matches",
                emissions.len()
            );
        }
        for emission in emissions {
            self.deliver(emission)?;
        }
        Ok(())
    }

    fn deliver(&mut self, emission: Emission) -> Result<()> {
        let Emission {
            source,
            destination,
            matched,
        } = emission;
        if self.states[destination.index()].buffer().is_none() {
            let prefix = self.states[source.index()]
                .buffer()
                .map_or_else(Vec::new, |b| b.var_names().to_vec());
            self.states[destination.index()].ensure_buffer(&prefix);
        }
        self.states[destination.index()].push_match(matched)?;
        self.activate(destination);
        Ok(())
    }

    fn activate(&mut self, id: StateId) {
        if !self.is_active[id.index()] {
            self.is_active[id.index()] = true;
            self.active.push(id);
        }
    }

    /// Drops partial matches that started more than the window before
    /// `now` from every intermediate buffer. Returns how many were dropped.
    ///
    /// `consume` only evicts from buffers it scans; this sweep reaches the
    /// rest. Completed matches are never touched.
    pub fn evict_expired(&mut self, now: i64) -> usize {
        let window = self.window;
        let evicted = self
            .states
            .iter_mut()
            .filter(|s| s.kind() == StateKind::Intermediate)
            .map(|s| s.evict_expired(now, window))
            .sum();
        if evicted > 0 {
            trace!("sweep at t={now} evicted {evicted} partial matches");
        }
        evicted
    }

    /// Number of completed matches across all final states.
    #[must_use]
    pub fn count_tuples(&self) -> usize {
        self.final_states().map(State::match_count).sum()
    }

    /// One tuple per completed match, events rendered in sequence order.
    pub fn get_tuples<S: RecordSchema + ?Sized>(&self, schema: &S) -> Result<Vec<Tuple>> {
        self.final_matches()
            .map(|m| -> Result<Tuple> {
                let mut tuple = Tuple::with_capacity(m.len());
                for record in self.records_of(m)? {
                    tuple.push(schema.render(record)?);
                }
                Ok(tuple)
            })
            .collect()
    }

    /// Count or tuples, depending on `mode`.
    pub fn output<S: RecordSchema + ?Sized>(
        &self,
        schema: &S,
        mode: OutputMode,
    ) -> Result<MatchOutput> {
        Ok(match mode {
            OutputMode::Count => MatchOutput::Count(self.count_tuples()),
            OutputMode::Tuples => MatchOutput::Tuples(self.get_tuples(schema)?),
        })
    }

    /// Completed matches, final state by final state.
    pub fn final_matches(&self) -> impl Iterator<Item = &PartialMatch> {
        self.final_states()
            .filter_map(State::buffer)
            .flat_map(|b| b.matches().iter())
    }

    /// Raw records bound by `m`, in sequence order.
    pub fn records_of(&self, m: &PartialMatch) -> Result<Vec<&[u8]>> {
        m.handles()
            .iter()
            .map(|&handle| {
                self.store.get(handle).ok_or_else(|| {
                    CepError::defect(
                        format!("event {handle}"),
                        "handle does not belong to this automaton's store",
                    )
                })
            })
            .collect()
    }

    /// Drops every completed match; intermediate buffers keep their contents.
    pub fn clear_final_matches(&mut self) {
        for state in self.states.iter_mut().filter(|s| s.is_final()) {
            state.clear_buffer();
        }
    }

    /// All states, indexed by [`StateId::index`].
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// The state with id `id`.
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    /// Final states in creation order.
    pub fn final_states(&self) -> impl Iterator<Item = &State> {
        self.states.iter().filter(|s| s.is_final())
    }

    /// States created for variable `name`; one per path it appears on.
    pub fn states_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a State> + 'a {
        self.states.iter().filter(move |s| s.name() == name)
    }

    /// Active states in activation order; the start state is always first.
    #[must_use]
    pub fn active_states(&self) -> &[StateId] {
        &self.active
    }

    /// Records stored so far.
    #[must_use]
    pub const fn event_store(&self) -> &EventHandleStore {
        &self.store
    }

    /// Maximum timestamp span of one match.
    #[must_use]
    pub const fn window(&self) -> i64 {
        self.window
    }

    /// Event selection strategy.
    #[must_use]
    pub const fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    fn write_paths(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: StateId,
        line: &mut String,
    ) -> fmt::Result {
        let Some(state) = self.state(id) else {
            return writeln!(f, "  {line} <missing state {id}>");
        };
        if state.transitions().is_empty() {
            let suffix = if state.is_final() { " (final)" } else { "" };
            return writeln!(f, "  {line}{suffix}");
        }
        for transition in state.transitions() {
            let len = line.len();
            line.push(' ');
            line.push_str(&transition.to_string());
            self.write_paths(f, transition.destination(), line)?;
            line.truncate(len);
        }
        Ok(())
    }
}

impl fmt::Display for Nfa {
    /// One line per path from the start state.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "window={} strategy={}", self.window, self.strategy)?;
        let mut line = String::from(START_STATE_NAME);
        self.write_paths(f, StateId::START, &mut line)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::common::schema::EventSchema;
    use crate::condition::CmpOp;
    use proptest::prelude::*;

    fn stream() -> impl Strategy<Value = Vec<(u8, i64, i64)>> {
        // (event type index, x, timestamp gap)
        prop::collection::vec((0_u8..3, -5_i64..5, 0_i64..4), 0..40)
    }

    fn encode(events: &[(u8, i64, i64)]) -> (EventSchema, Vec<Vec<u8>>) {
        let mut schema =
            EventSchema::new("p", &[("type", "TYPE"), ("x", "INT"), ("time", "TIMESTAMP")])
                .unwrap();
        let mut now = 0;
        let records = events
            .iter()
            .map(|&(ty, x, gap)| {
                now += gap;
                let ty = ["A", "B", "C"][usize::from(ty)];
                schema
                    .encode(&[ty, &x.to_string(), &now.to_string()])
                    .unwrap()
            })
            .collect();
        (schema, records)
    }

    fn pattern(window: i64, strategy: MatchStrategy) -> CompiledPattern {
        CompiledPattern::new(window, strategy)
            .with_sequence(&[("A", "a"), ("B", "b"), ("C", "c")])
            .with_sequence(&[("B", "b"), ("A", "a"), ("C", "c")])
            .with_dependent(DependentConstraint::new("x", "a", CmpOp::Le, "c"))
    }

    fn strategies() -> impl Strategy<Value = MatchStrategy> {
        prop_oneof![
            Just(MatchStrategy::SkipTillNextMatch),
            Just(MatchStrategy::SkipTillAnyMatch),
        ]
    }

    proptest! {
        #[test]
        fn completed_matches_fit_the_window(
            events in stream(),
            window in 0_i64..12,
            strategy in strategies(),
        ) {
            let (schema, records) = encode(&events);
            let mut nfa = Nfa::from_pattern(&pattern(window, strategy)).unwrap();
            for record in &records {
                nfa.consume(&schema, record).unwrap();
            }
            for m in nfa.final_matches() {
                prop_assert!(m.end_time() - m.start_time() <= window);
                prop_assert_eq!(m.len(), 3);
            }
        }

        #[test]
        fn each_record_is_stored_at_most_once(events in stream(), strategy in strategies()) {
            let (schema, records) = encode(&events);
            let mut nfa = Nfa::from_pattern(&pattern(8, strategy)).unwrap();
            for record in &records {
                let before = nfa.event_store().len();
                nfa.consume(&schema, record).unwrap();
                prop_assert!(nfa.event_store().len() - before <= 1);
            }
            for (_, stored) in nfa.event_store().iter() {
                prop_assert!(records.iter().any(|r| r.as_slice() == stored));
            }
        }

        #[test]
        fn replay_is_deterministic(events in stream(), strategy in strategies()) {
            let (schema, records) = encode(&events);
            let run = || {
                let mut nfa = Nfa::from_pattern(&pattern(6, strategy)).unwrap();
                for record in &records {
                    nfa.consume(&schema, record).unwrap();
                }
                nfa.get_tuples(&schema).unwrap()
            };
            prop_assert_eq!(run(), run());
        }

        #[test]
        fn next_match_finds_a_subset_of_any_match(events in stream(), window in 0_i64..12) {
            let (schema, records) = encode(&events);
            let mut next = Nfa::from_pattern(&pattern(window, MatchStrategy::SkipTillNextMatch)).unwrap();
            let mut any = Nfa::from_pattern(&pattern(window, MatchStrategy::SkipTillAnyMatch)).unwrap();
            for record in &records {
                next.consume(&schema, record).unwrap();
                any.consume(&schema, record).unwrap();
            }
            let any_tuples = any.get_tuples(&schema).unwrap();
            for tuple in next.get_tuples(&schema).unwrap() {
                prop_assert!(any_tuples.contains(&tuple));
            }
        }
    }
}
