// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::condition::dependent::DependentConstraint;
use crate::condition::independent::IndependentConstraint;
use crate::error::{CepError, Result};
use crate::pattern::MatchStrategy;

const fn unbounded_window() -> i64 {
    i64::MAX
}

/// One `EventType var` element of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternVariable {
    /// Event type the variable binds to.
    pub event_type: String,
    /// Variable name; also the name of the automaton state it creates.
    pub var: String,
}

impl PatternVariable {
    /// Creates `event_type var`.
    pub fn new(event_type: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            var: var.into(),
        }
    }
}

/// What a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Every completed match, rendered.
    #[default]
    Tuples,
    /// Only the number of completed matches.
    Count,
}

/// A decomposed pattern with its constraints, window and strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPattern {
    /// Maximum `end - start` timestamp span of one match, in timestamp units.
    #[serde(default = "unbounded_window")]
    pub window: i64,
    /// Event selection strategy.
    #[serde(default)]
    pub strategy: MatchStrategy,
    /// What the query returns.
    #[serde(default)]
    pub output: OutputMode,
    /// Alternative orderings, each a path of the automaton.
    pub sequences: Vec<Vec<PatternVariable>>,
    /// Range constraints per variable.
    #[serde(default)]
    pub independent: BTreeMap<String, Vec<IndependentConstraint>>,
    /// Cross-variable comparisons.
    #[serde(default)]
    pub dependent: Vec<DependentConstraint>,
}

impl CompiledPattern {
    /// Creates an empty pattern.
    #[must_use]
    pub fn new(window: i64, strategy: MatchStrategy) -> Self {
        Self {
            window,
            strategy,
            output: OutputMode::Tuples,
            sequences: Vec::new(),
            independent: BTreeMap::new(),
            dependent: Vec::new(),
        }
    }

    /// Deserializes and validates a pattern from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let pattern: Self = serde_json::from_str(json)?;
        pattern.validate()?;
        Ok(pattern)
    }

    /// Adds a sequence given as `(event_type, var)` pairs.
    #[must_use]
    pub fn with_sequence(mut self, vars: &[(&str, &str)]) -> Self {
        self.sequences.push(
            vars.iter()
                .map(|(event_type, var)| PatternVariable::new(*event_type, *var))
                .collect(),
        );
        self
    }

    /// Adds a range constraint on `var`.
    #[must_use]
    pub fn with_independent(mut self, var: &str, constraint: IndependentConstraint) -> Self {
        self.independent
            .entry(var.to_string())
            .or_default()
            .push(constraint);
        self
    }

    /// Adds a cross-variable comparison.
    #[must_use]
    pub fn with_dependent(mut self, constraint: DependentConstraint) -> Self {
        self.dependent.push(constraint);
        self
    }

    /// Sets the output mode.
    #[must_use]
    pub const fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Range constraints on `var`.
    #[must_use]
    pub fn independent_for(&self, var: &str) -> &[IndependentConstraint] {
        self.independent.get(var).map_or(&[], Vec::as_slice)
    }

    /// Dependent constraints linking `current` with any of `bound`, the
    /// variables already matched earlier on the same path.
    #[must_use]
    pub fn dependent_between(
        &self,
        bound: &HashSet<&str>,
        current: &str,
    ) -> Vec<DependentConstraint> {
        self.dependent
            .iter()
            .filter(|dc| {
                dc.counterpart(current)
                    .is_some_and(|other| bound.contains(other))
            })
            .cloned()
            .collect()
    }

    /// Checks the structural rules the automaton relies on.
    ///
    /// - at least one sequence, none of them empty
    /// - a non-negative window
    /// - no variable repeated within one sequence
    /// - every constrained variable appears in some sequence
    pub fn validate(&self) -> Result<()> {
        if self.window < 0 {
            return Err(CepError::pattern(format!(
                "window must be non-negative, got {}",
                self.window
            )));
        }
        if self.sequences.is_empty() {
            return Err(CepError::pattern("pattern has no sequences"));
        }

        let mut known = HashSet::new();
        for (idx, seq) in self.sequences.iter().enumerate() {
            if seq.is_empty() {
                return Err(CepError::pattern(format!("sequence {idx} is empty")));
            }
            let mut seen = HashSet::with_capacity(seq.len());
            for v in seq {
                if !seen.insert(v.var.as_str()) {
                    return Err(CepError::pattern(format!(
                        "variable '{}' appears twice in sequence {idx}",
                        v.var
                    )));
                }
                known.insert(v.var.as_str());
            }
        }

        for var in self.independent.keys() {
            if !known.contains(var.as_str()) {
                return Err(CepError::pattern(format!(
                    "independent constraint on unknown variable '{var}'"
                )));
            }
        }
        for dc in &self.dependent {
            for var in [&dc.left_var, &dc.right_var] {
                if !known.contains(var.as_str()) {
                    return Err(CepError::pattern(format!(
                        "dependent constraint '{dc}' names unknown variable '{var}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::CmpOp;

    fn abc() -> CompiledPattern {
        CompiledPattern::new(10, MatchStrategy::SkipTillAnyMatch)
            .with_sequence(&[("A", "a"), ("B", "b"), ("C", "c")])
    }

    #[test]
    fn test_builder() {
        let pattern = abc()
            .with_independent("a", IndependentConstraint::at_least("x", 1))
            .with_independent("a", IndependentConstraint::at_most("x", 9));
        assert_eq!(pattern.independent_for("a").len(), 2);
        assert!(pattern.independent_for("b").is_empty());
        assert!(pattern.validate().is_ok());
    }

    #[test]
    fn test_dependent_between_selects_earlier_vars() {
        let pattern = abc()
            .with_dependent(DependentConstraint::new("x", "a", CmpOp::Le, "c"))
            .with_dependent(DependentConstraint::new("x", "c", CmpOp::Ge, "b"))
            .with_dependent(DependentConstraint::new("x", "a", CmpOp::Lt, "b"));

        let bound: HashSet<&str> = ["a"].into_iter().collect();
        let for_b = pattern.dependent_between(&bound, "b");
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].to_string(), "a.x < b.x");

        let bound: HashSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(pattern.dependent_between(&bound, "c").len(), 2);

        // Nothing is bound before the first variable.
        assert!(pattern.dependent_between(&HashSet::new(), "a").is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(CompiledPattern::new(1, MatchStrategy::SkipTillAnyMatch)
            .validate()
            .is_err());
        assert!(CompiledPattern::new(-1, MatchStrategy::SkipTillAnyMatch)
            .with_sequence(&[("A", "a")])
            .validate()
            .is_err());
        assert!(abc().with_sequence(&[]).validate().is_err());
        assert!(CompiledPattern::new(1, MatchStrategy::SkipTillAnyMatch)
            .with_sequence(&[("A", "a"), ("B", "a")])
            .validate()
            .is_err());
        assert!(abc()
            .with_independent("z", IndependentConstraint::at_least("x", 0))
            .validate()
            .is_err());
        assert!(abc()
            .with_dependent(DependentConstraint::new("x", "a", CmpOp::Lt, "z"))
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_json_with_constraints() {
        let pattern = CompiledPattern::from_json(
            r#"{
                "window": 100,
                "output": "count",
                "sequences": [[{"event_type":"A","var":"a"},{"event_type":"B","var":"b"}]],
                "independent": {"a": [{"attr":"x","min":10,"max":20}]},
                "dependent": [{"attr":"x","left_var":"b","cmp":">=","right_var":"a"}]
            }"#,
        )
        .unwrap();
        assert_eq!(pattern.window, 100);
        assert_eq!(pattern.strategy, MatchStrategy::SkipTillAnyMatch);
        assert_eq!(pattern.output, OutputMode::Count);
        assert_eq!(pattern.independent_for("a")[0].max, 20);
        assert_eq!(pattern.dependent[0].to_string(), "b.x >= a.x");
    }

    #[test]
    fn test_from_json_defaults_window_and_rejects_invalid() {
        let pattern =
            CompiledPattern::from_json(r#"{"sequences": [[{"event_type":"A","var":"a"}]]}"#)
                .unwrap();
        assert_eq!(pattern.window, i64::MAX);

        let err = CompiledPattern::from_json(r#"{"sequences": []}"#).unwrap_err();
        assert!(matches!(err, CepError::Pattern { .. }));
        let err = CompiledPattern::from_json("{").unwrap_err();
        assert!(matches!(err, CepError::Config(_)));
    }
}
