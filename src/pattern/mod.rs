// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Compiled patterns handed to the automaton.
//!
//! A pattern arrives here already decomposed: `SEQ`/`AND`/`OR` trees have been
//! flattened upstream into plain sequences of `(event type, variable)` pairs,
//! one per alternative ordering. Each sequence becomes one path of the
//! automaton.
//!
//! ```text
//! SEQ(AND(A a, B b), C c)  =>  [A a, B b, C c]
//!                              [B b, A a, C c]
//! ```
//!
//! Patterns are plain data and load from JSON:
//!
//! ```
//! use cep::pattern::{CompiledPattern, MatchStrategy};
//!
//! let pattern = CompiledPattern::from_json(r#"{
//!     "window": 5,
//!     "strategy": "SKIP_TILL_NEXT_MATCH",
//!     "sequences": [[{"event_type": "A", "var": "a"}, {"event_type": "B", "var": "b"}]]
//! }"#).unwrap();
//! assert_eq!(pattern.strategy, MatchStrategy::SkipTillNextMatch);
//! assert_eq!(pattern.sequences[0].len(), 2);
//! ```

mod compiled;
mod strategy;

pub use compiled::{CompiledPattern, OutputMode, PatternVariable};
pub use strategy::MatchStrategy;
