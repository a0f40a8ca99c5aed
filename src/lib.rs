//! # `cep` — Incremental NFA for Complex Event Processing
//!
//! Matches a stream of typed, timestamped event records against sequence
//! patterns with per-variable range constraints and cross-variable
//! comparisons, inside a sliding time window.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`automaton`] | The NFA: event store, partial matches, states, driver |
//! | [`condition`] | Independent (range) and dependent (two-event) constraints |
//! | [`pattern`] | Compiled patterns and match strategies |
//! | [`common`] | Record schema codec and output tuples |
//! | [`error`] | [`CepError`] and the crate [`Result`] alias |
//!
//! ## Example
//!
//! ```
//! use cep::automaton::Nfa;
//! use cep::common::schema::EventSchema;
//! use cep::condition::CmpOp;
//! use cep::condition::dependent::DependentConstraint;
//! use cep::pattern::{CompiledPattern, MatchStrategy};
//!
//! let mut schema = EventSchema::new(
//!     "stock",
//!     &[("ticker", "TYPE"), ("price", "DOUBLE.2"), ("time", "TIMESTAMP")],
//! ).unwrap();
//!
//! // SEQ(IBM a, ORCL b) WHERE b.price >= a.price WITHIN 100
//! let pattern = CompiledPattern::new(100, MatchStrategy::SkipTillAnyMatch)
//!     .with_sequence(&[("IBM", "a"), ("ORCL", "b")])
//!     .with_dependent(DependentConstraint::new("price", "b", CmpOp::Ge, "a"));
//! let mut nfa = Nfa::from_pattern(&pattern).unwrap();
//!
//! for fields in [["IBM", "10.50", "1"], ["ORCL", "9.99", "2"], ["ORCL", "11.00", "3"]] {
//!     let record = schema.encode(&fields).unwrap();
//!     nfa.consume(&schema, &record).unwrap();
//! }
//!
//! let tuples = nfa.get_tuples(&schema).unwrap();
//! assert_eq!(tuples.len(), 1);
//! assert_eq!(tuples[0].to_string(), "[IBM,10.50,1|ORCL,11.00,3]");
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade (`debug!` on construction,
//! `trace!` per record) and never installs a logger itself.

pub mod automaton;
pub mod common;
pub mod condition;
pub mod error;
pub mod pattern;

pub use automaton::Nfa;
pub use error::{CepError, Result};
