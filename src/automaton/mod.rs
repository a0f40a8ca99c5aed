// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! The incremental matching automaton.
//!
//! # Architecture
//!
//! ```text
//!                 ┌────────────────────────── Nfa ──────────────────────────┐
//!  record ──────► │ active states ──transfer──► emissions ──► dest buffers  │
//!                 │        │                                      │         │
//!                 │        └──── EventHandleStore (one insert) ◄──┘         │
//!                 └─────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`event_cache`]: append-only arena; partial matches hold handles into it.
//! - [`partial_match`]: in-flight matches and per-state buffers.
//! - [`transition`]: edges gated by independent and dependent constraints.
//! - [`state`]: nodes and the per-record transfer step.
//! - [`nfa`]: the driver, construction from a [`crate::pattern::CompiledPattern`]
//!   and result extraction.

pub mod event_cache;
pub mod nfa;
pub mod partial_match;
pub mod state;
pub mod transition;

pub use event_cache::{EventHandle, EventHandleStore};
pub use nfa::{MatchOutput, Nfa};
pub use partial_match::{MatchBuffer, PartialMatch};
pub use state::{State, StateId, StateKind};
pub use transition::Transition;
