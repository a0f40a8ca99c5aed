// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Record schema and output types shared by the automaton and its callers.

pub mod schema;
pub mod tuple;
