// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Constraints that gate automaton transitions.
//!
//! - [`independent::IndependentConstraint`]: a range test on one attribute of
//!   the candidate event, `min <= value <= max`.
//! - [`dependent::DependentConstraint`]: a comparison between the candidate
//!   event and an event already bound in a partial match, in the form
//!
//! ```text
//! var1.attr (*|/) m1 (+|-) a1  CMP  var2.attr (*|/) m2 (+|-) a2
//! ```
//!
//! Both kinds compare values in the schema's fixed-point representation.
//! Three-term chains (`a.x <= b.x <= c.x`) and additive cross terms
//! (`a.x <= b.x + c.x`) are outside this grammar.

pub mod dependent;
pub mod independent;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CepError;

/// Comparison operator shared by both constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `=`
    #[serde(rename = "=")]
    Eq,
}

impl CmpOp {
    /// Evaluates `left <op> right`.
    #[must_use]
    #[inline]
    #[allow(clippy::float_cmp)]
    pub fn evaluate(self, left: f64, right: f64) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Eq => left == right,
        }
    }

    /// Operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CmpOp {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "=" | "==" => Ok(Self::Eq),
            other => Err(CepError::pattern(format!(
                "unknown comparison operator '{other}'"
            ))),
        }
    }
}

/// Multiplicative step of a linear term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScaleOp {
    /// `*`
    #[default]
    #[serde(rename = "*")]
    Mul,
    /// `/`
    #[serde(rename = "/")]
    Div,
}

impl ScaleOp {
    /// Applies `value <op> factor`.
    #[must_use]
    #[inline]
    pub fn apply(self, value: f64, factor: f64) -> f64 {
        match self {
            Self::Mul => value * factor,
            Self::Div => value / factor,
        }
    }

    /// Operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Additive step of a linear term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OffsetOp {
    /// `+`
    #[default]
    #[serde(rename = "+")]
    Add,
    /// `-`
    #[serde(rename = "-")]
    Sub,
}

impl OffsetOp {
    /// Applies `value <op> offset`.
    #[must_use]
    #[inline]
    pub fn apply(self, value: f64, offset: f64) -> f64 {
        match self {
            Self::Add => value + offset,
            Self::Sub => value - offset,
        }
    }

    /// Operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
        }
    }
}
