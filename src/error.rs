// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Error types for automaton construction and event matching.
//!
//! Two kinds are fatal by nature and kept apart so callers (and tests) can
//! tell them from each other:
//!
//! - [`CepError::Unsupported`]: a feature that is known to be absent, such as
//!   the `STRICT_CONTIGUOUS` strategy. Not transient, never retried.
//! - [`CepError::Defect`]: the compiled pattern is inconsistent with the
//!   schema or with the automaton built from it. This points at a bug
//!   upstream of the automaton, which does not attempt recovery.
//!
//! Out-of-window partial matches are not errors; they are evicted silently.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CepError>;

/// Errors raised while building or driving an automaton.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CepError {
    /// A feature that this engine deliberately does not implement.
    #[error("unsupported feature: {feature}")]
    Unsupported {
        /// Name of the missing feature.
        feature: String,
    },

    /// An inconsistency that can only come from a malformed pattern or schema.
    #[error("defect in {context}: {message}")]
    Defect {
        /// Offending state, variable or attribute.
        context: String,
        /// Human-readable description.
        message: String,
    },

    /// Invalid schema definition or record that does not fit the schema.
    #[error("schema error: {message}")]
    Schema {
        /// Human-readable description.
        message: String,
    },

    /// Structurally invalid compiled pattern.
    #[error("pattern error: {message}")]
    Pattern {
        /// Human-readable description.
        message: String,
    },

    /// Pattern or schema definition failed to deserialize.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CepError {
    /// Creates an [`CepError::Unsupported`] error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    /// Creates a [`CepError::Defect`] error.
    pub fn defect(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Defect {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates a [`CepError::Schema`] error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates a [`CepError::Pattern`] error.
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }

    /// Returns true for [`CepError::Defect`].
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::Defect { .. })
    }

    /// Returns true for [`CepError::Unsupported`].
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
