// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Event selection strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CepError;

/// How a partial match continues once it has been extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStrategy {
    /// A partial match is consumed by its first successful extension, so it
    /// contributes at most one continuation.
    SkipTillNextMatch,
    /// A partial match stays in its buffer and may be extended again by
    /// later events.
    #[default]
    SkipTillAnyMatch,
    /// Adjacent events only. Declared for completeness; selecting it fails
    /// with [`CepError::Unsupported`].
    StrictContiguous,
}

impl MatchStrategy {
    /// Name in upper snake case, as used in pattern definitions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SkipTillNextMatch => "SKIP_TILL_NEXT_MATCH",
            Self::SkipTillAnyMatch => "SKIP_TILL_ANY_MATCH",
            Self::StrictContiguous => "STRICT_CONTIGUOUS",
        }
    }

    /// Returns `self` if the automaton can run it.
    pub fn ensure_supported(self) -> Result<Self, CepError> {
        match self {
            Self::StrictContiguous => Err(CepError::unsupported(self.as_str())),
            supported => Ok(supported),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStrategy {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SKIP_TILL_NEXT_MATCH" => Ok(Self::SkipTillNextMatch),
            "SKIP_TILL_ANY_MATCH" => Ok(Self::SkipTillAnyMatch),
            "STRICT_CONTIGUOUS" => Ok(Self::StrictContiguous),
            other => Err(CepError::pattern(format!(
                "unknown match strategy '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            "skip_till_next_match".parse::<MatchStrategy>().unwrap(),
            MatchStrategy::SkipTillNextMatch
        );
        assert_eq!(
            "SKIP_TILL_ANY_MATCH".parse::<MatchStrategy>().unwrap(),
            MatchStrategy::SkipTillAnyMatch
        );
        assert!("SKIP_PAST_LAST".parse::<MatchStrategy>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        for s in [
            MatchStrategy::SkipTillNextMatch,
            MatchStrategy::SkipTillAnyMatch,
            MatchStrategy::StrictContiguous,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{s}\""));
            assert_eq!(s.to_string().parse::<MatchStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_strict_contiguous_unsupported() {
        let err = MatchStrategy::StrictContiguous
            .ensure_supported()
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(MatchStrategy::SkipTillAnyMatch.ensure_supported().is_ok());
    }

    #[test]
    fn test_default_is_any_match() {
        assert_eq!(MatchStrategy::default(), MatchStrategy::SkipTillAnyMatch);
    }
}
