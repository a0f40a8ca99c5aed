// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Single-event range constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::schema::RecordSchema;
use crate::condition::CmpOp;
use crate::error::Result;

const fn unbounded_min() -> i64 {
    i64::MIN
}

const fn unbounded_max() -> i64 {
    i64::MAX
}

/// `min <= attr <= max` on the candidate event.
///
/// Bounds are in the attribute's stored representation: for `DOUBLE.1`,
/// the real-valued range `[10, 20]` is `[100, 200]`. `i64::MIN`/`i64::MAX`
/// stand for an open side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndependentConstraint {
    /// Attribute the range applies to.
    pub attr: String,
    /// Inclusive lower bound.
    #[serde(default = "unbounded_min")]
    pub min: i64,
    /// Inclusive upper bound.
    #[serde(default = "unbounded_max")]
    pub max: i64,
}

impl IndependentConstraint {
    /// Creates `min <= attr <= max` from already-scaled bounds.
    pub fn new(attr: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            attr: attr.into(),
            min,
            max,
        }
    }

    /// Creates `attr >= min`.
    pub fn at_least(attr: impl Into<String>, min: i64) -> Self {
        Self::new(attr, min, i64::MAX)
    }

    /// Creates `attr <= max`.
    pub fn at_most(attr: impl Into<String>, max: i64) -> Self {
        Self::new(attr, i64::MIN, max)
    }

    /// Creates `attr <cmp> literal`, scaling the literal through the schema.
    ///
    /// Strict comparisons become inclusive bounds one unit inward, which is
    /// exact because stored values are integers.
    ///
    /// ```
    /// use cep::common::schema::EventSchema;
    /// use cep::condition::CmpOp;
    /// use cep::condition::independent::IndependentConstraint;
    ///
    /// let schema = EventSchema::new("s", &[("t", "TYPE"), ("open", "DOUBLE.2"), ("ts", "TIMESTAMP")]).unwrap();
    /// let ic = IndependentConstraint::from_literal(&schema, "open", CmpOp::Gt, "1.5").unwrap();
    /// assert_eq!(ic.min, 151);
    /// assert_eq!(ic.max, i64::MAX);
    /// ```
    pub fn from_literal<S: RecordSchema + ?Sized>(
        schema: &S,
        attr: &str,
        cmp: CmpOp,
        literal: &str,
    ) -> Result<Self> {
        let value = schema.scale_literal(attr, literal)?;
        let (min, max) = match cmp {
            CmpOp::Lt => (i64::MIN, value.saturating_sub(1)),
            CmpOp::Le => (i64::MIN, value),
            CmpOp::Gt => (value.saturating_add(1), i64::MAX),
            CmpOp::Ge => (value, i64::MAX),
            CmpOp::Eq => (value, value),
        };
        Ok(Self::new(attr, min, max))
    }

    /// Creates `low <= attr <= high` from literals.
    pub fn between<S: RecordSchema + ?Sized>(
        schema: &S,
        attr: &str,
        low: &str,
        high: &str,
    ) -> Result<Self> {
        let min = schema.scale_literal(attr, low)?;
        let max = schema.scale_literal(attr, high)?;
        Ok(Self::new(attr, min, max))
    }

    /// True if `value` lies inside the range.
    #[must_use]
    #[inline]
    pub const fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Evaluates the constraint against a raw record.
    pub fn check<S: RecordSchema + ?Sized>(&self, schema: &S, record: &[u8]) -> Result<bool> {
        Ok(self.contains(schema.numeric_value(record, &self.attr)?))
    }

    /// True if the lower bound is finite.
    #[must_use]
    pub const fn has_min(&self) -> bool {
        self.min != i64::MIN
    }

    /// True if the upper bound is finite.
    #[must_use]
    pub const fn has_max(&self) -> bool {
        self.max != i64::MAX
    }
}

impl fmt::Display for IndependentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.has_min(), self.has_max()) {
            (false, false) => write!(f, "{} unbounded", self.attr),
            (true, false) => write!(f, "{} in [{},INF)", self.attr, self.min),
            (false, true) => write!(f, "{} in (INF,{}]", self.attr, self.max),
            (true, true) => write!(f, "{} in [{},{}]", self.attr, self.min, self.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::EventSchema;

    fn schema() -> EventSchema {
        EventSchema::new(
            "s",
            &[("t", "TYPE"), ("x", "DOUBLE.1"), ("n", "INT"), ("ts", "TIMESTAMP")],
        )
        .unwrap()
    }

    #[test]
    fn test_contains_inclusive() {
        let ic = IndependentConstraint::new("n", 10, 20);
        assert!(ic.contains(10));
        assert!(ic.contains(20));
        assert!(!ic.contains(9));
        assert!(!ic.contains(21));
    }

    #[test]
    fn test_open_bounds() {
        assert!(IndependentConstraint::at_least("n", 5).contains(i64::MAX));
        assert!(IndependentConstraint::at_most("n", 5).contains(i64::MIN));
    }

    #[test]
    fn test_from_literal_strict_bounds() {
        let s = schema();
        let lt = IndependentConstraint::from_literal(&s, "n", CmpOp::Lt, "7").unwrap();
        assert_eq!((lt.min, lt.max), (i64::MIN, 6));
        let ge = IndependentConstraint::from_literal(&s, "x", CmpOp::Ge, "2.5").unwrap();
        assert_eq!((ge.min, ge.max), (25, i64::MAX));
        let eq = IndependentConstraint::from_literal(&s, "n", CmpOp::Eq, "3").unwrap();
        assert_eq!((eq.min, eq.max), (3, 3));
    }

    #[test]
    fn test_scaled_bounds_against_scaled_record() {
        // x = 1.5 is stored as 15 for DOUBLE.1.
        let mut s = schema();
        let record = s.encode(&["A", "1.5", "0", "1"]).unwrap();

        // Bounds written as stored values [100, 200] mean 10.0..=20.0.
        let stored = IndependentConstraint::new("x", 100, 200);
        assert!(!stored.check(&s, &record).unwrap());

        // Bounds [10, 20] in stored units mean 1.0..=2.0 and accept 1.5.
        let narrow = IndependentConstraint::new("x", 10, 20);
        assert!(narrow.check(&s, &record).unwrap());

        // Literal bounds 10..=20 scale to [100, 200].
        let literal = IndependentConstraint::between(&s, "x", "10", "20").unwrap();
        assert_eq!((literal.min, literal.max), (100, 200));
        assert!(!literal.check(&s, &record).unwrap());
        let inside = s.encode(&["A", "15.0", "0", "2"]).unwrap();
        assert!(literal.check(&s, &inside).unwrap());
    }

    #[test]
    fn test_check_on_non_comparable_attribute_is_defect() {
        let mut s = schema();
        let record = s.encode(&["A", "1.5", "0", "1"]).unwrap();
        let ic = IndependentConstraint::at_least("ts", 0);
        assert!(ic.check(&s, &record).unwrap_err().is_defect());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            IndependentConstraint::new("n", 1, 2).to_string(),
            "n in [1,2]"
        );
        assert_eq!(
            IndependentConstraint::at_least("n", 1).to_string(),
            "n in [1,INF)"
        );
        assert_eq!(
            IndependentConstraint::at_most("n", 2).to_string(),
            "n in (INF,2]"
        );
        assert_eq!(
            IndependentConstraint::new("n", i64::MIN, i64::MAX).to_string(),
            "n unbounded"
        );
    }

    #[test]
    fn test_serde_defaults() {
        let ic: IndependentConstraint = serde_json::from_str(r#"{"attr":"n","min":4}"#).unwrap();
        assert_eq!(ic.max, i64::MAX);
        assert!(ic.has_min());
        assert!(!ic.has_max());
    }
}
