// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Cross-event comparisons between two bound variables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::schema::RecordSchema;
use crate::condition::{CmpOp, OffsetOp, ScaleOp};
use crate::error::Result;

/// One side of a dependent constraint: `var.attr <scale> factor <offset> addend`.
///
/// `addend` is in the attribute's stored (scaled) representation; `factor`
/// is a plain multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTerm {
    /// `*` or `/`.
    #[serde(default)]
    pub scale_op: ScaleOp,
    /// Multiplier or divisor.
    #[serde(default = "unit_factor")]
    pub factor: f64,
    /// `+` or `-`.
    #[serde(default)]
    pub offset_op: OffsetOp,
    /// Scaled addend.
    #[serde(default)]
    pub addend: i64,
}

const fn unit_factor() -> f64 {
    1.0
}

impl Default for LinearTerm {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LinearTerm {
    /// `* 1 + 0`.
    pub const IDENTITY: Self = Self {
        scale_op: ScaleOp::Mul,
        factor: 1.0,
        offset_op: OffsetOp::Add,
        addend: 0,
    };

    /// Applies the term to a stored attribute value.
    #[must_use]
    #[inline]
    pub fn apply(&self, value: i64) -> f64 {
        let scaled = self.scale_op.apply(value as f64, self.factor);
        self.offset_op.apply(scaled, self.addend as f64)
    }

    #[allow(clippy::float_cmp)]
    fn has_factor(&self) -> bool {
        self.factor != 1.0
    }

    fn write_with(&self, f: &mut fmt::Formatter<'_>, var: &str, attr: &str) -> fmt::Result {
        write!(f, "{var}.{attr}")?;
        if self.has_factor() {
            write!(f, " {} {}", self.scale_op.symbol(), self.factor)?;
        }
        if self.addend != 0 {
            write!(f, " {} {}", self.offset_op.symbol(), self.addend)?;
        }
        Ok(())
    }
}

/// `left_var.attr ⊙ m1 ⊙ a1  CMP  right_var.attr ⊙ m2 ⊙ a2`.
///
/// Both sides read the same attribute. Values are combined as `f64` after
/// reading the stored fixed-point integers, so fractional attributes compare
/// at their stored scale on both sides.
///
/// ```
/// use cep::condition::{CmpOp, OffsetOp, ScaleOp};
/// use cep::condition::dependent::DependentConstraint;
///
/// // a.x * 3 + 5 <= b.x * 4 - 5
/// let dc = DependentConstraint::new("x", "a", CmpOp::Le, "b")
///     .with_left(ScaleOp::Mul, 3.0, OffsetOp::Add, 5)
///     .with_right(ScaleOp::Mul, 4.0, OffsetOp::Sub, 5);
/// assert!(dc.satisfied(2, 4)); // 11 <= 11
/// assert!(!dc.satisfied(3, 4)); // 14 <= 11
/// assert_eq!(dc.to_string(), "a.x * 3 + 5 <= b.x * 4 - 5");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentConstraint {
    /// Attribute compared on both sides.
    pub attr: String,
    /// Variable on the left-hand side.
    pub left_var: String,
    /// Comparison operator.
    pub cmp: CmpOp,
    /// Variable on the right-hand side.
    pub right_var: String,
    /// Left-hand linear term.
    #[serde(default)]
    pub left: LinearTerm,
    /// Right-hand linear term.
    #[serde(default)]
    pub right: LinearTerm,
}

impl DependentConstraint {
    /// Creates `left_var.attr <cmp> right_var.attr`.
    pub fn new(
        attr: impl Into<String>,
        left_var: impl Into<String>,
        cmp: CmpOp,
        right_var: impl Into<String>,
    ) -> Self {
        Self {
            attr: attr.into(),
            left_var: left_var.into(),
            cmp,
            right_var: right_var.into(),
            left: LinearTerm::IDENTITY,
            right: LinearTerm::IDENTITY,
        }
    }

    /// Sets the left-hand linear term.
    #[must_use]
    pub fn with_left(
        mut self,
        scale_op: ScaleOp,
        factor: f64,
        offset_op: OffsetOp,
        addend: i64,
    ) -> Self {
        self.left = LinearTerm {
            scale_op,
            factor,
            offset_op,
            addend,
        };
        self
    }

    /// Sets the right-hand linear term.
    #[must_use]
    pub fn with_right(
        mut self,
        scale_op: ScaleOp,
        factor: f64,
        offset_op: OffsetOp,
        addend: i64,
    ) -> Self {
        self.right = LinearTerm {
            scale_op,
            factor,
            offset_op,
            addend,
        };
        self
    }

    /// Left-hand side for a stored value of `left_var.attr`.
    #[must_use]
    pub fn left_value(&self, value: i64) -> f64 {
        self.left.apply(value)
    }

    /// Right-hand side for a stored value of `right_var.attr`.
    #[must_use]
    pub fn right_value(&self, value: i64) -> f64 {
        self.right.apply(value)
    }

    /// Compares stored values; arguments must be passed in variable order.
    #[must_use]
    pub fn satisfied(&self, left: i64, right: i64) -> bool {
        self.cmp
            .evaluate(self.left_value(left), self.right_value(right))
    }

    /// Evaluates against the records bound to `left_var` and `right_var`.
    pub fn check<S: RecordSchema + ?Sized>(
        &self,
        schema: &S,
        left_record: &[u8],
        right_record: &[u8],
    ) -> Result<bool> {
        let left = schema.numeric_value(left_record, &self.attr)?;
        let right = schema.numeric_value(right_record, &self.attr)?;
        Ok(self.satisfied(left, right))
    }

    /// The variable on the other side of `var`, if `var` appears at all.
    #[must_use]
    pub fn counterpart(&self, var: &str) -> Option<&str> {
        if self.left_var == var {
            Some(&self.right_var)
        } else if self.right_var == var {
            Some(&self.left_var)
        } else {
            None
        }
    }
}

impl fmt::Display for DependentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.left.write_with(f, &self.left_var, &self.attr)?;
        write!(f, " {} ", self.cmp)?;
        self.right.write_with(f, &self.right_var, &self.attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::EventSchema;

    #[test]
    fn test_plain_comparison() {
        let dc = DependentConstraint::new("x", "a", CmpOp::Le, "b");
        assert!(dc.satisfied(5, 9));
        assert!(dc.satisfied(5, 5));
        assert!(!dc.satisfied(9, 5));
        assert_eq!(dc.to_string(), "a.x <= b.x");
    }

    #[test]
    fn test_divide_and_subtract() {
        // a.x / 2 - 1 > b.x
        let dc = DependentConstraint::new("x", "a", CmpOp::Gt, "b").with_left(
            ScaleOp::Div,
            2.0,
            OffsetOp::Sub,
            1,
        );
        assert!((dc.left_value(10) - 4.0).abs() < f64::EPSILON);
        assert!(dc.satisfied(10, 3));
        assert!(!dc.satisfied(10, 4));
    }

    #[test]
    fn test_fractional_factor() {
        // b.open >= a.open * 0.5, prices stored at DOUBLE.2
        let dc = DependentConstraint::new("open", "b", CmpOp::Ge, "a").with_right(
            ScaleOp::Mul,
            0.5,
            OffsetOp::Add,
            0,
        );
        assert!(dc.satisfied(5_000, 10_000));
        assert!(!dc.satisfied(4_999, 10_000));
        assert_eq!(dc.to_string(), "b.open >= a.open * 0.5");
    }

    #[test]
    fn test_equality() {
        let dc = DependentConstraint::new("n", "a", CmpOp::Eq, "b").with_right(
            ScaleOp::Mul,
            2.0,
            OffsetOp::Add,
            0,
        );
        assert!(dc.satisfied(8, 4));
        assert!(!dc.satisfied(8, 5));
    }

    #[test]
    fn test_counterpart() {
        let dc = DependentConstraint::new("x", "a", CmpOp::Lt, "b");
        assert_eq!(dc.counterpart("a"), Some("b"));
        assert_eq!(dc.counterpart("b"), Some("a"));
        assert_eq!(dc.counterpart("c"), None);
    }

    #[test]
    fn test_check_reads_records() {
        let mut schema = EventSchema::new(
            "s",
            &[("k", "TYPE"), ("x", "DOUBLE.1"), ("t", "TIMESTAMP")],
        )
        .unwrap();
        let a = schema.encode(&["A", "5.0", "1"]).unwrap();
        let b = schema.encode(&["B", "4.9", "2"]).unwrap();
        let dc = DependentConstraint::new("x", "b", CmpOp::Ge, "a");
        assert!(!dc.check(&schema, &b, &a).unwrap());
        assert!(dc.check(&schema, &a, &b).unwrap());
    }

    #[test]
    fn test_check_on_timestamp_is_defect() {
        let mut schema =
            EventSchema::new("s", &[("k", "TYPE"), ("t", "TIMESTAMP")]).unwrap();
        let a = schema.encode(&["A", "1"]).unwrap();
        let dc = DependentConstraint::new("t", "a", CmpOp::Lt, "b");
        assert!(dc.check(&schema, &a, &a).unwrap_err().is_defect());
    }

    #[test]
    fn test_serde_defaults_to_identity_terms() {
        let dc: DependentConstraint = serde_json::from_str(
            r#"{"attr":"x","left_var":"a","cmp":"<=","right_var":"b",
                "right":{"scale_op":"*","factor":4.0,"offset_op":"-","addend":5}}"#,
        )
        .unwrap();
        assert_eq!(dc.left, LinearTerm::IDENTITY);
        assert_eq!(dc.right.addend, 5);
        assert_eq!(dc.to_string(), "a.x <= b.x * 4 - 5");
    }
}
