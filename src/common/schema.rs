// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Record schemas: attribute layout, fixed-point scaling and the accessor
//! trait the automaton reads records through.
//!
//! The automaton never owns a decoded event. It stores raw byte records and
//! asks a [`RecordSchema`] for the event type, the timestamp and typed
//! attribute values whenever a constraint needs them.
//!
//! # Storage types
//!
//! | Type | Width | Stored as |
//! |------|-------|-----------|
//! | `TYPE` | 4 bytes | interned event-type id (`i32`, ids start at 1) |
//! | `INT` | 4 bytes | `i32` |
//! | `FLOAT.n` | 8 bytes | `i64`, value × 10^n |
//! | `DOUBLE.n` | 8 bytes | `i64`, value × 10^n |
//! | `TIMESTAMP` | 8 bytes | `i64` |
//!
//! All fields are little-endian and laid out in declaration order.
//!
//! Fractional attributes are scaled to fixed-point integers once, when the
//! record is encoded. Constraint bounds go through [`RecordSchema::scale_literal`]
//! so that both sides of every comparison share the same representation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CepError, Result};

/// Largest supported decimal length; `10^18` is the largest power of ten
/// that fits in an `i64`.
pub const MAX_DECIMAL_LEN: u32 = 18;

/// Storage type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttrType {
    /// Event type column.
    Type,
    /// 32-bit integer.
    Int,
    /// Fixed-point float with the given number of decimal digits.
    Float(u32),
    /// Fixed-point double with the given number of decimal digits.
    Double(u32),
    /// Event timestamp.
    Timestamp,
}

impl AttrType {
    /// Number of bytes one value occupies in a record.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Type | Self::Int => 4,
            Self::Float(_) | Self::Double(_) | Self::Timestamp => 8,
        }
    }

    /// Fixed-point multiplier: `10^n` for fractional types, 1 otherwise.
    #[must_use]
    pub const fn scale(self) -> i64 {
        match self {
            Self::Float(n) | Self::Double(n) => 10_i64.pow(n),
            _ => 1,
        }
    }

    /// Decimal digits kept by fractional types, 0 otherwise.
    #[must_use]
    pub const fn decimal_len(self) -> u32 {
        match self {
            Self::Float(n) | Self::Double(n) => n,
            _ => 0,
        }
    }

    /// True for the types constraints may compare: `INT`, `FLOAT.n`, `DOUBLE.n`.
    #[must_use]
    pub const fn is_comparable(self) -> bool {
        matches!(self, Self::Int | Self::Float(_) | Self::Double(_))
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => f.write_str("TYPE"),
            Self::Int => f.write_str("INT"),
            Self::Float(n) => write!(f, "FLOAT.{n}"),
            Self::Double(n) => write!(f, "DOUBLE.{n}"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
        }
    }
}

impl FromStr for AttrType {
    type Err = CepError;

    /// Parses `TYPE`, `INT`, `TIMESTAMP`, `FLOAT.n` and `DOUBLE.n`
    /// (case-insensitive; a bare `FLOAT`/`DOUBLE` keeps no decimals).
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let (base, decimals) = match upper.split_once('.') {
            Some((base, digits)) => {
                let n: u32 = digits.trim().parse().map_err(|_| {
                    CepError::schema(format!("invalid decimal length in type '{s}'"))
                })?;
                (base.trim().to_string(), Some(n))
            }
            None => (upper.clone(), None),
        };
        if let Some(n) = decimals {
            if n > MAX_DECIMAL_LEN {
                return Err(CepError::schema(format!(
                    "decimal length {n} in type '{s}' exceeds {MAX_DECIMAL_LEN}"
                )));
            }
        }
        match (base.as_str(), decimals) {
            ("TYPE", None) => Ok(Self::Type),
            ("INT", None) => Ok(Self::Int),
            ("TIMESTAMP", None) => Ok(Self::Timestamp),
            ("FLOAT", n) => Ok(Self::Float(n.unwrap_or(0))),
            ("DOUBLE", n) => Ok(Self::Double(n.unwrap_or(0))),
            _ => Err(CepError::schema(format!("unsupported attribute type '{s}'"))),
        }
    }
}

impl TryFrom<String> for AttrType {
    type Error = CepError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AttrType> for String {
    fn from(value: AttrType) -> Self {
        value.to_string()
    }
}

/// Read access to raw event records.
///
/// This is the seam between the automaton and the record codec. Fractional
/// values come back already scaled to fixed-point integers.
pub trait RecordSchema {
    /// Event type name of `record`.
    fn event_type(&self, record: &[u8]) -> Result<&str>;

    /// Timestamp of `record`.
    fn timestamp(&self, record: &[u8]) -> Result<i64>;

    /// Storage type of the attribute called `attr`.
    fn attr_type(&self, attr: &str) -> Result<AttrType>;

    /// Converts a literal to the stored representation of `attr`, so bounds
    /// compare against record values without re-deriving floats.
    fn scale_literal(&self, attr: &str, text: &str) -> Result<i64>;

    /// Comparable value of `attr` in `record`.
    ///
    /// `INT` widens to `i64`; `FLOAT.n`/`DOUBLE.n` return the stored scaled
    /// value. Any other storage type is a [`CepError::Defect`].
    fn numeric_value(&self, record: &[u8], attr: &str) -> Result<i64>;

    /// Human-readable rendering of the whole record.
    fn render(&self, record: &[u8]) -> Result<String>;
}

/// One attribute of a [`SchemaDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name.
    pub name: String,
    /// Storage type, e.g. `"DOUBLE.2"`.
    #[serde(rename = "type")]
    pub ty: AttrType,
}

/// Serializable description of a schema.
///
/// ```
/// use cep::common::schema::SchemaDefinition;
///
/// let def = SchemaDefinition::from_json(
///     r#"{"name": "stock", "attributes": [
///         {"name": "ticker", "type": "TYPE"},
///         {"name": "open", "type": "DOUBLE.2"},
///         {"name": "time", "type": "TIMESTAMP"}
///     ]}"#,
/// ).unwrap();
/// assert_eq!(def.attributes.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema name.
    pub name: String,
    /// Attributes in storage order.
    pub attributes: Vec<AttributeDefinition>,
}

impl SchemaDefinition {
    /// Deserializes a definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone)]
struct Attribute {
    name: String,
    ty: AttrType,
    offset: usize,
}

/// Concrete fixed-layout schema.
///
/// Event-type strings are interned the first time [`EventSchema::encode`]
/// sees them, so encoding needs `&mut self` while every read path is shared.
#[derive(Debug, Clone)]
pub struct EventSchema {
    name: String,
    attributes: Vec<Attribute>,
    by_name: HashMap<String, usize>,
    type_idx: usize,
    timestamp_idx: usize,
    record_size: usize,
    type_ids: HashMap<String, i32>,
    // Index 0 is a placeholder; ids are assigned from 1.
    type_names: Vec<String>,
}

impl EventSchema {
    /// Builds a schema from `(name, type)` pairs in storage order.
    ///
    /// ```
    /// use cep::common::schema::EventSchema;
    ///
    /// let schema = EventSchema::new(
    ///     "synthetic",
    ///     &[("type", "TYPE"), ("a1", "INT"), ("a3", "DOUBLE.1"), ("time", "TIMESTAMP")],
    /// ).unwrap();
    /// assert_eq!(schema.record_size(), 24);
    /// ```
    pub fn new(name: &str, attributes: &[(&str, &str)]) -> Result<Self> {
        let attributes = attributes
            .iter()
            .map(|(attr, ty)| -> Result<AttributeDefinition> {
                Ok(AttributeDefinition {
                    name: (*attr).to_string(),
                    ty: ty.parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_definition(&SchemaDefinition {
            name: name.to_string(),
            attributes,
        })
    }

    /// Builds a schema from a [`SchemaDefinition`].
    ///
    /// Exactly one `TYPE` and one `TIMESTAMP` attribute are required and
    /// attribute names must be unique.
    pub fn from_definition(def: &SchemaDefinition) -> Result<Self> {
        let mut attributes = Vec::with_capacity(def.attributes.len());
        let mut by_name = HashMap::with_capacity(def.attributes.len());
        let mut type_idx = None;
        let mut timestamp_idx = None;
        let mut offset = 0;

        for (idx, attr) in def.attributes.iter().enumerate() {
            if by_name.insert(attr.name.clone(), idx).is_some() {
                return Err(CepError::schema(format!(
                    "duplicate attribute '{}' in schema '{}'",
                    attr.name, def.name
                )));
            }
            let slot = match attr.ty {
                AttrType::Type => Some(&mut type_idx),
                AttrType::Timestamp => Some(&mut timestamp_idx),
                _ => None,
            };
            if let Some(slot) = slot {
                if slot.replace(idx).is_some() {
                    return Err(CepError::schema(format!(
                        "schema '{}' declares more than one {} attribute",
                        def.name, attr.ty
                    )));
                }
            }
            attributes.push(Attribute {
                name: attr.name.clone(),
                ty: attr.ty,
                offset,
            });
            offset += attr.ty.width();
        }

        let type_idx = type_idx.ok_or_else(|| {
            CepError::schema(format!("schema '{}' is missing a TYPE attribute", def.name))
        })?;
        let timestamp_idx = timestamp_idx.ok_or_else(|| {
            CepError::schema(format!(
                "schema '{}' is missing a TIMESTAMP attribute",
                def.name
            ))
        })?;

        Ok(Self {
            name: def.name.clone(),
            attributes,
            by_name,
            type_idx,
            timestamp_idx,
            record_size: offset,
            type_ids: HashMap::new(),
            type_names: vec![String::new()],
        })
    }

    /// Schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes per encoded record.
    #[must_use]
    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Attribute names in storage order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Returns the id of `event_type`, interning it on first use.
    pub fn type_id(&mut self, event_type: &str) -> i32 {
        if let Some(&id) = self.type_ids.get(event_type) {
            return id;
        }
        let id = self.type_names.len() as i32;
        self.type_names.push(event_type.to_string());
        self.type_ids.insert(event_type.to_string(), id);
        id
    }

    /// Encodes text fields, one per attribute in storage order.
    pub fn encode(&mut self, fields: &[&str]) -> Result<Vec<u8>> {
        if fields.len() != self.attributes.len() {
            return Err(CepError::schema(format!(
                "schema '{}' expects {} fields, got {}",
                self.name,
                self.attributes.len(),
                fields.len()
            )));
        }
        let mut record = Vec::with_capacity(self.record_size);
        for (idx, text) in fields.iter().enumerate() {
            let text = text.trim();
            let ty = self.attributes[idx].ty;
            match ty {
                AttrType::Type => {
                    let id = self.type_id(text);
                    record.extend_from_slice(&id.to_le_bytes());
                }
                AttrType::Int => {
                    let name = &self.attributes[idx].name;
                    let value = scale_text(ty, name, text)?;
                    let value = i32::try_from(value).map_err(|_| {
                        CepError::schema(format!("value {value} of '{name}' does not fit INT"))
                    })?;
                    record.extend_from_slice(&value.to_le_bytes());
                }
                AttrType::Float(_) | AttrType::Double(_) | AttrType::Timestamp => {
                    let value = scale_text(ty, &self.attributes[idx].name, text)?;
                    record.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
        Ok(record)
    }

    fn attribute(&self, attr: &str) -> Result<&Attribute> {
        self.by_name
            .get(attr)
            .map(|&idx| &self.attributes[idx])
            .ok_or_else(|| {
                CepError::defect(
                    format!("schema '{}'", self.name),
                    format!("unknown attribute '{attr}'"),
                )
            })
    }

    fn field<'r>(&self, record: &'r [u8], attr: &Attribute) -> Result<&'r [u8]> {
        record
            .get(attr.offset..attr.offset + attr.ty.width())
            .ok_or_else(|| {
                CepError::schema(format!(
                    "record of {} bytes is too short for schema '{}' ({} bytes)",
                    record.len(),
                    self.name,
                    self.record_size
                ))
            })
    }

    fn read_i32(&self, record: &[u8], attr: &Attribute) -> Result<i32> {
        let bytes = self.field(record, attr)?;
        let bytes: [u8; 4] = bytes
            .try_into()
            .map_err(|_| CepError::schema(format!("field '{}' is not 4 bytes", attr.name)))?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn read_i64(&self, record: &[u8], attr: &Attribute) -> Result<i64> {
        let bytes = self.field(record, attr)?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| CepError::schema(format!("field '{}' is not 8 bytes", attr.name)))?;
        Ok(i64::from_le_bytes(bytes))
    }

    fn type_name(&self, id: i32) -> Result<&str> {
        usize::try_from(id)
            .ok()
            .filter(|&idx| idx > 0)
            .and_then(|idx| self.type_names.get(idx))
            .map(String::as_str)
            .ok_or_else(|| {
                CepError::schema(format!(
                    "unknown event type id {id} in schema '{}'",
                    self.name
                ))
            })
    }
}

impl RecordSchema for EventSchema {
    fn event_type(&self, record: &[u8]) -> Result<&str> {
        let id = self.read_i32(record, &self.attributes[self.type_idx])?;
        self.type_name(id)
    }

    fn timestamp(&self, record: &[u8]) -> Result<i64> {
        self.read_i64(record, &self.attributes[self.timestamp_idx])
    }

    fn attr_type(&self, attr: &str) -> Result<AttrType> {
        Ok(self.attribute(attr)?.ty)
    }

    /// `INT` and `TIMESTAMP` parse as integers; `FLOAT.n`/`DOUBLE.n` parse as
    /// decimals and are multiplied by `10^n` and rounded to the nearest integer.
    ///
    /// ```
    /// use cep::common::schema::{EventSchema, RecordSchema};
    ///
    /// let schema = EventSchema::new("s", &[("t", "TYPE"), ("x", "DOUBLE.1"), ("ts", "TIMESTAMP")]).unwrap();
    /// assert_eq!(schema.scale_literal("x", "1.5").unwrap(), 15);
    /// ```
    fn scale_literal(&self, attr: &str, text: &str) -> Result<i64> {
        let ty = self.attribute(attr)?.ty;
        scale_text(ty, attr, text)
    }

    fn numeric_value(&self, record: &[u8], attr: &str) -> Result<i64> {
        let attribute = self.attribute(attr)?;
        match attribute.ty {
            AttrType::Int => Ok(i64::from(self.read_i32(record, attribute)?)),
            // Already scaled when the record was encoded.
            AttrType::Float(_) | AttrType::Double(_) => self.read_i64(record, attribute),
            other => Err(CepError::defect(
                format!("attribute '{attr}'"),
                format!("storage type {other} cannot be compared"),
            )),
        }
    }

    fn render(&self, record: &[u8]) -> Result<String> {
        let mut out = String::with_capacity(self.attributes.len() * 8);
        for (idx, attr) in self.attributes.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            match attr.ty {
                AttrType::Type => out.push_str(self.type_name(self.read_i32(record, attr)?)?),
                AttrType::Int => out.push_str(&self.read_i32(record, attr)?.to_string()),
                AttrType::Timestamp => out.push_str(&self.read_i64(record, attr)?.to_string()),
                AttrType::Float(_) | AttrType::Double(_) => {
                    let value = self.read_i64(record, attr)? as f64 / attr.ty.scale() as f64;
                    let prec = attr.ty.decimal_len() as usize;
                    out.push_str(&format!("{value:.prec$}"));
                }
            }
        }
        Ok(out)
    }
}

fn scale_text(ty: AttrType, attr: &str, text: &str) -> Result<i64> {
    let text = text.trim();
    let invalid = || CepError::schema(format!("cannot parse '{text}' as {ty} for '{attr}'"));
    match ty {
        AttrType::Int | AttrType::Timestamp => text.parse::<i64>().map_err(|_| invalid()),
        AttrType::Float(_) | AttrType::Double(_) => {
            let value: f64 = text.parse().map_err(|_| invalid())?;
            let scaled = (value * ty.scale() as f64).round();
            if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
                return Err(invalid());
            }
            Ok(scaled as i64)
        }
        AttrType::Type => Err(CepError::schema(format!(
            "attribute '{attr}' holds event types, not values"
        ))),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encoded_int_reads_back(value in any::<i32>(), ts in any::<i64>()) {
            let mut schema = EventSchema::new("p", &[("k", "TYPE"), ("v", "INT"), ("t", "TIMESTAMP")]).unwrap();
            let record = schema.encode(&["E", &value.to_string(), &ts.to_string()]).unwrap();
            prop_assert_eq!(schema.numeric_value(&record, "v").unwrap(), i64::from(value));
            prop_assert_eq!(schema.timestamp(&record).unwrap(), ts);
        }

        #[test]
        fn encoded_fraction_matches_scaled_literal(cents in -1_000_000_i64..1_000_000) {
            let mut schema = EventSchema::new("p", &[("k", "TYPE"), ("v", "DOUBLE.2"), ("t", "TIMESTAMP")]).unwrap();
            let text = format!("{:.2}", cents as f64 / 100.0);
            let record = schema.encode(&["E", &text, "0"]).unwrap();
            prop_assert_eq!(schema.numeric_value(&record, "v").unwrap(), cents);
            prop_assert_eq!(schema.scale_literal("v", &text).unwrap(), cents);
        }
    }
}
