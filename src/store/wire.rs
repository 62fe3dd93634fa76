// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Typed-value wire codec for the document store.
//!
//! Every stored field is one of five scalar variants. The remote store's
//! REST API wraps each value in a single-key envelope naming its type
//! (`{"stringValue": "x"}`); integers travel as decimal strings. Values
//! outside the scalar set (arrays, nested objects) and unrecognized wire
//! tags are hard errors: nothing degrades to stringified JSON or decodes
//! to nothing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{json, Map, Number, Value};

use super::StoreError;

/// A scalar document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

/// Field map of a document. `BTreeMap` keeps key order canonical, which
/// the certificate content hash relies on.
pub type Fields = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Convert a JSON value produced by serde into a field value.
    ///
    /// Arrays and objects are rejected: persisted models are declared
    /// flat, and a silent JSON-string fallback would hide schema drift.
    pub fn from_json(field: &str, value: &Value) -> Result<FieldValue, StoreError> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FieldValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(FieldValue::Double(f))
                } else {
                    Err(StoreError::UnsupportedValue {
                        field: field.to_string(),
                        kind: "number out of range",
                    })
                }
            }
            Value::String(s) => Ok(FieldValue::Str(s.clone())),
            Value::Array(_) => Err(StoreError::UnsupportedValue {
                field: field.to_string(),
                kind: "array",
            }),
            Value::Object(_) => Err(StoreError::UnsupportedValue {
                field: field.to_string(),
                kind: "object",
            }),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::Double(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Str(s) => Value::String(s.clone()),
        }
    }

    /// Total order used by query filtering and sorting: values group by
    /// kind (null < bool < number < string), numbers compare across
    /// int/double.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        fn rank(v: &FieldValue) -> u8 {
            match v {
                FieldValue::Null => 0,
                FieldValue::Bool(_) => 1,
                FieldValue::Int(_) | FieldValue::Double(_) => 2,
                FieldValue::Str(_) => 3,
            }
        }

        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Str(a), FieldValue::Str(b)) => a.cmp(b),
            (a, b) if rank(a) == 2 && rank(b) == 2 => {
                let fa = a.as_f64().unwrap_or(f64::NAN);
                let fb = b.as_f64().unwrap_or(f64::NAN);
                fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Double(f) => Some(*f),
            _ => None,
        }
    }
}

/// Encode a field map into the REST wire envelope: `{"fields": {...}}`.
pub fn encode_fields(fields: &Fields) -> Value {
    let mut out = Map::new();
    for (name, value) in fields {
        let wrapped = match value {
            FieldValue::Null => json!({ "nullValue": null }),
            FieldValue::Bool(b) => json!({ "booleanValue": b }),
            // The remote store encodes 64-bit integers as decimal strings.
            FieldValue::Int(i) => json!({ "integerValue": i.to_string() }),
            FieldValue::Double(f) => json!({ "doubleValue": f }),
            FieldValue::Str(s) => json!({ "stringValue": s }),
        };
        out.insert(name.clone(), wrapped);
    }
    json!({ "fields": out })
}

/// Decode the `fields` object of a wire document.
///
/// Recognizes exactly the five scalar envelopes; any other tag
/// (`timestampValue`, `mapValue`, ...) is an error rather than a silently
/// dropped field.
pub fn decode_fields(wire: &Map<String, Value>) -> Result<Fields, StoreError> {
    let mut fields = Fields::new();
    for (name, envelope) in wire {
        let obj = envelope
            .as_object()
            .ok_or_else(|| StoreError::InvalidResponse(format!("field {name} is not an envelope")))?;
        let (tag, raw) = obj.iter().next().ok_or_else(|| {
            StoreError::InvalidResponse(format!("field {name} has an empty envelope"))
        })?;

        let value = match tag.as_str() {
            "nullValue" => FieldValue::Null,
            "booleanValue" => FieldValue::Bool(raw.as_bool().ok_or_else(|| {
                StoreError::InvalidResponse(format!("field {name}: booleanValue is not a bool"))
            })?),
            "integerValue" => {
                // Decimal string or bare number, depending on the server.
                let parsed = match raw {
                    Value::String(s) => s.parse::<i64>().ok(),
                    Value::Number(n) => n.as_i64(),
                    _ => None,
                };
                FieldValue::Int(parsed.ok_or_else(|| {
                    StoreError::InvalidResponse(format!("field {name}: bad integerValue"))
                })?)
            }
            "doubleValue" => FieldValue::Double(raw.as_f64().ok_or_else(|| {
                StoreError::InvalidResponse(format!("field {name}: doubleValue is not a number"))
            })?),
            "stringValue" => FieldValue::Str(
                raw.as_str()
                    .ok_or_else(|| {
                        StoreError::InvalidResponse(format!(
                            "field {name}: stringValue is not a string"
                        ))
                    })?
                    .to_string(),
            ),
            other => {
                return Err(StoreError::UnsupportedWireType {
                    field: name.clone(),
                    tag: other.to_string(),
                })
            }
        };
        fields.insert(name.clone(), value);
    }
    Ok(fields)
}

/// Convert a field map to a plain JSON object (embedded-store encoding
/// and model deserialization).
pub fn fields_to_json_map(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Convert a plain JSON object into a field map, rejecting non-scalars.
pub fn fields_from_json_map(map: &Map<String, Value>) -> Result<Fields, StoreError> {
    let mut fields = Fields::new();
    for (k, v) in map {
        fields.insert(k.clone(), FieldValue::from_json(k, v)?);
    }
    Ok(fields)
}
