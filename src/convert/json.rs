//! JSON conversion.
//!
//! Supported inputs:
//! - A JSON array of uniformly-keyed objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object: `{"a":1}` (one observation)
//!
//! Keys of the first object become the labels, in encountered order
//! (serde_json is built with `preserve_order`); every later object must carry
//! exactly the same keys.

use serde_json::Map;

use crate::error::{ConversionError, ConversionResult};
use crate::types::{UploadSource, Value};

use super::Converted;

/// Convert a JSON source into feature vectors.
pub fn convert_json(source: &UploadSource) -> ConversionResult<Converted> {
    let text = source.read_text()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConversionError::EmptySource);
    }

    let parsed: serde_json::Value = serde_json::from_str(trimmed)?;
    let objects: Vec<&Map<String, serde_json::Value>> = match &parsed {
        serde_json::Value::Array(items) => {
            let mut objects = Vec::with_capacity(items.len());
            for (idx0, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(obj) => objects.push(obj),
                    None => {
                        return Err(ConversionError::BadStructure {
                            message: format!("row {} is not a json object", idx0 + 1),
                        });
                    }
                }
            }
            objects
        }
        serde_json::Value::Object(obj) => vec![obj],
        _ => {
            return Err(ConversionError::BadStructure {
                message: "json must be an object or an array of objects".to_string(),
            });
        }
    };

    if objects.is_empty() {
        return Err(ConversionError::EmptySource);
    }

    let labels: Vec<String> = objects[0].keys().cloned().collect();
    let count_features = labels.len();
    if count_features == 0 {
        return Err(ConversionError::EmptySource);
    }

    let mut records: Vec<Vec<Value>> = Vec::with_capacity(objects.len());
    for (idx0, obj) in objects.iter().enumerate() {
        let row_num = idx0 + 1;
        if obj.len() != count_features {
            return Err(ConversionError::ShapeMismatch {
                row: row_num,
                expected: count_features,
                found: obj.len(),
            });
        }

        let mut row: Vec<Value> = Vec::with_capacity(count_features);
        for label in &labels {
            let jv = obj.get(label).ok_or_else(|| ConversionError::BadStructure {
                message: format!("row {row_num} missing key '{label}'"),
            })?;
            row.push(scalar_value(row_num, label, jv)?);
        }
        records.push(row);
    }

    Ok(Converted {
        records,
        count_features,
        labels,
    })
}

fn scalar_value(row: usize, label: &str, v: &serde_json::Value) -> ConversionResult<Value> {
    match v {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float64(f))
            } else {
                Err(ConversionError::BadStructure {
                    message: format!("row {row} key '{label}': number out of range"),
                })
            }
        }
        serde_json::Value::String(s) => Ok(Value::Utf8(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(ConversionError::BadStructure {
                message: format!("row {row} key '{label}' is nested, expected a scalar"),
            })
        }
    }
}
