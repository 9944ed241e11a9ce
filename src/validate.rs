//! Boundary validation: file extensions and session ids.
//!
//! Exactly one of the two payload shapes is handled per run, selected by
//! which [`DatasetField`] variant the payload carries.

use crate::error::StageError;
use crate::types::{
    CanonicalUpload, DatasetField, RequestPayload, SourceFormat, UploadDescriptor, UploadSource,
};

/// Validate declared file types and restructure the payload into a
/// [`CanonicalUpload`].
///
/// Interactive path (`file_upload`): each file's declared type is checked
/// against the csv/json/xml allow-set. Files with an unsupported type are
/// excluded and reported in a single validation error; the remaining valid
/// files are still restructured into the canonical shape.
///
/// Programmatic path (`json_string`): no type check. The inline JSON becomes
/// a single descriptor, and an error already present on the payload is
/// forwarded unchanged.
pub fn validate_file_extension(
    payload: &RequestPayload,
) -> (CanonicalUpload, Option<StageError>) {
    match &payload.data.dataset {
        DatasetField::FileUpload(files) => {
            let mut descriptors = Vec::with_capacity(files.len());
            let mut rejected: Vec<String> = Vec::new();

            for raw in files {
                match SourceFormat::from_extension(&raw.kind) {
                    Some(format) => descriptors.push(UploadDescriptor {
                        format,
                        source: UploadSource::File(raw.file.clone()),
                    }),
                    None => rejected.push(raw.kind.clone()),
                }
            }

            let error = if rejected.is_empty() {
                None
            } else {
                Some(StageError::Validation(format!(
                    "unsupported file extension(s): {}",
                    rejected.join(", ")
                )))
            };
            (CanonicalUpload { descriptors }, error)
        }
        DatasetField::JsonString(value) => {
            let upload = CanonicalUpload {
                descriptors: vec![UploadDescriptor {
                    format: SourceFormat::Json,
                    source: UploadSource::Inline(value.to_string()),
                }],
            };
            (upload, payload.error.clone().map(StageError::Validation))
        }
    }
}

/// Check that a raw session id is a positive integer.
///
/// Accepts an integer or a numeric string (the id may arrive as either from
/// form-encoded requests). Returns `None` when the id is valid.
pub fn validate_session_id(raw: &serde_json::Value) -> Option<StageError> {
    match parse_session_id(raw) {
        Ok(id) if id > 0 => None,
        Ok(id) => Some(StageError::Validation(format!(
            "'session_id' {id} not a positive integer"
        ))),
        Err(message) => Some(StageError::Validation(message)),
    }
}

/// The session id as a positive integer, when it is one.
pub fn session_id_value(raw: &serde_json::Value) -> Option<i64> {
    parse_session_id(raw).ok().filter(|id| *id > 0)
}

fn parse_session_id(raw: &serde_json::Value) -> Result<i64, String> {
    match raw {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| format!("'session_id' {n} is not an integer")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'session_id' '{s}' is not an integer")),
        other => Err(format!("'session_id' {other} is not an integer")),
    }
}
