//! Core data model types for dataset ingestion.
//!
//! Uploaded sources are normalized into [`DatasetRecord`]s whose cells are
//! loosely-typed [`Value`]s, plus a positionally aligned [`LabelSet`]. The
//! inbound HTTP payload is deserialized once at the boundary into
//! [`RequestPayload`] rather than being re-validated field by field.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Deserialize;

/// Identifier of a persisted entity row.
pub type EntityId = i64;

/// Identifier of the logged-in user.
pub type UserId = i64;

/// A single cell value in a converted feature vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Infer the tightest value type for a raw text cell.
    ///
    /// Empty (after trimming) maps to [`Value::Null`]; then integer, float,
    /// and bool parses are attempted in that order, falling back to text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int64(n);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Float64(n);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Utf8(trimmed.to_owned()),
        }
    }
}

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-separated values; first row is the label sequence.
    Csv,
    /// JSON object or array of uniformly-keyed objects; keys become labels.
    Json,
    /// XML; observation child tags become labels.
    Xml,
}

impl SourceFormat {
    /// Parse a source format from a declared file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// One raw source to convert.
///
/// `read_text` performs a fresh, full read on every call, so a converter
/// always starts from the beginning of the source. Re-converting the same
/// source therefore yields identical results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A file written by the upload handler.
    File(PathBuf),
    /// An inline string (programmatic submissions).
    Inline(String),
}

impl UploadSource {
    /// Read the entire source as text.
    pub fn read_text(&self) -> io::Result<String> {
        match self {
            Self::File(path) => fs::read_to_string(path),
            Self::Inline(text) => Ok(text.clone()),
        }
    }
}

/// One validated upload: a declared format plus its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    /// Declared source format.
    pub format: SourceFormat,
    /// Raw source content.
    pub source: UploadSource,
}

/// The canonical upload shape produced by extension validation.
///
/// For the programmatic path this holds exactly one inline-JSON descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalUpload {
    /// Validated descriptors, in submission order.
    pub descriptors: Vec<UploadDescriptor>,
}

impl CanonicalUpload {
    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// `true` when no descriptor survived validation.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// One converted source, ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Entity the record belongs to.
    pub id_entity: EntityId,
    /// Feature vectors, one per observation.
    pub premodel_dataset: Vec<Vec<Value>>,
    /// Number of features per vector.
    ///
    /// Assumed invariant across all vectors of the record; the first record's
    /// count is treated as authoritative for the whole batch when the feature
    /// count row is saved.
    pub count_features: usize,
}

/// Ordered label sequences, one per converted source, positionally aligned
/// with the dataset list.
pub type LabelSet = Vec<Vec<String>>;

/// Entity row draft handed to the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDraft {
    /// Optional session title.
    pub title: Option<String>,
    /// Logged-in user id.
    pub uid: UserId,
    /// `None` when a new entity id should be minted; `Some` when updating an
    /// existing entity.
    pub id_entity: Option<EntityId>,
    /// Model family requested for later training; stored with the entity,
    /// not interpreted here.
    pub model_type: Option<String>,
}

/// Distinguishes a "create new entity" run from an "append to existing
/// entity" run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    /// Create a new entity.
    DataNew,
    /// Append to (and touch) an existing entity.
    DataAppend,
}

impl SessionType {
    /// Wire tag used by the persistence gateway.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataNew => "data_new",
            Self::DataAppend => "data_append",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request context supplied by the caller.
///
/// The pipeline never reads ambient session state; the HTTP layer resolves
/// the user id and session type up front and passes them in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Logged-in user id.
    pub uid: UserId,
    /// Create-new vs. append-existing flow.
    pub session_type: SessionType,
}

/// Inbound request payload, deserialized once at the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestPayload {
    /// Settings and dataset.
    pub data: RequestData,
    /// Error carried in by an upstream layer; forwarded, never interpreted.
    #[serde(default)]
    pub error: Option<String>,
}

/// The `data` field of a request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestData {
    /// Session settings.
    pub settings: SessionSettings,
    /// The dataset, in exactly one of the two submission shapes.
    pub dataset: DatasetField,
}

/// Session settings supplied with a submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    /// Title for the persisted entity.
    #[serde(default)]
    pub session_name: Option<String>,
    /// Existing entity id for append runs; integer or numeric string.
    #[serde(default)]
    pub session_id: Option<serde_json::Value>,
    /// Model family requested for later training; carried into the
    /// [`EntityDraft`].
    #[serde(default)]
    pub model_type: Option<String>,
}

/// The two mutually exclusive dataset submission shapes.
///
/// Which variant is present selects the validation path: `file_upload` is
/// the interactive path (extension-checked), `json_string` the programmatic
/// path (passed through unchanged).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetField {
    /// Interactive multi-file upload.
    FileUpload(Vec<RawUpload>),
    /// Inline JSON dataset from a programmatic caller.
    JsonString(serde_json::Value),
}

/// One file entry of an interactive upload, as received from the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUpload {
    /// Declared file type (extension without the dot).
    #[serde(rename = "type")]
    pub kind: String,
    /// Path of the temp file the upload handler wrote.
    pub file: PathBuf,
}
