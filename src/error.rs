use thiserror::Error;

/// Convenience result type for format conversion.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Error raised while converting one raw source into feature vectors.
///
/// A conversion error is fatal for the whole batch: the orchestrator discards
/// any partially built dataset list when one source fails.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Underlying I/O error (e.g. upload temp file missing, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parse error.
    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The source contained no observations at all.
    #[error("source is empty")]
    EmptySource,

    /// An observation does not match the feature count of the first one.
    #[error("row {row} has {found} values, expected {expected}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The source parsed, but its shape cannot be flattened into uniform
    /// feature vectors (non-object JSON rows, mismatched keys/tags, nesting).
    #[error("bad structure: {message}")]
    BadStructure { message: String },
}

/// A single recorded pipeline error, tagged by the stage family it came from.
///
/// Validation and persistence errors are collected and never abort later
/// independent stages; conversion errors additionally abort the conversion
/// stage (see [`crate::pipeline::DataPipeline::dataset_to_dict`]).
#[derive(Debug, Error)]
pub enum StageError {
    /// Bad file extension, malformed payload field, non-positive session id.
    #[error("validation error: {0}")]
    Validation(String),

    /// A source could not be converted into feature vectors.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// A persistence-gateway save reported failure.
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Ordered, append-only error accumulator scoped to one pipeline run.
///
/// Owned by the orchestrator and exposed read-only afterward; it is never
/// reset mid-run.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<StageError>,
}

impl ErrorLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one error. Entries keep insertion order.
    pub fn push(&mut self, error: StageError) {
        self.entries.push(error);
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded errors, in insertion order.
    pub fn as_slice(&self) -> &[StageError] {
        &self.entries
    }

    /// Iterate recorded errors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StageError> {
        self.entries.iter()
    }
}
