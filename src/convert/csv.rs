//! CSV conversion.
//!
//! The first row is the label sequence; each subsequent row is one feature
//! vector. `count_features` is the header length.

use crate::error::{ConversionError, ConversionResult};
use crate::types::{UploadSource, Value};

use super::Converted;

/// Convert a CSV source into feature vectors.
///
/// Rules:
///
/// - The header row defines labels and the expected vector length.
/// - Rows whose width differs from the header raise
///   [`ConversionError::ShapeMismatch`].
/// - A blank source, an empty header, or a header with no observation rows
///   raises [`ConversionError::EmptySource`].
pub fn convert_csv(source: &UploadSource) -> ConversionResult<Converted> {
    let text = source.read_text()?;
    if text.trim().is_empty() {
        return Err(ConversionError::EmptySource);
    }

    // flexible() so ragged rows reach the explicit shape check below instead
    // of surfacing as an opaque csv::Error.
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let labels: Vec<String> = headers.iter().map(str::to_owned).collect();
    let count_features = labels.len();
    if count_features == 0 {
        return Err(ConversionError::EmptySource);
    }

    let mut records: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based row number for users; +1 again because the header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        if record.len() != count_features {
            return Err(ConversionError::ShapeMismatch {
                row: user_row,
                expected: count_features,
                found: record.len(),
            });
        }
        records.push(record.iter().map(Value::infer).collect());
    }

    if records.is_empty() {
        return Err(ConversionError::EmptySource);
    }

    Ok(Converted {
        records,
        count_features,
        labels,
    })
}
