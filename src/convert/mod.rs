//! Format converters: one raw source in, uniform feature vectors out.
//!
//! Each converter parses a [`crate::types::UploadDescriptor`]'s source into a
//! [`Converted`] bundle of feature vectors, a feature count, and the inferred
//! feature labels. Dispatch happens in [`convert`] based on the declared
//! [`crate::types::SourceFormat`].
//!
//! Format-specific implementations live under:
//! - [`csv`]
//! - [`json`]
//! - [`xml`]
//!
//! Converters never touch pipeline state; failure is reported as a
//! [`crate::error::ConversionError`] and the orchestrator decides what the
//! batch-level consequence is.

pub mod csv;
pub mod json;
pub mod xml;

use crate::error::ConversionResult;
use crate::types::{SourceFormat, UploadDescriptor, Value};

/// Output of converting one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    /// Feature vectors, one per observation, in source order.
    pub records: Vec<Vec<Value>>,
    /// Number of features per vector.
    pub count_features: usize,
    /// Feature labels in source order (headers, keys, or tags).
    pub labels: Vec<String>,
}

/// Convert one source according to its declared format.
///
/// The source is re-read from its start on every call, so converting the
/// same descriptor twice yields identical results.
pub fn convert(descriptor: &UploadDescriptor) -> ConversionResult<Converted> {
    match descriptor.format {
        SourceFormat::Csv => csv::convert_csv(&descriptor.source),
        SourceFormat::Json => json::convert_json(&descriptor.source),
        SourceFormat::Xml => xml::convert_xml(&descriptor.source),
    }
}
