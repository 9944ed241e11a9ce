//! XML conversion.
//!
//! The root element's element children are the observations. Each
//! observation's child tag names become the labels and their text content the
//! feature vector:
//!
//! ```xml
//! <dataset>
//!   <observation><a>1</a><b>2</b></observation>
//!   <observation><a>3</a><b>4</b></observation>
//! </dataset>
//! ```
//!
//! An observation element with no element children falls back to its
//! attributes (attribute names become labels).

use roxmltree::Node;

use crate::error::{ConversionError, ConversionResult};
use crate::types::{UploadSource, Value};

use super::Converted;

/// Convert an XML source into feature vectors.
pub fn convert_xml(source: &UploadSource) -> ConversionResult<Converted> {
    let text = source.read_text()?;
    if text.trim().is_empty() {
        return Err(ConversionError::EmptySource);
    }

    let doc = roxmltree::Document::parse(&text)?;
    let root = doc.root_element();
    let observations: Vec<Node> = root.children().filter(|n| n.is_element()).collect();
    if observations.is_empty() {
        return Err(ConversionError::EmptySource);
    }

    let labels = field_names(&observations[0]);
    let count_features = labels.len();
    if count_features == 0 {
        return Err(ConversionError::BadStructure {
            message: format!(
                "observation 1 <{}> has no child elements or attributes",
                observations[0].tag_name().name()
            ),
        });
    }

    let mut records: Vec<Vec<Value>> = Vec::with_capacity(observations.len());
    for (idx0, obs) in observations.iter().enumerate() {
        let row_num = idx0 + 1;
        let fields = field_values(obs);

        if fields.len() != count_features {
            return Err(ConversionError::ShapeMismatch {
                row: row_num,
                expected: count_features,
                found: fields.len(),
            });
        }

        let mut row: Vec<Value> = Vec::with_capacity(count_features);
        for (label, (name, raw)) in labels.iter().zip(fields.iter()) {
            if name != label {
                return Err(ConversionError::BadStructure {
                    message: format!("row {row_num} has tag '{name}', expected '{label}'"),
                });
            }
            row.push(Value::infer(raw));
        }
        records.push(row);
    }

    Ok(Converted {
        records,
        count_features,
        labels,
    })
}

fn field_names(obs: &Node) -> Vec<String> {
    let from_children: Vec<String> = obs
        .children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name().to_owned())
        .collect();
    if !from_children.is_empty() {
        return from_children;
    }
    obs.attributes().map(|a| a.name().to_owned()).collect()
}

fn field_values(obs: &Node) -> Vec<(String, String)> {
    let from_children: Vec<(String, String)> = obs
        .children()
        .filter(|n| n.is_element())
        .map(|n| {
            (
                n.tag_name().name().to_owned(),
                n.text().unwrap_or_default().to_owned(),
            )
        })
        .collect();
    if !from_children.is_empty() {
        return from_children;
    }
    obs.attributes()
        .map(|a| (a.name().to_owned(), a.value().to_owned()))
        .collect()
}
