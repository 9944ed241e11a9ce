use premodel_ingestion::convert::json::convert_json;
use premodel_ingestion::error::ConversionError;
use premodel_ingestion::types::{UploadSource, Value};

fn inline(text: &str) -> UploadSource {
    UploadSource::Inline(text.to_string())
}

#[test]
fn convert_json_array_labels_follow_key_order() {
    let input = r#"[
        {"bedrooms": 2, "bathrooms": 1.0, "city": "Reno"},
        {"bedrooms": 3, "bathrooms": 2.5, "city": "Tahoe"}
    ]"#;
    let out = convert_json(&inline(input)).unwrap();

    assert_eq!(out.labels, vec!["bedrooms", "bathrooms", "city"]);
    assert_eq!(out.count_features, 3);
    assert_eq!(out.records.len(), 2);
    assert_eq!(
        out.records[0],
        vec![
            Value::Int64(2),
            Value::Float64(1.0),
            Value::Utf8("Reno".to_string()),
        ]
    );
}

#[test]
fn convert_json_single_object_is_one_observation() {
    let out = convert_json(&inline(r#"{"x": 1, "y": 2}"#)).unwrap();
    assert_eq!(out.labels, vec!["x", "y"]);
    assert_eq!(out.records, vec![vec![Value::Int64(1), Value::Int64(2)]]);
}

#[test]
fn convert_json_from_file_preserves_key_order() {
    let out = convert_json(&UploadSource::File("tests/fixtures/dataset.json".into())).unwrap();
    assert_eq!(out.labels, vec!["bedrooms", "bathrooms", "city"]);
    assert_eq!(out.records.len(), 2);
}

#[test]
fn convert_json_null_and_bool_cells() {
    let out = convert_json(&inline(r#"[{"a": null, "b": true}]"#)).unwrap();
    assert_eq!(out.records[0], vec![Value::Null, Value::Bool(true)]);
}

#[test]
fn convert_json_errors_on_malformed_input() {
    let err = convert_json(&UploadSource::File("tests/fixtures/truncated.json".into())).unwrap_err();
    assert!(matches!(err, ConversionError::Json(_)));
}

#[test]
fn convert_json_errors_on_non_object_row() {
    let err = convert_json(&inline(r#"[{"a": 1}, 7]"#)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("bad structure"));
    assert!(msg.contains("row 2 is not a json object"));
}

#[test]
fn convert_json_errors_on_scalar_input() {
    let err = convert_json(&inline("42")).unwrap_err();
    assert!(err.to_string().contains("object or an array of objects"));
}

#[test]
fn convert_json_errors_on_mismatched_keys() {
    let err = convert_json(&inline(r#"[{"a": 1, "b": 2}, {"a": 3, "c": 4}]"#)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("row 2 missing key 'b'"));
}

#[test]
fn convert_json_errors_on_extra_key() {
    let err = convert_json(&inline(r#"[{"a": 1}, {"a": 2, "b": 3}]"#)).unwrap_err();
    assert!(matches!(
        err,
        ConversionError::ShapeMismatch {
            row: 2,
            expected: 1,
            found: 2,
        }
    ));
}

#[test]
fn convert_json_errors_on_nested_value() {
    let err = convert_json(&inline(r#"[{"a": {"nested": 1}}]"#)).unwrap_err();
    assert!(err.to_string().contains("is nested, expected a scalar"));
}

#[test]
fn convert_json_errors_on_empty_inputs() {
    for input in ["", "   ", "[]", "{}"] {
        let err = convert_json(&inline(input)).unwrap_err();
        assert!(
            matches!(err, ConversionError::EmptySource),
            "input {input:?} should be EmptySource, got {err:?}"
        );
    }
}

#[test]
fn convert_json_is_idempotent_per_source() {
    let source = UploadSource::File("tests/fixtures/dataset.json".into());
    let first = convert_json(&source).unwrap();
    let second = convert_json(&source).unwrap();
    assert_eq!(first, second);
}
