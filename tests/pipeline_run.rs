use std::cell::{Cell, RefCell};

use premodel_ingestion::error::StageError;
use premodel_ingestion::gateway::{
    EntitySaveResult, FeatureCountRow, FeatureRow, FeatureSaveResult, LabelRow, LabelSaveResult,
    PersistenceGateway,
};
use premodel_ingestion::pipeline::DataPipeline;
use premodel_ingestion::types::{
    EntityDraft, RequestContext, RequestPayload, SessionType, Value,
};

/// In-memory gateway that records every save and can be told to fail.
struct MemoryGateway {
    next_id: Cell<i64>,
    fail_entity: Cell<bool>,
    fail_feature_calls: RefCell<Vec<usize>>,
    feature_calls: Cell<usize>,
    entities: RefCell<Vec<(EntityDraft, SessionType)>>,
    counts: RefCell<Vec<FeatureCountRow>>,
    features: RefCell<Vec<FeatureRow>>,
    labels: RefCell<Vec<LabelRow>>,
}

impl MemoryGateway {
    fn new() -> Self {
        Self {
            next_id: Cell::new(100),
            fail_entity: Cell::new(false),
            fail_feature_calls: RefCell::new(Vec::new()),
            feature_calls: Cell::new(0),
            entities: RefCell::new(Vec::new()),
            counts: RefCell::new(Vec::new()),
            features: RefCell::new(Vec::new()),
            labels: RefCell::new(Vec::new()),
        }
    }
}

impl PersistenceGateway for MemoryGateway {
    fn save_entity(&self, draft: &EntityDraft, session_type: SessionType) -> EntitySaveResult {
        if self.fail_entity.get() {
            return EntitySaveResult {
                status: false,
                id: None,
                error: Some("db unavailable".to_string()),
            };
        }
        self.entities.borrow_mut().push((draft.clone(), session_type));
        match draft.id_entity {
            // Create: mint a fresh id.
            None => {
                let id = self.next_id.get() + 1;
                self.next_id.set(id);
                EntitySaveResult {
                    status: true,
                    id: Some(id),
                    error: None,
                }
            }
            // Update: touch metadata, no new id.
            Some(_) => EntitySaveResult {
                status: true,
                id: None,
                error: None,
            },
        }
    }

    fn save_feature_count(&self, row: &FeatureCountRow) -> FeatureSaveResult {
        self.counts.borrow_mut().push(*row);
        FeatureSaveResult::default()
    }

    fn save_feature(&self, row: &FeatureRow) -> FeatureSaveResult {
        let call = self.feature_calls.get();
        self.feature_calls.set(call + 1);
        if self.fail_feature_calls.borrow().contains(&call) {
            return FeatureSaveResult {
                error: Some(format!("insert failed for vector {call}")),
            };
        }
        self.features.borrow_mut().push(row.clone());
        FeatureSaveResult::default()
    }

    fn save_observation_label(&self, row: &LabelRow, _session_type: SessionType) -> LabelSaveResult {
        self.labels.borrow_mut().push(row.clone());
        LabelSaveResult {
            status: true,
            error: None,
        }
    }
}

fn payload(value: serde_json::Value) -> RequestPayload {
    serde_json::from_value(value).unwrap()
}

fn create_ctx() -> RequestContext {
    RequestContext {
        uid: 1,
        session_type: SessionType::DataNew,
    }
}

fn programmatic_payload() -> RequestPayload {
    payload(serde_json::json!({
        "data": {
            "settings": { "session_name": "rent estimate", "model_type": "svm" },
            "dataset": { "json_string": [
                { "bedrooms": 2, "sqft": 1100.0 },
                { "bedrooms": 3, "sqft": 1650.0 }
            ] }
        }
    }))
}

#[test]
fn create_run_persists_entity_count_vectors_and_labels() {
    let gateway = MemoryGateway::new();
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    let report = pipeline.run(&programmatic_payload());

    assert!(report.status);
    assert_eq!(report.id_entity, Some(101));
    assert!(pipeline.get_errors().is_none());
    assert!(!pipeline.is_blocked());

    let entities = gateway.entities.borrow();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].0.title.as_deref(), Some("rent estimate"));
    assert_eq!(entities[0].0.uid, 1);
    assert_eq!(entities[0].0.id_entity, None);
    assert_eq!(entities[0].0.model_type.as_deref(), Some("svm"));
    assert_eq!(entities[0].1, SessionType::DataNew);

    assert_eq!(
        *gateway.counts.borrow(),
        vec![FeatureCountRow {
            id_entity: 101,
            count_features: 2,
        }]
    );

    let features = gateway.features.borrow();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].id_entity, 101);
    assert_eq!(
        features[0].premodel_dataset,
        vec![Value::Int64(2), Value::Float64(1100.0)]
    );

    let labels = gateway.labels.borrow();
    let names: Vec<&str> = labels.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(names, vec!["bedrooms", "sqft"]);
    assert!(labels.iter().all(|l| l.id_entity == 101));
}

#[test]
fn multi_file_upload_converts_every_source_in_order() {
    let gateway = MemoryGateway::new();
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": { "session_name": "two sources" },
            "dataset": { "file_upload": [
                { "type": "csv", "file": "tests/fixtures/dataset.csv" },
                { "type": "xml", "file": "tests/fixtures/dataset.xml" }
            ] }
        }
    })));

    assert!(report.status);
    assert_eq!(pipeline.dataset().len(), 2);
    assert_eq!(pipeline.observation_labels().len(), 2);
    assert_eq!(pipeline.observation_labels()[0], vec!["a", "b", "c"]);

    // First record's feature count is authoritative for the batch.
    assert_eq!(gateway.counts.borrow()[0].count_features, 3);
    // 2 vectors from each source.
    assert_eq!(gateway.features.borrow().len(), 4);
    // 3 labels per source.
    assert_eq!(gateway.labels.borrow().len(), 6);
}

#[test]
fn malformed_second_file_discards_the_whole_batch() {
    let gateway = MemoryGateway::new();
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": {},
            "dataset": { "file_upload": [
                { "type": "csv", "file": "tests/fixtures/dataset.csv" },
                { "type": "csv", "file": "tests/fixtures/ragged.csv" },
                { "type": "xml", "file": "tests/fixtures/dataset.xml" }
            ] }
        }
    })));

    assert!(!report.status);
    // The entity was already resolved, but conversion emptied the batch.
    assert_eq!(report.id_entity, Some(101));
    assert!(pipeline.dataset().is_empty());
    assert!(pipeline.observation_labels().is_empty());

    let errors = pipeline.get_errors().expect("conversion error recorded");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], StageError::Conversion(_)));

    // Nothing downstream of conversion ran.
    assert!(gateway.counts.borrow().is_empty());
    assert!(gateway.features.borrow().is_empty());
    assert!(gateway.labels.borrow().is_empty());
}

#[test]
fn dataset_to_dict_returns_false_on_conversion_error() {
    let gateway = MemoryGateway::new();
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    pipeline.validate_file_extension(&payload(serde_json::json!({
        "data": {
            "settings": {},
            "dataset": { "file_upload": [
                { "type": "csv", "file": "tests/fixtures/ragged.csv" }
            ] }
        }
    })));

    assert!(!pipeline.dataset_to_dict(55));
    assert!(pipeline.get_errors().is_some());
}

#[test]
fn invalid_extension_blocks_flag_but_valid_files_still_flow() {
    let gateway = MemoryGateway::new();
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": {},
            "dataset": { "file_upload": [
                { "type": "csv", "file": "tests/fixtures/dataset.csv" },
                { "type": "pdf", "file": "tests/fixtures/report.pdf" }
            ] }
        }
    })));

    // The validation error is recorded, so the run is not clean.
    assert!(!report.status);
    assert!(pipeline.is_blocked());

    let errors = pipeline.get_errors().unwrap();
    assert!(matches!(errors[0], StageError::Validation(_)));

    // The surviving csv was still converted and persisted.
    assert_eq!(pipeline.dataset().len(), 1);
    assert_eq!(gateway.features.borrow().len(), 2);
}

#[test]
fn append_run_updates_existing_entity_without_minting_an_id() {
    let gateway = MemoryGateway::new();
    let ctx = RequestContext {
        uid: 9,
        session_type: SessionType::DataAppend,
    };
    let mut pipeline = DataPipeline::new(&gateway, ctx);

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": { "session_name": "more rows", "session_id": 7 },
            "dataset": { "json_string": [{ "x": 1, "y": 2 }] }
        }
    })));

    assert!(report.status);
    assert_eq!(report.id_entity, Some(7));

    let entities = gateway.entities.borrow();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].0.id_entity, Some(7));
    assert_eq!(entities[0].1, SessionType::DataAppend);

    assert!(gateway.features.borrow().iter().all(|f| f.id_entity == 7));
    assert!(gateway.labels.borrow().iter().all(|l| l.id_entity == 7));
}

#[test]
fn failed_append_conversion_leaves_the_entity_untouched() {
    let gateway = MemoryGateway::new();
    let ctx = RequestContext {
        uid: 9,
        session_type: SessionType::DataAppend,
    };
    let mut pipeline = DataPipeline::new(&gateway, ctx);

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": { "session_id": 7 },
            "dataset": { "file_upload": [
                { "type": "csv", "file": "tests/fixtures/ragged.csv" }
            ] }
        }
    })));

    assert!(!report.status);
    assert_eq!(report.id_entity, Some(7));

    // The entity's modification metadata is only touched once conversion has
    // produced something to append, so a discarded batch means no save at all.
    assert!(gateway.entities.borrow().is_empty());
    assert!(gateway.counts.borrow().is_empty());
    assert!(gateway.features.borrow().is_empty());
    assert!(gateway.labels.borrow().is_empty());

    let errors = pipeline.get_errors().expect("conversion error recorded");
    assert!(matches!(errors[0], StageError::Conversion(_)));
}

#[test]
fn append_run_rejects_non_positive_session_id() {
    let gateway = MemoryGateway::new();
    let ctx = RequestContext {
        uid: 9,
        session_type: SessionType::DataAppend,
    };
    let mut pipeline = DataPipeline::new(&gateway, ctx);

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": { "session_id": "abc" },
            "dataset": { "json_string": [{ "x": 1 }] }
        }
    })));

    assert!(!report.status);
    assert_eq!(report.id_entity, None);
    assert!(gateway.entities.borrow().is_empty());

    let errors = pipeline.get_errors().unwrap();
    assert!(errors[0].to_string().contains("not an integer"));
}

#[test]
fn append_run_requires_a_session_id() {
    let gateway = MemoryGateway::new();
    let ctx = RequestContext {
        uid: 9,
        session_type: SessionType::DataAppend,
    };
    let mut pipeline = DataPipeline::new(&gateway, ctx);

    let report = pipeline.run(&payload(serde_json::json!({
        "data": {
            "settings": {},
            "dataset": { "json_string": [{ "x": 1 }] }
        }
    })));

    assert!(!report.status);
    assert!(pipeline.get_errors().unwrap()[0]
        .to_string()
        .contains("'session_id' missing"));
}

#[test]
fn entity_save_failure_stops_the_run_before_conversion() {
    let gateway = MemoryGateway::new();
    gateway.fail_entity.set(true);
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    let report = pipeline.run(&programmatic_payload());

    assert!(!report.status);
    assert_eq!(report.id_entity, None);
    assert!(pipeline.dataset().is_empty());
    assert!(gateway.features.borrow().is_empty());

    let errors = pipeline.get_errors().unwrap();
    assert!(matches!(errors[0], StageError::Persistence(_)));
    assert!(errors[0].to_string().contains("db unavailable"));
}

#[test]
fn failing_vector_save_does_not_stop_remaining_vectors() {
    let gateway = MemoryGateway::new();
    gateway.fail_feature_calls.borrow_mut().push(0);
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    let report = pipeline.run(&programmatic_payload());

    // One vector failed, so the run is not clean, but the second vector and
    // the labels were still attempted.
    assert!(!report.status);
    assert_eq!(gateway.feature_calls.get(), 2);
    assert_eq!(gateway.features.borrow().len(), 1);
    assert_eq!(gateway.labels.borrow().len(), 2);

    let errors = pipeline.get_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("insert failed for vector 0"));
}

#[test]
fn validate_session_id_appends_through_the_pipeline() {
    let gateway = MemoryGateway::new();
    let mut pipeline = DataPipeline::new(&gateway, create_ctx());

    pipeline.validate_session_id(&serde_json::json!(-1));
    pipeline.validate_session_id(&serde_json::json!(0));
    pipeline.validate_session_id(&serde_json::json!("abc"));
    pipeline.validate_session_id(&serde_json::json!(5));

    assert_eq!(pipeline.get_errors().unwrap().len(), 3);
}
