//! `premodel-ingestion` is the dataset-ingestion layer of a predictive-modeling
//! service: it normalizes a user-supplied dataset (uploaded CSV/JSON/XML files
//! or an inline JSON payload) into uniform tabular records, infers the feature
//! count and feature labels, and sequences the persistence of the resulting
//! entity, feature, and observation-label rows.
//!
//! The primary entrypoint is [`pipeline::DataPipeline`], which drives one
//! submission end to end against a caller-supplied
//! [`gateway::PersistenceGateway`].
//!
//! ## What you can ingest
//!
//! **Interactive uploads** (`file_upload` payloads), one file per source:
//!
//! - **CSV**: first row is the label sequence, later rows are feature vectors
//! - **JSON**: an object or array of uniformly-keyed objects; keys become
//!   labels, in encountered order
//! - **XML**: observation child tags become labels
//!
//! **Programmatic submissions** (`json_string` payloads) wrap one inline JSON
//! dataset and skip the extension check entirely.
//!
//! Across formats, empty cells map to [`types::Value::Null`]; other cells are
//! inferred as the tightest of int/float/bool/text.
//!
//! ## Quick example: run a submission
//!
//! ```rust
//! use premodel_ingestion::gateway::{
//!     EntitySaveResult, FeatureCountRow, FeatureRow, FeatureSaveResult, LabelRow,
//!     LabelSaveResult, PersistenceGateway,
//! };
//! use premodel_ingestion::pipeline::DataPipeline;
//! use premodel_ingestion::types::{EntityDraft, RequestContext, RequestPayload, SessionType};
//!
//! // A gateway that accepts everything; real applications write SQL here.
//! struct NullGateway;
//!
//! impl PersistenceGateway for NullGateway {
//!     fn save_entity(&self, _draft: &EntityDraft, _st: SessionType) -> EntitySaveResult {
//!         EntitySaveResult { status: true, id: Some(1), error: None }
//!     }
//!     fn save_feature_count(&self, _row: &FeatureCountRow) -> FeatureSaveResult {
//!         FeatureSaveResult::default()
//!     }
//!     fn save_feature(&self, _row: &FeatureRow) -> FeatureSaveResult {
//!         FeatureSaveResult::default()
//!     }
//!     fn save_observation_label(&self, _row: &LabelRow, _st: SessionType) -> LabelSaveResult {
//!         LabelSaveResult { status: true, error: None }
//!     }
//! }
//!
//! let payload: RequestPayload = serde_json::from_value(serde_json::json!({
//!     "data": {
//!         "settings": { "session_name": "sample estimate" },
//!         "dataset": { "json_string": [
//!             { "bedrooms": 2, "sqft": 1100.0 },
//!             { "bedrooms": 3, "sqft": 1650.0 }
//!         ] }
//!     }
//! }))
//! .unwrap();
//!
//! let gateway = NullGateway;
//! let ctx = RequestContext { uid: 1, session_type: SessionType::DataNew };
//! let mut pipeline = DataPipeline::new(&gateway, ctx);
//!
//! let report = pipeline.run(&payload);
//! assert!(report.status);
//! assert_eq!(report.id_entity, Some(1));
//! assert!(pipeline.get_errors().is_none());
//! assert_eq!(pipeline.observation_labels()[0], vec!["bedrooms", "sqft"]);
//! ```
//!
//! ## Error policy
//!
//! Validation and persistence errors are accumulated in the run's error log
//! and never abort later independent stages; a conversion error aborts the
//! conversion stage for the entire batch (no partial dataset list survives)
//! while still being recorded. No public operation panics; outcomes are
//! status/result values plus [`pipeline::DataPipeline::get_errors`].
//!
//! ## Modules
//!
//! - [`pipeline`]: the normalization/persistence orchestrator
//! - [`convert`]: per-format converters (CSV/JSON/XML)
//! - [`validate`]: extension and session-id validation
//! - [`gateway`]: persistence contracts implemented by the application
//! - [`types`]: payload and data-model types
//! - [`observability`]: run observers (stderr/file sinks, alert thresholds)
//! - [`error`]: error taxonomy and the per-run error log

pub mod convert;
pub mod error;
pub mod gateway;
pub mod observability;
pub mod pipeline;
pub mod types;
pub mod validate;

pub use error::{ConversionError, ConversionResult, ErrorLog, StageError};
pub use pipeline::{DataPipeline, EntityResolution, EntitySave, PipelineOptions, PipelineReport};
