//! The dataset-normalization pipeline.
//!
//! [`DataPipeline`] drives one submission end to end: payload validation,
//! per-source conversion, entity resolution, and the persistence sequence
//! (feature count, feature vectors, observation labels). All per-run state
//! (canonical upload, dataset list, label set, error log) lives on the
//! pipeline instance and is discarded with it; only the rows written through
//! the [`PersistenceGateway`] survive the run.
//!
//! Error policy (deliberately asymmetric):
//!
//! - Validation and persistence errors are accumulated and never abort later
//!   independent stages.
//! - A conversion error aborts the conversion stage for the whole batch; no
//!   partial dataset list survives, and nothing downstream of conversion
//!   runs. The error is still recorded.
//!
//! No error escapes as a panic; callers read the outcome from
//! [`PipelineReport`] and [`DataPipeline::get_errors`].

use std::fmt;
use std::sync::Arc;

use crate::convert;
use crate::error::{ErrorLog, StageError};
use crate::gateway::{FeatureCountRow, FeatureRow, LabelRow, PersistenceGateway};
use crate::observability::{severity_for_error, PipelineObserver, RunContext, Severity, Stage, StageStats};
use crate::types::{
    CanonicalUpload, DatasetRecord, EntityDraft, EntityId, LabelSet, RequestContext,
    RequestPayload, SessionSettings, SessionType,
};
use crate::validate;

/// How the entity id for a run is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityResolution {
    /// Mint a new entity id through the gateway.
    CreateNew,
    /// Reuse an existing entity id; the gateway only touches modification
    /// metadata.
    UpdateExisting(EntityId),
}

/// Outcome of the entity-resolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySave {
    /// A new entity row was created.
    Created {
        /// The minted entity id.
        id: EntityId,
    },
    /// The existing entity row was updated.
    Updated,
    /// The save failed; the error is already recorded in the log.
    Failed,
}

/// Final outcome of a full pipeline run.
///
/// `status` is `true` only when the error log ended empty; callers decide
/// whether a non-empty log means partial success or full failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// `true` when the run recorded no errors at all.
    pub status: bool,
    /// The resolved entity id, when entity resolution succeeded.
    pub id_entity: Option<EntityId>,
}

/// Options controlling pipeline observability.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// One synchronous normalization run for one inbound submission.
///
/// Owns all mutable per-run state; no cross-request sharing, no locking.
pub struct DataPipeline<'g> {
    gateway: &'g dyn PersistenceGateway,
    ctx: RequestContext,
    options: PipelineOptions,
    upload: CanonicalUpload,
    dataset: Vec<DatasetRecord>,
    observation_labels: LabelSet,
    errors: ErrorLog,
    flag_upload: bool,
}

impl fmt::Debug for DataPipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPipeline")
            .field("ctx", &self.ctx)
            .field("upload_len", &self.upload.len())
            .field("dataset_len", &self.dataset.len())
            .field("errors", &self.errors.len())
            .field("flag_upload", &self.flag_upload)
            .finish()
    }
}

impl<'g> DataPipeline<'g> {
    /// Create a pipeline for one run.
    pub fn new(gateway: &'g dyn PersistenceGateway, ctx: RequestContext) -> Self {
        Self {
            gateway,
            ctx,
            options: PipelineOptions::default(),
            upload: CanonicalUpload::default(),
            dataset: Vec::new(),
            observation_labels: Vec::new(),
            errors: ErrorLog::new(),
            flag_upload: false,
        }
    }

    /// Attach observability options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Stage 1: validate declared file types and restructure the payload.
    ///
    /// A validation error is recorded and sets the blocked flag, but the run
    /// continues; downstream stages only see the surviving descriptors.
    pub fn validate_file_extension(&mut self, payload: &RequestPayload) {
        let (upload, error) = validate::validate_file_extension(payload);
        self.upload = upload;
        if let Some(error) = error {
            self.record(Stage::Validate, error);
            self.flag_upload = true;
        }
    }

    /// Stage 2: convert every validated source into feature vectors.
    ///
    /// Appends one [`DatasetRecord`] and one label sequence per source, in
    /// submission order. On the first conversion error the whole batch is
    /// discarded and `false` is returned; the error stays in the log.
    pub fn dataset_to_dict(&mut self, id_entity: EntityId) -> bool {
        self.dataset.clear();
        self.observation_labels.clear();

        for i in 0..self.upload.descriptors.len() {
            match convert::convert(&self.upload.descriptors[i]) {
                Ok(converted) => {
                    self.observation_labels.push(converted.labels);
                    self.dataset.push(DatasetRecord {
                        id_entity,
                        premodel_dataset: converted.records,
                        count_features: converted.count_features,
                    });
                }
                Err(error) => {
                    self.record(Stage::Convert, StageError::Conversion(error));
                    self.dataset.clear();
                    self.observation_labels.clear();
                    return false;
                }
            }
        }
        true
    }

    /// Stage 3: resolve the entity id through the gateway.
    ///
    /// `CreateNew` mints a fresh id (required by every later stage);
    /// `UpdateExisting` touches modification metadata on a known id and
    /// returns no new id. Failure is recorded and reported as
    /// [`EntitySave::Failed`].
    pub fn save_entity(
        &mut self,
        settings: &SessionSettings,
        resolution: EntityResolution,
    ) -> EntitySave {
        let draft = EntityDraft {
            title: settings.session_name.clone(),
            uid: self.ctx.uid,
            id_entity: match resolution {
                EntityResolution::CreateNew => None,
                EntityResolution::UpdateExisting(id) => Some(id),
            },
            model_type: settings.model_type.clone(),
        };

        let result = self.gateway.save_entity(&draft, self.ctx.session_type);
        if !result.status {
            let message = result
                .error
                .unwrap_or_else(|| "entity save failed".to_string());
            self.record(Stage::ResolveEntity, StageError::Persistence(message));
            return EntitySave::Failed;
        }

        match resolution {
            EntityResolution::CreateNew => match result.id {
                Some(id) => EntitySave::Created { id },
                None => {
                    self.record(
                        Stage::ResolveEntity,
                        StageError::Persistence("entity save returned no id".to_string()),
                    );
                    EntitySave::Failed
                }
            },
            EntityResolution::UpdateExisting(_) => EntitySave::Updated,
        }
    }

    /// Stage 4: save the expected feature count.
    ///
    /// Derived from the first dataset record, whose count is assumed
    /// representative of the whole batch. An error is recorded; the run
    /// continues.
    pub fn save_feature_count(&mut self) {
        let row = match self.dataset.first() {
            Some(first) => FeatureCountRow {
                id_entity: first.id_entity,
                count_features: first.count_features,
            },
            None => return,
        };

        let result = self.gateway.save_feature_count(&row);
        if let Some(error) = result.error {
            self.record(Stage::FeatureCount, StageError::Persistence(error));
        }
    }

    /// Stage 5: save every feature vector of every dataset record.
    ///
    /// A failing vector is recorded and the remaining vectors are still
    /// attempted.
    pub fn save_premodel_dataset(&mut self) {
        for ri in 0..self.dataset.len() {
            for vi in 0..self.dataset[ri].premodel_dataset.len() {
                let row = FeatureRow {
                    id_entity: self.dataset[ri].id_entity,
                    premodel_dataset: self.dataset[ri].premodel_dataset[vi].clone(),
                };
                let result = self.gateway.save_feature(&row);
                if let Some(error) = result.error {
                    self.record(Stage::Dataset, StageError::Persistence(error));
                }
            }
        }
    }

    /// Stage 6: save every observation label of every label sequence.
    ///
    /// Labels are tagged with the resolved entity id; per-label failures are
    /// recorded and never abort the remaining labels.
    pub fn save_observation_label(&mut self, id_entity: EntityId) {
        for li in 0..self.observation_labels.len() {
            for wi in 0..self.observation_labels[li].len() {
                let row = LabelRow {
                    id_entity,
                    label: self.observation_labels[li][wi].clone(),
                };
                let result = self.gateway.save_observation_label(&row, self.ctx.session_type);
                if !result.status {
                    let message = result
                        .error
                        .unwrap_or_else(|| "observation label save failed".to_string());
                    self.record(Stage::Labels, StageError::Persistence(message));
                }
            }
        }
    }

    /// Record an error unless the raw session id is a positive integer.
    pub fn validate_session_id(&mut self, raw: &serde_json::Value) {
        if let Some(error) = validate::validate_session_id(raw) {
            self.record(Stage::Validate, error);
        }
    }

    /// Stage 7: all errors recorded during this run, or `None` when clean.
    pub fn get_errors(&self) -> Option<&[StageError]> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.as_slice())
        }
    }

    /// `true` when payload validation flagged this run.
    pub fn is_blocked(&self) -> bool {
        self.flag_upload
    }

    /// Converted dataset records accumulated by [`Self::dataset_to_dict`].
    pub fn dataset(&self) -> &[DatasetRecord] {
        &self.dataset
    }

    /// Label sequences accumulated by [`Self::dataset_to_dict`], positionally
    /// aligned with [`Self::dataset`].
    pub fn observation_labels(&self) -> &LabelSet {
        &self.observation_labels
    }

    /// Drive the full state sequence for one payload.
    ///
    /// Create runs resolve the entity id before conversion (the id is an
    /// input to [`Self::dataset_to_dict`]). Append runs validate the supplied
    /// session id up front but only confirm the entity update (touching its
    /// modification metadata) after conversion has produced something to
    /// append. Conversion failure skips every persistence stage that depends
    /// on a populated dataset.
    pub fn run(&mut self, payload: &RequestPayload) -> PipelineReport {
        let before = self.errors.len();
        self.validate_file_extension(payload);
        if self.errors.len() == before {
            self.stage_ok(Stage::Validate, self.upload.len());
        }

        let settings = payload.data.settings.clone();
        let resolved = match self.ctx.session_type {
            SessionType::DataNew => match self.save_entity(&settings, EntityResolution::CreateNew) {
                EntitySave::Created { id } => {
                    self.stage_ok(Stage::ResolveEntity, 1);
                    Some(id)
                }
                _ => None,
            },
            SessionType::DataAppend => self.existing_entity_id(&settings),
        };

        let Some(id_entity) = resolved else {
            return PipelineReport {
                status: false,
                id_entity: None,
            };
        };

        if !self.dataset_to_dict(id_entity) {
            return PipelineReport {
                status: false,
                id_entity: Some(id_entity),
            };
        }
        self.stage_ok(Stage::Convert, self.dataset.len());

        if self.ctx.session_type == SessionType::DataAppend {
            match self.save_entity(&settings, EntityResolution::UpdateExisting(id_entity)) {
                EntitySave::Updated => self.stage_ok(Stage::ResolveEntity, 1),
                _ => {
                    return PipelineReport {
                        status: false,
                        id_entity: None,
                    };
                }
            }
        }

        let before = self.errors.len();
        self.save_feature_count();
        if self.errors.len() == before {
            self.stage_ok(Stage::FeatureCount, 1);
        }

        let before = self.errors.len();
        self.save_premodel_dataset();
        if self.errors.len() == before {
            let vectors = self.dataset.iter().map(|d| d.premodel_dataset.len()).sum();
            self.stage_ok(Stage::Dataset, vectors);
        }

        let before = self.errors.len();
        self.save_observation_label(id_entity);
        if self.errors.len() == before {
            let labels = self.observation_labels.iter().map(Vec::len).sum();
            self.stage_ok(Stage::Labels, labels);
        }

        PipelineReport {
            status: self.errors.is_empty(),
            id_entity: Some(id_entity),
        }
    }

    /// Validate and parse the supplied session id for an append run.
    ///
    /// The entity row itself is not touched here; the update is confirmed
    /// after conversion.
    fn existing_entity_id(&mut self, settings: &SessionSettings) -> Option<EntityId> {
        let raw = match settings.session_id.clone() {
            Some(raw) => raw,
            None => {
                self.record(
                    Stage::Validate,
                    StageError::Validation("'session_id' missing for append run".to_string()),
                );
                return None;
            }
        };

        let before = self.errors.len();
        self.validate_session_id(&raw);
        if self.errors.len() > before {
            return None;
        }

        // validate_session_id accepted it, so this parse succeeds.
        validate::session_id_value(&raw)
    }

    fn record(&mut self, stage: Stage, error: StageError) {
        if let Some(observer) = self.options.observer.as_ref() {
            let severity = severity_for_error(&error);
            let ctx = RunContext {
                uid: self.ctx.uid,
                session_type: self.ctx.session_type,
            };
            observer.on_stage_error(&ctx, stage, severity, &error);
            if severity >= self.options.alert_at_or_above {
                observer.on_alert(&ctx, stage, severity, &error);
            }
        }
        self.errors.push(error);
    }

    fn stage_ok(&self, stage: Stage, items: usize) {
        if let Some(observer) = self.options.observer.as_ref() {
            let ctx = RunContext {
                uid: self.ctx.uid,
                session_type: self.ctx.session_type,
            };
            observer.on_stage_ok(&ctx, stage, StageStats { items });
        }
    }
}
