//! Persistence gateway contracts.
//!
//! The pipeline never talks SQL; it hands row-shaped payloads to a
//! [`PersistenceGateway`] implementation owned by the application. All calls
//! are synchronous and report failure through their result values, never by
//! panicking.

use crate::types::{EntityDraft, EntityId, SessionType, Value};

/// Result of saving (or updating) an entity row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySaveResult {
    /// `true` when the save succeeded.
    pub status: bool,
    /// Minted entity id; `None` on failure and on update saves.
    pub id: Option<EntityId>,
    /// Failure description, when `status` is `false`.
    pub error: Option<String>,
}

/// Result of a feature-count or feature-vector save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSaveResult {
    /// Failure description; `None` on success.
    pub error: Option<String>,
}

/// Result of an observation-label save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSaveResult {
    /// `true` when the save succeeded.
    pub status: bool,
    /// Failure description, when `status` is `false`.
    pub error: Option<String>,
}

/// Feature-count row derived from the first dataset record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureCountRow {
    /// Entity the count belongs to.
    pub id_entity: EntityId,
    /// Expected number of features per observation.
    pub count_features: usize,
}

/// One feature vector to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Entity the vector belongs to.
    pub id_entity: EntityId,
    /// The observation's feature values.
    pub premodel_dataset: Vec<Value>,
}

/// One observation label to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    /// Entity the label belongs to.
    pub id_entity: EntityId,
    /// Feature label.
    pub label: String,
}

/// The three independent save operations the pipeline sequences.
///
/// Implementations may use interior mutability; the pipeline holds a shared
/// reference for the duration of one run.
pub trait PersistenceGateway {
    /// Save a new entity (`id_entity: None`, a fresh id is minted and
    /// returned) or update an existing one (`id_entity: Some`, modification
    /// metadata is touched, no id is returned).
    fn save_entity(&self, draft: &EntityDraft, session_type: SessionType) -> EntitySaveResult;

    /// Save the expected feature count for an entity.
    fn save_feature_count(&self, row: &FeatureCountRow) -> FeatureSaveResult;

    /// Save one feature vector.
    fn save_feature(&self, row: &FeatureRow) -> FeatureSaveResult;

    /// Save one observation label.
    fn save_observation_label(&self, row: &LabelRow, session_type: SessionType) -> LabelSaveResult;
}
