use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ConversionError, StageError};
use crate::types::{SessionType, UserId};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Extension/payload validation.
    Validate,
    /// Entity id resolution (create or update).
    ResolveEntity,
    /// Per-source format conversion.
    Convert,
    /// Feature-count persistence.
    FeatureCount,
    /// Feature-vector persistence.
    Dataset,
    /// Observation-label persistence.
    Labels,
}

impl Stage {
    /// Short stage name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::ResolveEntity => "resolve-entity",
            Self::Convert => "convert",
            Self::FeatureCount => "feature-count",
            Self::Dataset => "dataset",
            Self::Labels => "labels",
        }
    }
}

/// Severity classification used for observer callbacks and alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Recoverable validation problem.
    Warning,
    /// Stage failed but the run continued.
    Error,
    /// Infrastructure failure (typically I/O on an upload source).
    Critical,
}

/// Severity assigned to a recorded pipeline error.
///
/// Validation problems are user mistakes (Warning); I/O during conversion
/// points at upload-handler infrastructure (Critical); everything else is an
/// Error.
pub fn severity_for_error(error: &StageError) -> Severity {
    match error {
        StageError::Validation(_) => Severity::Warning,
        StageError::Conversion(ConversionError::Io(_)) => Severity::Critical,
        StageError::Conversion(_) => Severity::Error,
        StageError::Persistence(_) => Severity::Error,
    }
}

/// Context about the run an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Logged-in user id.
    pub uid: UserId,
    /// Create-new vs. append-existing flow.
    pub session_type: SessionType,
}

/// Minimal stats reported when a stage completes cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Items the stage handled (sources converted, rows saved, ...).
    pub items: usize,
}

/// Observer interface for pipeline run outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called when a stage completes without recording an error.
    fn on_stage_ok(&self, _ctx: &RunContext, _stage: Stage, _stats: StageStats) {}

    /// Called for every error the pipeline records.
    fn on_stage_error(&self, _ctx: &RunContext, _stage: Stage, _severity: Severity, _error: &StageError) {}

    /// Called when a recorded error meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_stage_error`].
    fn on_alert(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        self.on_stage_error(ctx, stage, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_stage_ok(&self, ctx: &RunContext, stage: Stage, stats: StageStats) {
        for o in &self.observers {
            o.on_stage_ok(ctx, stage, stats);
        }
    }

    fn on_stage_error(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        for o in &self.observers {
            o.on_stage_error(ctx, stage, severity, error);
        }
    }

    fn on_alert(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        for o in &self.observers {
            o.on_alert(ctx, stage, severity, error);
        }
    }
}

/// Logs pipeline events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl PipelineObserver for StdErrObserver {
    fn on_stage_ok(&self, ctx: &RunContext, stage: Stage, stats: StageStats) {
        eprintln!(
            "[pipeline][ok] uid={} session={} stage={} items={}",
            ctx.uid,
            ctx.session_type,
            stage.name(),
            stats.items
        );
    }

    fn on_stage_error(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        eprintln!(
            "[pipeline][{:?}] uid={} session={} stage={} err={}",
            severity,
            ctx.uid,
            ctx.session_type,
            stage.name(),
            error
        );
    }

    fn on_alert(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        eprintln!(
            "[ALERT][pipeline][{:?}] uid={} session={} stage={} err={}",
            severity,
            ctx.uid,
            ctx.session_type,
            stage.name(),
            error
        );
    }
}

/// Appends pipeline events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_stage_ok(&self, ctx: &RunContext, stage: Stage, stats: StageStats) {
        self.append_line(&format!(
            "{} ok uid={} session={} stage={} items={}",
            unix_ts(),
            ctx.uid,
            ctx.session_type,
            stage.name(),
            stats.items
        ));
    }

    fn on_stage_error(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        self.append_line(&format!(
            "{} fail severity={:?} uid={} session={} stage={} err={}",
            unix_ts(),
            severity,
            ctx.uid,
            ctx.session_type,
            stage.name(),
            error
        ));
    }

    fn on_alert(&self, ctx: &RunContext, stage: Stage, severity: Severity, error: &StageError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} uid={} session={} stage={} err={}",
            unix_ts(),
            severity,
            ctx.uid,
            ctx.session_type,
            stage.name(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
