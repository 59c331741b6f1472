//! Run preparation orchestrator
//!
//! [`ExperimentManager`] is the public entry point: it validates the
//! monitored keys, composes the experiment identifier, derives the run
//! paths from a single timestamp captured at the start of preparation, and
//! materializes the tree. The returned [`RunHandle`] is the whole contract
//! with downstream consumers — checkpoint writers and log writers receive
//! paths and a filename template, never this crate's internals.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifier::ExperimentId;
use crate::layout::{render_model_filename, RunPaths, RunStamp, MODELS_DIR, MODEL_FILENAME_TEMPLATE};
use crate::materialize::{materialize, RunDirMode};
use crate::params::ParamMap;

/// Top-level parameter that routes a run to the reusable debug layout.
const DEBUG_KEY: &str = "debug";

/// Comparison direction for the monitored metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Infer the direction from the metric name.
    Auto,
    /// Lower is better (losses).
    Min,
    /// Higher is better (accuracies).
    Max,
}

/// Monitoring spec handed through to the checkpoint-writing consumer:
/// which metric gates checkpointing, and in which direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSpec {
    metric: String,
    mode: MonitorMode,
}

impl MonitorSpec {
    /// Create a monitoring spec.
    #[must_use]
    pub fn new(metric: impl Into<String>, mode: MonitorMode) -> Self {
        Self {
            metric: metric.into(),
            mode,
        }
    }

    /// Name of the monitored metric (e.g. `val_loss`).
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Comparison direction.
    #[must_use]
    pub const fn mode(&self) -> MonitorMode {
        self.mode
    }
}

impl Default for MonitorSpec {
    fn default() -> Self {
        Self::new("val_loss", MonitorMode::Auto)
    }
}

/// Sorts training runs into a deterministic directory tree.
///
/// Runs of identical monitored hyperparameters share one experiment
/// bucket; any change in a monitored group lands in a new one. The
/// monitored-key *order* is part of the identifier: reordering it is a
/// breaking change to every existing experiment directory.
///
/// # Example
///
/// ```rust,no_run
/// use expman::ExperimentManager;
/// use serde_json::json;
///
/// let manager = ExperimentManager::builder()
///     .base_dir("experiments")
///     .monitored_keys(["model", "training"])
///     .build();
///
/// let params = expman::params::from_serialize(&json!({
///     "model": {"layers": 4},
///     "training": {"batch_size": 128, "epochs": 12},
/// }))?;
///
/// let handle = manager.prepare(&params)?;
/// println!("checkpoints go to {}", handle.models_dir().display());
/// # Ok::<(), expman::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExperimentManager {
    base_dir: PathBuf,
    monitored_keys: Vec<String>,
    monitor: MonitorSpec,
}

impl Default for ExperimentManager {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("experiments"),
            monitored_keys: vec!["model".to_string(), "training".to_string()],
            monitor: MonitorSpec::default(),
        }
    }
}

impl ExperimentManager {
    /// Create a manager with the default configuration: base dir
    /// `experiments`, monitored keys `["model", "training"]`, monitored
    /// metric `val_loss`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for a customized manager.
    #[must_use]
    pub fn builder() -> ExperimentManagerBuilder {
        ExperimentManagerBuilder::default()
    }

    /// Base directory all experiment buckets live under.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Monitored top-level keys, in identifier order.
    #[must_use]
    pub fn monitored_keys(&self) -> &[String] {
        &self.monitored_keys
    }

    /// The monitoring spec handed to checkpoint consumers.
    #[must_use]
    pub fn monitor(&self) -> &MonitorSpec {
        &self.monitor
    }

    /// Derive the experiment identifier for a parameter set without
    /// touching the filesystem.
    ///
    /// # Errors
    ///
    /// [`Error::MissingMonitoredKey`] if a monitored key is absent;
    /// [`Error::UnsupportedValueKind`] if a group cannot be serialized.
    pub fn experiment_id(&self, params: &ParamMap) -> Result<ExperimentId> {
        let id = ExperimentId::compose(self.monitored_groups(params)?)?;
        debug!(%id, "experiment identifier composed");
        Ok(id)
    }

    /// Prepare a run starting now.
    ///
    /// The timestamp is captured once, up front: every derived path uses
    /// the same instant even if preparation itself straddles a minute
    /// boundary.
    ///
    /// # Errors
    ///
    /// See [`prepare_at`](Self::prepare_at).
    pub fn prepare(&self, params: &ParamMap) -> Result<RunHandle> {
        self.prepare_at(params, RunStamp::now())
    }

    /// Prepare a run at an explicit instant (testing, replaying).
    ///
    /// Validates the monitored keys before any filesystem mutation, then
    /// creates the experiment tree and writes the snapshot. A top-level
    /// `"debug": true` parameter routes the run to the reusable
    /// `<base>/debug` directory instead of a hash-addressed bucket.
    ///
    /// # Errors
    ///
    /// [`Error::MissingMonitoredKey`] before any I/O;
    /// [`Error::RunDirectoryCollision`] if a same-minute run already left
    /// artifacts at the computed path; [`Error::Filesystem`] on I/O
    /// failure; [`Error::UnsupportedValueKind`] if parameters cannot be
    /// serialized.
    pub fn prepare_at(&self, params: &ParamMap, stamp: RunStamp) -> Result<RunHandle> {
        // Fail on absent monitored keys before the first directory exists.
        let groups = self.monitored_groups(params)?;

        let debug_run = params
            .get(DEBUG_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let (experiment_id, paths, mode) = if debug_run {
            (None, RunPaths::debug(&self.base_dir), RunDirMode::Reuse)
        } else {
            let id = ExperimentId::compose(groups)?;
            let paths = RunPaths::new(&self.base_dir, &id, &stamp);
            (Some(id), paths, RunDirMode::Fresh)
        };

        materialize(&paths, params, mode)?;
        info!(run_dir = %paths.run_dir().display(), "run directory prepared");

        Ok(RunHandle {
            experiment_id,
            stamp,
            paths,
            monitor: self.monitor.clone(),
        })
    }

    /// Resume an existing run identified by its experiment and run folder
    /// names, returning its paths and the most recently written
    /// checkpoint.
    ///
    /// The snapshot is not rewritten and no directories are created: the
    /// run must already exist.
    ///
    /// # Errors
    ///
    /// [`Error::RunNotFound`] if the run directory does not exist;
    /// [`Error::Filesystem`] if the checkpoint scan fails.
    pub fn resume(&self, experiment_folder: &str, run_folder: &str) -> Result<ResumedRun> {
        let run_dir = self.base_dir.join(experiment_folder).join(run_folder);
        if !run_dir.is_dir() {
            return Err(Error::RunNotFound(run_dir));
        }

        let models_dir = run_dir.join(MODELS_DIR);
        let latest_checkpoint = latest_checkpoint(&models_dir)?;
        match &latest_checkpoint {
            Some(path) => info!(checkpoint = %path.display(), "resuming from checkpoint"),
            None => info!(run_dir = %run_dir.display(), "resuming run with no checkpoints"),
        }

        Ok(ResumedRun {
            run_dir,
            models_dir,
            latest_checkpoint,
        })
    }

    /// Monitored group values in identifier order, or the first missing
    /// key as an error.
    fn monitored_groups<'a>(&self, params: &'a ParamMap) -> Result<Vec<&'a Value>> {
        self.monitored_keys
            .iter()
            .map(|key| {
                params
                    .get(key)
                    .ok_or_else(|| Error::MissingMonitoredKey(key.clone()))
            })
            .collect()
    }
}

/// Builder for [`ExperimentManager`].
#[derive(Debug, Default)]
pub struct ExperimentManagerBuilder {
    base_dir: Option<PathBuf>,
    monitored_keys: Option<Vec<String>>,
    monitor: Option<MonitorSpec>,
}

impl ExperimentManagerBuilder {
    /// Set the base directory experiment buckets live under.
    #[must_use]
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Set the monitored top-level keys. Order matters: it is baked into
    /// every identifier derived by the built manager.
    #[must_use]
    pub fn monitored_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.monitored_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Set the monitoring spec handed to checkpoint consumers.
    #[must_use]
    pub fn monitor(mut self, monitor: MonitorSpec) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Build the manager, filling unset fields with the defaults.
    #[must_use]
    pub fn build(self) -> ExperimentManager {
        let defaults = ExperimentManager::default();
        ExperimentManager {
            base_dir: self.base_dir.unwrap_or(defaults.base_dir),
            monitored_keys: self.monitored_keys.unwrap_or(defaults.monitored_keys),
            monitor: self.monitor.unwrap_or(defaults.monitor),
        }
    }
}

/// Ready-to-use handle for a prepared run: concrete paths plus the
/// filename template downstream consumers fill per epoch.
#[derive(Debug, Clone, Serialize)]
pub struct RunHandle {
    experiment_id: Option<ExperimentId>,
    stamp: RunStamp,
    paths: RunPaths,
    monitor: MonitorSpec,
}

impl RunHandle {
    /// The composite experiment identifier, or `None` for debug runs.
    #[must_use]
    pub fn experiment_id(&self) -> Option<&ExperimentId> {
        self.experiment_id.as_ref()
    }

    /// The timestamp all of this run's paths were derived from.
    #[must_use]
    pub const fn stamp(&self) -> RunStamp {
        self.stamp
    }

    /// The full derived path set.
    #[must_use]
    pub const fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// This run's directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        self.paths.run_dir()
    }

    /// Checkpoint directory for the checkpoint-writing consumer.
    #[must_use]
    pub fn models_dir(&self) -> &Path {
        self.paths.models_dir()
    }

    /// Path of the hyperparameter snapshot written at preparation.
    #[must_use]
    pub fn hyperparams_file(&self) -> &Path {
        self.paths.hyperparams_file()
    }

    /// Path reserved for the training consumer's best-performances file.
    #[must_use]
    pub fn performances_file(&self) -> &Path {
        self.paths.performances_file()
    }

    /// Path reserved for the training consumer's progress CSV.
    #[must_use]
    pub fn csv_log_file(&self) -> &Path {
        self.paths.csv_log_file()
    }

    /// Path reserved for the training consumer's error log.
    #[must_use]
    pub fn error_log_file(&self) -> &Path {
        self.paths.error_log_file()
    }

    /// The monitoring spec this run was prepared with.
    #[must_use]
    pub const fn monitor(&self) -> &MonitorSpec {
        &self.monitor
    }

    /// The checkpoint filename template; see
    /// [`MODEL_FILENAME_TEMPLATE`](crate::layout::MODEL_FILENAME_TEMPLATE)
    /// for the placeholder contract.
    #[must_use]
    pub const fn model_filename_template(&self) -> &'static str {
        MODEL_FILENAME_TEMPLATE
    }

    /// Full checkpoint path for one epoch, with the template filled in.
    #[must_use]
    pub fn model_checkpoint_path(&self, epoch: u32, metric: f64) -> PathBuf {
        self.paths
            .models_dir()
            .join(render_model_filename(epoch, metric))
    }
}

/// Paths of a resumed run and its latest checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ResumedRun {
    run_dir: PathBuf,
    models_dir: PathBuf,
    latest_checkpoint: Option<PathBuf>,
}

impl ResumedRun {
    /// The resumed run's directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// The resumed run's checkpoint directory.
    #[must_use]
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Most recently modified checkpoint, or `None` if the run never
    /// wrote one.
    #[must_use]
    pub fn latest_checkpoint(&self) -> Option<&Path> {
        self.latest_checkpoint.as_deref()
    }
}

/// Most recently modified file in the models directory, if any.
fn latest_checkpoint(models_dir: &Path) -> Result<Option<PathBuf>> {
    if !models_dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(models_dir).map_err(|e| Error::fs(models_dir, e))? {
        let entry = entry.map_err(|e| Error::fs(models_dir, e))?;
        let metadata = entry.metadata().map_err(|e| Error::fs(entry.path(), e))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().map_err(|e| Error::fs(entry.path(), e))?;
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, entry.path()));
        }
    }
    Ok(latest.map(|(_, path)| path))
}
