//! Run timestamps and directory layout
//!
//! Pure path derivation: nothing in this module touches the filesystem,
//! so every layout rule is unit-testable without a disk. The on-disk tree
//! this describes is a fixed contract for any tooling built atop it:
//!
//! ```text
//! <base_dir>/
//!   exp-<fp1>-...-<fpk>/
//!     run--<YY>-<MM>-<DD>--<HH>-<MM>/
//!       hyperparameters.json
//!       performances.json
//!       training-logs.csv
//!       errors.log
//!       models/
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::identifier::ExperimentId;

/// Literal prefix of every run folder name.
pub const RUN_PREFIX: &str = "run--";

/// Minute-precision, lexically sortable timestamp token format.
const STAMP_FORMAT: &str = "%y-%m-%d--%H-%M";

/// Hyperparameter snapshot filename inside a run directory.
pub const HYPERPARAMETERS_FILE: &str = "hyperparameters.json";

/// Best-performances filename; owned by the training consumer.
pub const PERFORMANCES_FILE: &str = "performances.json";

/// Per-epoch progress log filename; owned by the training consumer.
pub const CSV_LOG_FILE: &str = "training-logs.csv";

/// Error log filename; owned by the training consumer.
pub const ERROR_LOG_FILE: &str = "errors.log";

/// Checkpoint subdirectory name inside a run directory.
pub const MODELS_DIR: &str = "models";

/// Folder name for throwaway debug runs, directly under the base dir.
pub const DEBUG_DIR: &str = "debug";

/// Checkpoint filename template handed to the checkpoint-writing consumer.
///
/// Placeholder contract: `{epoch:02}` is the zero-padded epoch index,
/// `{metric:.4}` is the monitored metric value rendered with four decimal
/// places. [`render_model_filename`] fills the template exactly as
/// documented here; consumers formatting it themselves must match.
pub const MODEL_FILENAME_TEMPLATE: &str = "model.{epoch:02}-{metric:.4}.ckpt";

/// Fill [`MODEL_FILENAME_TEMPLATE`] for one epoch.
#[must_use]
pub fn render_model_filename(epoch: u32, metric: f64) -> String {
    format!("model.{epoch:02}-{metric:.4}.ckpt")
}

/// Run start instant, truncated to minute precision.
///
/// The token form (`20-03-03--15-52`) is fixed-width and lexically
/// sortable, so run folders list in start order. Two runs starting within
/// the same minute under one experiment identifier map to the same folder
/// name; the materializer surfaces that as a collision rather than
/// overwriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RunStamp(NaiveDateTime);

impl RunStamp {
    /// Capture the current local wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    /// Build a stamp from an explicit instant (testing, tooling over
    /// existing trees).
    #[must_use]
    pub fn at(instant: NaiveDateTime) -> Self {
        let truncated = instant
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(instant);
        Self(truncated)
    }

    /// The minute-precision timestamp token, e.g. `20-03-03--15-52`.
    #[must_use]
    pub fn token(&self) -> String {
        self.0.format(STAMP_FORMAT).to_string()
    }

    /// Directory name for this run, e.g. `run--20-03-03--15-52`.
    #[must_use]
    pub fn folder_name(&self) -> String {
        format!("{RUN_PREFIX}{}", self.token())
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Concrete paths of one run, derived purely from base dir, identifier
/// and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPaths {
    experiment_dir: PathBuf,
    run_dir: PathBuf,
    models_dir: PathBuf,
    hyperparams_file: PathBuf,
    performances_file: PathBuf,
    csv_log_file: PathBuf,
    error_log_file: PathBuf,
}

impl RunPaths {
    /// Derive the full set of run paths.
    #[must_use]
    pub fn new(base_dir: impl AsRef<Path>, id: &ExperimentId, stamp: &RunStamp) -> Self {
        let experiment_dir = base_dir.as_ref().join(id.folder_name());
        let run_dir = experiment_dir.join(stamp.folder_name());
        Self::from_run_dir(experiment_dir, run_dir)
    }

    /// Derive the layout of a debug run: a single reusable directory
    /// directly under the base dir, with no identifier or timestamp.
    #[must_use]
    pub fn debug(base_dir: impl AsRef<Path>) -> Self {
        let run_dir = base_dir.as_ref().join(DEBUG_DIR);
        Self::from_run_dir(run_dir.clone(), run_dir)
    }

    fn from_run_dir(experiment_dir: PathBuf, run_dir: PathBuf) -> Self {
        Self {
            models_dir: run_dir.join(MODELS_DIR),
            hyperparams_file: run_dir.join(HYPERPARAMETERS_FILE),
            performances_file: run_dir.join(PERFORMANCES_FILE),
            csv_log_file: run_dir.join(CSV_LOG_FILE),
            error_log_file: run_dir.join(ERROR_LOG_FILE),
            experiment_dir,
            run_dir,
        }
    }

    /// Experiment bucket directory, shared by all runs of one
    /// hyperparameter configuration.
    #[must_use]
    pub fn experiment_dir(&self) -> &Path {
        &self.experiment_dir
    }

    /// This run's directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Checkpoint directory inside the run.
    #[must_use]
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Hyperparameter snapshot path.
    #[must_use]
    pub fn hyperparams_file(&self) -> &Path {
        &self.hyperparams_file
    }

    /// Best-performances path (written by the training consumer).
    #[must_use]
    pub fn performances_file(&self) -> &Path {
        &self.performances_file
    }

    /// Progress CSV path (written by the training consumer).
    #[must_use]
    pub fn csv_log_file(&self) -> &Path {
        &self.csv_log_file
    }

    /// Error log path (written by the training consumer).
    #[must_use]
    pub fn error_log_file(&self) -> &Path {
        &self.error_log_file
    }

    /// Whether this is the reusable debug layout.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.experiment_dir == self.run_dir
    }
}
