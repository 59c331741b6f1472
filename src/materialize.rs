//! Directory tree materialization
//!
//! Turns a derived [`RunPaths`] into a real tree on disk. Experiment
//! directories are shared across runs (and across parallel search workers
//! racing to create them), so their creation is idempotent. Run
//! directories are private to one process, so their creation is strict: a
//! non-empty directory at the computed path means another run already
//! owns it, and the only safe outcome is a loud failure.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::RunPaths;
use crate::params::ParamMap;

/// Placeholder contents for `performances.json`; the training consumer
/// overwrites it with the best-epoch records.
const PERFORMANCES_PLACEHOLDER: &str = "[]\n";

/// How to treat a pre-existing run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDirMode {
    /// Strict: a non-empty run directory at the computed path is a
    /// [`Error::RunDirectoryCollision`]. An existing but empty one (a
    /// crashed earlier attempt that never wrote artifacts) is tolerated.
    Fresh,
    /// Idempotent reuse; the snapshot is rewritten. Only debug runs use
    /// this.
    Reuse,
}

/// Create the full run tree and write the hyperparameter snapshot.
///
/// Creates the experiment directory if absent, the run directory according
/// to `mode`, the `models/` subdirectory, the `hyperparameters.json`
/// snapshot of the full raw parameter structure, and the
/// `performances.json` placeholder.
///
/// On failure nothing is rolled back: at worst the idempotent experiment
/// directory remains, which a later run recreates harmlessly. No run
/// artifacts exist unless every step succeeded.
///
/// # Errors
///
/// [`Error::RunDirectoryCollision`] when `mode` is [`RunDirMode::Fresh`]
/// and the run directory already holds content;
/// [`Error::Filesystem`] on any underlying I/O failure.
pub fn materialize(paths: &RunPaths, hyperparameters: &ParamMap, mode: RunDirMode) -> Result<()> {
    fs::create_dir_all(paths.experiment_dir())
        .map_err(|e| Error::fs(paths.experiment_dir(), e))?;

    match mode {
        RunDirMode::Fresh => create_fresh_run_dir(paths.run_dir())?,
        RunDirMode::Reuse => fs::create_dir_all(paths.run_dir())
            .map_err(|e| Error::fs(paths.run_dir(), e))?,
    }

    fs::create_dir_all(paths.models_dir()).map_err(|e| Error::fs(paths.models_dir(), e))?;

    write_snapshot(paths.hyperparams_file(), hyperparameters)?;
    fs::write(paths.performances_file(), PERFORMANCES_PLACEHOLDER)
        .map_err(|e| Error::fs(paths.performances_file(), e))?;

    debug!(run_dir = %paths.run_dir().display(), "run tree materialized");
    Ok(())
}

/// Strict run directory creation: create-if-absent and fail-if-exists are
/// distinguished operations here, unlike the experiment directory above.
fn create_fresh_run_dir(run_dir: &Path) -> Result<()> {
    match fs::create_dir(run_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let mut entries =
                fs::read_dir(run_dir).map_err(|e| Error::fs(run_dir, e))?;
            if entries.next().is_some() {
                Err(Error::RunDirectoryCollision(run_dir.to_path_buf()))
            } else {
                Ok(())
            }
        }
        Err(e) => Err(Error::fs(run_dir, e)),
    }
}

/// Write the canonical snapshot of the full raw hyperparameter structure:
/// sorted keys, two-space indent, UTF-8. Written once at run start; the
/// tracked subset is recoverable from it, the untracked remainder makes
/// the run directory self-describing.
fn write_snapshot(path: &Path, hyperparameters: &ParamMap) -> Result<()> {
    let mut rendered = serde_json::to_string_pretty(hyperparameters)
        .map_err(|e| Error::UnsupportedValueKind(e.to_string()))?;
    rendered.push('\n');
    fs::write(path, rendered).map_err(|e| Error::fs(path, e))
}
