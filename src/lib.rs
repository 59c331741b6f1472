//! # Expman: Deterministic Experiment Directory Layout
//!
//! Expman assigns every training run a deterministic, hierarchical,
//! collision-resistant location on disk. Repeated runs of identical
//! hyperparameters land in the same experiment bucket; any change in a
//! tracked parameter group produces a distinguishable one. The directory
//! tree itself is the only index — there is no database, no daemon, no
//! cross-machine coordination.
//!
//! ## How a path is derived
//!
//! 1. Each monitored parameter group is canonically serialized (sorted
//!    keys, type-disambiguating) and digested with SHA-256 into a
//!    fixed-width [`Fingerprint`].
//! 2. The fingerprints join, in monitored-key order, into an
//!    [`ExperimentId`] such as `exp-00123456-98765432`.
//! 3. A minute-precision [`RunStamp`] names the run folder,
//!    `run--20-03-03--15-52`.
//! 4. The tree is created idempotently at the experiment level and
//!    strictly at the run level, and the full hyperparameter snapshot is
//!    written alongside.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use expman::ExperimentManager;
//! use serde_json::json;
//!
//! let params = expman::params::from_serialize(&json!({
//!     "model": {"layers": 4, "dropout": 0.1},
//!     "training": {"batch_size": 128, "epochs": 12, "learning-rate": 0.008},
//!     "comment": "baseline",
//! }))?;
//!
//! let handle = ExperimentManager::new().prepare(&params)?;
//! let first_checkpoint = handle.model_checkpoint_path(0, 1.5);
//! assert!(first_checkpoint.starts_with(handle.models_dir()));
//! # Ok::<(), expman::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod fingerprint;
pub mod identifier;
pub mod layout;
pub mod manager;
pub mod materialize;
pub mod params;

pub use error::{Error, Result};
pub use fingerprint::{fingerprint, Fingerprint};
pub use identifier::ExperimentId;
pub use layout::{RunPaths, RunStamp, MODEL_FILENAME_TEMPLATE};
pub use manager::{
    ExperimentManager, ExperimentManagerBuilder, MonitorMode, MonitorSpec, ResumedRun, RunHandle,
};
pub use params::ParamMap;
