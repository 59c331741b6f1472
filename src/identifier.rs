//! Experiment identifier composition
//!
//! An experiment identifier is the ordered join of one fingerprint per
//! monitored parameter group: `exp-<fp1>-<fp2>-...-<fpk>`. Two runs with
//! equal monitored groups land in the same experiment bucket; any tracked
//! change produces a distinguishable one.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::fingerprint::{fingerprint, Fingerprint};

/// Literal prefix of every experiment folder name.
pub const EXPERIMENT_PREFIX: &str = "exp";

/// Composite identifier for one hyperparameter configuration.
///
/// Segment order follows the caller's monitored-key order and is part of
/// the identifier's meaning: reordering monitored keys is a breaking
/// change to identifier stability, not a cosmetic one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExperimentId {
    segments: Vec<Fingerprint>,
}

impl ExperimentId {
    /// Compose an identifier from parameter groups in caller order.
    ///
    /// Each group is fingerprinted independently, so changing one group
    /// changes exactly one segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedValueKind`](crate::Error::UnsupportedValueKind)
    /// if any group cannot be canonically serialized.
    pub fn compose<'a>(groups: impl IntoIterator<Item = &'a Value>) -> Result<Self> {
        let segments = groups
            .into_iter()
            .map(fingerprint)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// The ordered fingerprint segments.
    #[must_use]
    pub fn segments(&self) -> &[Fingerprint] {
        &self.segments
    }

    /// Directory name for this experiment, e.g. `exp-00123456-98765432`.
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{EXPERIMENT_PREFIX}")?;
        for segment in &self.segments {
            write!(f, "-{segment}")?;
        }
        Ok(())
    }
}
