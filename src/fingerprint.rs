//! Parameter group fingerprinting
//!
//! Maps a nested parameter group to a fixed-width digest that is stable
//! across processes and machines. The canonical form is the group's JSON
//! rendering with sorted mapping keys; the digest is SHA-256 reduced to
//! eight decimal digits. Per-process-seeded hashers (`std::hash`) are
//! deliberately not used: equal input must fingerprint equally in every
//! run, forever.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Number of decimal digits a fingerprint is reduced to.
pub const FINGERPRINT_WIDTH: usize = 8;

const FINGERPRINT_MODULUS: u64 = 100_000_000;

/// Fixed-width decimal digest of a canonicalized parameter group.
///
/// Always displayed zero-padded to [`FINGERPRINT_WIDTH`] digits so
/// identifier segments line up visually across experiments.
///
/// Collisions across distinct groups are an accepted bounded risk, not an
/// error: the fingerprint distinguishes experiment buckets, it does not
/// authenticate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Raw digest value, `< 10^8`.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = FINGERPRINT_WIDTH)
    }
}

/// Render a parameter group in its canonical, order-independent form.
///
/// Mapping keys serialize in sorted order (the `serde_json` map is a
/// `BTreeMap`), so two groups differing only in key insertion order render
/// byte-identically. The rendering is type-disambiguating: `"3,3"`, `[3,3]`,
/// `3` and `3.0` all produce distinct canonical text.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValueKind`] if the value cannot be
/// serialized.
pub fn canonical_json(group: &Value) -> Result<String> {
    serde_json::to_string(group).map_err(|e| Error::UnsupportedValueKind(e.to_string()))
}

/// Fingerprint a parameter group.
///
/// Deterministic across calls, processes and machines: the digest depends
/// only on the canonical serialization, never on object identity, mapping
/// iteration order or a process-specific seed.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValueKind`] if the group cannot be
/// canonically serialized.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
///
/// let group = json!({"batch_size": 128, "epochs": 12});
/// let fp = expman::fingerprint(&group)?;
/// assert_eq!(fp, expman::fingerprint(&group)?);
/// assert_eq!(fp.to_string().len(), 8);
/// # Ok::<(), expman::Error>(())
/// ```
pub fn fingerprint(group: &Value) -> Result<Fingerprint> {
    let canonical = canonical_json(group)?;
    let digest = Sha256::digest(canonical.as_bytes());

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let word = u64::from_be_bytes(prefix);

    #[allow(clippy::cast_possible_truncation)]
    let reduced = (word % FINGERPRINT_MODULUS) as u32;
    Ok(Fingerprint(reduced))
}
