//! Parameter representation at the serialization boundary
//!
//! Hyperparameters are held as `serde_json` values: a closed tagged variant
//! over null, bool, int, float, string, sequence and mapping. Anything the
//! JSON data model cannot hold never enters the crate — arbitrary caller
//! types are funneled through [`from_serialize`], which surfaces
//! [`Error::UnsupportedValueKind`] instead of guessing at a rendering.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Top-level hyperparameter mapping: named parameter groups keyed by name.
///
/// The map representation is `serde_json`'s default `BTreeMap`, so key
/// order is always sorted regardless of insertion order.
pub type ParamMap = Map<String, Value>;

/// Convert an arbitrary serializable value into a [`ParamMap`].
///
/// # Value policy
///
/// - Mapping keys must be strings; non-string keys fail.
/// - Non-finite floats (NaN, ±inf) are normalized to `null` by the JSON
///   serializer. Callers that need to distinguish them must do so before
///   this boundary.
/// - Values whose `Serialize` impl fails (closures, handles, anything
///   without a data representation) fail.
/// - The top level must be a mapping of named parameter groups.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValueKind`] on any of the failures above.
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Hyperparameters {
///     training: Training,
/// }
///
/// #[derive(Serialize)]
/// struct Training {
///     batch_size: u32,
///     epochs: u32,
/// }
///
/// let params = expman::params::from_serialize(&Hyperparameters {
///     training: Training { batch_size: 128, epochs: 12 },
/// })?;
/// assert!(params.contains_key("training"));
/// # Ok::<(), expman::Error>(())
/// ```
pub fn from_serialize<T: Serialize>(value: &T) -> Result<ParamMap> {
    match serde_json::to_value(value).map_err(|e| Error::UnsupportedValueKind(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(Error::UnsupportedValueKind(format!(
            "hyperparameters must be a mapping of named groups, got {}",
            kind_name(&other)
        ))),
    }
}

/// Human-readable name of a value's kind, for error messages.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
