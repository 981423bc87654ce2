//! Decoder from raw control app bytes to [`UpstreamStatus`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;
use crate::types::{ClusterStats, GcStats, Stats, StatusKind, UpstreamStatus};

/// Decode a response body as the family named by `kind`.
///
/// Missing or `null` fields become zero; unknown fields are ignored.
/// Invalid JSON, a non-object document, or a field of the wrong type
/// is an error.
pub fn decode(bytes: &[u8], kind: StatusKind) -> Result<UpstreamStatus, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|source| DecodeError::Malformed { kind, source })?;

    // serde would happily read a struct out of a JSON array; reject it up front.
    if !value.is_object() {
        return Err(DecodeError::Shape {
            kind,
            found: json_type(&value),
        });
    }

    Ok(match kind {
        StatusKind::Stats => UpstreamStatus::Stats(from_object::<Stats>(value, kind)?),
        StatusKind::GcStats => UpstreamStatus::Gc(from_object::<GcStats>(value, kind)?),
        StatusKind::ClusterStats => {
            UpstreamStatus::Cluster(from_object::<ClusterStats>(value, kind)?)
        }
    })
}

fn from_object<T: DeserializeOwned>(value: Value, kind: StatusKind) -> Result<T, DecodeError> {
    serde_path_to_error::deserialize(value).map_err(|e| DecodeError::Field {
        kind,
        path: e.path().to_string(),
        source: e.into_inner(),
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
