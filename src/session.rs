//! Session normalization
//!
//! Session history mixes two storage shapes (a bare exercise array and an
//! object wrapping it under `exercises`). Everything that reads exercises out
//! of a session goes through `normalize` first.

use tracing::warn;

use crate::models::{Exercise, RawSession};

/// Canonical exercise list for a stored session. Unrecognized shapes yield
/// an empty list rather than an error.
pub fn normalize(session: &RawSession) -> Vec<Exercise> {
  match session {
    RawSession::Bare(exercises) => exercises.clone(),
    RawSession::Wrapped { exercises } => exercises.clone(),
    RawSession::Unrecognized(value) => {
      warn!(shape = shape_name(value), "Unrecognized session shape, treating as empty");
      Vec::new()
    }
  }
}

/// Same as `normalize`, starting from raw JSON
pub fn normalize_value(value: &serde_json::Value) -> Vec<Exercise> {
  let session = serde_json::from_value::<RawSession>(value.clone())
    .unwrap_or_else(|_| RawSession::Unrecognized(value.clone()));
  normalize(&session)
}

/// Exercise list of the most recent session, empty when there is none
pub fn latest_exercises(sessions: &[RawSession]) -> Vec<Exercise> {
  sessions.last().map(normalize).unwrap_or_default()
}

fn shape_name(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "bool",
    serde_json::Value::Number(_) => "number",
    serde_json::Value::String(_) => "string",
    serde_json::Value::Array(_) => "array",
    serde_json::Value::Object(_) => "object",
  }
}
