//! Exercise addressing
//!
//! Consumers locate an exercise through a (workout id, exercise id) pair.
//! Inside the crate the pair travels as an `ExerciseKey`. Two string forms
//! exist for boundaries that need one handle:
//!
//! - `encode`/`decode`: the legacy `workout-exercise` form, split at the last
//!   separator. Ambiguous when the exercise id itself contains `-`.
//! - `ExerciseKey::to_handle`/`from_handle`: an escaped form that round-trips
//!   any pair of ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkoutError};

pub const SEPARATOR: char = '-';
const ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseKey {
  pub workout_id: String,
  pub exercise_id: String,
}

impl ExerciseKey {
  pub fn new(workout_id: impl Into<String>, exercise_id: impl Into<String>) -> Self {
    Self {
      workout_id: workout_id.into(),
      exercise_id: exercise_id.into(),
    }
  }

  /// Escaped single-string form, safe for ids containing the separator
  pub fn to_handle(&self) -> String {
    let mut handle = String::with_capacity(self.workout_id.len() + self.exercise_id.len() + 1);
    push_escaped(&mut handle, &self.workout_id);
    handle.push(SEPARATOR);
    push_escaped(&mut handle, &self.exercise_id);
    handle
  }

  /// Parse a handle produced by `to_handle`. Requires exactly one unescaped separator.
  pub fn from_handle(handle: &str) -> Result<Self> {
    let mut parts = vec![String::new()];
    let mut chars = handle.chars();

    while let Some(c) = chars.next() {
      match c {
        ESCAPE => match chars.next() {
          Some(escaped @ (ESCAPE | SEPARATOR)) => push_last(&mut parts, escaped),
          Some(other) => {
            return Err(WorkoutError::Validation(format!(
              "Invalid escape '\\{}' in exercise handle: {}",
              other, handle
            )))
          }
          None => {
            return Err(WorkoutError::Validation(format!(
              "Dangling escape in exercise handle: {}",
              handle
            )))
          }
        },
        SEPARATOR => parts.push(String::new()),
        other => push_last(&mut parts, other),
      }
    }

    match <[String; 2]>::try_from(parts) {
      Ok([workout_id, exercise_id]) => Ok(Self {
        workout_id,
        exercise_id,
      }),
      Err(parts) => Err(WorkoutError::Validation(format!(
        "Exercise handle must contain exactly one separator, found {}: {}",
        parts.len() - 1,
        handle
      ))),
    }
  }
}

impl fmt::Display for ExerciseKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_handle())
  }
}

impl FromStr for ExerciseKey {
  type Err = WorkoutError;
  fn from_str(s: &str) -> Result<Self> {
    Self::from_handle(s)
  }
}

fn push_escaped(out: &mut String, id: &str) {
  for c in id.chars() {
    if c == ESCAPE || c == SEPARATOR {
      out.push(ESCAPE);
    }
    out.push(c);
  }
}

fn push_last(parts: &mut [String], c: char) {
  if let Some(last) = parts.last_mut() {
    last.push(c);
  }
}

/// ---------------------------------------------------------------------------
/// Legacy composite ids
/// ---------------------------------------------------------------------------

/// `workout_id` + `-` + `exercise_id`, no escaping
pub fn encode(workout_id: &str, exercise_id: &str) -> String {
  format!("{}{}{}", workout_id, SEPARATOR, exercise_id)
}

/// Split a legacy composite id at its last separator
pub fn decode(composite_id: &str) -> Result<ExerciseKey> {
  let (workout_id, exercise_id) = composite_id.rsplit_once(SEPARATOR).ok_or_else(|| {
    WorkoutError::Validation(format!("Composite id has no separator: {}", composite_id))
  })?;
  Ok(ExerciseKey::new(workout_id, exercise_id))
}
