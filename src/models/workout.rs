use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
  pub id: String,
  pub owner_id: String,
  pub title: String,
  #[serde(default)]
  pub week: String,
  #[serde(default)]
  pub completed: bool,
  pub created_at: DateTime<Utc>,
  /// Chronological, oldest first. Only the last entry is ever rewritten.
  #[serde(default)]
  pub sessions: Vec<RawSession>,
}

/// For creating new workouts (without id, owner, created_at)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkout {
  pub title: String,
  #[serde(default)]
  pub week: String,
  /// Template exercises; when non-empty they become the first session
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exercises: Vec<Exercise>,
}

/// A session as it appears on the wire or in storage.
///
/// Older records are a bare array of exercises, newer ones wrap the array
/// under `exercises`. Anything else is kept verbatim so history stays
/// browsable; `session::normalize` turns every variant into a plain list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSession {
  Bare(Vec<Exercise>),
  Wrapped { exercises: Vec<Exercise> },
  Unrecognized(serde_json::Value),
}

impl RawSession {
  /// The shape used for every new write
  pub fn wrapped(exercises: Vec<Exercise>) -> Self {
    RawSession::Wrapped { exercises }
  }
}

/// One exercise entry of a session.
///
/// Stored sessions predate several schema changes, so every field reads
/// leniently: nulls and wrong types fall back to the field default instead of
/// failing the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  #[serde(default, deserialize_with = "lenient::text")]
  pub id: String,
  #[serde(default, deserialize_with = "lenient::text")]
  pub name: String,
  /// Target set count. `reps.len()` usually matches but nothing enforces it.
  #[serde(default, deserialize_with = "lenient::count")]
  pub sets: u32,
  #[serde(default, deserialize_with = "lenient::counts")]
  pub reps: Vec<u32>,
  /// Legacy single weight, always present
  #[serde(default, deserialize_with = "lenient::number")]
  pub weight: f64,
  /// Per-set weights, preferred over `weight` when present and non-empty
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient::numbers"
  )]
  pub weights: Option<Vec<f64>>,
  #[serde(default, deserialize_with = "lenient::flag")]
  pub completed: bool,
  /// RFC 3339 string or epoch milliseconds on read, RFC 3339 on write
  #[serde(rename = "lastUpdated", default, deserialize_with = "lenient::timestamp")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Exercise {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      sets: 0,
      reps: Vec::new(),
      weight: 0.0,
      weights: None,
      completed: false,
      updated_at: None,
    }
  }

  fn per_set_weights(&self) -> Option<&[f64]> {
    self.weights.as_deref().filter(|w| !w.is_empty())
  }

  /// Mean of the per-set weights, falling back to the scalar weight
  pub fn effective_weight(&self) -> f64 {
    match self.per_set_weights() {
      Some(weights) => weights.iter().sum::<f64>() / weights.len() as f64,
      None => self.weight,
    }
  }

  pub fn total_reps(&self) -> u64 {
    self.reps.iter().map(|reps| u64::from(*reps)).sum()
  }

  /// Sum of weight x reps per set. Sets without a matching weight count as zero.
  /// An empty `weights` list falls back to the scalar weight, as for `effective_weight`.
  pub fn volume(&self) -> f64 {
    match self.per_set_weights() {
      Some(weights) => self
        .reps
        .iter()
        .enumerate()
        .map(|(i, reps)| weights.get(i).copied().unwrap_or(0.0) * f64::from(*reps))
        .sum(),
      None => self.weight * self.total_reps() as f64,
    }
  }

  /// True when the per-set rep list disagrees with the target set count
  pub fn reps_mismatch(&self) -> bool {
    self.reps.len() != self.sets as usize
  }
}

/// Local-only edits to a workout's header fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPatch {
  pub title: Option<String>,
  pub week: Option<String>,
  pub completed: Option<bool>,
}

impl WorkoutPatch {
  pub fn apply(&self, workout: &mut Workout) {
    if let Some(title) = &self.title {
      workout.title = title.clone();
    }
    if let Some(week) = &self.week {
      workout.week = week.clone();
    }
    if let Some(completed) = self.completed {
      workout.completed = completed;
    }
  }
}

/// Edits to one exercise of the latest session
#[derive(Debug, Clone, Default)]
pub struct ExercisePatch {
  pub name: Option<String>,
  pub sets: Option<u32>,
  pub reps: Option<Vec<u32>>,
  pub weight: Option<f64>,
  /// `Some(None)` clears the per-set weights
  pub weights: Option<Option<Vec<f64>>>,
  pub completed: Option<bool>,
}

impl ExercisePatch {
  pub fn apply(&self, exercise: &mut Exercise, now: DateTime<Utc>) {
    if let Some(name) = &self.name {
      exercise.name = name.clone();
    }
    if let Some(sets) = self.sets {
      exercise.sets = sets;
    }
    if let Some(reps) = &self.reps {
      exercise.reps = reps.clone();
    }
    if let Some(weight) = self.weight {
      exercise.weight = weight;
    }
    if let Some(weights) = &self.weights {
      exercise.weights = weights.clone();
    }
    if let Some(completed) = self.completed {
      exercise.completed = completed;
    }
    exercise.updated_at = Some(now);
  }
}

/// Field readers for `Exercise` that never reject a value
mod lenient {
  use chrono::{DateTime, TimeZone, Utc};
  use serde::{Deserialize, Deserializer};
  use serde_json::Value;

  fn as_number(value: &Value) -> Option<f64> {
    match value {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  // Float to int casts saturate, and NaN becomes 0
  fn as_count(value: &Value) -> u32 {
    as_number(value).map(|n| n as u32).unwrap_or(0)
  }

  pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
      Value::String(s) => s,
      Value::Number(n) => n.to_string(),
      _ => String::new(),
    })
  }

  pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(as_count(&Value::deserialize(deserializer)?))
  }

  pub fn counts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
      Value::Array(items) => items.iter().map(as_count).collect(),
      _ => Vec::new(),
    })
  }

  pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(as_number(&Value::deserialize(deserializer)?).unwrap_or(0.0))
  }

  pub fn numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
      Value::Array(items) => Some(items.iter().map(|v| as_number(v).unwrap_or(0.0)).collect()),
      _ => None,
    })
  }

  pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
      Value::Bool(b) => b,
      Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
      Value::String(s) => s.eq_ignore_ascii_case("true"),
      _ => false,
    })
  }

  pub fn timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
      Value::String(s) => DateTime::parse_from_rfc3339(&s)
        .ok()
        .map(|t| t.with_timezone(&Utc)),
      Value::Number(n) => n
        .as_i64()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
      _ => None,
    })
  }
}
