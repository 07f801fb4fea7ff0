//! Session-over-session progress
//!
//! Compares the latest recorded session of a workout against a baseline
//! session and reports, per exercise:
//! - weight (mean of per-set weights, or the scalar weight)
//! - reps (sum over sets)
//! - volume (weight x reps summed over sets)
//!
//! Key rules:
//! - Needs at least two sessions, otherwise there is nothing to compare
//! - Exercises are taken from the first session, in its order
//! - An exercise missing from either compared session gets no metrics
//! - A zero baseline has no percentage

use serde::{Deserialize, Serialize};

use crate::models::{Exercise, Workout};
use crate::session::normalize;

// ---------------------------------------------------------------------------
/// Comparison Mode: Which session is the "before" state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonMode {
    /// Session immediately before the latest one
    #[default]
    LastSession,
    /// First session ever recorded
    AllHistory,
}

impl ComparisonMode {
    /// Index of the baseline session among `session_count` sessions
    pub fn baseline_index(&self, session_count: usize) -> Option<usize> {
        if session_count < 2 {
            return None;
        }
        match self {
            Self::LastSession => Some(session_count - 2),
            Self::AllHistory => Some(0),
        }
    }
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastSession => write!(f, "lastSession"),
            Self::AllHistory => write!(f, "allHistory"),
        }
    }
}

impl std::str::FromStr for ComparisonMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lastSession" => Ok(Self::LastSession),
            "allHistory" => Ok(Self::AllHistory),
            _ => Err(format!("Unknown comparison mode: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
/// Metric Progress: before/after for one metric
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricProgress<T> {
    pub previous: T,
    pub current: T,
    pub increase: T,
    /// e.g. "11.1%". None when the baseline is zero.
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    pub exercise_id: String,
    pub name: String,
    pub weight: Option<MetricProgress<f64>>,
    pub reps: Option<MetricProgress<i64>>,
    pub volume: Option<MetricProgress<i64>>,
}

impl ExerciseProgress {
    fn compare(exercise_id: &str, name: &str, baseline: &Exercise, latest: &Exercise) -> Self {
        Self {
            exercise_id: exercise_id.to_string(),
            name: name.to_string(),
            weight: Some(weight_progress(baseline, latest)),
            reps: Some(reps_progress(baseline, latest)),
            volume: Some(volume_progress(baseline, latest)),
        }
    }

    fn without_metrics(exercise: &Exercise) -> Self {
        Self {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            weight: None,
            reps: None,
            volume: None,
        }
    }

    /// True when at least one metric could be computed
    pub fn has_metrics(&self) -> bool {
        self.weight.is_some() || self.reps.is_some() || self.volume.is_some()
    }
}

// ---------------------------------------------------------------------------
/// Progress Calculation
// ---------------------------------------------------------------------------

/// Compare the latest session of `workout` against the baseline picked by
/// `mode`. Returns None when the workout has fewer than two sessions.
pub fn calculate_progress(workout: &Workout, mode: ComparisonMode) -> Option<Vec<ExerciseProgress>> {
    let baseline_idx = mode.baseline_index(workout.sessions.len())?;
    let latest_idx = workout.sessions.len() - 1;

    let first = normalize(&workout.sessions[0]);
    let baseline = normalize(&workout.sessions[baseline_idx]);
    let latest = normalize(&workout.sessions[latest_idx]);

    let progress = first
        .iter()
        .map(|exercise| {
            let before = find_exercise(&baseline, &exercise.id);
            let after = find_exercise(&latest, &exercise.id);
            match (before, after) {
                (Some(before), Some(after)) => {
                    ExerciseProgress::compare(&exercise.id, &exercise.name, before, after)
                }
                _ => ExerciseProgress::without_metrics(exercise),
            }
        })
        .collect();

    Some(progress)
}

fn find_exercise<'a>(exercises: &'a [Exercise], id: &str) -> Option<&'a Exercise> {
    exercises.iter().find(|e| e.id == id)
}

fn weight_progress(baseline: &Exercise, latest: &Exercise) -> MetricProgress<f64> {
    let previous = baseline.effective_weight();
    let current = latest.effective_weight();
    let increase = current - previous;

    MetricProgress {
        previous: round_to_tenth(previous),
        current: round_to_tenth(current),
        increase: round_to_tenth(increase),
        percentage: format_percentage(increase, previous),
    }
}

fn reps_progress(baseline: &Exercise, latest: &Exercise) -> MetricProgress<i64> {
    let previous = i64::try_from(baseline.total_reps()).unwrap_or(i64::MAX);
    let current = i64::try_from(latest.total_reps()).unwrap_or(i64::MAX);
    let increase = current - previous;

    MetricProgress {
        previous,
        current,
        increase,
        percentage: format_percentage(increase as f64, previous as f64),
    }
}

fn volume_progress(baseline: &Exercise, latest: &Exercise) -> MetricProgress<i64> {
    let previous = baseline.volume();
    let current = latest.volume();
    let increase = current - previous;

    MetricProgress {
        previous: previous.round() as i64,
        current: current.round() as i64,
        increase: increase.round() as i64,
        percentage: format_percentage(increase, previous),
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One-decimal percentage of `increase` relative to `baseline`
fn format_percentage(increase: f64, baseline: f64) -> Option<String> {
    if baseline == 0.0 {
        return None;
    }
    let pct = increase / baseline * 100.0;
    pct.is_finite().then(|| format!("{:.1}%", pct))
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
