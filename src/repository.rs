//! Workout repository
//!
//! Owns the in-memory workout cache and is the only way to change it.
//! Writes that must be durable go to the `WorkoutStore` first and are
//! committed locally only after the store succeeds. Lookups return `Option`,
//! every other fallible operation returns `Result`.
//!
//! There is no per-workout locking: two concurrent edits of the same
//! exercise resolve as last write committed wins.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::composite_id::{self, ExerciseKey};
use crate::error::{Result, WorkoutError};
use crate::events::{AuthEvent, SyncHandle};
use crate::models::{Exercise, ExercisePatch, NewWorkout, RawSession, Workout, WorkoutPatch};
use crate::progress::{self, ComparisonMode, ExerciseProgress};
use crate::session::{latest_exercises, normalize};
use crate::store::WorkoutStore;

pub struct WorkoutRepository {
  store: Arc<dyn WorkoutStore>,
  workouts: RwLock<Vec<Workout>>,
}

impl WorkoutRepository {
  pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
    Self {
      store,
      workouts: RwLock::new(Vec::new()),
    }
  }

  // ---------------------------------------------------------------------------
  // Store-backed operations
  // ---------------------------------------------------------------------------

  /// Create a workout through the store and cache the stored copy
  pub async fn add(&self, owner_id: &str, draft: NewWorkout) -> Result<Workout> {
    if draft.title.trim().is_empty() {
      return Err(WorkoutError::Validation("Workout title is required".into()));
    }

    let workout = self.store.create_workout(owner_id, &draft).await?;
    info!(workout_id = %workout.id, owner_id, "Workout added");

    self.workouts.write().await.push(workout.clone());
    Ok(workout)
  }

  /// Delete through the store, then drop the cached copy
  pub async fn remove(&self, id: &str) -> Result<()> {
    self.store.delete_workout(id).await?;
    self.workouts.write().await.retain(|w| w.id != id);
    info!(workout_id = id, "Workout removed");
    Ok(())
  }

  /// Replace the whole cache with the store's view of `owner_id`'s workouts
  pub async fn list(&self, owner_id: &str) -> Result<Vec<Workout>> {
    let fetched = self.store.fetch_workouts_by_owner(owner_id).await?;
    debug!(owner_id, count = fetched.len(), "Workouts fetched");

    let mut workouts = self.workouts.write().await;
    *workouts = fetched.clone();
    Ok(fetched)
  }

  /// Record `exercises` as a new session and mark the workout completed
  pub async fn save_progress(&self, workout_id: &str, exercises: Vec<Exercise>) -> Result<()> {
    if self.get_by_id(workout_id).await.is_none() {
      return Err(WorkoutError::NotFound(format!("Workout {}", workout_id)));
    }
    validate_snapshot(&exercises)?;

    let now = Utc::now();
    let stamped: Vec<Exercise> = exercises
      .into_iter()
      .map(|mut exercise| {
        if exercise.reps_mismatch() {
          warn!(
            workout_id,
            exercise_id = %exercise.id,
            sets = exercise.sets,
            reps = exercise.reps.len(),
            "Rep count list does not match set count"
          );
        }
        exercise.updated_at = Some(now);
        exercise
      })
      .collect();

    self.store.append_session_snapshot(workout_id, &stamped).await?;

    let mut workouts = self.workouts.write().await;
    match workouts.iter_mut().find(|w| w.id == workout_id) {
      Some(workout) => {
        workout.sessions.push(RawSession::wrapped(stamped));
        workout.completed = true;
        info!(workout_id, sessions = workout.sessions.len(), "Progress saved");
      }
      // Removed while the store call was in flight; the store copy stays authoritative
      None => warn!(workout_id, "Progress saved for a workout no longer cached"),
    }
    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Local operations
  // ---------------------------------------------------------------------------

  pub async fn get_by_id(&self, id: &str) -> Option<Workout> {
    self.workouts.read().await.iter().find(|w| w.id == id).cloned()
  }

  /// Snapshot of every cached workout
  pub async fn workouts(&self) -> Vec<Workout> {
    self.workouts.read().await.clone()
  }

  /// Merge title/week/completed into the cached workout. Not persisted.
  pub async fn update(&self, id: &str, patch: WorkoutPatch) -> Result<Workout> {
    let mut workouts = self.workouts.write().await;
    let workout = workouts
      .iter_mut()
      .find(|w| w.id == id)
      .ok_or_else(|| WorkoutError::NotFound(format!("Workout {}", id)))?;

    patch.apply(workout);
    Ok(workout.clone())
  }

  /// Exercise from the latest session of the addressed workout
  pub async fn get_exercise(&self, key: &ExerciseKey) -> Option<Exercise> {
    let workouts = self.workouts.read().await;
    let workout = workouts.iter().find(|w| w.id == key.workout_id)?;
    latest_exercises(&workout.sessions)
      .into_iter()
      .find(|e| e.id == key.exercise_id)
  }

  pub async fn get_exercise_by_composite_id(&self, id: &str) -> Option<Exercise> {
    let key = composite_id::decode(id).ok()?;
    self.get_exercise(&key).await
  }

  /// Merge `patch` into an exercise of the latest session. Leaves every
  /// workout untouched when the workout, session or exercise is missing.
  pub async fn update_exercise(&self, key: &ExerciseKey, patch: ExercisePatch) -> Result<Exercise> {
    let mut workouts = self.workouts.write().await;
    let workout = workouts
      .iter_mut()
      .find(|w| w.id == key.workout_id)
      .ok_or_else(|| WorkoutError::NotFound(format!("Workout {}", key.workout_id)))?;

    let latest = workout.sessions.last_mut().ok_or_else(|| {
      WorkoutError::NotFound(format!("Workout {} has no sessions", key.workout_id))
    })?;

    let mut exercises = normalize(latest);
    let exercise = exercises
      .iter_mut()
      .find(|e| e.id == key.exercise_id)
      .ok_or_else(|| {
        WorkoutError::NotFound(format!(
          "Exercise {} in workout {}",
          key.exercise_id, key.workout_id
        ))
      })?;

    patch.apply(exercise, Utc::now());
    let updated = exercise.clone();

    *latest = RawSession::wrapped(exercises);
    debug!(workout_id = %key.workout_id, exercise_id = %key.exercise_id, "Exercise updated");
    Ok(updated)
  }

  pub async fn update_exercise_by_composite_id(
    &self,
    id: &str,
    patch: ExercisePatch,
  ) -> Result<Exercise> {
    let key = composite_id::decode(id)?;
    self.update_exercise(&key, patch).await
  }

  /// Progress of the latest session against the baseline chosen by `mode`.
  /// None when the workout is unknown or has fewer than two sessions.
  pub async fn calculate_progress(
    &self,
    workout_id: &str,
    mode: ComparisonMode,
  ) -> Option<Vec<ExerciseProgress>> {
    let snapshot = self.get_by_id(workout_id).await?;
    progress::calculate_progress(&snapshot, mode)
  }

  /// Drop every cached workout
  pub async fn clear(&self) {
    self.workouts.write().await.clear();
  }

  // ---------------------------------------------------------------------------
  // Auth events
  // ---------------------------------------------------------------------------

  /// Follow sign-in/sign-out: reload on sign-in, empty the cache on sign-out
  pub fn attach(self: Arc<Self>, mut events: broadcast::Receiver<AuthEvent>) -> SyncHandle {
    let task = tokio::spawn(async move {
      loop {
        match events.recv().await {
          Ok(AuthEvent::SignedIn { owner_id }) => {
            if let Err(e) = self.list(&owner_id).await {
              warn!(owner_id = %owner_id, error = %e, "Failed to load workouts after sign-in");
            }
          }
          Ok(AuthEvent::SignedOut) => {
            self.clear().await;
            debug!("Workout cache cleared after sign-out");
          }
          Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "Auth event receiver lagged");
          }
          Err(RecvError::Closed) => break,
        }
      }
    });
    SyncHandle::new(task)
  }
}

fn validate_snapshot(exercises: &[Exercise]) -> Result<()> {
  for exercise in exercises {
    if exercise.id.trim().is_empty() {
      return Err(WorkoutError::Validation("Exercise id is required".into()));
    }
    if exercise.name.trim().is_empty() {
      return Err(WorkoutError::Validation(format!(
        "Exercise {} has no name",
        exercise.id
      )));
    }
  }
  Ok(())
}
