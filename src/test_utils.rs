//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - An in-memory `WorkoutStore` with failure injection

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Result, WorkoutError};
use crate::models::{Exercise, NewWorkout, RawSession, Workout};
use crate::session::latest_exercises;
use crate::store::WorkoutStore;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
pub async fn setup_test_db() -> SqlitePool {
  crate::db::initialize_in_memory()
    .await
    .expect("Failed to create in-memory database")
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert a session row verbatim, bypassing the store's write shape
pub async fn insert_raw_session(pool: &SqlitePool, workout_id: &str, position: i64, payload: &str) {
  sqlx::query(
    r#"
    INSERT INTO workout_sessions (workout_id, position, payload_json, recorded_at)
    VALUES (?1, ?2, ?3, ?4)
    "#,
  )
  .bind(workout_id)
  .bind(position)
  .bind(payload)
  .bind(Utc::now())
  .execute(pool)
  .await
  .expect("Failed to insert raw session");
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Exercise with one set per entry in `reps`, all at `weight`
pub fn mock_exercise(id: &str, reps: &[u32], weight: f64) -> Exercise {
  Exercise {
    id: id.to_string(),
    name: format!("Exercise {}", id),
    sets: reps.len() as u32,
    reps: reps.to_vec(),
    weight,
    weights: None,
    completed: false,
    updated_at: None,
  }
}

pub fn mock_workout(id: &str, sessions: Vec<RawSession>) -> Workout {
  Workout {
    id: id.to_string(),
    owner_id: "u1".to_string(),
    title: "Test Workout".to_string(),
    week: "Week 1".to_string(),
    completed: false,
    created_at: Utc::now(),
    sessions,
  }
}

/// Exercise `id` from the latest session of `workout`
pub fn workout_exercise(workout: &Workout, id: &str) -> Exercise {
  latest_exercises(&workout.sessions)
    .into_iter()
    .find(|e| e.id == id)
    .expect("Exercise should exist in latest session")
}

/// Poll `check` until it holds, giving spawned tasks time to run
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
  F: FnMut() -> Fut,
  Fut: Future<Output = bool>,
{
  for _ in 0..100 {
    if check().await {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  false
}

/// ---------------------------------------------------------------------------
/// Mock Store
/// ---------------------------------------------------------------------------

/// In-memory `WorkoutStore`. `fail_next` makes the next call fail with a
/// persistence error.
#[derive(Default)]
pub struct MockStore {
  workouts: Mutex<Vec<Workout>>,
  failure: Mutex<Option<String>>,
  appends: AtomicUsize,
}

impl MockStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_next(&self, message: &str) {
    *self.failure.lock().unwrap() = Some(message.to_string());
  }

  /// Insert a workout directly, as if another client had created it
  pub fn seed(&self, owner_id: &str, title: &str) -> Workout {
    let mut workout = mock_workout(&Uuid::new_v4().to_string(), vec![]);
    workout.owner_id = owner_id.to_string();
    workout.title = title.to_string();
    self.workouts.lock().unwrap().push(workout.clone());
    workout
  }

  pub fn replace(&self, workout: Workout) {
    let mut workouts = self.workouts.lock().unwrap();
    workouts.retain(|w| w.id != workout.id);
    workouts.push(workout);
  }

  pub fn forget(&self, id: &str) {
    self.workouts.lock().unwrap().retain(|w| w.id != id);
  }

  pub fn workout_count(&self) -> usize {
    self.workouts.lock().unwrap().len()
  }

  pub fn append_calls(&self) -> usize {
    self.appends.load(Ordering::SeqCst)
  }

  fn check_failure(&self) -> Result<()> {
    match self.failure.lock().unwrap().take() {
      Some(message) => Err(WorkoutError::Persistence(message)),
      None => Ok(()),
    }
  }
}

#[async_trait]
impl WorkoutStore for MockStore {
  async fn create_workout(&self, owner_id: &str, draft: &NewWorkout) -> Result<Workout> {
    self.check_failure()?;

    let mut workout = mock_workout(&Uuid::new_v4().to_string(), vec![]);
    workout.owner_id = owner_id.to_string();
    workout.title = draft.title.clone();
    workout.week = draft.week.clone();
    if !draft.exercises.is_empty() {
      workout.sessions.push(RawSession::wrapped(draft.exercises.clone()));
    }

    self.workouts.lock().unwrap().push(workout.clone());
    Ok(workout)
  }

  async fn fetch_workouts_by_owner(&self, owner_id: &str) -> Result<Vec<Workout>> {
    self.check_failure()?;
    Ok(
      self
        .workouts
        .lock()
        .unwrap()
        .iter()
        .filter(|w| w.owner_id == owner_id)
        .cloned()
        .collect(),
    )
  }

  async fn delete_workout(&self, id: &str) -> Result<()> {
    self.check_failure()?;
    let mut workouts = self.workouts.lock().unwrap();
    let before = workouts.len();
    workouts.retain(|w| w.id != id);
    if workouts.len() == before {
      return Err(WorkoutError::NotFound(format!("Workout {}", id)));
    }
    Ok(())
  }

  async fn append_session_snapshot(&self, workout_id: &str, exercises: &[Exercise]) -> Result<()> {
    self.check_failure()?;
    let mut workouts = self.workouts.lock().unwrap();
    let workout = workouts
      .iter_mut()
      .find(|w| w.id == workout_id)
      .ok_or_else(|| WorkoutError::NotFound(format!("Workout {}", workout_id)))?;

    workout.sessions.push(RawSession::wrapped(exercises.to_vec()));
    workout.completed = true;
    self.appends.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('workouts', 'workout_sessions')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected both tables, got {:?}", tables);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_mock_store_failure_is_one_shot() {
    let store = MockStore::new();
    store.fail_next("down");

    assert!(store.fetch_workouts_by_owner("u1").await.is_err());
    assert!(store.fetch_workouts_by_owner("u1").await.is_ok());
  }

  #[test]
  fn test_mock_exercise_matches_sets() {
    let exercise = mock_exercise("e1", &[8, 8, 6], 50.0);
    assert_eq!(exercise.sets, 3);
    assert_eq!(exercise.total_reps(), 22);
    assert!(!exercise.reps_mismatch());
  }
}
