use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::WorkoutStore;
use crate::db::DbPool;
use crate::error::{Result, WorkoutError};
use crate::models::{Exercise, NewWorkout, RawSession, Workout};

#[derive(Debug, sqlx::FromRow)]
struct WorkoutRow {
  id: String,
  owner_id: String,
  title: String,
  week: String,
  completed: bool,
  created_at: DateTime<Utc>,
}

impl WorkoutRow {
  fn into_workout(self, sessions: Vec<RawSession>) -> Workout {
    Workout {
      id: self.id,
      owner_id: self.owner_id,
      title: self.title,
      week: self.week,
      completed: self.completed,
      created_at: self.created_at,
      sessions,
    }
  }
}

/// SQLite-backed store. Session payloads are stored as JSON text, so rows
/// written by older clients as bare arrays stay readable.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

fn parse_payload(workout_id: &str, payload: &str) -> RawSession {
  serde_json::from_str::<RawSession>(payload).unwrap_or_else(|e| {
    warn!(workout_id, error = %e, "Session payload is not valid JSON");
    RawSession::Unrecognized(serde_json::Value::String(payload.to_string()))
  })
}

async fn insert_session(
  conn: &mut sqlx::SqliteConnection,
  workout_id: &str,
  exercises: &[Exercise],
) -> Result<i64> {
  let payload = serde_json::to_string(&RawSession::wrapped(exercises.to_vec()))?;

  let position: i64 = sqlx::query_scalar(
    "SELECT COALESCE(MAX(position) + 1, 0) FROM workout_sessions WHERE workout_id = ?",
  )
  .bind(workout_id)
  .fetch_one(&mut *conn)
  .await?;

  sqlx::query(
    r#"
    INSERT INTO workout_sessions (workout_id, position, payload_json, recorded_at)
    VALUES (?1, ?2, ?3, ?4)
    "#,
  )
  .bind(workout_id)
  .bind(position)
  .bind(&payload)
  .bind(Utc::now())
  .execute(&mut *conn)
  .await?;

  Ok(position)
}

#[async_trait]
impl WorkoutStore for SqliteStore {
  async fn create_workout(&self, owner_id: &str, draft: &NewWorkout) -> Result<Workout> {
    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();

    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
      INSERT INTO workouts (id, owner_id, title, week, completed, created_at)
      VALUES (?1, ?2, ?3, ?4, 0, ?5)
      "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.week)
    .bind(created_at)
    .execute(&mut *tx)
    .await?;

    let mut sessions = Vec::new();
    if !draft.exercises.is_empty() {
      insert_session(&mut *tx, &id, &draft.exercises).await?;
      sessions.push(RawSession::wrapped(draft.exercises.clone()));
    }

    tx.commit().await?;
    debug!(workout_id = %id, owner_id, "Workout created");

    Ok(Workout {
      id,
      owner_id: owner_id.to_string(),
      title: draft.title.clone(),
      week: draft.week.clone(),
      completed: false,
      created_at,
      sessions,
    })
  }

  async fn fetch_workouts_by_owner(&self, owner_id: &str) -> Result<Vec<Workout>> {
    let rows = sqlx::query_as::<_, WorkoutRow>(
      r#"
      SELECT id, owner_id, title, week, completed, created_at
      FROM workouts
      WHERE owner_id = ?
      ORDER BY created_at, rowid
      "#,
    )
    .bind(owner_id)
    .fetch_all(&self.pool)
    .await?;

    let session_rows: Vec<(String, String)> = sqlx::query_as(
      r#"
      SELECT s.workout_id, s.payload_json
      FROM workout_sessions s
      JOIN workouts w ON w.id = s.workout_id
      WHERE w.owner_id = ?
      ORDER BY s.workout_id, s.position
      "#,
    )
    .bind(owner_id)
    .fetch_all(&self.pool)
    .await?;

    let mut sessions: HashMap<String, Vec<RawSession>> = HashMap::new();
    for (workout_id, payload) in session_rows {
      let session = parse_payload(&workout_id, &payload);
      sessions.entry(workout_id).or_default().push(session);
    }

    Ok(
      rows
        .into_iter()
        .map(|row| {
          let history = sessions.remove(&row.id).unwrap_or_default();
          row.into_workout(history)
        })
        .collect(),
    )
  }

  async fn delete_workout(&self, id: &str) -> Result<()> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM workout_sessions WHERE workout_id = ?")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    let result = sqlx::query("DELETE FROM workouts WHERE id = ?")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    if result.rows_affected() == 0 {
      return Err(WorkoutError::NotFound(format!("Workout {}", id)));
    }

    tx.commit().await?;
    Ok(())
  }

  async fn append_session_snapshot(&self, workout_id: &str, exercises: &[Exercise]) -> Result<()> {
    let mut tx = self.pool.begin().await?;

    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM workouts WHERE id = ?")
      .bind(workout_id)
      .fetch_optional(&mut *tx)
      .await?;

    if exists.is_none() {
      return Err(WorkoutError::NotFound(format!("Workout {}", workout_id)));
    }

    let position = insert_session(&mut *tx, workout_id, exercises).await?;

    sqlx::query("UPDATE workouts SET completed = 1 WHERE id = ?")
      .bind(workout_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    debug!(workout_id, position, "Session snapshot appended");

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::normalize;
  use crate::test_utils::*;

  fn draft(title: &str, exercises: Vec<Exercise>) -> NewWorkout {
    NewWorkout {
      title: title.to_string(),
      week: "Week 1".to_string(),
      exercises,
    }
  }

  #[tokio::test]
  async fn test_create_and_fetch_roundtrip() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    let created = store
      .create_workout("user-1", &draft("Push Day", vec![mock_exercise("e1", &[8, 8, 8], 60.0)]))
      .await
      .expect("Should create workout");

    assert!(!created.id.is_empty());
    assert_eq!(created.sessions.len(), 1);

    let fetched = store
      .fetch_workouts_by_owner("user-1")
      .await
      .expect("Should fetch workouts");

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, created.id);
    assert_eq!(fetched[0].title, "Push Day");
    assert_eq!(fetched[0].week, "Week 1");
    assert!(!fetched[0].completed);

    let exercises = normalize(&fetched[0].sessions[0]);
    assert_eq!(exercises[0].reps, vec![8, 8, 8]);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_fetch_is_owner_scoped() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    store.create_workout("user-1", &draft("Mine", vec![])).await.unwrap();
    store.create_workout("user-2", &draft("Theirs", vec![])).await.unwrap();

    let mine = store.fetch_workouts_by_owner("user-1").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "Mine");
    assert!(mine[0].sessions.is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_append_keeps_order_and_marks_completed() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let workout = store.create_workout("user-1", &draft("Legs", vec![])).await.unwrap();

    store
      .append_session_snapshot(&workout.id, &[mock_exercise("e1", &[5], 100.0)])
      .await
      .expect("Should append first session");
    store
      .append_session_snapshot(&workout.id, &[mock_exercise("e1", &[5], 105.0)])
      .await
      .expect("Should append second session");

    let fetched = store.fetch_workouts_by_owner("user-1").await.unwrap();
    let sessions = &fetched[0].sessions;
    assert_eq!(sessions.len(), 2);
    assert!(matches!(sessions[1], RawSession::Wrapped { .. }));
    assert_eq!(normalize(&sessions[0])[0].weight, 100.0);
    assert_eq!(normalize(&sessions[1])[0].weight, 105.0);
    assert!(fetched[0].completed);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_legacy_bare_rows_are_readable() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let workout = store.create_workout("user-1", &draft("Pull", vec![])).await.unwrap();

    insert_raw_session(&pool, &workout.id, 0, r#"[{"id":"e1","name":"Row","reps":[10,10],"weight":40}]"#).await;
    insert_raw_session(&pool, &workout.id, 1, "not json at all").await;

    let fetched = store.fetch_workouts_by_owner("user-1").await.unwrap();
    let sessions = &fetched[0].sessions;
    assert!(matches!(sessions[0], RawSession::Bare(_)));
    assert_eq!(normalize(&sessions[0])[0].name, "Row");
    assert!(normalize(&sessions[1]).is_empty());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_removes_workout_and_sessions() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let workout = store
      .create_workout("user-1", &draft("Core", vec![mock_exercise("e1", &[20], 0.0)]))
      .await
      .unwrap();

    store.delete_workout(&workout.id).await.expect("Should delete");
    assert!(store.fetch_workouts_by_owner("user-1").await.unwrap().is_empty());

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_sessions")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(orphans, 0);

    let err = store.delete_workout(&workout.id).await.unwrap_err();
    assert!(matches!(err, WorkoutError::NotFound(_)));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_append_to_missing_workout_fails() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    let err = store
      .append_session_snapshot("missing", &[mock_exercise("e1", &[5], 10.0)])
      .await
      .unwrap_err();
    assert!(matches!(err, WorkoutError::NotFound(_)));

    teardown_test_db(pool).await;
  }
}
