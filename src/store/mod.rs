//! Persistence collaborators
//!
//! The repository treats durable storage as a black box behind `WorkoutStore`.
//! Every store must hand back sessions in whatever shape they were written,
//! bare array or wrapped object; callers normalize on read.

pub mod remote;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::{Backend, Config};
use crate::db;
use crate::error::Result;
use crate::models::{Exercise, NewWorkout, Workout};

pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait WorkoutStore: Send + Sync {
  /// Persist a new workout. The returned id and timestamp are authoritative.
  async fn create_workout(&self, owner_id: &str, draft: &NewWorkout) -> Result<Workout>;

  /// Every workout owned by `owner_id`, sessions included
  async fn fetch_workouts_by_owner(&self, owner_id: &str) -> Result<Vec<Workout>>;

  async fn delete_workout(&self, id: &str) -> Result<()>;

  /// Record `exercises` as the newest session of the workout and mark it completed
  async fn append_session_snapshot(&self, workout_id: &str, exercises: &[Exercise]) -> Result<()>;
}

/// Build the store selected by `config`
pub async fn connect(config: &Config) -> Result<Arc<dyn WorkoutStore>> {
  match &config.backend {
    Backend::Sqlite { path } => {
      let pool = db::initialize_db(path).await?;
      let store: Arc<dyn WorkoutStore> = Arc::new(SqliteStore::new(pool));
      Ok(store)
    }
    Backend::Remote { api_url, api_token } => {
      info!(url = %api_url, "Using remote workout store");
      let store: Arc<dyn WorkoutStore> =
        Arc::new(RemoteStore::new(api_url.clone(), api_token.clone())?);
      Ok(store)
    }
  }
}
