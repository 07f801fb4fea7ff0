pub mod composite_id;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod progress;
pub mod repository;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use composite_id::ExerciseKey;
pub use config::{Backend, Config};
pub use error::{Result, WorkoutError};
pub use events::{AuthEvent, AuthEventBus, SyncHandle};
pub use models::{Exercise, ExercisePatch, NewWorkout, RawSession, Workout, WorkoutPatch};
pub use progress::{ComparisonMode, ExerciseProgress, MetricProgress};
pub use repository::WorkoutRepository;
pub use store::WorkoutStore;

/// Install the global tracing subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `workout_log=info`. Later calls are no-ops.
pub fn init_tracing() {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("workout_log=info"));

  let _ = tracing_subscriber::registry()
    .with(env_filter)
    .with(tracing_subscriber::fmt::layer())
    .try_init();
}

/// Set up logging, connect the configured store and return an empty repository
pub async fn bootstrap(config: &Config) -> Result<Arc<WorkoutRepository>> {
  init_tracing();

  let store = store::connect(config).await?;
  info!("Workout repository ready");

  Ok(Arc::new(WorkoutRepository::new(store)))
}
