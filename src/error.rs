use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

pub type Result<T> = std::result::Result<T, WorkoutError>;

#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
  /// Referenced workout or exercise does not exist in local state
  #[error("Not found: {0}")]
  NotFound(String),

  /// Malformed identifier or a write missing required fields
  #[error("Invalid input: {0}")]
  Validation(String),

  /// The persistence collaborator rejected or failed the call
  #[error("Persistence error: {0}")]
  Persistence(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Missing configuration: {0}")]
  Config(String),
}

impl WorkoutError {
  /// True for every failure that originated in the persistence collaborator
  pub fn is_persistence(&self) -> bool {
    matches!(
      self,
      Self::Persistence(_) | Self::Database(_) | Self::Migration(_) | Self::Request(_)
    )
  }
}

impl From<serde_json::Error> for WorkoutError {
  fn from(e: serde_json::Error) -> Self {
    Self::Persistence(format!("Failed to encode session payload: {}", e))
  }
}

impl Serialize for WorkoutError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
