use std::env;
use std::path::PathBuf;
use url::Url;

use crate::error::{Result, WorkoutError};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const BACKEND_VAR: &str = "WORKOUT_LOG_BACKEND";
const DB_PATH_VAR: &str = "WORKOUT_LOG_DB_PATH";
const API_URL_VAR: &str = "WORKOUT_LOG_API_URL";
const API_TOKEN_VAR: &str = "WORKOUT_LOG_API_TOKEN";
const DEFAULT_DB_PATH: &str = "workout-log.db";

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
  Sqlite { path: PathBuf },
  Remote { api_url: Url, api_token: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub backend: Backend,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      backend: Backend::Sqlite {
        path: PathBuf::from(DEFAULT_DB_PATH),
      },
    }
  }
}

impl Config {
  /// Load `.env` if present, then read the process environment
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_process_env()
  }

  /// Read the process environment only
  pub fn from_process_env() -> Result<Self> {
    let backend = env::var(BACKEND_VAR).unwrap_or_else(|_| "sqlite".to_string());

    let backend = match backend.trim().to_lowercase().as_str() {
      "sqlite" => Backend::Sqlite {
        path: env::var(DB_PATH_VAR)
          .map(PathBuf::from)
          .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
      },
      "remote" => {
        let raw_url =
          env::var(API_URL_VAR).map_err(|_| WorkoutError::Config(API_URL_VAR.into()))?;
        let api_url = Url::parse(&raw_url)
          .map_err(|e| WorkoutError::Config(format!("{} is not a valid URL: {}", API_URL_VAR, e)))?;
        let api_token =
          env::var(API_TOKEN_VAR).map_err(|_| WorkoutError::Config(API_TOKEN_VAR.into()))?;
        Backend::Remote { api_url, api_token }
      }
      other => {
        return Err(WorkoutError::Config(format!(
          "{} must be 'sqlite' or 'remote', got '{}'",
          BACKEND_VAR, other
        )))
      }
    };

    Ok(Self { backend })
  }
}
