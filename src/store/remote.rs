use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::WorkoutStore;
use crate::error::{Result, WorkoutError};
use crate::models::{Exercise, NewWorkout, Workout};

/// ---------------------------------------------------------------------------
/// REST Workout Store
/// ---------------------------------------------------------------------------
///
/// Endpoints, relative to the configured base URL:
/// - GET    owners/{owner}/workouts
/// - POST   owners/{owner}/workouts
/// - DELETE workouts/{id}
/// - POST   workouts/{id}/sessions

#[derive(Debug, Clone)]
pub struct RemoteStore {
  client: Client,
  base_url: Url,
  api_token: String,
}

#[derive(Serialize)]
struct SessionBody<'a> {
  exercises: &'a [Exercise],
}

impl RemoteStore {
  pub fn new(base_url: Url, api_token: String) -> Result<Self> {
    if base_url.cannot_be_a_base() {
      return Err(WorkoutError::Config(format!("Not a base URL: {}", base_url)));
    }
    Ok(Self {
      client: Client::new(),
      base_url,
      api_token,
    })
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| WorkoutError::Config(format!("Not a base URL: {}", self.base_url)))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// Map non-2xx responses onto the error taxonomy
  async fn check(response: Response, action: &str, subject: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
      return Err(WorkoutError::NotFound(subject.to_string()));
    }
    Err(WorkoutError::Persistence(format!(
      "{} failed ({}): {}",
      action, status, body
    )))
  }
}

#[async_trait]
impl WorkoutStore for RemoteStore {
  async fn create_workout(&self, owner_id: &str, draft: &NewWorkout) -> Result<Workout> {
    let url = self.endpoint(&["owners", owner_id, "workouts"])?;

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.api_token)
      .json(draft)
      .send()
      .await?;

    let response = Self::check(response, "Create workout", &format!("Owner {}", owner_id)).await?;
    let workout: Workout = response.json().await?;
    debug!(workout_id = %workout.id, owner_id, "Workout created remotely");
    Ok(workout)
  }

  async fn fetch_workouts_by_owner(&self, owner_id: &str) -> Result<Vec<Workout>> {
    let url = self.endpoint(&["owners", owner_id, "workouts"])?;

    let response = self
      .client
      .get(url)
      .bearer_auth(&self.api_token)
      .send()
      .await?;

    // An owner with no workouts yet is not an error
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(Vec::new());
    }

    let response = Self::check(response, "Fetch workouts", &format!("Owner {}", owner_id)).await?;
    Ok(response.json().await?)
  }

  async fn delete_workout(&self, id: &str) -> Result<()> {
    let url = self.endpoint(&["workouts", id])?;

    let response = self
      .client
      .delete(url)
      .bearer_auth(&self.api_token)
      .send()
      .await?;

    Self::check(response, "Delete workout", &format!("Workout {}", id)).await?;
    Ok(())
  }

  async fn append_session_snapshot(&self, workout_id: &str, exercises: &[Exercise]) -> Result<()> {
    let url = self.endpoint(&["workouts", workout_id, "sessions"])?;

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.api_token)
      .json(&SessionBody { exercises })
      .send()
      .await?;

    Self::check(response, "Append session", &format!("Workout {}", workout_id)).await?;
    debug!(workout_id, count = exercises.len(), "Session snapshot appended remotely");
    Ok(())
  }
}
