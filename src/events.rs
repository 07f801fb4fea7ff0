//! Sign-in / sign-out notifications
//!
//! The auth layer publishes `AuthEvent`s on an `AuthEventBus`. A repository
//! only reacts to them after `WorkoutRepository::attach` and stops when the
//! returned `SyncHandle` is shut down.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
  SignedIn { owner_id: String },
  SignedOut,
}

#[derive(Debug, Clone)]
pub struct AuthEventBus {
  tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
  /// `capacity` events are buffered per receiver before the oldest are dropped
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
    self.tx.subscribe()
  }

  /// Publish to current subscribers. Returns how many received it.
  pub fn emit(&self, event: AuthEvent) -> usize {
    match self.tx.send(event) {
      Ok(count) => count,
      Err(broadcast::error::SendError(event)) => {
        debug!(?event, "No subscribers for auth event");
        0
      }
    }
  }
}

impl Default for AuthEventBus {
  fn default() -> Self {
    Self::new(16)
  }
}

/// Running subscription of a repository to an `AuthEventBus`
#[derive(Debug)]
pub struct SyncHandle {
  task: JoinHandle<()>,
}

impl SyncHandle {
  pub(crate) fn new(task: JoinHandle<()>) -> Self {
    Self { task }
  }

  pub fn is_finished(&self) -> bool {
    self.task.is_finished()
  }

  /// Stop reacting to auth events and wait for the task to exit
  pub async fn shutdown(self) {
    self.task.abort();
    let _ = self.task.await;
  }
}
