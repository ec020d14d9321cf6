//! Run Sessions
//!
//! One document admits one run at a time. [`RunGate`] hands out a
//! [`RunPermit`] per run; the permit carries the run's cancellation token and
//! frees the gate when dropped.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AgentError, Result};

/// Public view of the run holding the gate
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActiveRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Slot {
    run: ActiveRun,
    cancel: CancellationToken,
}

/// Mutual exclusion for runs against one document
#[derive(Clone, Debug)]
pub struct RunGate {
    permits: Arc<Semaphore>,
    active: Arc<Mutex<Option<Slot>>>,
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a run now, or fail with `RunInProgress`
    pub fn try_begin(&self) -> Result<RunPermit> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Ok(self.admit(permit)),
            Err(TryAcquireError::NoPermits) => Err(AgentError::RunInProgress),
            Err(TryAcquireError::Closed) => Err(AgentError::Other("run gate closed".into())),
        }
    }

    /// Wait until the current run (if any) finishes, then start
    pub async fn begin(&self) -> Result<RunPermit> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AgentError::Other("run gate closed".into()))?;
        Ok(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> RunPermit {
        let run = ActiveRun {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        let cancel = CancellationToken::new();

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(Slot {
            run: run.clone(),
            cancel: cancel.clone(),
        });
        tracing::debug!(run_id = %run.id, "run admitted");

        RunPermit {
            run,
            cancel,
            active: Arc::clone(&self.active),
            _permit: permit,
        }
    }

    /// The run currently holding the gate
    pub fn active(&self) -> Option<ActiveRun> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|slot| slot.run.clone())
    }

    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }

    /// Signal cancellation to the active run. Returns `false` if nothing is running.
    pub fn cancel_active(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(slot) => {
                tracing::info!(run_id = %slot.run.id, "cancelling run");
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Exclusive right to run against the document; released on drop
#[derive(Debug)]
pub struct RunPermit {
    run: ActiveRun,
    cancel: CancellationToken,
    active: Arc<Mutex<Option<Slot>>>,
    _permit: OwnedSemaphorePermit,
}

impl RunPermit {
    pub fn id(&self) -> Uuid {
        self.run.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.run.started_at
    }

    /// Token the run must observe
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|slot| slot.run.id == self.run.id) {
            *active = None;
        }
    }
}
