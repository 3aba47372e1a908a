//! Periodic heartbeat logging job.
//!
//! Schedules one ticker per process identifier that appends an "alive"
//! message to a separate in-memory log on every interval. This job is an
//! independent collaborator of the supervision core: it never touches the
//! capture pipeline or the persisted snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Heartbeat scheduling errors
#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    /// A heartbeat ticker already runs for this identifier.
    #[error("heartbeat already scheduled for process {id}")]
    AlreadyScheduled {
        /// Identifier the caller tried to schedule twice.
        id: u32,
    },

    /// No heartbeat ticker is registered for this identifier.
    #[error("no heartbeat scheduled for process {id}")]
    NotScheduled {
        /// Identifier the caller asked for.
        id: u32,
    },
}

/// One scheduled heartbeat, as reported by [`HeartbeatScheduler::list`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledProcess {
    /// Identifier the heartbeat was scheduled under.
    pub process_id: u32,
    /// Scheduling time.
    pub created_at: DateTime<Utc>,
}

struct HeartbeatJob {
    created_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct HeartbeatState {
    jobs: BTreeMap<u32, HeartbeatJob>,
    logs: BTreeMap<u32, Vec<String>>,
}

/// Runs the per-identifier heartbeat tickers. Cheap to clone; clones share
/// the job table and the log.
#[derive(Clone)]
pub struct HeartbeatScheduler {
    state: Arc<Mutex<HeartbeatState>>,
    interval: Duration,
}

impl HeartbeatScheduler {
    /// Create a scheduler whose tickers fire every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeartbeatState::default())),
            interval,
        }
    }

    /// Start a heartbeat ticker for `id`. The first message is recorded
    /// immediately, then one per interval.
    pub async fn schedule(&self, id: u32) -> Result<(), HeartbeatError> {
        let mut state = self.state.lock().await;
        if state.jobs.contains_key(&id) {
            return Err(HeartbeatError::AlreadyScheduled { id });
        }

        let shared = self.state.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let message = format!("Process Id : {} : alive at {}", id, Utc::now().to_rfc3339());
                debug!("{message}");
                let mut state = shared.lock().await;
                state.logs.entry(id).or_default().push(message);
            }
        });

        state.jobs.insert(
            id,
            HeartbeatJob {
                created_at: Utc::now(),
                handle,
            },
        );
        info!("scheduled heartbeat for process {id}");
        Ok(())
    }

    /// Stop and remove the ticker for `id`. Accumulated messages are kept.
    pub async fn stop(&self, id: u32) -> Result<(), HeartbeatError> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .remove(&id)
            .ok_or(HeartbeatError::NotScheduled { id })?;
        job.handle.abort();
        info!("stopped heartbeat for process {id}");
        Ok(())
    }

    /// Every currently-scheduled heartbeat with its scheduling time.
    pub async fn list(&self) -> Vec<ScheduledProcess> {
        let state = self.state.lock().await;
        state
            .jobs
            .iter()
            .map(|(id, job)| ScheduledProcess {
                process_id: *id,
                created_at: job.created_at,
            })
            .collect()
    }

    /// Accumulated heartbeat messages for `id`, or `None` when none were
    /// ever recorded.
    pub async fn lines(&self, id: u32) -> Option<Vec<String>> {
        let state = self.state.lock().await;
        state.logs.get(&id).cloned()
    }
}
