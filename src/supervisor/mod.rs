//! Process supervision core.
//!
//! The [`Supervisor`] owns the registry of live processes and the log store
//! of captured output. All mutations of the pair, and every snapshot write,
//! happen under one mutex: no observer can see a registry entry without its
//! log entry, and the persisted file never runs ahead of memory. The lock is
//! shared across all supervised processes, which serializes unrelated
//! processes' log writes against each other - throughput traded for
//! crash-consistency of the on-disk snapshot.

mod capture;
mod log_store;
mod persist;

pub use log_store::LogStore;
pub use persist::SnapshotWriter;

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::error::{Result, SupervisorError};

/// How to launch the supervised external program.
///
/// The process identifier is appended as the final argument.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Program to execute.
    pub program: String,
    /// Fixed leading arguments.
    pub args: Vec<String>,
}

/// Terminal outcome of a supervised process, published by the exit watcher.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessExit {
    /// OS exit code; `None` when the process was ended by a signal.
    #[allow(dead_code)]
    pub(crate) code: Option<i32>,
}

/// Registry record for one live process. The `Child` itself is owned by the
/// exit-watcher task; the record carries what the supervisor operations need.
struct ProcessRecord {
    pid: u32,
    started_at: DateTime<Utc>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

/// Identifier and start time of a live process, as reported by
/// [`Supervisor::find_all`].
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    /// Caller-supplied process identifier.
    pub process_id: u32,
    /// OS start time recorded at spawn.
    pub started_at: DateTime<Utc>,
}

struct SupervisorState {
    registry: BTreeMap<u32, ProcessRecord>,
    logs: LogStore,
}

pub(crate) struct SupervisorInner {
    pub(crate) state: Mutex<SupervisorState>,
    pub(crate) writer: SnapshotWriter,
    launch: LaunchSpec,
}

/// Public-facing supervision core. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

impl Supervisor {
    /// Create a supervisor that launches processes per `launch` and persists
    /// captured output through `writer`.
    pub fn new(launch: LaunchSpec, writer: SnapshotWriter) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                state: Mutex::new(SupervisorState {
                    registry: BTreeMap::new(),
                    logs: LogStore::default(),
                }),
                writer,
                launch,
            }),
        }
    }

    /// Spawn and register a new supervised process under `id`.
    ///
    /// Fails with [`SupervisorError::Conflict`] when `id` is already
    /// registered, and with [`SupervisorError::SpawnFailed`] when the OS
    /// refuses to launch the program; neither registers anything. On success
    /// the process record and an empty log entry are inserted together, the
    /// snapshot is persisted, and the capture pipeline (two stream readers)
    /// plus the exit watcher are started.
    pub async fn start(&self, id: u32) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.registry.contains_key(&id) {
            return Err(SupervisorError::Conflict { id });
        }

        let mut cmd = Command::new(&self.inner.launch.program);
        cmd.args(&self.inner.launch.args)
            .arg(id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|source| SupervisorError::SpawnFailed { id, source })?;
        let pid = child.id().unwrap_or(0);

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.start_kill();
                return Err(SupervisorError::SpawnFailed {
                    id,
                    source: io::Error::other("stdout pipe was not captured"),
                });
            }
        };
        let stderr = match child.stderr.take() {
            Some(stderr) => stderr,
            None => {
                let _ = child.start_kill();
                return Err(SupervisorError::SpawnFailed {
                    id,
                    source: io::Error::other("stderr pipe was not captured"),
                });
            }
        };

        info!("spawned process {id} with pid {pid}");

        let (exit_tx, exit_rx) = watch::channel(None);
        state.registry.insert(
            id,
            ProcessRecord {
                pid,
                started_at: Utc::now(),
                exit_rx,
            },
        );
        state.logs.register(id);
        if let Err(e) = self.inner.writer.write(&state.logs).await {
            warn!("failed to persist log snapshot for process {id}: {e}");
        }

        let stdout_task = tokio::spawn(capture::capture_stream(
            self.inner.clone(),
            id,
            stdout,
            "stdout",
        ));
        let stderr_task = tokio::spawn(capture::capture_stream(
            self.inner.clone(),
            id,
            stderr,
            "stderr",
        ));
        tokio::spawn(capture::exit_watcher(
            self.inner.clone(),
            id,
            child,
            stdout_task,
            stderr_task,
            exit_tx,
        ));

        Ok(())
    }

    /// Terminate the process registered under `id` and remove it together
    /// with its captured output.
    ///
    /// Sends SIGTERM when the process is still alive and waits up to
    /// `timeout` for OS-level termination; on expiry the distinct
    /// [`SupervisorError::TerminationPending`] is returned and registry and
    /// log are left untouched for a retry. An identifier whose process
    /// already exited naturally only has an orphaned log entry left; kill
    /// removes that entry and reports success.
    pub async fn kill(&self, id: u32, timeout: Duration) -> Result<()> {
        let (pid, mut exit_rx) = {
            let mut state = self.inner.state.lock().await;
            match state.registry.get(&id) {
                Some(record) => (record.pid, record.exit_rx.clone()),
                None => {
                    if state.logs.remove(id) {
                        if let Err(e) = self.inner.writer.write(&state.logs).await {
                            warn!("failed to persist log snapshot after removing process {id}: {e}");
                        }
                        info!("removed captured output of exited process {id}");
                        return Ok(());
                    }
                    return Err(SupervisorError::NotFound { id });
                }
            }
        };

        if exit_rx.borrow().is_none() {
            // pid 0 would address our own process group
            if pid != 0 {
                capture::send_sigterm(pid)?;
            }
            let wait = tokio::time::timeout(timeout, async {
                while exit_rx.borrow_and_update().is_none() {
                    if exit_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await;
            if wait.is_err() {
                warn!("process {id} (pid {pid}) still running after {timeout:?}");
                return Err(SupervisorError::TerminationPending { id, timeout });
            }
        }

        let mut state = self.inner.state.lock().await;
        state.registry.remove(&id);
        state.logs.remove(id);
        if let Err(e) = self.inner.writer.write(&state.logs).await {
            warn!("failed to persist log snapshot after killing process {id}: {e}");
        }
        info!("process {id} killed and removed from tracking");
        Ok(())
    }

    /// Captured output for `id`, or `None` when no entry exists.
    ///
    /// A registered process with no output yet returns an empty vector,
    /// which is distinct from `None`.
    pub async fn find_by_identifier(&self, id: u32) -> Option<Vec<String>> {
        let state = self.inner.state.lock().await;
        state.logs.get(id).map(<[String]>::to_vec)
    }

    /// Identifier and start time of every currently-registered process.
    ///
    /// Registry-only view: processes that exited or were killed are absent.
    pub async fn find_all(&self) -> Vec<ProcessInfo> {
        let state = self.inner.state.lock().await;
        state
            .registry
            .iter()
            .map(|(id, record)| ProcessInfo {
                process_id: *id,
                started_at: record.started_at,
            })
            .collect()
    }

    /// Location of the persisted snapshot file.
    pub fn snapshot_path(&self) -> &Path {
        self.inner.writer.path()
    }
}
