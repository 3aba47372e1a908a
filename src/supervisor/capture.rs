//! Capture pipeline: per-stream line readers and the exit watcher.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ProcessExit, SupervisorInner};

/// Read lines from one stream of a supervised process until end-of-stream.
///
/// Every line is appended to the process's log sequence and the snapshot
/// file is rewritten before the state lock is released, so the on-disk
/// document always reflects a line boundary. A read fault stops only this
/// reader; the sibling stream and the exit watcher are unaffected.
pub(super) async fn capture_stream<R>(
    inner: Arc<SupervisorInner>,
    id: u32,
    stream: R,
    stream_name: &'static str,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let mut state = inner.state.lock().await;
                state.logs.append(id, line);
                if let Err(e) = inner.writer.write(&state.logs).await {
                    warn!("failed to persist log snapshot for process {id}: {e}");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("{stream_name} reader for process {id} faulted: {e}");
                break;
            }
        }
    }
    debug!("{stream_name} reader for process {id} finished");
}

/// Wait for both stream readers, then for process termination.
///
/// Owns the `Child`. The reader barrier comes first: the exit status is
/// only reaped once both streams have drained, so every line the process
/// wrote before exiting is in the store by the time the exit is published.
/// A natural exit prunes the registry record and leaves the captured lines
/// queryable; only an explicit kill removes both.
pub(super) async fn exit_watcher(
    inner: Arc<SupervisorInner>,
    id: u32,
    mut child: Child,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
    exit_tx: watch::Sender<Option<ProcessExit>>,
) {
    let _ = tokio::join!(stdout_task, stderr_task);

    let exit = match child.wait().await {
        Ok(status) => {
            info!("process {id} exited with {status}");
            ProcessExit {
                code: status.code(),
            }
        }
        Err(e) => {
            error!("failed waiting for process {id} to exit: {e}");
            ProcessExit { code: None }
        }
    };
    let _ = exit_tx.send(Some(exit));

    let mut state = inner.state.lock().await;
    state.registry.remove(&id);
}

/// Deliver SIGTERM to `pid`. A process that is already gone is not an error.
#[cfg(unix)]
pub(super) fn send_sigterm(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from_raw_os_error(errno as i32)),
    }
}

#[cfg(not(unix))]
pub(super) fn send_sigterm(_pid: u32) -> io::Result<()> {
    Err(io::Error::other("signal delivery is only supported on unix"))
}
