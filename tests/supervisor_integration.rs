//! Integration tests for the supervision core against real child processes.
//!
//! Every supervised process here is a small `sh` script; the supervisor
//! appends the process identifier as the script's `$0`, which the scripts
//! ignore.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use warden::SupervisorError;
use warden::supervisor::{LaunchSpec, SnapshotWriter, Supervisor};

const KILL_TIMEOUT: Duration = Duration::from_secs(5);

fn sh_supervisor(script: &str, dir: &Path) -> Supervisor {
    let launch = LaunchSpec {
        program: String::from("sh"),
        args: vec![String::from("-c"), String::from(script)],
    };
    Supervisor::new(launch, SnapshotWriter::new(dir.join("process_logs.json")))
}

/// Poll until the process has at least `min` captured lines.
async fn wait_for_lines(sup: &Supervisor, id: u32, min: usize) -> Vec<String> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(lines) = sup.find_by_identifier(id).await
            && lines.len() >= min
        {
            return lines;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {min} lines from process {id}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Poll until the exit watcher has pruned the registry record.
async fn wait_until_unregistered(sup: &Supervisor, id: u32) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if sup.find_all().await.iter().all(|p| p.process_id != id) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for process {id} to leave the registry"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn duplicate_start_is_rejected() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("exec sleep 5", dir.path());

    sup.start(1).await.unwrap();
    let second = sup.start(1).await;
    assert!(matches!(second, Err(SupervisorError::Conflict { id: 1 })));
    assert_eq!(sup.find_all().await.len(), 1);

    sup.kill(1, KILL_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn kill_unknown_identifier_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("exec sleep 5", dir.path());

    let result = sup.kill(42, KILL_TIMEOUT).await;
    assert!(matches!(result, Err(SupervisorError::NotFound { id: 42 })));

    // nothing was ever mutated, so no snapshot was written
    assert!(!dir.path().join("process_logs.json").exists());
}

#[tokio::test]
async fn captures_both_streams() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("echo a; echo b; echo c 1>&2", dir.path());

    sup.start(1).await.unwrap();
    let lines = wait_for_lines(&sup, 1, 3).await;

    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(sorted, ["a", "b", "c"]);

    // order across the two streams is unspecified, within stdout it is kept
    let pos_a = lines.iter().position(|l| l == "a").unwrap();
    let pos_b = lines.iter().position(|l| l == "b").unwrap();
    assert!(pos_a < pos_b);
}

#[tokio::test]
async fn registered_process_with_no_output_is_distinguishable() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("exec sleep 5", dir.path());

    sup.start(8).await.unwrap();
    assert_eq!(sup.find_by_identifier(8).await.unwrap(), Vec::<String>::new());
    assert!(sup.find_by_identifier(99).await.is_none());

    sup.kill(8, KILL_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn kill_removes_registry_log_and_snapshot_entry() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("echo hello; exec sleep 30", dir.path());

    sup.start(9).await.unwrap();
    wait_for_lines(&sup, 9, 1).await;
    assert!(sup.find_all().await.iter().any(|p| p.process_id == 9));

    sup.kill(9, KILL_TIMEOUT).await.unwrap();

    assert!(sup.find_by_identifier(9).await.is_none());
    assert!(sup.find_all().await.is_empty());

    let content = std::fs::read_to_string(dir.path().join("process_logs.json")).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(snapshot.get("9").is_none());
}

#[tokio::test]
async fn snapshot_matches_memory_after_capture() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("echo x; echo y", dir.path());

    sup.start(5).await.unwrap();
    let lines = wait_for_lines(&sup, 5, 2).await;

    let content = std::fs::read_to_string(dir.path().join("process_logs.json")).unwrap();
    let snapshot: std::collections::BTreeMap<String, Vec<String>> =
        serde_json::from_str(&content).unwrap();
    assert_eq!(snapshot["5"], lines);
}

#[tokio::test]
async fn find_all_tracks_live_processes() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("exec sleep 30", dir.path());

    sup.start(1).await.unwrap();
    sup.start(2).await.unwrap();

    let mut ids: Vec<u32> = sup.find_all().await.iter().map(|p| p.process_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, [1, 2]);

    sup.kill(1, KILL_TIMEOUT).await.unwrap();
    let ids: Vec<u32> = sup.find_all().await.iter().map(|p| p.process_id).collect();
    assert_eq!(ids, [2]);

    sup.kill(2, KILL_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn concurrent_starts_register_exactly_once() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("exec sleep 5", dir.path());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let sup = sup.clone();
        handles.push(tokio::spawn(async move { sup.start(7).await }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(SupervisorError::Conflict { id: 7 }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(sup.find_all().await.len(), 1);

    sup.kill(7, KILL_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn spawn_failure_surfaces_and_registers_nothing() {
    let dir = TempDir::new().unwrap();
    let launch = LaunchSpec {
        program: String::from("/nonexistent/definitely-missing-binary"),
        args: Vec::new(),
    };
    let sup = Supervisor::new(
        launch,
        SnapshotWriter::new(dir.path().join("process_logs.json")),
    );

    let result = sup.start(3).await;
    assert!(matches!(result, Err(SupervisorError::SpawnFailed { id: 3, .. })));
    assert!(sup.find_all().await.is_empty());
    assert!(sup.find_by_identifier(3).await.is_none());
}

#[tokio::test]
async fn kill_timeout_reports_termination_pending() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("trap '' TERM; sleep 3", dir.path());

    sup.start(6).await.unwrap();
    // give the shell a moment to install the trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = sup.kill(6, Duration::from_millis(200)).await;
    assert!(matches!(
        result,
        Err(SupervisorError::TerminationPending { id: 6, .. })
    ));

    // registry and log are left in place for a retry
    assert!(sup.find_all().await.iter().any(|p| p.process_id == 6));
    assert!(sup.find_by_identifier(6).await.is_some());
}

#[tokio::test]
async fn natural_exit_prunes_registry_and_keeps_lines() {
    let dir = TempDir::new().unwrap();
    let sup = sh_supervisor("echo done", dir.path());

    sup.start(4).await.unwrap();
    wait_until_unregistered(&sup, 4).await;
    assert_eq!(sup.find_by_identifier(4).await.unwrap(), ["done"]);

    // identifier is reusable once the exit watcher pruned the record;
    // the surviving lines accumulate
    sup.start(4).await.unwrap();
    wait_for_lines(&sup, 4, 2).await;
    wait_until_unregistered(&sup, 4).await;

    // kill cleans up the orphaned lines of an exited process
    sup.kill(4, KILL_TIMEOUT).await.unwrap();
    assert!(sup.find_by_identifier(4).await.is_none());
}
