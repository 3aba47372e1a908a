//! Warden - supervised execution of external OS processes.
//!
//! Warden launches an external program per caller-supplied identifier,
//! concurrently captures its stdout and stderr into an in-memory log that is
//! re-persisted to disk on every captured line, tracks process liveness, and
//! supports forced termination and output queries over a REST API.
//!
//! # Architecture
//!
//! - `supervisor` - the supervision core: registry, log store, capture
//!   pipeline, exit watcher, snapshot persistence
//! - `heartbeat` - periodic per-identifier "alive" logging job
//! - `api` - REST transport over the supervisor and the heartbeat job
//! - `config` - toml configuration with CLI overrides
//! - `error` - the core error taxonomy

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod supervisor;

pub use config::WardenConfig;
pub use error::SupervisorError;
pub use supervisor::{LaunchSpec, ProcessInfo, SnapshotWriter, Supervisor};

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
