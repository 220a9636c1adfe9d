//! Error types shared across the kernel subsystems.
//!
//! Library-level operations return these typed errors; application code
//! (the binary, thread bodies, event handlers) works with `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

use crate::threads::KernelThreadId;

/// Raised by a [`StopToken`](crate::threads::StopToken) when the owning
/// thread has been asked to stop. Thread bodies propagate it with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("thread interrupted")]
pub struct Interrupted;

/// Kernel thread lifecycle errors.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("no such kernel thread {0}")]
    NotFound(KernelThreadId),

    #[error("kernel thread {name} ({id}) is not ready; stop or regenerate it first")]
    NotReady { id: KernelThreadId, name: String },

    #[error("kernel thread {name} ({id}) is already running")]
    AlreadyRunning { id: KernelThreadId, name: String },

    #[error("kernel thread {name} ({id}) is a child; start its parent instead")]
    ChildThread { id: KernelThreadId, name: String },

    #[error("kernel thread {name} ({id}) is still running")]
    StillRunning { id: KernelThreadId, name: String },

    #[error("kernel thread {name} ({id}) is critical and cannot be stopped")]
    Critical { id: KernelThreadId, name: String },

    #[error("failed to spawn native thread for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Event bus errors.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("no such event: {0}")]
    NoSuchEvent(String),

    #[error("handler {handler} is not registered for {event}")]
    HandlerNotFound { event: String, handler: u64 },
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Thread(#[from] ThreadError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
