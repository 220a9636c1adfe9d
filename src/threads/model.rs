//! Kernel thread model: ids, per-thread records and display info.

use std::any::Any;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StopToken;

/// Unique identifier for a kernel thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KernelThreadId(pub u64);

impl KernelThreadId {
    /// Generate a new unique thread ID.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for KernelThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KernelThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque argument handed to a thread body by `start_with`.
pub type ThreadParameter = Arc<dyn Any + Send + Sync>;

/// The body of a kernel thread. It may run many times (once per start).
pub type ThreadAction = Arc<dyn Fn(ThreadContext) -> anyhow::Result<()> + Send + Sync>;

/// Everything a running thread body gets to see.
#[derive(Clone)]
pub struct ThreadContext {
    pub id: KernelThreadId,
    pub name: String,
    pub parameter: Option<ThreadParameter>,
    pub stop: StopToken,
}

impl ThreadContext {
    /// Downcast the start parameter to a concrete type.
    pub fn parameter<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.parameter.as_deref().and_then(|p| p.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_parameter", &self.parameter.is_some())
            .finish()
    }
}

/// Completion latch for a single run of a native thread.
#[derive(Debug, Default)]
pub(crate) struct RunLatch {
    done: Mutex<bool>,
    cond: Condvar,
}

impl RunLatch {
    pub(crate) fn finish(&self) {
        *self.done.lock().unwrap_or_else(|p| p.into_inner()) = true;
        self.cond.notify_all();
    }

    pub(crate) fn is_done(&self) -> bool {
        *self.done.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(|p| p.into_inner());
        while !*done {
            done = self.cond.wait(done).unwrap_or_else(|p| p.into_inner());
        }
    }

    /// Wait until `deadline`; true if the run finished in time.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        let mut done = self.done.lock().unwrap_or_else(|p| p.into_inner());
        while !*done {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(done, deadline - now)
                .unwrap_or_else(|p| p.into_inner());
            done = guard;
        }
        true
    }
}

/// Marks the latch finished when the native thread unwinds or returns.
pub(crate) struct LatchGuard(pub(crate) Arc<RunLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// A live (or finished, not yet reaped) native thread.
pub(crate) struct ThreadRun {
    pub(crate) stop: StopToken,
    pub(crate) latch: Arc<RunLatch>,
    pub(crate) handle: Option<JoinHandle<()>>,
}

impl ThreadRun {
    /// Join the native thread if it already finished, otherwise detach it.
    pub(crate) fn reap(mut self) {
        if let Some(handle) = self.handle.take() {
            if self.latch.is_done() {
                let _ = handle.join();
            }
        }
    }
}

/// Lifecycle state shown in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadStatus {
    /// Created or regenerated, waiting for a start.
    Ready,
    /// Native thread is executing.
    Running,
    /// Ran to completion (or was stopped without regeneration).
    Finished,
}

impl ThreadStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Ready => "○",
            Self::Running => "▶",
            Self::Finished => "✓",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Finished => "Finished",
        }
    }
}

/// A kernel thread record owned by the [`ThreadManager`](super::ThreadManager) arena.
pub struct KernelThread {
    pub(crate) id: KernelThreadId,
    pub(crate) name: String,
    pub(crate) background: bool,
    pub(crate) critical: bool,
    pub(crate) action: ThreadAction,
    pub(crate) parent: Option<KernelThreadId>,
    pub(crate) children: Vec<KernelThreadId>,
    pub(crate) ready: bool,
    pub(crate) run: Option<ThreadRun>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl KernelThread {
    pub(crate) fn new(
        name: impl Into<String>,
        background: bool,
        critical: bool,
        parent: Option<KernelThreadId>,
        action: ThreadAction,
    ) -> Self {
        Self {
            id: KernelThreadId::new(),
            name: name.into(),
            background,
            critical,
            action,
            parent,
            children: Vec::new(),
            ready: true,
            run: None,
            created_at: Utc::now(),
            started_at: None,
        }
    }

    pub fn id(&self) -> KernelThreadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent(&self) -> Option<KernelThreadId> {
        self.parent
    }

    pub fn children(&self) -> &[KernelThreadId] {
        &self.children
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_alive(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.latch.is_done())
    }

    pub fn status(&self) -> ThreadStatus {
        if self.is_alive() {
            ThreadStatus::Running
        } else if self.ready {
            ThreadStatus::Ready
        } else {
            ThreadStatus::Finished
        }
    }

    /// Get info for diagnostics display.
    pub fn to_info(&self) -> ThreadInfo {
        let status = self.status();
        ThreadInfo {
            id: self.id,
            name: self.name.clone(),
            background: self.background,
            critical: self.critical,
            alive: status == ThreadStatus::Running,
            ready: self.ready,
            status,
            parent: self.parent,
            children: self.children.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
        }
    }
}

/// Snapshot of a kernel thread for enumeration and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: KernelThreadId,
    pub name: String,
    pub background: bool,
    pub critical: bool,
    pub alive: bool,
    pub ready: bool,
    pub status: ThreadStatus,
    pub parent: Option<KernelThreadId>,
    pub children: Vec<KernelThreadId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

/// A failure that escaped a thread body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatalThreadError {
    pub thread_id: KernelThreadId,
    pub thread_name: String,
    pub critical: bool,
    /// True when the body panicked rather than returning an error.
    pub panicked: bool,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for FatalThreadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.panicked { "panicked" } else { "failed" };
        write!(f, "kernel thread {} ({}) {}: {}", self.thread_name, self.thread_id, kind, self.message)
    }
}
