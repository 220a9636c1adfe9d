//! Thread manager: owns every kernel thread and drives their lifecycle.
//!
//! Threads live in an arena keyed by [`KernelThreadId`]. Parent/child
//! grouping is stored as id lists, so a parent never holds a reference to
//! its children and regeneration only resets arena records in place.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::model::{LatchGuard, RunLatch, ThreadRun};
use super::{
    FatalThreadError, KernelThread, KernelThreadId, StopToken, ThreadAction, ThreadContext,
    ThreadInfo, ThreadParameter,
};
use crate::error::{Interrupted, ThreadError};

/// Configuration for thread management.
#[derive(Debug, Clone)]
pub struct ThreadManagerConfig {
    /// How long `stop` waits for a thread group to wind down
    pub stop_timeout: Duration,
}

impl Default for ThreadManagerConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(60),
        }
    }
}

/// Receives lifecycle notifications from the manager.
///
/// `on_fatal` is called on the failing native thread; the others on the
/// thread that issued the start or stop. The arena lock is never held
/// while an observer runs.
pub trait ThreadObserver: Send + Sync {
    fn on_started(&self, _info: &ThreadInfo) {}
    fn on_stopped(&self, _info: &ThreadInfo) {}
    fn on_fatal(&self, _error: &FatalThreadError) {}
}

/// Outcome of [`ThreadManager::stop`].
///
/// A timeout is not an error: the members listed in `timed_out` keep their
/// native thread and are neither regenerated nor reported as stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Members that wound down within the stop timeout
    pub stopped: Vec<KernelThreadId>,
    /// Members still running when the timeout ran out
    pub timed_out: Vec<KernelThreadId>,
}

impl StopReport {
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty()
    }
}

/// Where failures escaping thread bodies end up.
#[derive(Default)]
struct FatalSink {
    records: Mutex<Vec<FatalThreadError>>,
    observer: RwLock<Option<Arc<dyn ThreadObserver>>>,
}

impl FatalSink {
    fn observer(&self) -> Option<Arc<dyn ThreadObserver>> {
        self.observer
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn report(&self, fatal: FatalThreadError) {
        error!(
            thread_id = %fatal.thread_id,
            thread = %fatal.thread_name,
            critical = fatal.critical,
            "{}",
            fatal
        );
        self.records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(fatal.clone());
        if let Some(observer) = self.observer() {
            observer.on_fatal(&fatal);
        }
    }
}

/// Manages all kernel threads.
pub struct ThreadManager {
    /// All threads by ID, in creation order
    threads: Mutex<BTreeMap<KernelThreadId, KernelThread>>,

    /// Fatal error log + lifecycle observer
    sink: Arc<FatalSink>,

    /// Configuration
    config: ThreadManagerConfig,
}

impl ThreadManager {
    /// Create a new thread manager.
    pub fn new() -> Self {
        Self::with_config(ThreadManagerConfig::default())
    }

    /// Create with custom config.
    pub fn with_config(config: ThreadManagerConfig) -> Self {
        Self {
            threads: Mutex::new(BTreeMap::new()),
            sink: Arc::new(FatalSink::default()),
            config,
        }
    }

    /// Install the lifecycle observer, replacing any previous one.
    pub fn set_observer(&self, observer: Arc<dyn ThreadObserver>) {
        *self.sink.observer.write().unwrap_or_else(|p| p.into_inner()) = Some(observer);
    }

    pub fn config(&self) -> &ThreadManagerConfig {
        &self.config
    }

    fn arena(&self) -> MutexGuard<'_, BTreeMap<KernelThreadId, KernelThread>> {
        self.threads.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ── Thread Creation ─────────────────────────────────────────────────────

    /// Register a new top-level thread in the ready state. Nothing runs yet.
    pub fn create<F>(&self, name: impl Into<String>, background: bool, action: F) -> KernelThreadId
    where
        F: Fn(ThreadContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(KernelThread::new(name, background, false, None, Arc::new(action)))
    }

    /// Register a critical thread; user-initiated stops are refused.
    pub fn create_critical<F>(
        &self,
        name: impl Into<String>,
        background: bool,
        action: F,
    ) -> KernelThreadId
    where
        F: Fn(ThreadContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(KernelThread::new(name, background, true, None, Arc::new(action)))
    }

    /// Attach a child to `parent`. Children start, stop and wait with it.
    ///
    /// Fails with `AlreadyRunning` once the parent is alive.
    pub fn add_child<F>(
        &self,
        parent: KernelThreadId,
        name: impl Into<String>,
        background: bool,
        action: F,
    ) -> Result<KernelThreadId, ThreadError>
    where
        F: Fn(ThreadContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let action: ThreadAction = Arc::new(action);
        let mut arena = self.arena();
        let parent_thread = arena.get(&parent).ok_or(ThreadError::NotFound(parent))?;
        if parent_thread.is_alive() {
            return Err(ThreadError::AlreadyRunning {
                id: parent,
                name: parent_thread.name.clone(),
            });
        }

        let child = KernelThread::new(name, background, false, Some(parent), action);
        let id = child.id;
        debug!(thread_id = %id, parent = %parent, name = %child.name, "Child thread added");
        arena.insert(id, child);
        if let Some(parent_thread) = arena.get_mut(&parent) {
            parent_thread.children.push(id);
        }
        Ok(id)
    }

    fn insert(&self, thread: KernelThread) -> KernelThreadId {
        let id = thread.id;
        debug!(thread_id = %id, name = %thread.name, "Kernel thread created");
        self.arena().insert(id, thread);
        id
    }

    // ── Thread Access ───────────────────────────────────────────────────────

    /// List non-child threads, in creation order.
    pub fn threads(&self) -> Vec<ThreadInfo> {
        self.arena()
            .values()
            .filter(|t| !t.is_child())
            .map(|t| t.to_info())
            .collect()
    }

    /// List every thread including children.
    pub fn all_threads(&self) -> Vec<ThreadInfo> {
        self.arena().values().map(|t| t.to_info()).collect()
    }

    pub fn info(&self, id: KernelThreadId) -> Option<ThreadInfo> {
        self.arena().get(&id).map(|t| t.to_info())
    }

    /// Direct children of a thread.
    pub fn children(&self, id: KernelThreadId) -> Vec<ThreadInfo> {
        let arena = self.arena();
        arena
            .get(&id)
            .map(|t| {
                t.children
                    .iter()
                    .filter_map(|c| arena.get(c).map(|c| c.to_info()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_by_name(&self, name: &str) -> Option<KernelThreadId> {
        self.arena().values().find(|t| t.name == name).map(|t| t.id)
    }

    pub fn is_alive(&self, id: KernelThreadId) -> bool {
        self.arena().get(&id).is_some_and(|t| t.is_alive())
    }

    pub fn is_ready(&self, id: KernelThreadId) -> bool {
        self.arena().get(&id).is_some_and(|t| t.ready)
    }

    /// Failures that escaped thread bodies so far.
    pub fn fatal_errors(&self) -> Vec<FatalThreadError> {
        self.sink
            .records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Start a thread and all of its children without a parameter.
    pub fn start(&self, id: KernelThreadId) -> Result<(), ThreadError> {
        self.start_inner(id, None)
    }

    /// Start a thread and all of its children, handing each the same parameter.
    pub fn start_with<P>(&self, id: KernelThreadId, parameter: P) -> Result<(), ThreadError>
    where
        P: std::any::Any + Send + Sync,
    {
        self.start_inner(id, Some(Arc::new(parameter)))
    }

    fn start_inner(
        &self,
        id: KernelThreadId,
        parameter: Option<ThreadParameter>,
    ) -> Result<(), ThreadError> {
        let started = {
            let mut arena = self.arena();
            let thread = arena.get(&id).ok_or(ThreadError::NotFound(id))?;
            if thread.is_child() {
                return Err(ThreadError::ChildThread {
                    id,
                    name: thread.name.clone(),
                });
            }

            let group = subtree(&arena, id, Order::ParentFirst);
            // Refuse before spawning anything so a group never half-starts.
            for member in &group {
                let t = &arena[member];
                if !t.ready {
                    return Err(ThreadError::NotReady { id: *member, name: t.name.clone() });
                }
            }

            let mut started = Vec::with_capacity(group.len());
            for member in &group {
                let Some(thread) = arena.get_mut(member) else { continue };
                match self.spawn(thread, parameter.clone()) {
                    Ok(()) => started.push(thread.to_info()),
                    Err(e) => {
                        let ids: Vec<KernelThreadId> = started.iter().map(|t| t.id).collect();
                        roll_back(&mut arena, &ids);
                        return Err(e);
                    }
                }
            }
            started
        };

        info!(thread_id = %id, group = started.len(), "Kernel thread started");
        if let Some(observer) = self.sink.observer() {
            for thread in &started {
                observer.on_started(thread);
            }
        }
        Ok(())
    }

    fn spawn(
        &self,
        thread: &mut KernelThread,
        parameter: Option<ThreadParameter>,
    ) -> Result<(), ThreadError> {
        let stop = StopToken::new();
        let latch = Arc::new(RunLatch::default());
        let ctx = ThreadContext {
            id: thread.id,
            name: thread.name.clone(),
            parameter,
            stop: stop.clone(),
        };
        let action = thread.action.clone();
        let sink = self.sink.clone();
        let critical = thread.critical;
        let guard = LatchGuard(latch.clone());

        let handle = std::thread::Builder::new()
            .name(thread.name.clone())
            .spawn(move || {
                let _guard = guard;
                run_body(action, ctx, critical, &sink);
            })
            .map_err(|source| ThreadError::Spawn {
                name: thread.name.clone(),
                source,
            })?;

        if let Some(old) = thread.run.take() {
            old.reap();
        }
        thread.run = Some(ThreadRun {
            stop,
            latch,
            handle: Some(handle),
        });
        thread.ready = false;
        thread.started_at = Some(Utc::now());
        Ok(())
    }

    /// Stop a thread and its children, waiting up to the configured timeout.
    ///
    /// Children are signalled before their parent. A timeout is logged and
    /// listed in the report, not returned as an error. With `regen` every
    /// member that wound down becomes startable again.
    pub fn stop(&self, id: KernelThreadId, regen: bool) -> Result<StopReport, ThreadError> {
        let pending: Vec<(KernelThreadId, Arc<RunLatch>)> = {
            let arena = self.arena();
            if !arena.contains_key(&id) {
                return Err(ThreadError::NotFound(id));
            }
            subtree(&arena, id, Order::ChildrenFirst)
                .into_iter()
                .filter_map(|member| {
                    let run = arena[&member].run.as_ref()?;
                    if run.latch.is_done() {
                        return None;
                    }
                    run.stop.cancel();
                    Some((member, run.latch.clone()))
                })
                .collect()
        };

        let deadline = Instant::now() + self.config.stop_timeout;
        let mut report = StopReport::default();
        for (member, latch) in &pending {
            if latch.wait_until(deadline) {
                report.stopped.push(*member);
            } else {
                report.timed_out.push(*member);
            }
        }
        if !report.is_complete() {
            warn!(
                thread_id = %id,
                timeout_secs = self.config.stop_timeout.as_secs_f64(),
                stuck = ?report.timed_out,
                "Kernel thread did not stop in time"
            );
        }

        let stopped = {
            let mut arena = self.arena();
            let group = subtree(&arena, id, Order::ChildrenFirst);
            let mut stopped = Vec::new();
            for member in group {
                if report.timed_out.contains(&member) {
                    continue;
                }
                let Some(thread) = arena.get_mut(&member) else { continue };
                if regen {
                    if let Some(run) = thread.run.take() {
                        run.reap();
                    }
                    thread.ready = true;
                }
                if report.stopped.contains(&member) {
                    stopped.push(thread.to_info());
                }
            }
            stopped
        };

        info!(
            thread_id = %id,
            regen,
            stopped = stopped.len(),
            timed_out = report.timed_out.len(),
            "Kernel thread stopped"
        );
        if let Some(observer) = self.sink.observer() {
            for thread in &stopped {
                observer.on_stopped(thread);
            }
        }
        Ok(report)
    }

    /// Stop on behalf of a user; critical threads refuse.
    pub fn stop_by_user(&self, id: KernelThreadId) -> Result<StopReport, ThreadError> {
        {
            let arena = self.arena();
            let thread = arena.get(&id).ok_or(ThreadError::NotFound(id))?;
            if thread.critical {
                return Err(ThreadError::Critical { id, name: thread.name.clone() });
            }
        }
        self.stop(id, true)
    }

    /// Stop every running top-level thread.
    pub fn stop_all(&self, regen: bool) {
        let running: Vec<KernelThreadId> = self
            .arena()
            .values()
            .filter(|t| !t.is_child())
            .map(|t| t.id)
            .collect();
        for id in running {
            if let Err(e) = self.stop(id, regen) {
                warn!(thread_id = %id, error = %e, "Failed to stop kernel thread");
            }
        }
    }

    /// Make a finished thread group startable again without stopping it first.
    pub fn regen(&self, id: KernelThreadId) -> Result<(), ThreadError> {
        let mut arena = self.arena();
        if !arena.contains_key(&id) {
            return Err(ThreadError::NotFound(id));
        }
        let group = subtree(&arena, id, Order::ChildrenFirst);
        if let Some(alive) = group.iter().find(|m| arena[*m].is_alive()) {
            return Err(ThreadError::StillRunning {
                id: *alive,
                name: arena[alive].name.clone(),
            });
        }
        for member in group {
            if let Some(thread) = arena.get_mut(&member) {
                if let Some(run) = thread.run.take() {
                    run.reap();
                }
                thread.ready = true;
            }
        }
        debug!(thread_id = %id, "Kernel thread regenerated");
        Ok(())
    }

    /// Block until the thread and all of its children finish.
    pub fn wait(&self, id: KernelThreadId) -> Result<(), ThreadError> {
        for latch in self.latches(id, true)? {
            latch.wait();
        }
        Ok(())
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`; true on success.
    pub fn wait_timeout(&self, id: KernelThreadId, timeout: Duration) -> Result<bool, ThreadError> {
        let deadline = Instant::now() + timeout;
        Ok(self
            .latches(id, true)?
            .iter()
            .all(|latch| latch.wait_until(deadline)))
    }

    /// Sleep up to `duration`, waking early once `id` itself finishes.
    ///
    /// Returns true if the thread finished before the time ran out.
    pub fn sleep_no_block(&self, duration: Duration, id: KernelThreadId) -> Result<bool, ThreadError> {
        let deadline = Instant::now() + duration;
        Ok(self
            .latches(id, false)?
            .iter()
            .all(|latch| latch.wait_until(deadline)))
    }

    fn latches(&self, id: KernelThreadId, recursive: bool) -> Result<Vec<Arc<RunLatch>>, ThreadError> {
        let arena = self.arena();
        if !arena.contains_key(&id) {
            return Err(ThreadError::NotFound(id));
        }
        let members = if recursive {
            subtree(&arena, id, Order::ParentFirst)
        } else {
            vec![id]
        };
        Ok(members
            .iter()
            .filter_map(|m| arena[m].run.as_ref().map(|r| r.latch.clone()))
            .collect())
    }

    // ── Thread Removal ──────────────────────────────────────────────────────

    /// Drop a thread and its children from the arena. Running groups refuse.
    pub fn remove(&self, id: KernelThreadId) -> Result<(), ThreadError> {
        let mut arena = self.arena();
        let parent = arena.get(&id).ok_or(ThreadError::NotFound(id))?.parent;
        let group = subtree(&arena, id, Order::ChildrenFirst);
        if let Some(alive) = group.iter().find(|m| arena[*m].is_alive()) {
            return Err(ThreadError::StillRunning {
                id: *alive,
                name: arena[alive].name.clone(),
            });
        }
        for member in &group {
            if let Some(run) = arena.remove(member).and_then(|t| t.run) {
                run.reap();
            }
        }
        if let Some(parent) = parent.and_then(|p| arena.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        debug!(thread_id = %id, removed = group.len(), "Kernel thread removed");
        Ok(())
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadManager {
    fn drop(&mut self) {
        // Background threads are abandoned; foreground threads get the stop timeout.
        let arena = self.threads.get_mut().unwrap_or_else(|p| p.into_inner());
        let mut foreground = Vec::new();
        for thread in arena.values() {
            if let Some(run) = thread.run.as_ref().filter(|r| !r.latch.is_done()) {
                run.stop.cancel();
                if !thread.background {
                    foreground.push(run.latch.clone());
                }
            }
        }
        let deadline = Instant::now() + self.config.stop_timeout;
        for latch in foreground {
            latch.wait_until(deadline);
        }
    }
}

#[derive(Clone, Copy)]
enum Order {
    ParentFirst,
    ChildrenFirst,
}

/// `root` plus all of its descendants.
fn subtree(
    arena: &BTreeMap<KernelThreadId, KernelThread>,
    root: KernelThreadId,
    order: Order,
) -> Vec<KernelThreadId> {
    fn visit(
        arena: &BTreeMap<KernelThreadId, KernelThread>,
        id: KernelThreadId,
        order: Order,
        out: &mut Vec<KernelThreadId>,
    ) {
        let Some(thread) = arena.get(&id) else { return };
        if matches!(order, Order::ParentFirst) {
            out.push(id);
        }
        for child in &thread.children {
            visit(arena, *child, order, out);
        }
        if matches!(order, Order::ChildrenFirst) {
            out.push(id);
        }
    }

    let mut out = Vec::new();
    visit(arena, root, order, &mut out);
    out
}

/// Undo a partially started group: signal the members that already run and
/// make them startable again. Their runs are kept until the next spawn reaps
/// them, so `is_alive` stays truthful while they wind down.
fn roll_back(arena: &mut BTreeMap<KernelThreadId, KernelThread>, started: &[KernelThreadId]) {
    for id in started {
        let Some(thread) = arena.get_mut(id) else { continue };
        if let Some(run) = thread.run.as_ref() {
            run.stop.cancel();
        }
        thread.ready = true;
        thread.started_at = None;
    }
    warn!(rolled_back = started.len(), "Kernel thread group failed to start");
}

/// Run one thread body, routing escaped failures to the fatal sink.
fn run_body(action: ThreadAction, ctx: ThreadContext, critical: bool, sink: &FatalSink) {
    let id = ctx.id;
    let name = ctx.name.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(ctx)));

    let (message, panicked) = match outcome {
        Ok(Ok(())) => {
            debug!(thread_id = %id, thread = %name, "Kernel thread finished");
            return;
        }
        Ok(Err(e)) if e.is::<Interrupted>() => {
            debug!(thread_id = %id, thread = %name, "Kernel thread interrupted");
            return;
        }
        Ok(Err(e)) => (format!("{e:#}"), false),
        Err(payload) => (panic_message(payload.as_ref()), true),
    };

    sink.report(FatalThreadError {
        thread_id: id,
        thread_name: name,
        critical,
        panicked,
        message,
        at: Utc::now(),
    });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
