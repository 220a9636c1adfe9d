//! Kernel thread integration tests.
//!
//! Drive the public `ThreadManager` API with real native threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nitrocid::error::{Interrupted, ThreadError};
use nitrocid::threads::{
    ThreadContext, ThreadInfo, ThreadManager, ThreadManagerConfig, ThreadObserver, ThreadStatus,
};

fn manager() -> ThreadManager {
    ThreadManager::with_config(ThreadManagerConfig {
        stop_timeout: Duration::from_secs(5),
    })
}

fn idle(ctx: ThreadContext) -> anyhow::Result<()> {
    ctx.stop.wait_cancelled();
    Err(Interrupted.into())
}

// ── Lifecycle ───────────────────────────────────────────────────────────────

mod lifecycle {
    use super::*;

    #[test]
    fn test_stop_with_regen_allows_restart() {
        let threads = manager();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let id = threads.create("Restartable", false, move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.stop.wait_cancelled();
            Err(Interrupted.into())
        });

        threads.start(id).unwrap();
        threads.stop(id, true).unwrap();
        threads.start(id).unwrap();
        threads.stop(id, true).unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(threads.fatal_errors().is_empty());
    }

    #[test]
    fn test_stop_without_regen_leaves_thread_finished() {
        let threads = manager();
        let id = threads.create("Once", false, idle);
        threads.start(id).unwrap();
        threads.stop(id, false).unwrap();

        assert_eq!(threads.info(id).unwrap().status, ThreadStatus::Finished);
        assert!(matches!(threads.start(id), Err(ThreadError::NotReady { .. })));

        threads.regen(id).unwrap();
        threads.start(id).unwrap();
        threads.stop(id, true).unwrap();
    }

    #[test]
    fn test_timed_wait_reports_timeout() {
        let threads = manager();
        let id = threads.create("Sleeper", false, idle);
        threads.start(id).unwrap();

        assert!(!threads.wait_timeout(id, Duration::from_millis(50)).unwrap());
        threads.stop(id, true).unwrap();
        assert!(threads.wait_timeout(id, Duration::from_millis(50)).unwrap());
    }

    #[derive(Default)]
    struct StopCounter(AtomicUsize);

    impl ThreadObserver for StopCounter {
        fn on_stopped(&self, _info: &ThreadInfo) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stop_times_out_on_uncooperative_body() {
        let threads = ThreadManager::with_config(ThreadManagerConfig {
            stop_timeout: Duration::from_millis(200),
        });
        let stops = Arc::new(StopCounter::default());
        threads.set_observer(stops.clone());
        let id = threads.create("Deaf", false, |_| {
            std::thread::sleep(Duration::from_millis(1500));
            Ok(())
        });
        threads.start(id).unwrap();

        let began = Instant::now();
        let report = threads.stop(id, true).unwrap();
        let elapsed = began.elapsed();

        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(1200));
        assert!(!report.is_complete());
        assert_eq!(report.timed_out, vec![id]);
        assert_eq!(stops.0.load(Ordering::SeqCst), 0);
        assert!(threads.is_alive(id));

        threads.wait(id).unwrap();
        assert_eq!(threads.info(id).unwrap().status, ThreadStatus::Finished);
    }

    #[test]
    fn test_parameter_reaches_body() {
        let threads = manager();
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let id = threads.create("Param", false, move |ctx| {
            *slot.lock().unwrap() = ctx.parameter::<String>().cloned();
            Ok(())
        });

        threads.start_with(id, "hello".to_string()).unwrap();
        threads.wait(id).unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("hello"));
    }
}

// ── Parent / child groups ───────────────────────────────────────────────────

mod groups {
    use super::*;

    #[test]
    fn test_parent_with_two_children_starts_and_stops_together() {
        let threads = manager();
        let parent = threads.create("Parent", false, idle);
        let a = threads.add_child(parent, "Child A", false, idle).unwrap();
        let b = threads.add_child(parent, "Child B", false, idle).unwrap();

        threads.start(parent).unwrap();
        assert!(threads.is_alive(parent));
        assert!(threads.is_alive(a));
        assert!(threads.is_alive(b));

        threads.stop(parent, true).unwrap();
        for id in [parent, a, b] {
            assert!(!threads.is_alive(id));
            assert!(threads.is_ready(id));
        }
    }

    #[test]
    fn test_children_cannot_start_alone() {
        let threads = manager();
        let parent = threads.create("Parent", false, idle);
        let child = threads.add_child(parent, "Child", false, idle).unwrap();

        assert!(matches!(
            threads.start(child),
            Err(ThreadError::ChildThread { .. })
        ));
    }

    #[test]
    fn test_add_child_to_running_parent_fails() {
        let threads = manager();
        let parent = threads.create("Parent", false, idle);
        threads.start(parent).unwrap();

        assert!(matches!(
            threads.add_child(parent, "Late", false, idle),
            Err(ThreadError::AlreadyRunning { .. })
        ));
        threads.stop(parent, true).unwrap();
    }

    #[test]
    fn test_listing_hides_children() {
        let threads = manager();
        let parent = threads.create("Parent", false, idle);
        threads.add_child(parent, "Child", false, idle).unwrap();

        assert_eq!(threads.threads().len(), 1);
        assert_eq!(threads.all_threads().len(), 2);
        assert_eq!(threads.children(parent)[0].name, "Child");
    }

    #[test]
    fn test_remove_cascades_to_children() {
        let threads = manager();
        let parent = threads.create("Parent", false, idle);
        let child = threads.add_child(parent, "Child", false, idle).unwrap();

        threads.remove(parent).unwrap();
        assert!(threads.info(parent).is_none());
        assert!(threads.info(child).is_none());
    }
}

// ── Failures ────────────────────────────────────────────────────────────────

mod failures {
    use super::*;

    #[test]
    fn test_panicking_body_is_recorded() {
        let threads = manager();
        let id = threads.create("Panics", false, |_| panic!("boom"));
        threads.start(id).unwrap();
        threads.wait(id).unwrap();

        let fatal = threads.fatal_errors();
        assert_eq!(fatal.len(), 1);
        assert!(fatal[0].panicked);
        assert_eq!(fatal[0].message, "boom");
    }

    #[test]
    fn test_critical_thread_refuses_user_stop() {
        let threads = manager();
        let id = threads.create_critical("Core", false, idle);
        threads.start(id).unwrap();

        assert!(matches!(
            threads.stop_by_user(id),
            Err(ThreadError::Critical { .. })
        ));
        assert!(threads.is_alive(id));
        threads.stop(id, true).unwrap();
    }

    #[test]
    fn test_unknown_id() {
        let threads = manager();
        let id = threads.create("Gone", false, idle);
        threads.remove(id).unwrap();

        assert!(matches!(threads.start(id), Err(ThreadError::NotFound(_))));
        assert!(matches!(threads.stop(id, true), Err(ThreadError::NotFound(_))));
    }
}
