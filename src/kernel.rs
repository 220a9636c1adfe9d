//! Kernel context: the one object that owns configuration, the thread
//! manager and the event bus. Everything else borrows it.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde_json::json;
use tracing::{error, info};

use crate::args::CommonArgs;
use crate::config::Config;
use crate::error::ConfigError;
use crate::events::{EventKind, EventsManager};
use crate::threads::{FatalThreadError, ThreadInfo, ThreadManager, ThreadObserver};

/// Republishes thread lifecycle changes on the event bus.
struct ThreadEvents {
    events: Arc<EventsManager>,
}

impl ThreadObserver for ThreadEvents {
    fn on_started(&self, info: &ThreadInfo) {
        self.events.fire(
            EventKind::ThreadStarted,
            vec![json!(info.id.0), json!(info.name)],
        );
    }

    fn on_stopped(&self, info: &ThreadInfo) {
        self.events.fire(
            EventKind::ThreadStopped,
            vec![json!(info.id.0), json!(info.name)],
        );
    }

    fn on_fatal(&self, fatal: &FatalThreadError) {
        self.events.fire(
            EventKind::ThreadFatal,
            vec![
                json!(fatal.thread_id.0),
                json!(fatal.thread_name),
                json!(fatal.message),
            ],
        );
        if fatal.critical {
            self.events
                .fire(EventKind::KernelError, vec![json!(fatal.to_string())]);
        }
    }
}

pub struct KernelContext {
    config: RwLock<Config>,
    /// Where `save_config`/`reload_config` go; `None` means the default path
    config_path: Option<PathBuf>,
    events: Arc<EventsManager>,
    threads: ThreadManager,
}

impl KernelContext {
    pub fn new(config: Config) -> Self {
        Self::with_config_path(config, None)
    }

    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        let events = Arc::new(EventsManager::with_config(config.events_manager()));
        let threads = ThreadManager::with_config(config.thread_manager());
        threads.set_observer(Arc::new(ThreadEvents {
            events: events.clone(),
        }));
        Self {
            config: RwLock::new(config),
            config_path,
            events,
            threads,
        }
    }

    /// Load the configuration named by the CLI flags and boot a context.
    pub fn from_args(args: &CommonArgs) -> Result<Self, ConfigError> {
        let config_path = args.config_path();
        let mut config = Config::load(config_path.as_deref())?;
        args.apply_overrides(&mut config);
        let kernel = Self::with_config_path(config, config_path);
        kernel
            .events
            .fire(EventKind::ConfigRead, vec![json!(kernel.config_file().display().to_string())]);
        Ok(kernel)
    }

    pub fn events(&self) -> &EventsManager {
        &self.events
    }

    /// Shared handle to the event bus, for handlers that outlive a borrow.
    pub fn events_handle(&self) -> Arc<EventsManager> {
        self.events.clone()
    }

    pub fn threads(&self) -> &ThreadManager {
        &self.threads
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.config().settings_dir.join("config.toml"))
    }

    /// Apply `edit` to the in-memory configuration.
    pub fn update_config(&self, edit: impl FnOnce(&mut Config)) {
        edit(&mut self.config.write().unwrap_or_else(|p| p.into_inner()));
    }

    // ── Configuration I/O ───────────────────────────────────────────────────

    /// Write the configuration, firing `ConfigSaved` or `ConfigSaveError`.
    pub fn save_config(&self) -> Result<PathBuf, ConfigError> {
        let path = self.config_file();
        match self.config().save(Some(path.as_path())) {
            Ok(path) => {
                info!(path = %path.display(), "Configuration saved");
                self.events
                    .fire(EventKind::ConfigSaved, vec![json!(path.display().to_string())]);
                Ok(path)
            }
            Err(e) => {
                error!(error = %e, "Failed to save configuration");
                self.events
                    .fire(EventKind::ConfigSaveError, vec![json!(e.to_string())]);
                Err(e)
            }
        }
    }

    /// Re-read the configuration file, firing the reload and read events.
    ///
    /// Thread and event limits were fixed when the managers were built; a
    /// reload only affects settings read on demand (prompt, TUI layout).
    pub fn reload_config(&self) -> Result<(), ConfigError> {
        let path = self.config_file();
        self.events.fire(EventKind::PreReloadConfig, Vec::new());
        match Config::load(Some(path.as_path())) {
            Ok(mut config) => {
                config.settings_dir = self.config().settings_dir;
                *self.config.write().unwrap_or_else(|p| p.into_inner()) = config;
                self.events
                    .fire(EventKind::ConfigRead, vec![json!(path.display().to_string())]);
                self.events.fire(EventKind::PostReloadConfig, Vec::new());
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to reload configuration");
                self.events
                    .fire(EventKind::ConfigReadError, vec![json!(e.to_string())]);
                Err(e)
            }
        }
    }

    /// Stop every thread, bracketed by the shutdown events.
    pub fn shutdown(&self) {
        self.events.fire(EventKind::PreShutdown, Vec::new());
        self.threads.stop_all(false);
        self.events.fire(EventKind::PostShutdown, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn kernel_in(dir: &std::path::Path) -> KernelContext {
        let mut config = Config {
            settings_dir: dir.to_path_buf(),
            ..Default::default()
        };
        config.threads.stop_timeout_secs = 5;
        KernelContext::new(config)
    }

    #[test]
    fn test_thread_lifecycle_fires_events() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_in(dir.path());
        let id = kernel.threads().create("Worker", false, |ctx| {
            ctx.stop.wait_cancelled();
            Err(crate::error::Interrupted.into())
        });

        kernel.threads().start(id).unwrap();
        kernel.threads().stop(id, true).unwrap();

        let started = kernel.events().list_fired("ThreadStarted");
        assert_eq!(started, vec![("ThreadStarted".to_string(), vec![json!(id.0), json!("Worker")])]);
        assert_eq!(kernel.events().list_fired("ThreadStopped").len(), 1);
        assert!(kernel.events().list_fired("ThreadFatal").is_empty());
    }

    #[test]
    fn test_fatal_thread_fires_thread_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_in(dir.path());
        let id = kernel
            .threads()
            .create("Doomed", false, |_| anyhow::bail!("disk on fire"));

        kernel.threads().start(id).unwrap();
        assert!(kernel.threads().wait_timeout(id, Duration::from_secs(5)).unwrap());

        let fatal = kernel.events().list_fired("ThreadFatal");
        assert_eq!(fatal.len(), 1);
        assert_eq!(fatal[0].1[2], json!("disk on fire"));
        assert!(kernel.events().list_fired("KernelError").is_empty());
    }

    #[test]
    fn test_save_and_reload_fire_config_events() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_in(dir.path());
        kernel.update_config(|c| c.shell.prompt = "$ ".into());

        let path = kernel.save_config().unwrap();
        assert_eq!(path, dir.path().join("config.toml"));
        kernel.update_config(|c| c.shell.prompt = "changed".into());
        kernel.reload_config().unwrap();

        assert_eq!(kernel.config().shell.prompt, "$ ");
        assert_eq!(kernel.events().list_fired("ConfigSaved").len(), 1);
        assert_eq!(kernel.events().list_fired("ConfigRead").len(), 1);
        assert_eq!(kernel.events().list_fired("PostReloadConfig").len(), 1);
    }

    #[test]
    fn test_reload_failure_fires_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let kernel = kernel_in(dir.path());
        std::fs::write(dir.path().join("config.toml"), "shell = 42").unwrap();

        assert!(kernel.reload_config().is_err());
        assert_eq!(kernel.events().list_fired("ConfigReadError").len(), 1);
        assert!(kernel.events().list_fired("PostReloadConfig").is_empty());
    }
}
