use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::events::EventsManagerConfig;
use crate::threads::ThreadManagerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// State directory (logs, default config location)
    pub settings_dir: PathBuf,
    pub threads: ThreadsConfig,
    pub events: EventsConfig,
    pub tui: TuiConfig,
    pub shell: ShellConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsConfig {
    /// How long `stop` waits for a thread group before giving up
    pub stop_timeout_secs: u64,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Cap on the fired-event history; unset keeps everything
    pub history_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Title rows above the panes
    pub header_rows: u16,
    /// Auto-refresh period of the task manager
    pub refresh_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            header_rows: 1,
            refresh_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub prompt: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "nitrocid> ".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            settings_dir: home_dir.join(".nitrocid"),
            threads: ThreadsConfig::default(),
            events: EventsConfig::default(),
            tui: TuiConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl Config {
    /// `~/.nitrocid/config.toml`
    pub fn default_path() -> PathBuf {
        Self::default().settings_dir.join("config.toml")
    }

    /// Load configuration from `path` (or the default location).
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !config_path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })
    }

    /// Save configuration to `path` (or `<settings_dir>/config.toml`).
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings_dir.join("config.toml"));

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: config_path.clone(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(config_path)
    }

    pub fn log_path(&self) -> PathBuf {
        self.settings_dir.join("nitrocid.log")
    }

    pub fn thread_manager(&self) -> ThreadManagerConfig {
        ThreadManagerConfig {
            stop_timeout: Duration::from_secs(self.threads.stop_timeout_secs),
        }
    }

    pub fn events_manager(&self) -> EventsManagerConfig {
        EventsManagerConfig {
            history_limit: self.events.history_limit,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.tui.refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config.threads.stop_timeout_secs, 60);
        assert_eq!(config.events.history_limit, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            settings_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.events.history_limit = Some(500);
        config.shell.prompt = "> ".into();

        let path = config.save(None).unwrap();
        assert_eq!(path, dir.path().join("config.toml"));
        assert_eq!(Config::load(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[threads]\nstop_timeout_secs = 5\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.thread_manager().stop_timeout, Duration::from_secs(5));
        assert_eq!(config.tui, TuiConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "threads = [").unwrap();

        assert!(matches!(
            Config::load(Some(path.as_path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
