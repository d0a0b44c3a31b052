//! User configuration
//!
//! Optional TOML file; every key has a default so an absent file or an
//! empty section is fine. Command-line flags are applied on top by the
//! commands that accept them.

pub mod divisions;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::models::constants::{DEFAULT_DENIED_CODECS, DESKTOP_USER_AGENT};
use crate::models::ScreenSize;
use crate::selector::FormatSelector;
use crate::supervisor::{RestartPolicy, SupervisorConfig};
use crate::tools::ToolOverrides;

pub use divisions::{parse_divisions, DivisionsStore};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "VIDEOTILER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TilerConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub format: FormatConfig,

    #[serde(default)]
    pub downloader: DownloaderConfig,

    #[serde(default)]
    pub tools: ToolOverrides,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Restart without asking when the renderer is lost
    #[serde(default = "default_true")]
    pub auto_restart: bool,

    /// Seconds to wait for a restart answer before restarting anyway
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Seconds the renderer gets to open its window
    #[serde(default = "default_window_timeout")]
    pub window_timeout_secs: u64,

    /// Seconds between SIGTERM and SIGKILL when tearing down a pipeline
    #[serde(default = "default_terminate_grace")]
    pub terminate_grace_secs: u64,

    /// Base restart delay; 0 restarts immediately
    #[serde(default)]
    pub restart_backoff_base_ms: u64,

    #[serde(default = "default_backoff_max")]
    pub restart_backoff_max_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            auto_restart: true,
            confirm_timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval(),
            window_timeout_secs: default_window_timeout(),
            terminate_grace_secs: default_terminate_grace(),
            restart_backoff_base_ms: 0,
            restart_backoff_max_secs: default_backoff_max(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_confirm_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_window_timeout() -> u64 {
    15
}

fn default_terminate_grace() -> u64 {
    5
}

fn default_backoff_max() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FormatConfig {
    /// Video codec family prefixes never selected
    #[serde(default = "default_denied_codecs")]
    pub denied_codecs: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            denied_codecs: default_denied_codecs(),
        }
    }
}

fn default_denied_codecs() -> Vec<String> {
    DEFAULT_DENIED_CODECS.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DownloaderConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    DESKTOP_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Screen size override, `WIDTHxHEIGHT`
    #[serde(default)]
    pub screen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Require a visible renderer window, not just a running process
    #[serde(default = "default_true")]
    pub windows: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { windows: true }
    }
}

impl TilerConfig {
    /// `<config_dir>/videotiler/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("videotiler").join("config.toml"))
    }

    /// Load from `path`, or from `$VIDEOTILER_CONFIG`, or from the default
    /// location. An explicitly named file must exist; the default one may
    /// be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match explicit {
            Some(path) => Self::load_file(&path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigurationError> {
        let config_error = |message: String| ConfigurationError::ConfigFile {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: Self = toml::from_str(&content).map_err(|e| config_error(e.to_string()))?;
        config.validate().map_err(config_error)?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.playback.poll_interval_ms == 0 {
            return Err("playback.poll_interval_ms must be greater than 0".to_string());
        }
        if let Some(screen) = &self.display.screen {
            screen.parse::<ScreenSize>().map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    pub fn screen_override(&self) -> Result<Option<ScreenSize>, ConfigurationError> {
        self.display
            .screen
            .as_deref()
            .map(str::parse::<ScreenSize>)
            .transpose()
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy::from_preference(
            self.playback.auto_restart,
            Duration::from_secs(self.playback.confirm_timeout_secs),
        )
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_secs(self.playback.terminate_grace_secs)
    }

    pub fn selector(&self) -> FormatSelector {
        FormatSelector::new(self.format.denied_codecs.clone())
    }

    pub fn supervisor_config(&self, screen: ScreenSize) -> SupervisorConfig {
        let playback = &self.playback;
        SupervisorConfig {
            poll_interval: Duration::from_millis(playback.poll_interval_ms),
            window_timeout: Duration::from_secs(playback.window_timeout_secs),
            restart_policy: self.restart_policy(),
            backoff_base: Duration::from_millis(playback.restart_backoff_base_ms),
            backoff_max: Duration::from_secs(playback.restart_backoff_max_secs),
            screen,
        }
    }
}
