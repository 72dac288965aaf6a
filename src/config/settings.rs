//! Application settings and paths.
//!
//! Settings are read from `settings.json` in the XDG config directory
//! (~/.config/netsweep on Linux) or from an explicit path.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{Admission, ScanConfig};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/netsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve paths using XDG directories.
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "netsweep", "netsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults for a scan, overridable from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Maximum number of hosts scanned at once.
    pub threads: usize,
    /// Connection timeout per probe in milliseconds.
    pub probe_timeout_ms: u64,
    /// Stop writing results after this many idle seconds. Unset means the
    /// log stays open until every host is done.
    pub idle_timeout_secs: Option<u64>,
    /// How new hosts are admitted once the thread cap is reached.
    pub admission: Admission,
    /// Append to an existing result log instead of truncating it.
    pub append: bool,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            threads: 100,
            probe_timeout_ms: 10_000,
            idle_timeout_secs: None,
            admission: Admission::Pool,
            append: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings from the default location.
    ///
    /// A missing file, or a platform without a config directory, yields the
    /// defaults.
    pub fn load() -> ConfigResult<Self> {
        let file = match Paths::new() {
            Ok(paths) => paths.settings_file(),
            Err(ConfigError::DirectoryNotFound) => return Ok(Self::default()),
            Err(e) => return Err(e),
        };

        if !file.exists() {
            debug!(path = %file.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Build the runtime scan configuration these settings describe.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::new()
            .with_threads(self.threads)
            .with_probe_timeout(Duration::from_millis(self.probe_timeout_ms))
            .with_idle_timeout(self.idle_timeout_secs.map(Duration::from_secs))
            .with_admission(self.admission)
    }
}
