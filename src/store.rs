//! Loading and saving the configuration document.
//!
//! Reads never fail: a missing file means a first run, and an unreadable or
//! corrupt file is reported with `warn!` and replaced by defaults in memory.
//! The next save overwrites it.
//!
//! Writes replace the whole document. The JSON is written to a sibling
//! `.tmp` file first and then renamed over the target, so an interrupted save
//! never leaves a truncated config behind. There is no locking; concurrent
//! writers race.

use crate::config::{complete_with_defaults, parse_config, Config, PartialConfig};
use crate::error::ReportError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cr_config.json";

/// A configuration document at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, completing missing fields from defaults.
    pub fn load(&self) -> Config {
        complete_with_defaults(self.load_partial().unwrap_or_default())
    }

    /// Raw document as found on disk, or `None` when absent or unusable.
    pub fn load_partial(&self) -> Option<PartialConfig> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", self.path.display());
                return None;
            }
            Err(e) => {
                warn!(
                    "Could not read configuration {}: {}; using defaults",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        let parsed = parse_config(&raw);
        if parsed.is_none() {
            warn!(
                "Configuration {} is not a JSON object; using defaults",
                self.path.display()
            );
        }
        parsed
    }

    /// Overwrite the document with `config`.
    pub fn save(&self, config: &Config) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(config).map_err(|e| self.persistence(e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(|e| self.persistence(e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.persistence(e));
        }

        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    fn persistence(&self, e: impl std::fmt::Display) -> ReportError {
        ReportError::Persistence {
            path: self.path.clone(),
            detail: e.to_string(),
        }
    }
}
