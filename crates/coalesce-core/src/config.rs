//! Run configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default name of the consolidation log, placed inside the destination.
pub const CONSOLIDATION_LOG_FILE_NAME: &str = "consolidation_log.txt";

/// Default name of the cleanup log, placed in the working directory.
pub const CLEANUP_LOG_FILE_NAME: &str = "empty_folders_cleanup_log.txt";

/// Immutable configuration for one consolidation run.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RunConfig {
    /// Directories whose immediate children are consolidated, in order.
    #[serde(alias = "sources")]
    pub source_roots: Vec<PathBuf>,

    /// Directory receiving every copy.
    pub destination: PathBuf,

    /// Log file location (None = `<destination>/consolidation_log.txt`).
    #[builder(default)]
    #[serde(default, alias = "log")]
    pub log_path: Option<PathBuf>,

    /// Whether the caller confirmed the run. Unconfirmed runs only plan.
    #[builder(default = "false")]
    #[serde(default)]
    pub confirmed: bool,

    /// Always rename colliding folders, even when a folder left by a previous
    /// run has identical content.
    #[builder(default = "false")]
    #[serde(default)]
    pub always_rename_folders: bool,
}

impl RunConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        match self.source_roots {
            Some(ref roots) => check_roots(roots)?,
            None => return Err("At least one source root is required".to_string()),
        }
        match self.destination {
            Some(ref dest) if dest.as_os_str().is_empty() => {
                Err("Destination path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Destination path is required".to_string()),
        }
    }
}

impl RunConfig {
    /// Create a new run config builder.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Create an unconfirmed config for the given sources and destination.
    pub fn new(source_roots: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_roots,
            destination: destination.into(),
            log_path: None,
            confirmed: false,
            always_rename_folders: false,
        }
    }

    /// Parse a config from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from an explicitly given TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Check the invariants the builder enforces.
    pub fn validate(&self) -> Result<()> {
        check_roots(&self.source_roots).map_err(Error::invalid_config)?;
        if self.destination.as_os_str().is_empty() {
            return Err(Error::invalid_config("Destination path cannot be empty"));
        }
        Ok(())
    }

    /// The log file this run writes to.
    pub fn log_file(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.destination.join(CONSOLIDATION_LOG_FILE_NAME))
    }

    /// Return a copy with the confirmation flag set.
    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }
}

/// Immutable configuration for one empty-folder cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CleanupConfig {
    /// Directories to clean. The roots themselves are never removed.
    #[serde(alias = "sources", alias = "source_roots")]
    pub roots: Vec<PathBuf>,

    /// Log file location (None = `empty_folders_cleanup_log.txt` in the
    /// working directory).
    #[builder(default)]
    #[serde(default, alias = "log")]
    pub log_path: Option<PathBuf>,

    /// Whether deletion was confirmed. Unconfirmed runs only list.
    #[builder(default = "false")]
    #[serde(default)]
    pub confirmed: bool,
}

impl CleanupConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        match self.roots {
            Some(ref roots) => check_roots(roots),
            None => Err("At least one root is required".to_string()),
        }
    }
}

impl CleanupConfig {
    /// Create a new cleanup config builder.
    pub fn builder() -> CleanupConfigBuilder {
        CleanupConfigBuilder::default()
    }

    /// Create an unconfirmed cleanup config logging to the default file.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            log_path: None,
            confirmed: false,
        }
    }

    /// Take the roots of a consolidation config, so one config file can
    /// drive both operations.
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self::new(config.source_roots.clone())
    }

    /// Check the invariants the builder enforces.
    pub fn validate(&self) -> Result<()> {
        check_roots(&self.roots).map_err(Error::invalid_config)
    }

    /// The log file this run writes to.
    pub fn log_file(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CLEANUP_LOG_FILE_NAME))
    }

    /// Return a copy with the confirmation flag set.
    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }
}

fn check_roots(roots: &[PathBuf]) -> std::result::Result<(), String> {
    if roots.is_empty() {
        return Err("At least one source root is required".to_string());
    }
    if roots.iter().any(|r| r.as_os_str().is_empty()) {
        return Err("Source root paths cannot be empty".to_string());
    }
    Ok(())
}
