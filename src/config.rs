//! Reader configuration
//!
//! Controls where stream-sourced archives are materialized and whether readers
//! share open handles through the process-wide registry. Loadable from TOML:
//!
//! ```toml
//! temp_dir = "/var/tmp/imports"
//! temp_prefix = "lar-"
//! share_handles = true
//! ```

use crate::error::{Result, ZipFsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default prefix for materialized archive files
pub const DEFAULT_TEMP_PREFIX: &str = "zipfs-";

/// Default suffix for materialized archive files
pub const DEFAULT_TEMP_SUFFIX: &str = ".zip";

/// Options applied when constructing an `ArchiveReader`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Directory for temporary backing files (OS temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    pub temp_prefix: String,
    pub temp_suffix: String,
    /// Route handle acquisition through the process-wide registry
    pub share_handles: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            share_handles: true,
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize stream archives under `dir`
    pub fn with_temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_temp_prefix(mut self, prefix: &str) -> Self {
        self.temp_prefix = prefix.to_string();
        self
    }

    pub fn with_temp_suffix(mut self, suffix: &str) -> Self {
        self.temp_suffix = suffix.to_string();
        self
    }

    pub fn with_shared_handles(mut self, share: bool) -> Self {
        self.share_handles = share;
        self
    }

    /// Parse a configuration from TOML, filling unset keys with defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ReaderConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check that the temp-file name parts cannot escape `temp_dir`
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [("temp_prefix", &self.temp_prefix), ("temp_suffix", &self.temp_suffix)] {
            if value.contains(['/', '\\']) {
                return Err(ZipFsError::Config(format!(
                    "{} must not contain path separators: {:?}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}
