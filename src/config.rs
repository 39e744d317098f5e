use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

use crate::requirements::{default_requirements, Requirement};

/// Config file picked up from the working directory when present
pub const CONFIG_FILE: &str = "portable.toml";

const DEFAULT_STAGING_DIR: &str = "HandGestureRecognition_Portable";
const DEFAULT_ARCHIVE: &str = "HandGestureRecognition_Portable.zip";
const DEFAULT_INCLUDE: &[&str] = &["app.py", "utils", "model", "README.md"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("staging_dir must be a plain directory name, got {0:?}")]
    InvalidStagingDir(String),

    #[error("archive must be a plain file name, got {0:?}")]
    InvalidArchiveName(String),

    #[error("staging_dir and archive must differ (both are {0:?})")]
    ArchiveCollision(String),

    #[error("include entry must be a top-level name, got {0:?}")]
    InvalidInclude(String),

    #[error("include entry {0:?} collides with the bundle output")]
    IncludesOutput(String),

    #[error("requirement name {0:?} is empty or contains whitespace")]
    InvalidRequirement(String),
}

/// What goes into the portable bundle and where it is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    #[serde(default = "default_archive")]
    pub archive: String,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_requirements")]
    pub requirements: Vec<Requirement>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            archive: default_archive(),
            include: default_include(),
            requirements: default_requirements(),
        }
    }
}

impl BundleConfig {
    /// Load config from `path`, falling back to defaults when it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_plain_name(&self.staging_dir) {
            return Err(ConfigError::InvalidStagingDir(self.staging_dir.clone()));
        }
        if !is_plain_name(&self.archive) {
            return Err(ConfigError::InvalidArchiveName(self.archive.clone()));
        }
        if self.staging_dir == self.archive {
            return Err(ConfigError::ArchiveCollision(self.archive.clone()));
        }

        for entry in &self.include {
            if !is_plain_name(entry) {
                return Err(ConfigError::InvalidInclude(entry.clone()));
            }
            if *entry == self.staging_dir || *entry == self.archive {
                return Err(ConfigError::IncludesOutput(entry.clone()));
            }
        }

        for requirement in &self.requirements {
            let name = &requirement.name;
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidRequirement(name.clone()));
            }
        }

        Ok(())
    }
}

/// A single normal path component: no separators, no `.`/`..`, not absolute
fn is_plain_name(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !value.contains(['/', '\\'])
}

fn default_staging_dir() -> String {
    DEFAULT_STAGING_DIR.to_string()
}

fn default_archive() -> String {
    DEFAULT_ARCHIVE.to_string()
}

fn default_include() -> Vec<String> {
    DEFAULT_INCLUDE.iter().map(|name| name.to_string()).collect()
}
