// Public API
pub mod cli;
pub mod commands;

// Core domain types
mod archive;
mod bundler;
mod config;
mod requirements;
mod templates;
mod ui;
mod util;

// Re-export main types
pub use bundler::{BundleReport, Bundler};
pub use config::{BundleConfig, ConfigError, CONFIG_FILE};
pub use requirements::{default_requirements, Requirement, REQUIREMENTS_FILE};
