use crate::cli::Cli;
use crate::config::{BundleConfig, CONFIG_FILE};
use anyhow::{Context, Result};
use std::env;

mod package;

pub fn execute(cli: Cli) -> Result<()> {
    // Resolve the working directory - everything is relative to it
    let root = match cli.directory {
        Some(dir) => dir,
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    if !root.is_dir() {
        anyhow::bail!("Working directory {:?} does not exist", root);
    }

    let config = match cli.config {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Config file {:?} not found", path);
            }
            BundleConfig::load(&path)?
        }
        None => BundleConfig::load(&root.join(CONFIG_FILE))?,
    };

    package::execute(&root, config)
}
