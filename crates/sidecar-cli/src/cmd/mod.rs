//! Subcommand implementations

pub mod catalog;
pub mod fetch;
pub mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use sidecar_core::ProvisionConfig;
use sidecar_core::version::VersionError;

use crate::Cli;

/// Resolve the configuration: CLI flags over the config file over defaults.
pub fn load_config(cli: &Cli) -> Result<ProvisionConfig> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };

    let mut config = ProvisionConfig::load(&project_dir, cli.config.as_deref())
        .context("Failed to load sidecar configuration")?;

    if let Some(path) = &cli.version_file {
        config = config.with_version_file(path);
    }
    if let Some(path) = &cli.cache_dir {
        config = config.with_cache_dir(path);
    }
    Ok(config)
}

/// Message for a run skipped because the version pin is unusable.
pub fn skipped_message(err: &VersionError) -> String {
    format!("{err}; skipping sidecar provisioning")
}

/// Path shown to the user, relative to `base` when it is inside it.
pub fn display_path(path: &std::path::Path, base: &std::path::Path) -> String {
    path.strip_prefix(base)
        .map_or_else(|_| path.to_path_buf(), PathBuf::from)
        .display()
        .to_string()
}
