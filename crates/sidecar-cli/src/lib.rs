//! sidecars - sidecar binary provisioning
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Fetches the prebuilt helper executables a desktop application bundles
//! next to its main binary, for the platform being built.
//!
//! # Layout
//!
//! ```text
//! <project>/
//! ├── .sidecar-version   # release tag to fetch (e.g. v1.4.2)
//! ├── sidecars.toml      # optional: release source and asset catalog
//! └── build/binaries/    # one file per sidecar: {name}-{target}[.exe]
//! ```

pub mod cmd;
pub mod ui;

use clap::{ArgAction, Args, Parser, Subcommand};
use sidecar_schema::PlatformTarget;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sidecars")]
#[command(author, version, about = "Fetch the prebuilt sidecar binaries for a build target")]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Configuration file (defaults to <project>/sidecars.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Version-pin file (overrides the config)
    #[arg(long, global = true, value_name = "FILE")]
    pub version_file: Option<PathBuf>,

    /// Cache directory sidecars are written to (overrides the config)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download and install every sidecar for the target
    Fetch(TargetArgs),
    /// Show what `fetch` would do, without network access or writes
    Plan(TargetArgs),
    /// List the sidecars in the catalog and the targets they support
    Catalog,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Platform target triple (defaults to the host)
    #[arg(long, env = "SIDECAR_TARGET", value_name = "TRIPLE")]
    pub target: Option<PlatformTarget>,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "error",
            1 => "info",
            _ => "debug",
        }
    }
}
