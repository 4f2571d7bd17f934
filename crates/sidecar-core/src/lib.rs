//! Sidecar provisioning engine.
//!
//! Resolves the platform target, looks up the release asset for each logical
//! sidecar, downloads and unpacks it into the cache directory, and falls back
//! to a placeholder stub for optional sidecars a platform has no build for.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod io;
pub mod provision;
pub mod repo;
pub mod reporter;
pub mod resolver;
pub mod stub;
pub mod version;

pub use cache::{CacheOutcome, SidecarCache, SidecarError};
pub use catalog::{AssetCatalog, CatalogError, SidecarSpec};
pub use config::{ConfigError, ProvisionConfig};
pub use provision::{
    PlanAction, ProvisionError, ProvisionPlan, ProvisionReport, Provisioner, SidecarOutcome,
    SidecarReport, SkipReason,
};
pub use reporter::{NullReporter, Reporter};
pub use resolver::{HostTable, TargetResolver};

/// User Agent string sent with every release download
pub const USER_AGENT: &str = concat!("sidecars/", env!("CARGO_PKG_VERSION"));
