//! Shared data model for sidecar provisioning.
//!
//! These types are consumed by the provisioning engine (`sidecar-core`) and by
//! anything that reads a provisioning report. They carry no IO.

pub mod asset;
pub mod host;
pub mod target;
pub mod types;

// Re-exports
pub use asset::{ArchiveFormat, AssetEntry, MemberMap};
pub use host::{HostArch, HostOs};
pub use target::PlatformTarget;
pub use types::{SchemaError, SidecarName, VersionTag};
