//! The asset catalog: which release asset each logical sidecar uses on each
//! platform target.
//!
//! A catalog is built once (from configuration or the built-in table) and is
//! immutable afterwards. Lookups never touch the network or the filesystem.

use std::collections::BTreeMap;

use sidecar_schema::{ArchiveFormat, AssetEntry, MemberMap, PlatformTarget, SchemaError, SidecarName};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Sidecar '{0}' is declared more than once")]
    DuplicateSidecar(SidecarName),

    #[error("Sidecar '{name}' declares target {target} more than once")]
    DuplicateTarget {
        name: SidecarName,
        target: PlatformTarget,
    },

    #[error(
        "Archive '{file}' for sidecar '{name}' on {target} does not map any member to '{name}'"
    )]
    MissingLogicalMember {
        name: SidecarName,
        target: PlatformTarget,
        file: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// One logical sidecar and its availability matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarSpec {
    name: SidecarName,
    required: bool,
    assets: BTreeMap<PlatformTarget, AssetEntry>,
}

impl SidecarSpec {
    /// A sidecar with no assets yet.
    ///
    /// Required sidecars with no asset for a target are reported for manual
    /// placement; optional ones get a stub.
    pub fn new(name: SidecarName, required: bool) -> Self {
        Self {
            name,
            required,
            assets: BTreeMap::new(),
        }
    }

    /// Add the asset used on `target`.
    ///
    /// Archive entries must produce the sidecar itself, since its destination
    /// file is what marks the sidecar as provisioned.
    pub fn with_asset(
        mut self,
        target: PlatformTarget,
        entry: AssetEntry,
    ) -> Result<Self, CatalogError> {
        if !entry.produces(&self.name) {
            return Err(CatalogError::MissingLogicalMember {
                name: self.name,
                target,
                file: entry.file_name().to_string(),
            });
        }
        if self.assets.contains_key(&target) {
            return Err(CatalogError::DuplicateTarget {
                name: self.name,
                target,
            });
        }
        self.assets.insert(target, entry);
        Ok(self)
    }

    pub fn name(&self) -> &SidecarName {
        &self.name
    }

    pub fn required(&self) -> bool {
        self.required
    }

    /// Asset for `target`, if this sidecar is published for it.
    pub fn asset(&self, target: &PlatformTarget) -> Option<&AssetEntry> {
        self.assets.get(target)
    }

    /// All `(target, asset)` pairs, sorted by target.
    pub fn assets(&self) -> impl Iterator<Item = (&PlatformTarget, &AssetEntry)> {
        self.assets.iter()
    }
}

/// Immutable mapping from (logical sidecar, platform target) to asset entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    sidecars: Vec<SidecarSpec>,
}

impl AssetCatalog {
    /// Build a catalog. Sidecars keep the given order.
    pub fn new(sidecars: impl IntoIterator<Item = SidecarSpec>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for spec in sidecars {
            if catalog.get(&spec.name).is_some() {
                return Err(CatalogError::DuplicateSidecar(spec.name));
            }
            catalog.sidecars.push(spec);
        }
        Ok(catalog)
    }

    /// Asset entry for `name` on `target`. `None` means the sidecar is not
    /// published for that target (or is not in the catalog at all).
    pub fn lookup(&self, name: &str, target: &PlatformTarget) -> Option<&AssetEntry> {
        self.get(name).and_then(|spec| spec.asset(target))
    }

    pub fn get(&self, name: &str) -> Option<&SidecarSpec> {
        self.sidecars.iter().find(|spec| spec.name == *name)
    }

    /// Sidecars in declaration order.
    pub fn sidecars(&self) -> impl Iterator<Item = &SidecarSpec> {
        self.sidecars.iter()
    }

    /// Platform targets `name` is published for.
    pub fn targets(&self, name: &str) -> Vec<&PlatformTarget> {
        self.get(name)
            .map(|spec| spec.assets.keys().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sidecars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sidecars.is_empty()
    }

    /// The default catalog: the `sona` engine (required, shipped with an
    /// `ffmpeg` companion in the Windows and macOS archives) and the optional
    /// `sona-diarize` helper.
    pub fn builtin() -> Result<Self, CatalogError> {
        let sona = SidecarName::new("sona")?;
        let ffmpeg = SidecarName::new("ffmpeg")?;
        let diarize = SidecarName::new("sona-diarize")?;

        let unix_members = MemberMap::new()
            .with("sona", sona.clone())?
            .with("ffmpeg", ffmpeg.clone())?;
        let windows_members = MemberMap::new()
            .with("sona.exe", sona.clone())?
            .with("ffmpeg.exe", ffmpeg)?;

        let engine = SidecarSpec::new(sona, true)
            .with_asset(
                PlatformTarget::new("x86_64-pc-windows-msvc")?,
                AssetEntry::archive("sona-windows-amd64.zip", ArchiveFormat::Zip, windows_members)?,
            )?
            .with_asset(
                PlatformTarget::new("aarch64-apple-darwin")?,
                AssetEntry::archive(
                    "sona-darwin-arm64.tar.gz",
                    ArchiveFormat::TarGz,
                    unix_members.clone(),
                )?,
            )?
            .with_asset(
                PlatformTarget::new("x86_64-apple-darwin")?,
                AssetEntry::archive("sona-darwin-amd64.tar.gz", ArchiveFormat::TarGz, unix_members)?,
            )?
            .with_asset(
                PlatformTarget::new("x86_64-unknown-linux-gnu")?,
                AssetEntry::raw("sona-linux-amd64")?,
            )?
            .with_asset(
                PlatformTarget::new("aarch64-unknown-linux-gnu")?,
                AssetEntry::raw("sona-linux-arm64")?,
            )?;

        let helper = SidecarSpec::new(diarize, false)
            .with_asset(
                PlatformTarget::new("x86_64-pc-windows-msvc")?,
                AssetEntry::raw("sona-diarize-windows-amd64.exe")?,
            )?
            .with_asset(
                PlatformTarget::new("aarch64-apple-darwin")?,
                AssetEntry::raw("sona-diarize-darwin-arm64")?,
            )?
            .with_asset(
                PlatformTarget::new("x86_64-unknown-linux-gnu")?,
                AssetEntry::raw("sona-diarize-linux-amd64")?,
            )?;

        Self::new([engine, helper])
    }
}
