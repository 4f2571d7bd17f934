//! Provisioning configuration (`sidecars.toml`).
//!
//! The file describes where releases come from, where the version pin and the
//! cache live, and the per-sidecar availability matrix. Every field is
//! optional; a missing file selects the built-in catalog.
//!
//! ```toml
//! [release]
//! host = "https://github.com"
//! repo = "thewh1teagle/sona"
//!
//! [[sidecar]]
//! name = "sona"
//! required = true
//!
//! [sidecar.assets.x86_64-pc-windows-msvc]
//! file = "sona-windows-amd64.zip"
//! format = "zip"
//! members = { "sona.exe" = "sona", "ffmpeg.exe" = "ffmpeg" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sidecar_schema::{
    ArchiveFormat, AssetEntry, MemberMap, PlatformTarget, SchemaError, SidecarName,
};
use thiserror::Error;

use crate::catalog::{AssetCatalog, CatalogError, SidecarSpec};
use crate::repo::{GitHubRepo, ReleaseSource};
use crate::version::DEFAULT_VERSION_FILE;

/// Config file looked up in the project directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sidecars.toml";
/// Cache directory, relative to the project directory.
pub const DEFAULT_CACHE_DIR: &str = "build/binaries";
pub const DEFAULT_RELEASE_HOST: &str = "https://github.com";
pub const DEFAULT_RELEASE_REPO: &str = "thewh1teagle/sona";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    InvalidRepo(String),

    #[error("timeout_secs must be greater than zero")]
    InvalidTimeout,

    #[error("Sidecar '{sidecar}' on {target}: unsupported archive format '{format}'")]
    UnsupportedFormat {
        sidecar: String,
        target: String,
        format: String,
    },

    #[error("Sidecar '{sidecar}' on {target}: 'format' is set but 'members' is missing")]
    FormatWithoutMembers { sidecar: String, target: String },

    #[error("Sidecar '{sidecar}' on {target}: 'members' is set but 'format' is missing")]
    MembersWithoutFormat { sidecar: String, target: String },

    #[error("Invalid value in {context}: {source}")]
    Schema {
        context: String,
        #[source]
        source: SchemaError,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    release: RawRelease,
    #[serde(default)]
    sidecar: Vec<RawSidecar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRelease {
    host: Option<String>,
    repo: Option<String>,
    version_file: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSidecar {
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    assets: BTreeMap<String, RawAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAsset {
    file: String,
    format: Option<String>,
    members: Option<BTreeMap<String, String>>,
}

/// Fully resolved provisioning configuration. All paths are absolute
/// (relative values are joined onto the project directory).
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub project_dir: PathBuf,
    /// The file this config was read from, `None` for the built-in default.
    pub config_path: Option<PathBuf>,
    pub source: ReleaseSource,
    pub version_file: PathBuf,
    pub cache_dir: PathBuf,
    pub timeout: Duration,
    pub catalog: AssetCatalog,
}

impl ProvisionConfig {
    /// Load the configuration for `project_dir`.
    ///
    /// With `explicit`, that file must exist. Without it, `sidecars.toml` in
    /// the project directory is used if present, else the built-in default.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                let path = absolutize(project_dir, path);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                path
            }
            None => {
                let path = project_dir.join(DEFAULT_CONFIG_FILE);
                if !path.is_file() {
                    tracing::debug!(dir = %project_dir.display(), "no config file, using built-in catalog");
                    return Self::builtin(project_dir);
                }
                path
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded config");
        let mut config = Self::from_raw(project_dir, raw)?;
        config.config_path = Some(path);
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(project_dir: &Path, contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: project_dir.join(DEFAULT_CONFIG_FILE),
            source,
        })?;
        Self::from_raw(project_dir, raw)
    }

    /// The built-in defaults: GitHub releases of `thewh1teagle/sona` and the
    /// built-in catalog.
    pub fn builtin(project_dir: &Path) -> Result<Self, ConfigError> {
        Self::from_raw(project_dir, RawConfig::default())
    }

    /// Override the version-pin path (relative paths join the project dir).
    pub fn with_version_file(mut self, path: &Path) -> Self {
        self.version_file = absolutize(&self.project_dir, path);
        self
    }

    /// Override the cache directory (relative paths join the project dir).
    pub fn with_cache_dir(mut self, path: &Path) -> Self {
        self.cache_dir = absolutize(&self.project_dir, path);
        self
    }

    fn from_raw(project_dir: &Path, raw: RawConfig) -> Result<Self, ConfigError> {
        let release = raw.release;

        let repo = GitHubRepo::new(release.repo.as_deref().unwrap_or(DEFAULT_RELEASE_REPO))
            .map_err(ConfigError::InvalidRepo)?;
        let source = ReleaseSource::new(
            release.host.as_deref().unwrap_or(DEFAULT_RELEASE_HOST),
            repo,
        );

        let timeout_secs = release.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let catalog = if raw.sidecar.is_empty() {
            AssetCatalog::builtin()?
        } else {
            let specs = raw
                .sidecar
                .into_iter()
                .map(build_sidecar)
                .collect::<Result<Vec<_>, _>>()?;
            AssetCatalog::new(specs)?
        };

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config_path: None,
            source,
            version_file: absolutize(
                project_dir,
                release
                    .version_file
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_VERSION_FILE)),
            ),
            cache_dir: absolutize(
                project_dir,
                release
                    .cache_dir
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_CACHE_DIR)),
            ),
            timeout: Duration::from_secs(timeout_secs),
            catalog,
        })
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn build_sidecar(raw: RawSidecar) -> Result<SidecarSpec, ConfigError> {
    let name = SidecarName::new(&raw.name).map_err(|source| ConfigError::Schema {
        context: "sidecar name".to_string(),
        source,
    })?;

    let mut spec = SidecarSpec::new(name, raw.required);
    for (target, asset) in raw.assets {
        let context = format!("sidecar '{}' on {target}", raw.name);
        let schema_err = |source| ConfigError::Schema {
            context: context.clone(),
            source,
        };

        let platform = PlatformTarget::new(&target).map_err(schema_err)?;
        let entry = match (asset.format, asset.members) {
            (None, None) => AssetEntry::raw(&asset.file).map_err(schema_err)?,
            (Some(_), None) => {
                return Err(ConfigError::FormatWithoutMembers {
                    sidecar: raw.name,
                    target,
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::MembersWithoutFormat {
                    sidecar: raw.name,
                    target,
                });
            }
            (Some(format), Some(members)) => {
                let Ok(format) = format.parse::<ArchiveFormat>() else {
                    return Err(ConfigError::UnsupportedFormat {
                        sidecar: raw.name,
                        target,
                        format,
                    });
                };
                let mut map = MemberMap::new();
                for (member, dest) in members {
                    let dest = SidecarName::new(&dest).map_err(schema_err)?;
                    map.insert(&member, dest).map_err(schema_err)?;
                }
                AssetEntry::archive(&asset.file, format, map).map_err(schema_err)?
            }
        };
        spec = spec.with_asset(platform, entry)?;
    }
    Ok(spec)
}
