//! Release assets: what to download for a sidecar on one platform target, and
//! what to pull out of it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::SidecarName;
use crate::types::{SchemaError, check_segment};

/// Archive format of a release asset.
///
/// Only the two formats the extractor understands can be represented; any
/// other string is rejected when the catalog is decoded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Zip archive (`.zip`).
    #[serde(rename = "zip")]
    Zip,
    /// Gzip-compressed tar archive (`.tar.gz` / `.tgz`).
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
}

impl ArchiveFormat {
    /// Canonical configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ArchiveFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            _ => Err(SchemaError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Mapping from archive member basename to the logical sidecar it becomes.
///
/// Keys are basenames (the final path component), so `sona` matches
/// `bin/sona` and `sona-v1.2/linux/sona` alike.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberMap(BTreeMap<String, SidecarName>);

impl MemberMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `member basename → destination sidecar` pair.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the basename is empty or contains a path
    /// separator.
    pub fn insert(&mut self, member: &str, destination: SidecarName) -> Result<(), SchemaError> {
        check_segment("archive member", member)?;
        self.0.insert(member.to_string(), destination);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn with(mut self, member: &str, destination: SidecarName) -> Result<Self, SchemaError> {
        self.insert(member, destination)?;
        Ok(self)
    }

    /// The set of basenames to request from the extractor.
    pub fn wanted(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    /// Destination sidecar for a member basename.
    pub fn destination(&self, member: &str) -> Option<&SidecarName> {
        self.0.get(member)
    }

    /// Iterate `(member, destination)` pairs in member order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SidecarName)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of mapped members.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no members are mapped.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What to fetch for one logical sidecar on one platform target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetEntry {
    /// A standalone executable copied byte-for-byte.
    Raw {
        /// Release asset file name.
        file: String,
    },
    /// An archive from which selected members are extracted.
    Archive {
        /// Release asset file name.
        file: String,
        /// Archive format, fixed at catalog construction.
        format: ArchiveFormat,
        /// Members to extract and the sidecar each one becomes.
        members: MemberMap,
    },
}

impl AssetEntry {
    /// A raw-binary asset.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if `file` is not a single URL path segment.
    pub fn raw(file: &str) -> Result<Self, SchemaError> {
        check_segment("asset file", file)?;
        Ok(Self::Raw {
            file: file.to_string(),
        })
    }

    /// An archive asset.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if `file` is not a single URL path segment or
    /// if `members` is empty.
    pub fn archive(
        file: &str,
        format: ArchiveFormat,
        members: MemberMap,
    ) -> Result<Self, SchemaError> {
        check_segment("asset file", file)?;
        if members.is_empty() {
            return Err(SchemaError::NoMembers(file.to_string()));
        }
        Ok(Self::Archive {
            file: file.to_string(),
            format,
            members,
        })
    }

    /// Release asset file name (the last URL segment).
    pub fn file_name(&self) -> &str {
        match self {
            Self::Raw { file } | Self::Archive { file, .. } => file,
        }
    }

    /// Archive format, or `None` for raw binaries.
    pub fn format(&self) -> Option<ArchiveFormat> {
        match self {
            Self::Raw { .. } => None,
            Self::Archive { format, .. } => Some(*format),
        }
    }

    /// The sidecars this asset produces when provisioned for `logical`.
    ///
    /// A raw asset produces exactly `logical`. An archive produces each
    /// distinct destination in its member map.
    pub fn outputs(&self, logical: &SidecarName) -> Vec<SidecarName> {
        match self {
            Self::Raw { .. } => vec![logical.clone()],
            Self::Archive { members, .. } => {
                let mut seen = BTreeSet::new();
                members
                    .iter()
                    .filter(|(_, dest)| seen.insert((*dest).clone()))
                    .map(|(_, dest)| dest.clone())
                    .collect()
            }
        }
    }

    /// Whether provisioning this asset for `logical` writes `logical` itself.
    pub fn produces(&self, logical: &SidecarName) -> bool {
        match self {
            Self::Raw { .. } => true,
            Self::Archive { members, .. } => members.iter().any(|(_, dest)| dest == logical),
        }
    }
}
