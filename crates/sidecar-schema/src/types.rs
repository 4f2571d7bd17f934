//! Validated names and tags: sidecar names, version tags and the errors
//! raised when constructing them.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::PlatformTarget;

/// Errors raised when constructing schema values from untrusted strings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required field (name, tag, file) is empty after trimming.
    #[error("Empty field: {0}")]
    EmptyField(&'static str),

    /// A value that becomes part of a file name or URL path contains a separator.
    #[error("Invalid {field}: '{value}' must not contain path separators")]
    PathSeparator {
        /// Which field was rejected.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// A value contains whitespace where none is allowed.
    #[error("Invalid {field}: '{value}' must not contain whitespace")]
    Whitespace {
        /// Which field was rejected.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// An archive entry declares no members to extract.
    #[error("Archive asset '{0}' declares no members")]
    NoMembers(String),

    /// An archive format string that is neither `zip` nor `tar.gz`.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),
}

/// Reject empty values and values that would escape a directory or a URL segment.
pub(crate) fn check_segment(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::EmptyField(field));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(SchemaError::PathSeparator {
            field,
            value: value.to_string(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(SchemaError::Whitespace {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// The logical name of a sidecar (e.g. `sona`, `sona-diarize`, `ffmpeg`).
///
/// A logical name is a role, not a file: the concrete artifact differs per
/// platform target. The name becomes the prefix of the destination file name,
/// so it may not contain path separators.
///
/// # Example
///
/// ```
/// use sidecar_schema::{PlatformTarget, SidecarName};
///
/// let name = SidecarName::new("sona").unwrap();
/// let target = PlatformTarget::new("x86_64-pc-windows-msvc").unwrap();
/// assert_eq!(name.file_name_for(&target), "sona-x86_64-pc-windows-msvc.exe");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SidecarName(String);

impl SidecarName {
    /// Create a validated sidecar name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the name is empty, contains whitespace, or
    /// contains a path separator.
    pub fn new(name: &str) -> Result<Self, SchemaError> {
        check_segment("sidecar name", name)?;
        Ok(Self(name.to_string()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Destination file name for this sidecar on `target`:
    /// `{name}-{target}` plus `.exe` when the target is Windows.
    pub fn file_name_for(&self, target: &PlatformTarget) -> String {
        format!("{}-{}{}", self.0, target.as_str(), target.exe_suffix())
    }
}

impl TryFrom<String> for SidecarName {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_segment("sidecar name", &value)?;
        Ok(Self(value))
    }
}

impl From<SidecarName> for String {
    fn from(name: SidecarName) -> Self {
        name.0
    }
}

impl std::fmt::Display for SidecarName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for SidecarName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SidecarName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SidecarName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SidecarName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SidecarName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A release identifier pinning which set of remote artifacts to fetch (e.g. `v1.4.2`).
///
/// Parsed from the contents of the version-pin file: surrounding whitespace is
/// ignored, the remaining tag must be non-empty and contain no whitespace.
///
/// # Example
///
/// ```
/// use sidecar_schema::VersionTag;
///
/// let tag = VersionTag::parse("  v1.4.2\n").unwrap();
/// assert_eq!(tag.as_str(), "v1.4.2");
/// assert!(VersionTag::parse("\n").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    /// Parse a version tag from raw pin-file contents.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyField`] for blank input,
    /// [`SchemaError::Whitespace`] if the trimmed tag spans several words or
    /// lines, and [`SchemaError::PathSeparator`] if it contains a slash (the
    /// tag is a single URL path segment).
    pub fn parse(contents: &str) -> Result<Self, SchemaError> {
        let tag = contents.trim();
        check_segment("version tag", tag)?;
        Ok(Self(tag.to_string()))
    }

    /// Return the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
