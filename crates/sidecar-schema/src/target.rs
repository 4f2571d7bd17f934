//! Canonical platform-target identifiers.
//!
//! A platform target is a Rust-style triple such as `x86_64-pc-windows-msvc`:
//! CPU architecture, vendor, operating system and an optional ABI. The
//! provisioning engine only ever interprets one property of it, whether the
//! operating system component is `windows`.

use serde::{Deserialize, Serialize};

use crate::types::{SchemaError, check_segment};

/// Suffix appended to executables on Windows targets.
pub const WINDOWS_EXE_SUFFIX: &str = ".exe";

/// A canonical platform-target identifier (e.g. `aarch64-apple-darwin`).
///
/// Values coming from an explicit override are kept verbatim; the only checks
/// are the ones that keep the identifier usable inside a file name.
///
/// # Example
///
/// ```
/// use sidecar_schema::PlatformTarget;
///
/// let win = PlatformTarget::new("x86_64-pc-windows-msvc").unwrap();
/// assert!(win.is_windows());
/// assert_eq!(win.exe_suffix(), ".exe");
///
/// let linux = PlatformTarget::new("x86_64-unknown-linux-gnu").unwrap();
/// assert!(!linux.is_windows());
/// assert_eq!(linux.exe_suffix(), "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformTarget(String);

impl PlatformTarget {
    /// Create a platform target from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the identifier is empty, contains whitespace
    /// or contains a path separator.
    pub fn new(target: &str) -> Result<Self, SchemaError> {
        check_segment("platform target", target)?;
        Ok(Self(target.to_string()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the operating-system component of the triple is Windows.
    pub fn is_windows(&self) -> bool {
        self.0
            .split('-')
            .any(|component| component.eq_ignore_ascii_case("windows"))
    }

    /// `.exe` for Windows targets, empty otherwise.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            WINDOWS_EXE_SUFFIX
        } else {
            ""
        }
    }
}

impl TryFrom<String> for PlatformTarget {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_segment("platform target", &value)?;
        Ok(Self(value))
    }
}

impl From<PlatformTarget> for String {
    fn from(target: PlatformTarget) -> Self {
        target.0
    }
}

impl std::str::FromStr for PlatformTarget {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PlatformTarget {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
