//! Host descriptors: the operating system and CPU architecture a resolver
//! looks up in its host table.

use serde::{Deserialize, Serialize};

/// Host operating system, as reported by `std::env::consts::OS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    Macos,
    /// Linux.
    Linux,
}

impl HostOs {
    /// Parse a `std::env::consts::OS` value. Unknown systems yield `None`.
    pub fn parse(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "macos" | "darwin" => Some(Self::Macos),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// The `std::env::consts::OS` spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
        }
    }
}

impl std::fmt::Display for HostOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host CPU architecture, as reported by `std::env::consts::ARCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostArch {
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM.
    Aarch64,
}

impl HostArch {
    /// Parse a `std::env::consts::ARCH` value. Common aliases (`amd64`,
    /// `arm64`) are accepted; unknown architectures yield `None`.
    pub fn parse(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" | "amd64" => Some(Self::X86_64),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    /// The `std::env::consts::ARCH` spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

impl std::fmt::Display for HostArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
