//! Platform-target resolution.
//!
//! Maps the host's (operating system, CPU architecture) pair, or an explicit
//! override, to the canonical target identifier used in asset lookups and
//! destination file names.

use sidecar_schema::{HostArch, HostOs, PlatformTarget};

/// Fixed lookup table from host pairs to platform targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTable {
    entries: Vec<(HostOs, HostArch, PlatformTarget)>,
}

impl HostTable {
    /// Build a table from explicit entries. Later duplicates are ignored.
    pub fn new(entries: impl IntoIterator<Item = (HostOs, HostArch, PlatformTarget)>) -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        for (os, arch, target) in entries {
            if table.lookup(os, arch).is_none() {
                table.entries.push((os, arch, target));
            }
        }
        table
    }

    /// The six desktop platforms the release pipeline builds for.
    pub fn builtin() -> Self {
        const DEFAULTS: [(HostOs, HostArch, &str); 6] = [
            (HostOs::Windows, HostArch::X86_64, "x86_64-pc-windows-msvc"),
            (HostOs::Windows, HostArch::Aarch64, "aarch64-pc-windows-msvc"),
            (HostOs::Macos, HostArch::X86_64, "x86_64-apple-darwin"),
            (HostOs::Macos, HostArch::Aarch64, "aarch64-apple-darwin"),
            (HostOs::Linux, HostArch::X86_64, "x86_64-unknown-linux-gnu"),
            (HostOs::Linux, HostArch::Aarch64, "aarch64-unknown-linux-gnu"),
        ];

        Self::new(DEFAULTS.iter().filter_map(|(os, arch, triple)| {
            PlatformTarget::new(triple)
                .ok()
                .map(|target| (*os, *arch, target))
        }))
    }

    /// Target for a host pair, if the table knows it.
    pub fn lookup(&self, os: HostOs, arch: HostArch) -> Option<&PlatformTarget> {
        self.entries
            .iter()
            .find(|(o, a, _)| *o == os && *a == arch)
            .map(|(_, _, target)| target)
    }

    /// Iterate all entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (HostOs, HostArch, &PlatformTarget)> {
        self.entries.iter().map(|(o, a, t)| (*o, *a, t))
    }
}

impl Default for HostTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolves the platform target for a provisioning run.
///
/// Host values are captured once at construction, so resolution itself is a
/// pure function of the override and the table.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    os: String,
    arch: String,
    table: HostTable,
}

impl TargetResolver {
    /// Resolver for the machine this process runs on.
    pub fn for_host() -> Self {
        Self::with_host(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolver for an explicit host, using `std::env::consts` spellings.
    pub fn with_host(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            table: HostTable::builtin(),
        }
    }

    /// Replace the host table.
    pub fn with_table(mut self, table: HostTable) -> Self {
        self.table = table;
        self
    }

    /// `os/arch` of the captured host, for diagnostics.
    pub fn host(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }

    /// Resolve the target: the override verbatim if given, otherwise the host
    /// table entry. `None` when the host pair is not in the table.
    pub fn resolve(&self, explicit: Option<&PlatformTarget>) -> Option<PlatformTarget> {
        if let Some(target) = explicit {
            return Some(target.clone());
        }

        let os = HostOs::parse(&self.os)?;
        let arch = HostArch::parse(&self.arch)?;
        self.table.lookup(os, arch).cloned()
    }
}
