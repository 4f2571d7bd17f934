//! Placeholder executables for optional sidecars a platform has no build for.
//!
//! The stub keeps the bundle layout complete so packaging succeeds, and fails
//! loudly if anything tries to run it.

use std::path::PathBuf;

use sidecar_schema::{PlatformTarget, SidecarName};

use crate::cache::{SidecarCache, SidecarError};

/// Result of [`ensure_stub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOutcome {
    /// Something already occupies the destination; left untouched.
    AlreadyPresent(PathBuf),
    /// A new stub was written.
    Written(PathBuf),
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Script content: prints `<name> is not available for <target>` to stderr
/// and exits 1.
///
/// Windows targets get the same script under a `.exe` name. It satisfies the
/// bundler, but launching it on Windows fails with a loader error rather than
/// this message.
pub fn stub_script(name: &SidecarName, target: &PlatformTarget) -> String {
    let message = format!("{name} is not available for {target}");
    format!("#!/bin/sh\necho {} >&2\nexit 1\n", shell_quote(&message))
}

/// Write a stub for `name` on `target` unless its destination already exists.
pub fn ensure_stub(
    cache: &SidecarCache,
    name: &SidecarName,
    target: &PlatformTarget,
) -> Result<StubOutcome, SidecarError> {
    let dest = cache.destination(name, target);
    if dest.exists() {
        tracing::debug!(path = %dest.display(), "stub destination already exists");
        return Ok(StubOutcome::AlreadyPresent(dest));
    }

    cache.create_root()?;
    cache.write(&dest, stub_script(name, target).as_bytes(), target)?;
    tracing::info!(sidecar = %name, %target, "wrote stub");
    Ok(StubOutcome::Written(dest))
}
