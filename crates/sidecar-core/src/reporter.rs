//! Reporter trait for dependency injection
//!
//! Provisioning reports progress and status through this trait so the engine
//! is not coupled to a particular terminal renderer.

use sidecar_schema::{ArchiveFormat, SidecarName};

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Provisioning v1.4.2").
    fn section(&self, title: &str);

    /// Percent-complete of a download. Only emitted when the size is known.
    fn downloading(&self, name: &SidecarName, percent: u8);

    /// An archive for `name` is being unpacked.
    fn extracting(&self, name: &SidecarName, format: ArchiveFormat);

    /// A sidecar is in place (downloaded, cached or stubbed).
    fn done(&self, name: &SidecarName, detail: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &SidecarName, percent: u8) {
        (**self).downloading(name, percent);
    }
    fn extracting(&self, name: &SidecarName, format: ArchiveFormat) {
        (**self).extracting(name, format);
    }
    fn done(&self, name: &SidecarName, detail: &str) {
        (**self).done(name, detail);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g. planning, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &SidecarName, _: u8) {}
    fn extracting(&self, _: &SidecarName, _: ArchiveFormat) {}
    fn done(&self, _: &SidecarName, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
