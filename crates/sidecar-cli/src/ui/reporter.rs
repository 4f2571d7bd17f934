//! Console implementation of the core `Reporter` trait.
//!
//! Progress goes to stderr so stdout stays clean for summaries and JSON.

use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use crossterm::style::Stylize;
use sidecar_core::Reporter;
use sidecar_schema::{ArchiveFormat, SidecarName};

use super::NAME_WIDTH;

#[derive(Debug)]
pub struct ConsoleReporter {
    quiet: bool,
    live: bool,
    /// Sidecar whose progress line is currently drawn, if any.
    active: Mutex<Option<SidecarName>>,
}

impl ConsoleReporter {
    /// `quiet` suppresses everything except warnings.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            live: std::io::stderr().is_terminal(),
            active: Mutex::new(None),
        }
    }

    fn end_live_line(&self) {
        if self
            .active
            .lock()
            .is_ok_and(|mut active| active.take().is_some())
        {
            eprintln!();
        }
    }

    fn status(&self, name: &SidecarName, status: &str) {
        if self.quiet {
            return;
        }
        self.end_live_line();
        eprintln!("  {:<NAME_WIDTH$} {}", name.as_str(), status);
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        self.end_live_line();
        eprintln!("{}", title.bold());
    }

    fn downloading(&self, name: &SidecarName, percent: u8) {
        if self.quiet || !self.live {
            return;
        }
        if let Ok(mut active) = self.active.lock() {
            *active = Some(name.clone());
        }
        let mut stderr = std::io::stderr();
        let _ = write!(
            stderr,
            "\r  {:<NAME_WIDTH$} {} {:>3}%",
            name.as_str(),
            "fetching".cyan(),
            percent
        );
        let _ = stderr.flush();
    }

    fn extracting(&self, name: &SidecarName, format: ArchiveFormat) {
        self.status(name, &format!("{} {format}", "unpacking".cyan()));
    }

    fn done(&self, name: &SidecarName, detail: &str) {
        self.status(name, &format!("{} {}", "ok".green(), detail.dark_grey()));
    }

    fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.end_live_line();
        eprintln!("{msg}");
    }

    fn warning(&self, msg: &str) {
        self.end_live_line();
        eprintln!("{} {msg}", "warning:".yellow().bold());
    }
}
