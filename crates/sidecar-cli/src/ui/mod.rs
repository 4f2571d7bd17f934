//! Terminal output

pub mod reporter;

pub use reporter::ConsoleReporter;

/// Width of the name column in summaries.
pub const NAME_WIDTH: usize = 16;
