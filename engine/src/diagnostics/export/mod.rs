//! Renderers for the diagnostics log.
//!
//! Each exporter consumes the log's current view and writes its own artifact:
//!
//! - [`SpreadsheetExporter`] - grouped table with per-message counts
//! - [`ChangelogExporter`] - append-mode tab-separated text
//! - [`FeedbackExporter`] - curated text for data providers
//! - [`ConsoleEcho`] - console output, immediate or on demand
//!
//! File exporters derive a timestamped default name inside their directory
//! when no explicit path is given.

mod changelog;
mod console;
mod feedback;
mod spreadsheet;

pub use changelog::ChangelogExporter;
pub use console::ConsoleEcho;
pub use feedback::{action_phrase, FeedbackExporter};
pub use spreadsheet::SpreadsheetExporter;

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use super::entry::LogEntry;
use crate::error::ExportResult;

/// Something that renders a view of the diagnostics log.
pub trait LogExporter {
    /// Write the entries; returns the artifact path when one was written.
    fn export(&self, entries: &[&LogEntry]) -> ExportResult<Option<PathBuf>>;
}

/// `<dir>/<stem>_<YYYYmmdd_HHMMSS>.<ext>`
pub(crate) fn default_path(directory: &Path, stem: &str, extension: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    directory.join(format!("{}_{}.{}", stem, stamp, extension))
}

/// Make sure the parent directory of `path` exists.
pub(crate) fn ensure_parent(path: &Path) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
