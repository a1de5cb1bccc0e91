//! Structured diagnostics log.
//!
//! - `entry`: levels, log types, purposes and the immutable `LogEntry`
//! - `filter`: multi-axis view filter with free-text tokens
//! - `store`: `DiagnosticsLog`, the append-only store
//! - `export`: renderers (spreadsheet, changelog, feedback, console)
//!
//! ## Usage Flow
//!
//! ```text
//! operation -> OperationContext -> Session::log -> DiagnosticsLog + EventBus("log", "log_<type>")
//!                                                        |
//!                                  filter(...) -> entries() -> LogExporter
//! ```

pub mod entry;
pub mod export;
pub mod filter;
pub mod store;

pub use entry::{Level, LogDraft, LogEntry, LogType, Purpose};
pub use export::{
    action_phrase, ChangelogExporter, ConsoleEcho, FeedbackExporter, LogExporter,
    SpreadsheetExporter,
};
pub use filter::{FilterOptions, LogFilter};
pub use store::DiagnosticsLog;
