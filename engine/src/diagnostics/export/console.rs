use std::path::PathBuf;

use super::LogExporter;
use crate::diagnostics::entry::{Level, LogEntry};
use crate::error::ExportResult;
use crate::events::{Event, EventBus, SubscriptionId, LOG_CHANNEL};

/// Echo entries at or above a threshold to the console.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleEcho {
    threshold: Level,
}

impl ConsoleEcho {
    pub fn new(threshold: Level) -> Self {
        Self { threshold }
    }

    /// Print every new entry as soon as it is logged.
    pub fn attach(self, bus: &mut EventBus, priority: i32) -> SubscriptionId {
        bus.subscribe(LOG_CHANNEL, priority, move |event| {
            if let Event::Log(entry) = event {
                if let Some(line) = self.format(entry) {
                    println!("{}", line);
                }
            }
        })
    }

    /// Console line for an entry, or `None` below the threshold.
    pub fn format(&self, entry: &LogEntry) -> Option<String> {
        if entry.level < self.threshold {
            return None;
        }
        let prefix = match entry.level {
            Level::Debug => "   ·",
            Level::Info => "    ",
            Level::Warning => "   ⚠️",
            Level::Error => "   ❌",
            Level::Critical => "   🛑",
        };
        let location = match (entry.dataset_name.is_empty(), entry.row_number) {
            (false, Some(row)) => format!("[{} row {}] ", entry.dataset_name, row),
            (false, None) => format!("[{}] ", entry.dataset_name),
            (true, Some(row)) => format!("[row {}] ", row),
            (true, None) => String::new(),
        };
        Some(format!(
            "{} {}{} ({})",
            prefix, location, entry.message, entry.source
        ))
    }
}

impl LogExporter for ConsoleEcho {
    fn export(&self, entries: &[&LogEntry]) -> ExportResult<Option<PathBuf>> {
        for entry in entries {
            if let Some(line) = self.format(entry) {
                println!("{}", line);
            }
        }
        Ok(None)
    }
}
