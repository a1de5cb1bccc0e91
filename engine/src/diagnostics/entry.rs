//! Diagnostic log records and their classification axes.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LogError;

/// Severity, totally ordered: debug < info < warning < error < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Levels up to and including this one.
    pub fn and_below(self) -> impl Iterator<Item = Level> {
        Self::ALL.into_iter().filter(move |l| *l <= self)
    }

    /// This level and everything more severe.
    pub fn and_above(self) -> impl Iterator<Item = Level> {
        Self::ALL.into_iter().filter(move |l| *l >= self)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| LogError::UnknownLevel(s.to_string()))
    }
}

/// Which pipeline activity produced the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Validation,
    Transformation,
    Export,
    Workflow,
}

impl LogType {
    pub const ALL: [LogType; 4] = [
        LogType::Validation,
        LogType::Transformation,
        LogType::Export,
        LogType::Workflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Validation => "validation",
            LogType::Transformation => "transformation",
            LogType::Export => "export",
            LogType::Workflow => "workflow",
        }
    }

    /// Event bus channel dedicated to this log type.
    pub fn channel(&self) -> String {
        format!("log_{}", self.as_str())
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| LogError::UnknownLogType(s.to_string()))
    }
}

/// Audience of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    General,
    /// Curated subset reported back to data providers.
    Feedback,
}

impl Purpose {
    pub const ALL: [Purpose; 2] = [Purpose::General, Purpose::Feedback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::General => "general",
            Purpose::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| LogError::UnknownPurpose(s.to_string()))
    }
}

/// One immutable diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Ordinal, unique for the lifetime of the log.
    pub log_number: u64,
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub log_type: LogType,
    pub purpose: Purpose,
    pub message: String,
    /// Name of the emitting operation.
    pub source: String,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub row_number: Option<usize>,
    pub dataset_name: String,
}

/// An entry before the log numbers and stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct LogDraft {
    pub level: Level,
    pub log_type: LogType,
    pub purpose: Purpose,
    pub message: String,
    pub source: String,
    pub item: Option<String>,
    pub row_number: Option<usize>,
    pub dataset_name: String,
}

impl LogDraft {
    /// A general-purpose INFO draft.
    pub fn new(log_type: LogType, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            log_type,
            purpose: Purpose::General,
            message: message.into(),
            source: source.into(),
            item: None,
            row_number: None,
            dataset_name: String::new(),
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn row(mut self, row_number: usize) -> Self {
        self.row_number = Some(row_number);
        self
    }

    pub fn dataset(mut self, dataset_name: impl Into<String>) -> Self {
        self.dataset_name = dataset_name.into();
        self
    }

    pub(crate) fn into_entry(self, log_number: u64) -> LogEntry {
        LogEntry {
            log_number,
            timestamp: Local::now(),
            level: self.level,
            log_type: self.log_type,
            purpose: self.purpose,
            message: self.message,
            source: self.source,
            item: self.item,
            row_number: self.row_number,
            dataset_name: self.dataset_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Error < Level::Critical);
        let above: Vec<Level> = Level::Warning.and_above().collect();
        assert_eq!(above, vec![Level::Warning, Level::Error, Level::Critical]);
        let below: Vec<Level> = Level::Info.and_below().collect();
        assert_eq!(below, vec![Level::Debug, Level::Info]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(
            "fatal".parse::<Level>().unwrap_err(),
            LogError::UnknownLevel("fatal".into())
        );
        assert_eq!("export".parse::<LogType>().unwrap(), LogType::Export);
        assert_eq!("feedback".parse::<Purpose>().unwrap(), Purpose::Feedback);
    }

    #[test]
    fn test_channel_name() {
        assert_eq!(LogType::Validation.channel(), "log_validation");
    }
}
