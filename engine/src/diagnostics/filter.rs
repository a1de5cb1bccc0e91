//! Multi-axis view filter for the diagnostics log.
//!
//! A filter holds one active set per axis (level, log type, purpose) plus an
//! optional message substring. An empty set means the axis is unrestricted.
//!
//! Free-text tokens are matched against the known names of every axis:
//!
//! ```text
//! "validation"  -> log types += {validation}
//! "feedback"    -> purposes  += {feedback}
//! ">warning"    -> levels    += {warning, error, critical}
//! "<info"       -> levels    += {debug, info}
//! "whatever"    -> ignored
//! ```

use std::collections::BTreeSet;

use super::entry::{Level, LogEntry, LogType, Purpose};
use crate::error::LogError;

/// Explicit per-axis selections, added on top of token-derived ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub levels: Vec<Level>,
    pub log_types: Vec<LogType>,
    pub purposes: Vec<Purpose>,
    pub in_msg: Option<String>,
}

impl FilterOptions {
    pub fn levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.levels.extend(levels);
        self
    }

    /// Select levels by name; an unknown name is a programming error.
    pub fn level_names<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, LogError> {
        for name in names {
            self.levels.push(name.as_ref().parse()?);
        }
        Ok(self)
    }

    pub fn log_types(mut self, log_types: impl IntoIterator<Item = LogType>) -> Self {
        self.log_types.extend(log_types);
        self
    }

    pub fn purposes(mut self, purposes: impl IntoIterator<Item = Purpose>) -> Self {
        self.purposes.extend(purposes);
        self
    }

    pub fn in_msg(mut self, needle: impl Into<String>) -> Self {
        self.in_msg = Some(needle.into());
        self
    }
}

/// The active filter of a diagnostics log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    levels: BTreeSet<Level>,
    log_types: BTreeSet<LogType>,
    purposes: BTreeSet<Purpose>,
    /// Lowercased substring.
    in_msg: Option<String>,
}

impl LogFilter {
    /// Build a filter from free-text tokens and explicit options.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], options: FilterOptions) -> Self {
        let mut filter = Self::default();

        for token in tokens {
            filter.add_token(token.as_ref());
        }

        filter.levels.extend(options.levels);
        filter.log_types.extend(options.log_types);
        filter.purposes.extend(options.purposes);
        filter.in_msg = options
            .in_msg
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase());

        filter
    }

    fn add_token(&mut self, token: &str) {
        let token = token.trim().to_lowercase();

        if let Some(rest) = token.strip_prefix('>') {
            if let Ok(level) = rest.parse::<Level>() {
                self.levels.extend(level.and_above());
            }
            return;
        }
        if let Some(rest) = token.strip_prefix('<') {
            if let Ok(level) = rest.parse::<Level>() {
                self.levels.extend(level.and_below());
            }
            return;
        }

        if let Ok(level) = token.parse::<Level>() {
            self.levels.insert(level);
        } else if let Ok(log_type) = token.parse::<LogType>() {
            self.log_types.insert(log_type);
        } else if let Ok(purpose) = token.parse::<Purpose>() {
            self.purposes.insert(purpose);
        }
    }

    /// True when no axis is restricted.
    pub fn is_unrestricted(&self) -> bool {
        self.levels.is_empty()
            && self.log_types.is_empty()
            && self.purposes.is_empty()
            && self.in_msg.is_none()
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        (self.levels.is_empty() || self.levels.contains(&entry.level))
            && (self.log_types.is_empty() || self.log_types.contains(&entry.log_type))
            && (self.purposes.is_empty() || self.purposes.contains(&entry.purpose))
            && self
                .in_msg
                .as_ref()
                .map_or(true, |needle| entry.message.to_lowercase().contains(needle))
    }
}
