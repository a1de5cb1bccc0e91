//! Per-invocation results.

use serde::Serialize;
use std::time::Duration;

use super::applicability::SkipReason;
use super::Flow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum OperationStatus {
    Ran,
    Skipped(SkipReason),
}

/// What happened when an operation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationInfo {
    pub name: String,
    pub status: OperationStatus,
    /// The operation asked the pipeline to stop.
    pub terminate: bool,
    pub elapsed: Option<Duration>,
}

impl OperationInfo {
    pub fn ran(name: impl Into<String>, flow: Flow, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            status: OperationStatus::Ran,
            terminate: flow == Flow::Terminate,
            elapsed: Some(elapsed),
        }
    }

    pub fn skipped(name: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            name: name.into(),
            status: OperationStatus::Skipped(reason),
            terminate: false,
            elapsed: None,
        }
    }

    pub fn has_run(&self) -> bool {
        self.status == OperationStatus::Ran
    }

    pub fn is_skipped(&self) -> bool {
        !self.has_run()
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.status {
            OperationStatus::Skipped(reason) => Some(reason),
            OperationStatus::Ran => None,
        }
    }
}
