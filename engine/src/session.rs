//! Process-scoped context passed through every run.
//!
//! A [`Session`] owns the diagnostics log, the event bus and the settings.
//! The top-level driver builds one and hands it down by `&mut` through the
//! workflow, the controller and each operation; tests build their own.

use crate::config::Settings;
use crate::diagnostics::{DiagnosticsLog, LogDraft};
use crate::events::{
    DatasetStatus, Event, EventBus, Progress, WorkflowEvent, LOG_CHANNEL, PROGRESS_CHANNEL,
    WORKFLOW_CHANNEL,
};

#[derive(Debug, Default)]
pub struct Session {
    pub log: DiagnosticsLog,
    pub bus: EventBus,
    pub settings: Settings,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            log: DiagnosticsLog::new(),
            bus: EventBus::new(),
            settings,
        }
    }

    /// Append an entry and publish it on `log` and `log_<log_type>`.
    ///
    /// Returns the entry's log number.
    pub fn log(&mut self, draft: LogDraft) -> u64 {
        let entry = self.log.log(draft).clone();
        let number = entry.log_number;
        let typed_channel = entry.log_type.channel();
        let event = Event::Log(entry);
        self.bus.publish(LOG_CHANNEL, &event);
        self.bus.publish(&typed_channel, &event);
        number
    }

    pub fn progress(&mut self, label: impl Into<String>, done: usize, total: usize) {
        let event = Event::Progress(Progress {
            label: label.into(),
            done,
            total,
        });
        self.bus.publish(PROGRESS_CHANNEL, &event);
    }

    pub fn workflow_event(
        &mut self,
        dataset: impl Into<String>,
        status: DatasetStatus,
        message: impl Into<String>,
    ) {
        let event = Event::Workflow(WorkflowEvent {
            dataset: dataset.into(),
            status,
            message: message.into(),
        });
        self.bus.publish(WORKFLOW_CHANNEL, &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Level, LogType};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_log_publishes_on_both_channels() {
        let mut session = Session::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for channel in ["log", "log_validation", "log_export"] {
            let seen = Rc::clone(&seen);
            session.bus.subscribe(channel, 0, move |event| {
                if let Event::Log(entry) = event {
                    seen.borrow_mut().push((channel, entry.log_number));
                }
            });
        }

        let number = session.log(
            LogDraft::new(LogType::Validation, "not_empty", "Blank cell").level(Level::Warning),
        );
        assert_eq!(number, 1);
        assert_eq!(*seen.borrow(), vec![("log", 1), ("log_validation", 1)]);
        assert_eq!(session.log.total_len(), 1);
    }
}
