//! Channel-based publish/subscribe for diagnostics and progress.
//!
//! Subscribers are plain closures registered on a named channel with a
//! priority. Publishing delivers inline, on the caller's thread, in ascending
//! priority order (ties in subscription order). A panicking subscriber unwinds
//! through the publisher.
//!
//! Every published event is also mirrored on a broadcast channel so consumers
//! living elsewhere (a UI, a streaming endpoint) can follow along.
//!
//! # Channels
//!
//! | Channel            | Payload                      |
//! |--------------------|------------------------------|
//! | `log`              | every diagnostics entry      |
//! | `log_<log_type>`   | entries of one log type      |
//! | `progress`         | done/total counters          |
//! | `workflow`         | dataset lifecycle            |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::broadcast;

use crate::diagnostics::LogEntry;

pub const LOG_CHANNEL: &str = "log";
pub const PROGRESS_CHANNEL: &str = "progress";
pub const WORKFLOW_CHANNEL: &str = "workflow";

/// Capacity of the broadcast mirror.
const STREAM_CAPACITY: usize = 256;

/// Progress of a long-running step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub label: String,
    pub done: usize,
    pub total: usize,
}

/// Lifecycle status of one dataset in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Started,
    Finished,
    Failed,
}

/// Something that happened to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    pub dataset: String,
    pub status: DatasetStatus,
    pub message: String,
}

/// Payload of a published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Event {
    Log(LogEntry),
    Progress(Progress),
    Workflow(WorkflowEvent),
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Event)>;

struct Subscription {
    id: SubscriptionId,
    priority: i32,
    callback: Subscriber,
}

/// Inline publish/subscribe hub.
pub struct EventBus {
    channels: HashMap<String, Vec<Subscription>>,
    next_id: u64,
    stream: broadcast::Sender<(String, Event)>,
}

impl EventBus {
    pub fn new() -> Self {
        let (stream, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            channels: HashMap::new(),
            next_id: 0,
            stream,
        }
    }

    /// Register `callback` on `channel`. Lower priorities run first.
    pub fn subscribe<F>(&mut self, channel: &str, priority: i32, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let subscribers = self.channels.entry(channel.to_string()).or_default();
        let position = subscribers
            .iter()
            .position(|s| s.priority > priority)
            .unwrap_or(subscribers.len());
        subscribers.insert(
            position,
            Subscription {
                id,
                priority,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Remove a subscription. Returns false if it was not found.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.channels.values_mut() {
            if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
                subscribers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every subscriber of `channel`, then mirror it.
    pub fn publish(&mut self, channel: &str, event: &Event) {
        if let Some(subscribers) = self.channels.get_mut(channel) {
            for subscription in subscribers.iter_mut() {
                (subscription.callback)(event);
            }
        }
        // Nobody listening on the mirror is fine
        let _ = self.stream.send((channel.to_string(), event.clone()));
    }

    /// Follow every published event from outside the bus.
    pub fn stream(&self) -> broadcast::Receiver<(String, Event)> {
        self.stream.subscribe()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .channels
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("EventBus").field("channels", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn progress(done: usize) -> Event {
        Event::Progress(Progress {
            label: "test".into(),
            done,
            total: 3,
        })
    }

    #[test]
    fn test_priority_order() {
        let mut bus = EventBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        for (name, priority) in [("late", 10), ("early", -5), ("middle", 0), ("middle2", 0)] {
            let calls = Rc::clone(&calls);
            bus.subscribe(PROGRESS_CHANNEL, priority, move |_| calls.borrow_mut().push(name));
        }

        bus.publish(PROGRESS_CHANNEL, &progress(1));
        assert_eq!(*calls.borrow(), vec!["early", "middle", "middle2", "late"]);
    }

    #[test]
    fn test_channels_are_separate() {
        let mut bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        bus.subscribe(WORKFLOW_CHANNEL, 0, move |_| *counter.borrow_mut() += 1);

        bus.publish(PROGRESS_CHANNEL, &progress(1));
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(LOG_CHANNEL, 0, |_| {});
        assert_eq!(bus.subscriber_count(LOG_CHANNEL), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(LOG_CHANNEL), 0);
    }

    #[test]
    fn test_stream_mirror() {
        let mut bus = EventBus::new();
        let mut rx = bus.stream();
        bus.publish(PROGRESS_CHANNEL, &progress(2));
        let (channel, event) = rx.try_recv().unwrap();
        assert_eq!(channel, PROGRESS_CHANNEL);
        assert_eq!(event, progress(2));
    }
}
