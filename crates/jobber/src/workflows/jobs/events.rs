use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use super::domain::{EventKind, NotificationEvent};

type EventHandler = Box<dyn Fn(&serde_json::Value) + Send + Sync>;

struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<String>,
}

/// Receiving end of a realtime subscription. Dropping it detaches the
/// subscriber at the next publish.
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::UnboundedReceiver<String>,
}

/// Best-effort pub/sub fanning each lifecycle event out to connected
/// realtime subscribers and to in-process handlers.
///
/// Delivery is at-most-once per subscriber per publish: a subscriber whose
/// channel is gone is dropped from the active set without aborting delivery
/// to the rest. Nothing is persisted or replayed; a subscriber attaching
/// after a publish never sees it.
#[derive(Default)]
pub struct NotificationBus {
    subscribers: Mutex<Vec<Subscriber>>,
    handlers: Mutex<HashMap<EventKind, Vec<EventHandler>>>,
    next_subscriber_id: AtomicU64,
}

impl NotificationBus {
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.subscribers.lock().expect("subscriber mutex poisoned");
        guard.push(Subscriber { id, sender });
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: u64) {
        let mut guard = self.subscribers.lock().expect("subscriber mutex poisoned");
        guard.retain(|subscriber| subscriber.id != id);
    }

    /// Register an in-process handler for one event kind. Handlers run
    /// synchronously in registration order and must not publish back into
    /// the bus.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        let mut guard = self.handlers.lock().expect("handler mutex poisoned");
        guard.entry(kind).or_default().push(Box::new(handler));
    }

    /// Broadcast one event: a single serialized frame to every connected
    /// subscriber, then the registered handlers for this kind. Kinds with
    /// no registered handler simply skip that step.
    pub fn publish(&self, kind: EventKind, payload: serde_json::Value) {
        let event = NotificationEvent {
            kind,
            payload,
            timestamp: Utc::now(),
        };

        match serde_json::to_string(&event) {
            Ok(frame) => {
                let mut guard = self.subscribers.lock().expect("subscriber mutex poisoned");
                guard.retain(|subscriber| subscriber.sender.send(frame.clone()).is_ok());
            }
            Err(err) => debug!(kind = kind.label(), %err, "event frame not serializable"),
        }

        let guard = self.handlers.lock().expect("handler mutex poisoned");
        if let Some(registered) = guard.get(&kind) {
            for handler in registered {
                handler(&event.payload);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let guard = self.subscribers.lock().expect("subscriber mutex poisoned");
        guard.len()
    }
}
