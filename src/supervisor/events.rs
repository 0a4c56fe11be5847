//! Lifecycle event notification for UI observers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Lifecycle transition broadcast to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Started,
    Stopped,
    Crashed { exit_code: Option<i32> },
    Restarted { attempt: u32 },
    HealthCheckFailed { reason: String },
    HealthCheckPassed,
}

/// Discriminant used when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    Stopped,
    Crashed,
    Restarted,
    HealthCheckFailed,
    HealthCheckPassed,
}

impl SupervisorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Started => EventKind::Started,
            Self::Stopped => EventKind::Stopped,
            Self::Crashed { .. } => EventKind::Crashed,
            Self::Restarted { .. } => EventKind::Restarted,
            Self::HealthCheckFailed { .. } => EventKind::HealthCheckFailed,
            Self::HealthCheckPassed => EventKind::HealthCheckPassed,
        }
    }
}

/// Handle returned by [`EventBus::on`]; pass it to [`EventBus::off`]
/// to deregister. Closures are not comparable, so deregistration is
/// by handle rather than by callback identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&SupervisorEvent) + Send + Sync>;

struct Registration {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback,
}

/// Publish/subscribe bus scoped to one supervisor instance.
///
/// Delivery is synchronous, in registration order. A panicking
/// subscriber never suppresses delivery to later subscribers.
pub struct EventBus {
    subscribers: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for one event kind.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&SupervisorEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Registration {
                id,
                kind,
                callback: Arc::new(callback),
            });
        id
    }

    /// Deregister a callback. Unknown ids are ignored.
    pub fn off(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|r| r.id != id);
    }

    /// Deliver an event to all matching subscribers in registration order.
    pub fn publish(&self, event: &SupervisorEvent) {
        // Snapshot under the lock, dispatch outside it, so a callback may
        // subscribe or deregister without deadlocking.
        let matching: Vec<Callback> = {
            let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            subscribers
                .iter()
                .filter(|r| r.kind == event.kind())
                .map(|r| r.callback.clone())
                .collect()
        };

        for callback in matching {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!("Event subscriber panicked while handling {:?}", event.kind());
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
