use crate::supervisor::{EventBus, EventKind, SupervisorEvent};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_delivery_in_registration_order() {
    let bus = EventBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in 0..4 {
        let order = order.clone();
        bus.on(EventKind::Started, move |_| {
            order.lock().unwrap().push(tag);
        });
    }

    bus.publish(&SupervisorEvent::Started);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_subscribers_filtered_by_kind() {
    let bus = EventBus::new();
    let started = Arc::new(AtomicUsize::new(0));
    let stopped = Arc::new(AtomicUsize::new(0));

    {
        let started = started.clone();
        bus.on(EventKind::Started, move |_| {
            started.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let stopped = stopped.clone();
        bus.on(EventKind::Stopped, move |_| {
            stopped.fetch_add(1, Ordering::SeqCst);
        });
    }

    bus.publish(&SupervisorEvent::Started);
    bus.publish(&SupervisorEvent::Started);
    bus.publish(&SupervisorEvent::Stopped);

    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn test_off_deregisters_subscriber() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));

    let id = {
        let count = count.clone();
        bus.on(EventKind::Crashed, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };

    bus.publish(&SupervisorEvent::Crashed { exit_code: Some(1) });
    bus.off(id);
    bus.publish(&SupervisorEvent::Crashed { exit_code: Some(1) });

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_off_unknown_id_is_ignored() {
    let bus = EventBus::new();
    let id = bus.on(EventKind::Started, |_| {});
    bus.off(id);
    // Deregistering twice must not affect other subscribers or panic.
    bus.off(id);
    bus.publish(&SupervisorEvent::Started);
}

#[test]
fn test_panicking_subscriber_does_not_suppress_later_ones() {
    let bus = EventBus::new();
    let reached = Arc::new(AtomicUsize::new(0));

    bus.on(EventKind::Started, |_| {
        panic!("subscriber exploded");
    });
    {
        let reached = reached.clone();
        bus.on(EventKind::Started, move |_| {
            reached.fetch_add(1, Ordering::SeqCst);
        });
    }

    bus.publish(&SupervisorEvent::Started);
    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[test]
fn test_event_carries_payload() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(None));

    {
        let seen = seen.clone();
        bus.on(EventKind::Crashed, move |event| {
            if let SupervisorEvent::Crashed { exit_code } = event {
                *seen.lock().unwrap() = Some(*exit_code);
            }
        });
    }

    bus.publish(&SupervisorEvent::Crashed { exit_code: Some(7) });
    assert_eq!(*seen.lock().unwrap(), Some(Some(7)));
}

#[test]
fn test_subscriber_may_deregister_during_dispatch() {
    let bus = Arc::new(EventBus::new());
    let count = Arc::new(AtomicUsize::new(0));

    let id_slot: Arc<Mutex<Option<crate::supervisor::SubscriptionId>>> =
        Arc::new(Mutex::new(None));

    let id = {
        let bus = bus.clone();
        let count = count.clone();
        let id_slot = id_slot.clone();
        bus.clone().on(EventKind::Started, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_slot.lock().unwrap() {
                bus.off(id);
            }
        })
    };
    *id_slot.lock().unwrap() = Some(id);

    bus.publish(&SupervisorEvent::Started);
    bus.publish(&SupervisorEvent::Started);

    // Self-deregistered after the first delivery.
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
