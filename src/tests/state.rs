use crate::supervisor::{StatusSnapshot, SupervisorState};

#[test]
fn test_state_names_cover_all_variants() {
    let states = [
        (SupervisorState::Stopped, "stopped"),
        (SupervisorState::Starting, "starting"),
        (SupervisorState::Running { port: 51731 }, "running"),
        (SupervisorState::Crashed, "crashed"),
        (
            SupervisorState::Failed {
                error: "boom".into(),
            },
            "failed",
        ),
        (SupervisorState::Stopping, "stopping"),
    ];

    for (state, expected) in states {
        assert_eq!(state.as_str(), expected);
    }
}

#[test]
fn test_only_running_counts_as_running() {
    assert!(SupervisorState::Running { port: 51731 }.is_running());
    assert!(!SupervisorState::Stopped.is_running());
    assert!(!SupervisorState::Starting.is_running());
    assert!(!SupervisorState::Crashed.is_running());
    assert!(!SupervisorState::Stopping.is_running());
}

#[test]
fn test_snapshot_serializes_for_ui() {
    let snapshot = StatusSnapshot {
        state: "running".into(),
        pid: Some(4242),
        uptime_secs: Some(17),
        restart_count: 1,
        last_error: None,
        port: 51731,
    };

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["state"], "running");
    assert_eq!(json["pid"], 4242);
    assert_eq!(json["uptime_secs"], 17);
    assert_eq!(json["restart_count"], 1);
    assert_eq!(json["port"], 51731);
    assert!(json["last_error"].is_null());
}
