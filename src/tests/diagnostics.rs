use crate::supervisor::{
    Diagnostics, DiagnosticsOutcome, DiagnosticsReport, Finding, PreflightDiagnostics,
    SupervisorConfig,
};

use std::net::TcpListener;

use serial_test::serial;

fn finding(outcome: DiagnosticsOutcome) -> Finding {
    Finding {
        name: "check".into(),
        outcome,
        detail: "detail".into(),
    }
}

#[test]
fn test_overall_is_worst_finding() {
    let report = DiagnosticsReport {
        findings: vec![
            finding(DiagnosticsOutcome::Pass),
            finding(DiagnosticsOutcome::Warn),
        ],
    };
    assert_eq!(report.overall(), DiagnosticsOutcome::Warn);

    let report = DiagnosticsReport {
        findings: vec![
            finding(DiagnosticsOutcome::Warn),
            finding(DiagnosticsOutcome::Fail),
            finding(DiagnosticsOutcome::Pass),
        ],
    };
    assert_eq!(report.overall(), DiagnosticsOutcome::Fail);

    let report = DiagnosticsReport { findings: vec![] };
    assert_eq!(report.overall(), DiagnosticsOutcome::Pass);
}

#[test]
#[serial]
fn test_preflight_passes_on_free_port() {
    let dir = tempfile::tempdir().unwrap();
    let free_port = {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = SupervisorConfig::default();
    config.server.port = free_port;
    config.worker.data_dir = dir.path().into();

    let report = PreflightDiagnostics::new(&config).run();
    assert_eq!(report.overall(), DiagnosticsOutcome::Pass);
}

#[test]
#[serial]
fn test_preflight_fails_on_occupied_port() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let occupied_port = listener.local_addr().unwrap().port();

    let mut config = SupervisorConfig::default();
    config.server.port = occupied_port;
    config.worker.data_dir = dir.path().into();

    let report = PreflightDiagnostics::new(&config).run();
    assert_eq!(report.overall(), DiagnosticsOutcome::Fail);
    assert!(report.summary().contains("not bindable"));
}
