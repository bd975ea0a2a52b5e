//! End-to-end start flows driven through a scripted stand-in for `java`.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use h2ctl_config::ServerConfig;
use rstest::rstest;

use super::error::{FailureKind, LifecycleError, Listener};
use super::orchestrator::{server_status, start_server, start_server_with_sink, stop_server};
use super::readiness::OutputSink;
use crate::tests::support::{
    FAKE_CLASSPATH, FAKE_MAIN_CLASS, FakeJava, OneShotListener, TCP_ANNOUNCEMENT,
    WEB_ANNOUNCEMENT, free_ports,
};

#[derive(Clone, Default)]
struct SharedSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl SharedSink {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink lock").clone()
    }
}

impl OutputSink for SharedSink {
    fn line(&mut self, line: &str) {
        self.lines.lock().expect("sink lock").push(line.to_owned());
    }
}

#[test]
fn start_returns_once_both_listeners_are_announced() {
    let java = FakeJava::ready_server();
    let (data_port, console_port) = free_ports();
    let config = java.config(data_port, console_port);

    let started = start_server(&config).expect("fake server reports ready");

    assert!(started.pid > 0);
    assert_eq!(started.data_url, format!("tcp://127.0.0.1:{data_port}"));
    assert_eq!(started.console_url, format!("http://127.0.0.1:{console_port}"));
}

#[test]
fn start_passes_the_start_arguments_to_the_server() {
    let java = FakeJava::ready_server();
    let (data_port, console_port) = free_ports();
    let config = ServerConfig {
        data_password: String::from("s3cret"),
        console_password: String::from("console"),
        ..java.config(data_port, console_port)
    };

    start_server(&config).expect("fake server reports ready");

    let data = data_port.to_string();
    let console = console_port.to_string();
    let expected = [
        "-cp",
        FAKE_CLASSPATH,
        FAKE_MAIN_CLASS,
        "-tcp",
        "-tcpPort",
        data.as_str(),
        "-tcpPassword",
        "s3cret",
        "-web",
        "-webPort",
        console.as_str(),
        "-webAdminPassword",
        "console",
        "-ifNotExists",
        "-tcpAllowOthers",
        "-webAllowOthers",
    ];
    assert_eq!(java.recorded_arguments(), expected);
}

#[test]
fn start_relays_server_output_to_the_sink() {
    let java = FakeJava::ready_server();
    let (data_port, console_port) = free_ports();
    let sink = SharedSink::default();

    start_server_with_sink(&java.config(data_port, console_port), sink.clone())
        .expect("fake server reports ready");

    let lines = sink.lines();
    assert_eq!(lines.first().map(String::as_str), Some("H2 starting"));
    assert!(lines.iter().any(|line| line == TCP_ANNOUNCEMENT));
    assert!(lines.iter().any(|line| line == WEB_ANNOUNCEMENT));
}

#[test]
fn early_exit_is_a_launch_failure_with_the_diagnostic() {
    let java = FakeJava::failing_server();
    let (data_port, console_port) = free_ports();

    let error = start_server(&java.config(data_port, console_port))
        .expect_err("exiting server must fail to start");

    assert_eq!(error.kind(), FailureKind::LaunchFailed);
    match error {
        LifecycleError::ExitedBeforeReady {
            exit_status,
            detail,
        } => {
            assert_eq!(exit_status, Some(1));
            let detail = detail.expect("stderr line kept as detail");
            assert!(detail.contains("Exception opening port"), "detail: {detail}");
        }
        other => panic!("expected ExitedBeforeReady, got: {other:?}"),
    }
}

#[test]
fn partial_readiness_reports_a_premature_close() {
    let java = FakeJava::with_script(&format!("echo '{TCP_ANNOUNCEMENT}'\nexit 0"));
    let (data_port, console_port) = free_ports();

    let error = start_server(&java.config(data_port, console_port))
        .expect_err("a single listener is not ready");

    assert_eq!(error.kind(), FailureKind::StreamClosedPrematurely);
    let message = error.to_string();
    assert!(message.contains("web console server"), "message: {message}");
    assert!(!message.contains("TCP server and"), "message: {message}");
}

#[test]
fn silent_server_times_out() {
    let java = FakeJava::with_script("exec sleep 30");
    let (data_port, console_port) = free_ports();
    let config = ServerConfig {
        startup_timeout_ms: Some(300),
        ..java.config(data_port, console_port)
    };

    let started_at = Instant::now();
    let error = start_server(&config).expect_err("silent server never becomes ready");

    assert!(matches!(
        error,
        LifecycleError::StartupTimeout { timeout_ms: 300, .. }
    ));
    assert_eq!(error.kind(), FailureKind::StreamClosedPrematurely);
    assert!(started_at.elapsed() < Duration::from_secs(10));
}

#[test]
fn timeout_after_one_announcement_names_the_missing_listener() {
    let java = FakeJava::with_script(&format!("echo '{TCP_ANNOUNCEMENT}'\nexec sleep 30"));
    let (data_port, console_port) = free_ports();
    let config = ServerConfig {
        startup_timeout_ms: Some(500),
        ..java.config(data_port, console_port)
    };

    let error = start_server(&config).expect_err("console never announced");

    match &error {
        LifecycleError::StartupTimeout { missing, .. } => {
            assert_eq!(missing, "web console server");
        }
        other => panic!("expected StartupTimeout, got: {other:?}"),
    }
    assert_eq!(error.kind(), FailureKind::StreamClosedPrematurely);
}

#[test]
fn started_server_can_be_stopped_once() {
    let java = FakeJava::server_and_client();
    let (data_port, console_port) = free_ports();
    let config = java.config(data_port, console_port);

    start_server(&config).expect("fake server reports ready");
    let listener = OneShotListener::bind_to(data_port);

    stop_server(&config).expect("first stop succeeds");
    listener.join();
    let recorded = java.recorded_arguments();
    assert!(
        recorded.iter().any(|arg| arg == "-tcpShutdown"),
        "recorded: {recorded:?}"
    );

    let error = stop_server(&config).expect_err("nothing left to stop");
    assert!(matches!(error, LifecycleError::NotListening { .. }), "got: {error:?}");
    assert_eq!(error.kind(), FailureKind::ShutdownFailed);
}

#[rstest]
#[case::data(Listener::Data)]
#[case::console(Listener::Console)]
fn occupied_port_is_refused_before_launch(#[case] occupied: Listener) {
    let java = FakeJava::ready_server();
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
    let taken = listener.local_addr().expect("local addr").port();
    let (data_port, console_port) = free_ports();
    let config = match occupied {
        Listener::Data => java.config(taken, console_port),
        Listener::Console => java.config(data_port, taken),
    };

    let error = start_server(&config).expect_err("taken port must be refused");

    assert_eq!(error.kind(), FailureKind::LaunchFailed);
    assert!(
        matches!(error, LifecycleError::PortInUse { listener, .. } if listener == occupied),
        "unexpected error: {error:?}"
    );
    assert!(!java.was_invoked(), "server must not be launched");
}

#[test]
fn missing_java_is_a_launch_failure() {
    let (data_port, console_port) = free_ports();
    let config = ServerConfig {
        data_port,
        console_port,
        java_binary: Some(String::from("/nonexistent/h2ctl/bin/java")),
        classpath: Some(String::from(FAKE_CLASSPATH)),
        ..ServerConfig::default()
    };

    let error = start_server(&config).expect_err("missing java cannot launch");

    assert!(matches!(error, LifecycleError::Launch { .. }), "got: {error:?}");
    assert_eq!(error.kind(), FailureKind::LaunchFailed);
}

#[test]
fn invalid_configuration_is_rejected_before_probing() {
    let java = FakeJava::ready_server();
    let (data_port, _) = free_ports();
    let config = java.config(data_port, data_port);

    let error = start_server(&config).expect_err("shared port is invalid");

    assert_eq!(error.kind(), FailureKind::Configuration);
    assert!(!java.was_invoked());
}

#[test]
fn status_reports_each_listener() {
    let java = FakeJava::ready_server();
    let data = TcpListener::bind(("127.0.0.1", 0)).expect("bind data listener");
    let data_port = data.local_addr().expect("local addr").port();
    let (_, console_port) = free_ports();

    let status = server_status(&java.config(data_port, console_port)).expect("probe status");

    assert!(status.data_listening);
    assert!(!status.console_listening);
    assert!(!status.is_running());
    assert!(!status.is_stopped());
}
