//! Test support utilities for lifecycle coverage.
//!
//! Supplies a stand-in for the Java launcher so lifecycle flows can be driven
//! end to end without a JVM, plus config loaders and port helpers shared by
//! unit and behavioural tests.

use std::ffi::OsString;
use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use h2ctl_config::{ServerConfig, ServerRuntime};
use tempfile::TempDir;

use crate::{AppError, ConfigLoader};

pub(crate) const FAKE_CLASSPATH: &str = "fake-h2.jar";
pub(crate) const FAKE_MAIN_CLASS: &str = "org.h2.tools.Server";

pub(crate) const TCP_ANNOUNCEMENT: &str =
    "TCP server running at tcp://127.0.0.1:9092 (only local connections)";
pub(crate) const WEB_ANNOUNCEMENT: &str =
    "Web Console server running at http://127.0.0.1:8082 (only local connections)";

/// A config loader that returns a fixed configuration for tests.
pub(crate) struct StaticConfigLoader {
    config: ServerConfig,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<ServerConfig, AppError> {
        Ok(self.config.clone())
    }
}

/// An executable shell script standing in for `java`.
///
/// Every invocation records its arguments, one per line, before running the
/// scripted body.
pub(crate) struct FakeJava {
    _dir: TempDir,
    path: PathBuf,
    record: PathBuf,
}

impl FakeJava {
    pub(crate) fn with_script(body: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("java");
        let record = dir.path().join("arguments.txt");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{body}\n",
            record.display()
        );
        write_executable(&path, &script);
        Self {
            _dir: dir,
            path,
            record,
        }
    }

    /// Announces both listeners, then idles briefly before exiting.
    pub(crate) fn ready_server() -> Self {
        Self::with_script(&format!(
            "echo 'H2 starting'\necho '{TCP_ANNOUNCEMENT}'\necho '{WEB_ANNOUNCEMENT}'\nexec sleep 2"
        ))
    }

    /// Acts as the server when launched and as an accepting shutdown client
    /// when given `-tcpShutdown`.
    pub(crate) fn server_and_client() -> Self {
        Self::with_script(&format!(
            "if [ \"$4\" = '-tcpShutdown' ]; then\n  exit 0\nfi\necho '{TCP_ANNOUNCEMENT}'\necho '{WEB_ANNOUNCEMENT}'\nexec sleep 2"
        ))
    }

    /// Fails the way the server does when its port is taken.
    pub(crate) fn failing_server() -> Self {
        Self::with_script(
            "echo 'Exception in thread \"main\" org.h2.jdbc.JdbcSQLNonTransientConnectionException: Exception opening port \"9092\" (port may be in use)' >&2\nexit 1",
        )
    }

    /// Shutdown client that exits with `status` after printing `stderr`.
    pub(crate) fn shutdown_client(status: i32, stderr: &str) -> Self {
        if stderr.is_empty() {
            return Self::with_script(&format!("exit {status}"));
        }
        Self::with_script(&format!("echo '{stderr}' >&2\nexit {status}"))
    }

    pub(crate) fn runtime(&self) -> ServerRuntime {
        ServerRuntime::new(self.path.as_os_str(), FAKE_CLASSPATH, FAKE_MAIN_CLASS)
    }

    /// Configuration pointing at this script with the given ports.
    pub(crate) fn config(&self, data_port: u16, console_port: u16) -> ServerConfig {
        ServerConfig {
            data_port,
            console_port,
            host: String::from("127.0.0.1"),
            java_binary: Some(self.path.to_string_lossy().into_owned()),
            classpath: Some(String::from(FAKE_CLASSPATH)),
            main_class: String::from(FAKE_MAIN_CLASS),
            ..ServerConfig::default()
        }
    }

    pub(crate) fn was_invoked(&self) -> bool {
        self.record.exists()
    }

    /// Arguments of the most recent invocation.
    pub(crate) fn recorded_arguments(&self) -> Vec<String> {
        fs::read_to_string(&self.record)
            .expect("fake java recorded its arguments")
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(unix)]
fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, contents).expect("write fake java");
    let mut permissions = fs::metadata(path).expect("fake java metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).expect("make fake java executable");
}

#[cfg(not(unix))]
fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fake java");
}

/// A listener that accepts a single connection and then closes.
pub(crate) struct OneShotListener {
    pub(crate) port: u16,
    handle: JoinHandle<()>,
}

impl OneShotListener {
    pub(crate) fn bind() -> Self {
        Self::bind_to(0)
    }

    pub(crate) fn bind_to(port: u16) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port)).expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let _ = listener.accept();
        });
        Self { port, handle }
    }

    pub(crate) fn join(self) {
        self.handle.join().expect("listener thread");
    }
}

/// Two distinct ports that were free a moment ago.
pub(crate) fn free_ports() -> (u16, u16) {
    let first = TcpListener::bind(("127.0.0.1", 0)).expect("bind first port");
    let second = TcpListener::bind(("127.0.0.1", 0)).expect("bind second port");
    (
        first.local_addr().expect("first addr").port(),
        second.local_addr().expect("second addr").port(),
    )
}
