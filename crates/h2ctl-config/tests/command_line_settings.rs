//! On/off settings resolved through the full loader.

use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard};

use h2ctl_config::{ServerConfig, Toggle, start_args};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Clears every `H2CTL_*` variable for the lifetime of a test.
struct CleanEnvironment {
    removed: Vec<(OsString, OsString)>,
    applied: Vec<OsString>,
    _guard: MutexGuard<'static, ()>,
}

impl CleanEnvironment {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let removed: Vec<(OsString, OsString)> = std::env::vars_os()
            .filter(|(key, _)| key.to_string_lossy().starts_with("H2CTL_"))
            .collect();
        for (key, _) in &removed {
            // Environment mutation is `unsafe` on edition 2024; ENV_MUTEX
            // serialises every test in this binary.
            unsafe { std::env::remove_var(key) };
        }
        Self {
            removed,
            applied: Vec::new(),
            _guard: guard,
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
        self.applied.push(OsString::from(key));
    }
}

impl Drop for CleanEnvironment {
    fn drop(&mut self) {
        for key in self.applied.drain(..) {
            unsafe { std::env::remove_var(key) };
        }
        for (key, value) in self.removed.drain(..) {
            unsafe { std::env::set_var(key, value) };
        }
    }
}

#[fixture]
fn environment() -> CleanEnvironment {
    CleanEnvironment::new()
}

fn load(arguments: &[&str]) -> ServerConfig {
    ServerConfig::load_from_iter(arguments.iter().copied()).expect("configuration loads")
}

#[rstest]
fn program_name_alone_yields_the_default_start_vector(environment: CleanEnvironment) {
    let config = load(&["h2ctl"]);

    assert_eq!(
        start_args(&config),
        [
            "-tcp",
            "-tcpPort",
            "9092",
            "-tcpPassword",
            "admin",
            "-web",
            "-webPort",
            "8082",
            "-webAdminPassword",
            "admin",
            "-ifNotExists",
            "-tcpAllowOthers",
            "-webAllowOthers",
        ]
    );
    drop(environment);
}

#[rstest]
fn toggles_accept_explicit_values(environment: CleanEnvironment) {
    let config = load(&[
        "h2ctl",
        "--create-if-missing",
        "false",
        "--open-console-in-browser",
        "true",
    ]);

    assert_eq!(config.create_if_missing, Toggle::OFF);
    assert_eq!(config.open_console_in_browser, Toggle::ON);
    assert_eq!(config.allow_remote_data_connections, Toggle::ON);
    let args = start_args(&config);
    assert!(args.iter().any(|arg| arg == "-ifExists"), "args: {args:?}");
    assert!(args.iter().any(|arg| arg == "-browser"), "args: {args:?}");
    drop(environment);
}

#[rstest]
#[case::inline("--allow-remote-console-connections=FALSE")]
#[case::separate("--allow-remote-console-connections")]
fn toggle_values_are_case_insensitive(mut environment: CleanEnvironment, #[case] flag: &str) {
    let mut arguments = vec!["h2ctl", flag];
    if !flag.contains('=') {
        arguments.push("False");
    }
    environment.set("H2CTL_DATA_PORT", "9300");

    let config = load(&arguments);

    assert_eq!(config.allow_remote_console_connections, Toggle::OFF);
    assert_eq!(config.data_port, 9300);
    drop(environment);
}

#[rstest]
fn absent_flag_leaves_the_environment_value(mut environment: CleanEnvironment) {
    environment.set("H2CTL_ALLOW_REMOTE_DATA_CONNECTIONS", "false");

    let config = load(&["h2ctl"]);

    assert_eq!(config.allow_remote_data_connections, Toggle::OFF);
    assert_eq!(config.allow_remote_console_connections, Toggle::ON);
    drop(environment);
}

#[rstest]
fn non_boolean_value_is_rejected(environment: CleanEnvironment) {
    let error = ServerConfig::load_from_iter(["h2ctl", "--create-if-missing", "start"])
        .expect_err("`start` is not a toggle value");

    assert!(error.to_string().contains("start"), "error: {error}");
    drop(environment);
}
