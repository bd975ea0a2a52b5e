//! Builds the server's command-line argument vectors.
//!
//! Both builders are pure functions of [`ServerConfig`]: the same settings
//! always produce the same vector in the same order, which keeps the launched
//! command line predictable for tests and for operators reading logs.

use crate::ServerConfig;

const TCP: &str = "-tcp";
const TCP_PORT: &str = "-tcpPort";
const TCP_PASSWORD: &str = "-tcpPassword";
const WEB: &str = "-web";
const WEB_PORT: &str = "-webPort";
const WEB_ADMIN_PASSWORD: &str = "-webAdminPassword";
const IF_NOT_EXISTS: &str = "-ifNotExists";
const IF_EXISTS: &str = "-ifExists";
const TCP_ALLOW_OTHERS: &str = "-tcpAllowOthers";
const WEB_ALLOW_OTHERS: &str = "-webAllowOthers";
const BROWSER: &str = "-browser";
const BASE_DIR: &str = "-baseDir";
const TCP_SHUTDOWN: &str = "-tcpShutdown";

/// Arguments that start both listeners.
#[must_use]
pub fn start_args(config: &ServerConfig) -> Vec<String> {
    let mut args = vec![
        TCP.to_owned(),
        TCP_PORT.to_owned(),
        config.data_port.to_string(),
        TCP_PASSWORD.to_owned(),
        config.data_password.clone(),
        WEB.to_owned(),
        WEB_PORT.to_owned(),
        config.console_port.to_string(),
        WEB_ADMIN_PASSWORD.to_owned(),
        config.console_password.clone(),
    ];
    args.push(if config.create_if_missing.is_on() {
        IF_NOT_EXISTS.to_owned()
    } else {
        IF_EXISTS.to_owned()
    });
    if config.allow_remote_data_connections.is_on() {
        args.push(TCP_ALLOW_OTHERS.to_owned());
    }
    if config.allow_remote_console_connections.is_on() {
        args.push(WEB_ALLOW_OTHERS.to_owned());
    }
    if config.open_console_in_browser.is_on() {
        args.push(BROWSER.to_owned());
    }
    if let Some(base_dir) = &config.base_dir {
        args.push(BASE_DIR.to_owned());
        args.push(base_dir.clone());
    }
    args
}

/// Arguments that ask a running server to shut down.
#[must_use]
pub fn stop_args(config: &ServerConfig) -> Vec<String> {
    shutdown_args(&config.host, config.data_port, &config.data_password)
}

/// Shutdown arguments for an explicit target.
#[must_use]
pub fn shutdown_args(host: &str, port: u16, password: &str) -> Vec<String> {
    vec![
        TCP_SHUTDOWN.to_owned(),
        shutdown_url(host, port),
        TCP_PASSWORD.to_owned(),
        password.to_owned(),
    ]
}

/// URL of the data-access listener addressed by a shutdown request.
#[must_use]
pub fn shutdown_url(host: &str, port: u16) -> String {
    format!("tcp://{host}:{port}")
}
