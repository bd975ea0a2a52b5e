//! TCP reachability probes for the server's listeners.
//!
//! Used before launch to refuse ports that are already taken, before shutdown
//! to fail fast when nothing is listening, and by `status`.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::error::{LifecycleError, Listener};

const SOCKET_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Host the server binds on the local machine.
pub(super) const LOCAL_HOST: &str = "localhost";

/// Ensures nothing is accepting connections on `host:port`.
pub(super) fn ensure_port_available(
    listener: Listener,
    host: &str,
    port: u16,
) -> Result<(), LifecycleError> {
    if port_is_reachable(host, port)? {
        return Err(LifecycleError::PortInUse {
            listener,
            endpoint: endpoint(host, port),
        });
    }
    Ok(())
}

/// Checks whether something accepts connections on `host:port`.
///
/// Every resolved address is tried, so a listener bound only to IPv4 is still
/// found when the name also resolves to an IPv6 address. One refusal is
/// enough to call the port free when the other addresses are unroutable.
pub(super) fn port_is_reachable(host: &str, port: u16) -> Result<bool, LifecycleError> {
    let addresses = (host, port)
        .to_socket_addrs()
        .map_err(|source| LifecycleError::SocketProbe {
            endpoint: endpoint(host, port),
            source,
        })?;
    let mut refused = false;
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, SOCKET_PROBE_TIMEOUT) {
            Ok(_) => return Ok(true),
            Err(error) if is_port_available(&error) => refused = true,
            Err(error) => last_error = Some(error),
        }
    }
    match last_error {
        Some(source) if !refused => Err(LifecycleError::SocketProbe {
            endpoint: endpoint(host, port),
            source,
        }),
        _ => Ok(false),
    }
}

fn endpoint(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

/// Whether a connect error means nothing is listening.
///
/// `ConnectionReset` is excluded: a peer accepted and then dropped the
/// connection, so the port is taken.
fn is_port_available(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotFound
            | io::ErrorKind::AddrNotAvailable
    )
}
