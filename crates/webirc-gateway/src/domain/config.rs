//! Gateway configuration types.
//!
//! [`GatewayConfig`] is the single source of truth for all runtime settings.
//! `main.rs` builds it from CLI arguments; tests build it directly with
//! [`GatewayConfig::new`].  It is validated once, before the listener starts,
//! so sessions can assume every field is well-formed.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use webirc_core::WebIrcCredentials;

/// Default bound on dialing the IRC server.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on the reverse-DNS lookup of a client address.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors in the `SOURCE` / `TARGET` address arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The target argument had no `:` separating host and port.
    #[error("target must be host:port, got '{0}'")]
    TargetMissingPort(String),

    /// The target host part was empty.
    #[error("target host must not be empty in '{0}'")]
    EmptyTargetHost(String),

    /// A port was not a number in `1..=65535`.
    #[error("illegal port '{0}'")]
    IllegalPort(String),

    /// The source host was not an IP address.
    #[error("invalid listen address '{0}'")]
    InvalidListenHost(String),
}

/// All runtime configuration for the gateway.
///
/// Build this once at startup and wrap it in an `Arc` so every session task
/// can share it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the WebSocket listener binds to.
    pub listen_addr: SocketAddr,

    /// Host name or IP of the IRC server.
    pub target_host: String,

    /// TCP port of the IRC server.
    pub target_port: u16,

    /// WEBIRC gateway name and password, as configured on the IRC server.
    pub credentials: WebIrcCredentials,

    /// Directory for per-session trace files; `None` disables recording.
    pub record_dir: Option<PathBuf>,

    /// Maximum time to wait for the IRC server to accept a connection.
    pub connect_timeout: Duration,

    /// Maximum time to wait for a client's reverse-DNS name.
    ///
    /// `None` skips the lookup and always announces the client by IP.
    pub dns_timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Creates a configuration with recording disabled and default timeouts.
    pub fn new(
        listen_addr: SocketAddr,
        target_host: impl Into<String>,
        target_port: u16,
        credentials: WebIrcCredentials,
    ) -> Self {
        Self {
            listen_addr,
            target_host: target_host.into(),
            target_port,
            credentials,
            record_dir: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            dns_timeout: Some(DEFAULT_DNS_TIMEOUT),
        }
    }

    /// The target as `host:port`, bracketing IPv6 literals, for log lines.
    pub fn target_display(&self) -> String {
        if self.target_host.contains(':') {
            format!("[{}]:{}", self.target_host, self.target_port)
        } else {
            format!("{}:{}", self.target_host, self.target_port)
        }
    }
}

/// Parses the listen argument, `[host:]port`.
///
/// A bare port, or an empty host, listens on every IPv4 interface.  IPv6
/// hosts must be bracketed: `[::]:8080`.
pub fn parse_source(arg: &str) -> Result<SocketAddr, ConfigError> {
    let (host, port) = match arg.rsplit_once(':') {
        Some((host, port)) => (host, port),
        None => ("", arg),
    };

    let port = parse_port(port)?;

    let ip = if host.is_empty() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| ConfigError::InvalidListenHost(host.to_string()))?
    };

    Ok(SocketAddr::new(ip, port))
}

/// Parses the target argument, `host:port`.
///
/// The host may be a DNS name; it is resolved each time a session dials.
pub fn parse_target(arg: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = arg
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::TargetMissingPort(arg.to_string()))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(ConfigError::EmptyTargetHost(arg.to_string()));
    }

    Ok((host.to_string(), parse_port(port)?))
}

fn parse_port(text: &str) -> Result<u16, ConfigError> {
    match text.parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::IllegalPort(text.to_string())),
        Ok(port) => Ok(port),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
