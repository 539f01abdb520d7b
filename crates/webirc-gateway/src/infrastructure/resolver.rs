//! Reverse-DNS lookup of client addresses.
//!
//! The WEBIRC line carries the client's hostname when one exists.  Looking it
//! up is slow and may fail, so it is bounded by a timeout and any failure
//! quietly falls back to "no hostname", which makes the WEBIRC line carry
//! the IP in the host field.  A slow resolver therefore delays a session by
//! at most the timeout and never stops it.
//!
//! The lookup sits behind the [`HostnameResolver`] trait so tests and
//! `--no-dns` deployments can swap it out.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Finds the hostname of a client address.
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    /// Returns the hostname for `ip`, or `None` if there is none usable.
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String>;
}

/// A blocking reverse lookup, as done by `getnameinfo`.
pub type LookupFn = fn(&IpAddr) -> std::io::Result<String>;

/// Resolver backed by the operating system's `getnameinfo`.
#[derive(Clone)]
pub struct SystemResolver {
    timeout: Duration,
    lookup: LookupFn,
}

impl SystemResolver {
    /// Creates a resolver that waits at most `timeout` per lookup.
    pub fn new(timeout: Duration) -> Self {
        Self::with_lookup(timeout, dns_lookup::lookup_addr)
    }

    /// Creates a resolver that runs `lookup` instead of the system resolver.
    pub fn with_lookup(timeout: Duration, lookup: LookupFn) -> Self {
        Self { timeout, lookup }
    }
}

#[async_trait]
impl HostnameResolver for SystemResolver {
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
        // `lookup_addr` blocks, so it runs on the blocking pool.  On timeout
        // the blocking call finishes in the background and its result is
        // discarded.
        let lookup_fn = self.lookup;
        let lookup = tokio::task::spawn_blocking(move || lookup_fn(&ip));

        match timeout(self.timeout, lookup).await {
            Ok(Ok(Ok(name))) => usable_hostname(&name),
            Ok(Ok(Err(e))) => {
                debug!("reverse lookup of {ip} failed: {e}");
                None
            }
            Ok(Err(e)) => {
                warn!("reverse lookup task for {ip} failed: {e}");
                None
            }
            Err(_) => {
                debug!("reverse lookup of {ip} timed out after {:?}", self.timeout);
                None
            }
        }
    }
}

/// Resolver that never finds a hostname.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl HostnameResolver for NoopResolver {
    async fn reverse_lookup(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

/// Filters a lookup result down to something safe to put on the WEBIRC line.
///
/// `getnameinfo` echoes the numeric address back when no PTR record exists;
/// any numeric address is treated as "no hostname".  Names that would
/// break the line (whitespace, a leading `:`) are rejected too.
pub fn usable_hostname(name: &str) -> Option<String> {
    let name = name.trim_end_matches('.');
    if name.is_empty()
        || name.starts_with(':')
        || name.chars().any(char::is_whitespace)
        || name.parse::<IpAddr>().is_ok()
    {
        return None;
    }
    Some(name.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
