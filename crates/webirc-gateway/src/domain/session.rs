//! Session identity.
//!
//! A session is one browser WebSocket paired with one TCP connection to the
//! IRC server.  [`SessionInfo`] carries what the rest of the gateway needs to
//! know about it: an id for log lines and file names, who the client is, and
//! when the session started (trace timestamps are relative to that instant).

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use uuid::Uuid;
use webirc_core::canonical_ip_text;

/// The browser side of a session, as announced in the WEBIRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Socket address the WebSocket connection came from.
    pub addr: SocketAddr,
    /// Reverse-DNS name of `addr`, if the lookup found one.
    pub hostname: Option<String>,
}

impl ClientIdentity {
    /// Creates an identity with no resolved hostname.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            hostname: None,
        }
    }

    /// The client IP as sent in the WEBIRC IP field.
    pub fn ip_text(&self) -> String {
        canonical_ip_text(self.addr.ip())
    }
}

/// One running session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Unique id, used in log lines and the recording file name.
    pub id: Uuid,
    /// The browser side of the session.
    pub client: ClientIdentity,
    started_at: Instant,
}

impl SessionInfo {
    /// Starts the session clock for a newly accepted client.
    pub fn start(client: ClientIdentity) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            started_at: Instant::now(),
        }
    }

    /// Time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whole milliseconds since the session started, as used in traces.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// First eight hex digits of the id, for compact log lines.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
