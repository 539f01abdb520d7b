//! Session lifecycle rules.
//!
//! Every session walks through the same states:
//!
//! ```text
//! Connecting ──target connected──▶ Relaying ──terminal event──▶ Closing ──▶ Closed
//!     │                                                           ▲
//!     └──────────────────────dial failed──────────────────────────┘
//! ```
//!
//! While `Closing`, each of the two legs (the browser WebSocket and the IRC
//! TCP connection) must be closed exactly once.  A leg whose peer already hung
//! up counts as closed; [`SessionLifecycle::take_open`] hands out the close
//! duty for each remaining leg a single time, so a second close attempt is a
//! no-op rather than an error.

use std::time::Duration;

use thiserror::Error;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that end a session before or outside the relay.
///
/// None of these affect other sessions or the listener.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The WebSocket upgrade with the browser did not complete.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// The IRC server refused or reset the connection attempt.
    #[error("failed to connect to target {addr}: {source}")]
    TargetDial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The IRC server did not accept the connection in time.
    #[error("timed out after {timeout:?} connecting to target {addr}")]
    TargetDialTimeout { addr: String, timeout: Duration },

    /// The WEBIRC line could not be written after connecting.
    #[error("failed to send WEBIRC preamble: {0}")]
    Preamble(#[source] std::io::Error),

    /// A lifecycle method was called in a state that does not allow it.
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },
}

// ── States, legs, and terminal events ─────────────────────────────────────────

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Dialing the IRC server.
    Connecting,
    /// Preamble sent; bytes flow both ways.
    Relaying,
    /// A leg ended; the other is being closed.
    Closing,
    /// Both legs closed, resources released.
    Closed,
}

/// One side of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// The browser WebSocket.
    Client,
    /// The IRC server TCP connection.
    Target,
}

/// The event that ended the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// The IRC server closed its side of the connection.
    TargetEof,
    /// Reading from or writing to the IRC server failed.
    TargetError(String),
    /// The browser sent a WebSocket Close frame.
    ClientClosed { code: Option<u16>, reason: String },
    /// The browser's WebSocket stream ended without a Close frame.
    ClientStreamEnded,
    /// The WebSocket reported a protocol or I/O error.
    ClientError(String),
    /// Sending to the browser failed because it is already gone.
    ClientSendFailed,
}

impl TerminalEvent {
    /// The leg this event shows to be already closed by its peer, if any.
    ///
    /// A Close frame from the browser is not included: the gateway still owes
    /// the browser the reply half of the closing handshake.
    pub fn peer_closed_leg(&self) -> Option<Leg> {
        match self {
            TerminalEvent::TargetEof | TerminalEvent::TargetError(_) => Some(Leg::Target),
            TerminalEvent::ClientStreamEnded
            | TerminalEvent::ClientError(_)
            | TerminalEvent::ClientSendFailed => Some(Leg::Client),
            TerminalEvent::ClientClosed { .. } => None,
        }
    }
}

impl std::fmt::Display for TerminalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalEvent::TargetEof => write!(f, "target disconnected"),
            TerminalEvent::TargetError(e) => write!(f, "target connection error: {e}"),
            TerminalEvent::ClientClosed { code, reason } => match code {
                Some(code) => write!(f, "WebSocket client disconnected: {code} [{reason}]"),
                None => write!(f, "WebSocket client disconnected [{reason}]"),
            },
            TerminalEvent::ClientStreamEnded => write!(f, "WebSocket stream ended"),
            TerminalEvent::ClientError(e) => write!(f, "WebSocket client error: {e}"),
            TerminalEvent::ClientSendFailed => write!(f, "client closed, cleaning up target"),
        }
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Tracks one session's state and which legs still need closing.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
    client_open: bool,
    target_open: bool,
}

impl SessionLifecycle {
    /// A new session: dialing, with the browser leg open and no target yet.
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            client_open: true,
            target_open: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `Connecting → Relaying`, once the target accepted and the preamble is out.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidTransition`] from any other state.
    pub fn target_connected(&mut self) -> Result<(), BridgeError> {
        if self.state != SessionState::Connecting {
            return Err(BridgeError::InvalidTransition {
                from: self.state,
                action: "start relaying",
            });
        }
        self.state = SessionState::Relaying;
        self.target_open = true;
        Ok(())
    }

    /// `Connecting → Closing` after the target could not be reached.
    ///
    /// `target_reached` says whether a TCP connection exists that must be
    /// closed (the dial succeeded but the preamble write failed).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidTransition`] from any state but
    /// `Connecting`.
    pub fn dial_failed(&mut self, target_reached: bool) -> Result<(), BridgeError> {
        if self.state != SessionState::Connecting {
            return Err(BridgeError::InvalidTransition {
                from: self.state,
                action: "fail the dial",
            });
        }
        self.state = SessionState::Closing;
        self.target_open = target_reached;
        Ok(())
    }

    /// `Relaying → Closing` on a terminal event.
    ///
    /// The leg the event came from is marked closed when its peer already
    /// hung up.  A second terminal event while `Closing` changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidTransition`] from `Connecting` or
    /// `Closed`.
    pub fn begin_teardown(&mut self, event: &TerminalEvent) -> Result<(), BridgeError> {
        match self.state {
            SessionState::Relaying => {}
            SessionState::Closing => return Ok(()),
            from => {
                return Err(BridgeError::InvalidTransition {
                    from,
                    action: "tear down",
                })
            }
        }
        self.state = SessionState::Closing;
        match event.peer_closed_leg() {
            Some(Leg::Client) => self.client_open = false,
            Some(Leg::Target) => self.target_open = false,
            None => {}
        }
        Ok(())
    }

    /// Claims the duty to close `leg`.
    ///
    /// Returns `true` exactly once per open leg while `Closing`; every later
    /// call, and any call for a leg that was never open, returns `false`.
    pub fn take_open(&mut self, leg: Leg) -> bool {
        if self.state != SessionState::Closing {
            return false;
        }
        let slot = match leg {
            Leg::Client => &mut self.client_open,
            Leg::Target => &mut self.target_open,
        };
        std::mem::replace(slot, false)
    }

    /// `Closing → Closed`.  Any leg not yet closed is considered released.
    pub fn finish(&mut self) {
        self.client_open = false;
        self.target_open = false;
        self.state = SessionState::Closed;
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
