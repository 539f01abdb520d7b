//! Application layer for webirc-gateway.
//!
//! The application layer owns the rules of a session's life: which states it
//! passes through, which leg must be closed when something ends, and which
//! failures exist.  It performs no I/O itself; the infrastructure layer asks
//! it what to do and then does it.

pub mod bridge_service;

pub use bridge_service::{BridgeError, Leg, SessionLifecycle, SessionState, TerminalEvent};
