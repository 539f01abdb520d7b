//! webirc-gateway library crate.
//!
//! This crate lets a web browser talk to an IRC server.  Browsers can only
//! open WebSocket connections, while IRC servers speak a plain TCP byte
//! stream, so the gateway sits in between and relays bytes both ways.  Before
//! relaying anything, it tells the IRC server who the browser really is with a
//! WEBIRC line.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (WebSocket)
//!         ↕
//! [webirc-gateway]
//!   ├── domain/            Pure types: GatewayConfig, session identity
//!   ├── application/       Session lifecycle state machine, BridgeError
//!   └── infrastructure/
//!         ├── ws_server/   axum router: status page vs. WebSocket upgrade
//!         ├── bridge/      Per-session relay and teardown
//!         ├── target_conn/ TCP connection to the IRC server
//!         ├── recorder/    Optional per-session trace file
//!         ├── resolver/    Reverse DNS for the WEBIRC host field
//!         └── status/      JSON status page
//!         ↕
//! IRC server (TCP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` depends on `domain` only.
//! - `infrastructure` depends on all other layers plus `tokio` and `axum`.

/// Domain layer: configuration and session identity (no I/O).
pub mod domain;

/// Application layer: session lifecycle rules.
pub mod application;

/// Infrastructure layer: sockets, files, DNS.
pub mod infrastructure;
