//! # webirc-core
//!
//! Shared, I/O-free building blocks for the WebSocket-to-IRC gateway.
//!
//! The gateway accepts a WebSocket connection from a browser, opens a plain
//! TCP connection to an IRC server, and relays bytes between the two.  Before
//! relaying, it announces the browser's real address to the IRC server with a
//! WEBIRC line, because the IRC server would otherwise only see the gateway's
//! own address.
//!
//! This crate holds the parts of that job that are pure logic:
//!
//! - **`protocol::webirc`** – formats the WEBIRC identity line.
//! - **`protocol::trace`** – the text format used to record a session's
//!   frames for later debugging.
//! - **`domain::registry`** – the live-session counter reported on the status
//!   page.
//!
//! Nothing here opens sockets or files, so every rule can be unit-tested
//! without a network.

pub mod domain;
pub mod protocol;

pub use domain::registry::{SessionGuard, SessionRegistry};
pub use protocol::trace::{escape_payload, Direction};
pub use protocol::webirc::{build_preamble, canonical_ip_text, WebIrcCredentials};
