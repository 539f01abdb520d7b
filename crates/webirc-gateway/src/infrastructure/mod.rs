//! Infrastructure layer for webirc-gateway.
//!
//! Everything that touches a socket, a file, or the system resolver:
//!
//! - Binding the listener and routing requests with axum: WebSocket
//!   upgrades become sessions, anything else gets the status page
//! - Dialing the IRC server and writing the WEBIRC line
//! - Relaying bytes and tearing sessions down
//! - Writing optional trace files
//! - Reverse-DNS lookups of client addresses
//!
//! Configuration parsing is done in `main.rs`; lifecycle rules live in the
//! application layer.

pub mod bridge;
pub mod recorder;
pub mod resolver;
pub mod status;
pub mod target_conn;
pub mod ws_server;

pub use resolver::{HostnameResolver, NoopResolver, SystemResolver};
pub use ws_server::{build_router, run_server, serve, ServerContext};
