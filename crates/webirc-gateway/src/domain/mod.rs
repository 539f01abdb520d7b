//! Domain layer for webirc-gateway.
//!
//! Plain data types with no I/O: the parsed configuration and the identity of
//! a session.  The infrastructure layer fills them in from the command line
//! and the accepted socket.

pub mod config;
pub mod session;

pub use config::{ConfigError, GatewayConfig};
pub use session::{ClientIdentity, SessionInfo};
