//! Domain types shared by every session.
//!
//! Only the session registry lives here today: it is the one piece of state
//! that crosses session boundaries.

pub mod registry;

pub use registry::{SessionGuard, SessionRegistry};
