//! Wire and trace formats: the WEBIRC line and the session recording format.

pub mod trace;
pub mod webirc;

pub use trace::{escape_payload, format_event, Direction, TRACE_FOOTER, TRACE_HEADER};
pub use webirc::{build_preamble, canonical_ip_text, WebIrcCredentials};
