//! Session trace format.
//!
//! A recorded session is a small JavaScript array literal that a replay page
//! can load directly:
//!
//! ```text
//! var VNC_frame_data = [
//! '}5}PING\x0d\x0a',
//! '{12{PONG\x0d\x0a',
//! 'EOF'];
//! ```
//!
//! Each event line starts with a bracket character that tells the direction
//! (`}` = client to target, `{` = target to client), then the milliseconds
//! since the session started, the same bracket again, and finally the payload
//! with every byte outside `[A-Za-z0-9_]` written as `\xNN`.
//!
//! The escaping keeps every line printable and free of quotes, so the file is
//! safe to embed no matter what bytes the session carried.

use std::fmt::Write as _;

/// First line of every trace file.
pub const TRACE_HEADER: &str = "var VNC_frame_data = [\n";

/// Last line of every trace file.
pub const TRACE_FOOTER: &str = "'EOF'];\n";

/// Which way a frame travelled through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Browser → IRC server.
    ClientToTarget,
    /// IRC server → browser.
    TargetToClient,
}

impl Direction {
    /// The bracket character that tags this direction in a trace line.
    pub fn tag(self) -> char {
        match self {
            Direction::ClientToTarget => '}',
            Direction::TargetToClient => '{',
        }
    }
}

/// Escapes a payload for the trace file.
///
/// ASCII letters, digits and `_` are copied unchanged; every other byte
/// becomes the four characters `\x` + two lowercase hex digits.
pub fn escape_payload(payload: &[u8]) -> String {
    let mut out = String::with_capacity(payload.len() * 2);
    for &byte in payload {
        if byte.is_ascii_alphanumeric() || byte == b'_' {
            out.push(char::from(byte));
        } else {
            // Writing into a String cannot fail.
            let _ = write!(out, "\\x{byte:02x}");
        }
    }
    out
}

/// Formats one trace line, including the trailing comma and newline.
pub fn format_event(direction: Direction, elapsed_ms: u64, payload: &[u8]) -> String {
    let tag = direction.tag();
    format!("'{tag}{elapsed_ms}{tag}{}',\n", escape_payload(payload))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
