//! WEBIRC preamble formatting.
//!
//! # What is WEBIRC? (for beginners)
//!
//! An IRC server normally identifies a user by the address of the TCP
//! connection.  When a gateway sits in the middle, every user would appear to
//! come from the gateway itself.  The WEBIRC extension lets a *trusted*
//! gateway send one line as the very first thing on a new connection:
//!
//! ```text
//! WEBIRC <password> <gateway> <hostname> <ip> secure\r\n
//! ```
//!
//! The IRC server checks the password, and if it matches, treats the
//! connection as if it came from `<hostname>` / `<ip>`.
//!
//! # IPv6 addresses starting with `:`
//!
//! IRC parameters cannot begin with a colon (a leading `:` marks the final
//! "trailing" parameter).  An address such as `::1` therefore has to be sent
//! as `0::1`, which is the same address written in a form IRC can parse.

use std::net::IpAddr;

use thiserror::Error;

/// Errors raised when WEBIRC credentials are unusable on the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// The gateway username was empty.
    #[error("username required for WEBIRC")]
    MissingUsername,

    /// The WEBIRC password was empty.
    #[error("password required for WEBIRC")]
    MissingPassword,

    /// A field contained a space, CR, or LF and would break the line.
    #[error("WEBIRC {0} must not contain whitespace")]
    Whitespace(&'static str),
}

/// The gateway's WEBIRC identity, as configured on the IRC server.
///
/// `Debug` is implemented by hand so the password never reaches a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct WebIrcCredentials {
    username: String,
    password: String,
}

impl WebIrcCredentials {
    /// Validates and stores a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError`] if either value is empty or contains
    /// whitespace.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() {
            return Err(CredentialsError::MissingUsername);
        }
        if password.is_empty() {
            return Err(CredentialsError::MissingPassword);
        }
        if username.chars().any(char::is_whitespace) {
            return Err(CredentialsError::Whitespace("username"));
        }
        if password.chars().any(char::is_whitespace) {
            return Err(CredentialsError::Whitespace("password"));
        }

        Ok(Self { username, password })
    }

    /// The gateway name sent in the second WEBIRC field.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The shared secret sent in the first WEBIRC field.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for WebIrcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebIrcCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Renders a client address the way the gateway reports it.
///
/// IPv4-mapped IPv6 addresses (`::ffff:10.0.0.1`, which a dual-stack listener
/// hands out for IPv4 clients) are reduced to their IPv4 form.
pub fn canonical_ip_text(ip: IpAddr) -> String {
    ip.to_canonical().to_string()
}

/// Builds the WEBIRC line sent to the IRC server right after connecting.
///
/// `hostname` is the reverse-DNS name of the client, if one was found; an
/// empty string counts as "not found".  Without a hostname the client IP is
/// used in its place.  When `ip` starts with `:` the host field gets a leading
/// `0`; the IP field is always sent exactly as given.
///
/// # Example
///
/// ```rust
/// use webirc_core::{build_preamble, WebIrcCredentials};
///
/// let creds = WebIrcCredentials::new("u", "p").unwrap();
/// assert_eq!(
///     build_preamble(&creds, Some("h"), "10.0.0.1"),
///     "WEBIRC p u h 10.0.0.1 secure\r\n"
/// );
/// ```
pub fn build_preamble(credentials: &WebIrcCredentials, hostname: Option<&str>, ip: &str) -> String {
    let host = match hostname.filter(|h| !h.is_empty()) {
        Some(h) => h.to_string(),
        None if ip.starts_with(':') => format!("0{ip}"),
        None => ip.to_string(),
    };

    format!(
        "WEBIRC {} {} {} {} secure\r\n",
        credentials.password(),
        credentials.username(),
        host,
        ip
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
