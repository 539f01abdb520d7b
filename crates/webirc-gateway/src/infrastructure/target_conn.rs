//! TCP connection to the IRC server.
//!
//! Each browser session gets its own TCP connection to the IRC server.  The
//! first bytes on it are always the WEBIRC line; after that it carries the
//! browser's bytes unchanged.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::application::BridgeError;

/// Size of each read from the IRC server; one read becomes one WebSocket
/// message.
pub const READ_CHUNK: usize = 16 * 1024;

/// An open connection to the IRC server, split for concurrent use.
pub struct TargetConnection {
    /// Read half, drained by the target → client relay.
    pub read_half: OwnedReadHalf,
    /// Write half, fed by the client → target relay.
    pub write_half: OwnedWriteHalf,
}

impl TargetConnection {
    /// Dials `host:port`, giving up after `connect_timeout`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::TargetDial`] if the connection is refused or the host
    /// cannot be resolved, [`BridgeError::TargetDialTimeout`] if the attempt
    /// outlives `connect_timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let addr = format!("{host}:{port}");

        let stream = match timeout(connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(BridgeError::TargetDial { addr, source }),
            Err(_) => {
                return Err(BridgeError::TargetDialTimeout {
                    addr,
                    timeout: connect_timeout,
                })
            }
        };

        // IRC lines are small and interactive.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY on target connection: {e}");
        }

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            read_half,
            write_half,
        })
    }

    /// Writes the WEBIRC line.  Must be the first write on the connection.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Preamble`] if the write fails.
    pub async fn send_preamble(&mut self, line: &str) -> Result<(), BridgeError> {
        write_preamble(&mut self.write_half, line).await
    }
}

/// Writes `line` in full and flushes it.
pub async fn write_preamble<W>(writer: &mut W, line: &str) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(BridgeError::Preamble)?;
    writer.flush().await.map_err(BridgeError::Preamble)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
