//! Per-session bridge: dial, WEBIRC preamble, relay, teardown.
//!
//! [`run_bridge`] takes an already-upgraded WebSocket and drives the whole
//! remaining life of the session:
//!
//! 1. Dial the IRC server (bounded by `connect_timeout`).
//! 2. Send the WEBIRC line.
//! 3. Relay in both directions at once:
//!    - **Client → Target**: every WebSocket text or binary message is
//!      written to TCP unchanged.
//!    - **Target → Client**: every TCP read becomes one binary WebSocket
//!      message.
//! 4. As soon as either direction hits a terminal event, close the other
//!    leg, finalize the recorder, and return.
//!
//! Both directions run as futures inside the session's own task and are
//! raced with `tokio::select!`.  When one finishes, the other future is
//! dropped, which ends its borrow of the stream halves so teardown can use
//! them.  Per-direction order is preserved because each direction is a single
//! sequential loop.

use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use webirc_core::protocol::trace::Direction;
use webirc_core::build_preamble;

use crate::application::{BridgeError, Leg, SessionLifecycle, TerminalEvent};
use crate::domain::{GatewayConfig, SessionInfo};
use crate::infrastructure::recorder::SessionRecorder;
use crate::infrastructure::target_conn::{TargetConnection, READ_CHUNK};

/// How a relayed session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// The event that ended the relay.
    pub event: TerminalEvent,
    /// Total session duration.
    pub duration: Duration,
}

/// Runs one session from target dial to teardown.
///
/// `recorder` is `Some` only when recording is enabled; it is finalized on
/// every path out of this function.
///
/// # Errors
///
/// Returns a [`BridgeError`] if the IRC server cannot be reached or the
/// WEBIRC line cannot be sent.  In both cases the WebSocket has already been
/// closed.  Once relaying has started the session always ends with `Ok`.
pub async fn run_bridge(
    mut ws: WebSocket,
    session: &SessionInfo,
    recorder: Option<SessionRecorder>,
    config: &GatewayConfig,
) -> Result<SessionSummary, BridgeError> {
    let sid = session.short_id();
    let mut lifecycle = SessionLifecycle::new();

    // ── Step 1: Dial the IRC server ───────────────────────────────────────────
    let mut target = match TargetConnection::connect(
        &config.target_host,
        config.target_port,
        config.connect_timeout,
    )
    .await
    {
        Ok(target) => target,
        Err(e) => {
            warn!("session {sid}: {e}");
            lifecycle.dial_failed(false)?;
            if lifecycle.take_open(Leg::Client) {
                close_client_after_dial_failure(&mut ws, &sid).await;
            }
            finalize_recorder(recorder, &sid).await;
            lifecycle.finish();
            return Err(e);
        }
    };

    info!("session {sid}: connected to target {}", config.target_display());

    // ── Step 2: WEBIRC preamble ───────────────────────────────────────────────
    let preamble = build_preamble(
        &config.credentials,
        session.client.hostname.as_deref(),
        &session.client.ip_text(),
    );

    if let Err(e) = target.send_preamble(&preamble).await {
        warn!("session {sid}: {e}");
        lifecycle.dial_failed(true)?;
        if lifecycle.take_open(Leg::Target) {
            shutdown_target(&mut target.write_half, &sid).await;
        }
        if lifecycle.take_open(Leg::Client) {
            close_client_after_dial_failure(&mut ws, &sid).await;
        }
        finalize_recorder(recorder, &sid).await;
        lifecycle.finish();
        return Err(e);
    }

    lifecycle.target_connected()?;
    debug!("session {sid}: WEBIRC preamble sent, relaying");

    // ── Step 3: Relay both directions ─────────────────────────────────────────
    let (mut ws_tx, mut ws_rx) = ws.split();
    let TargetConnection {
        mut read_half,
        mut write_half,
    } = target;

    // Shared by the two directions of this session only.
    let recorder = recorder.map(Mutex::new);
    let trace = recorder.as_ref();

    let client_to_target = async {
        loop {
            let msg = match ws_rx.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return TerminalEvent::ClientError(e.to_string()),
                None => return TerminalEvent::ClientStreamEnded,
            };

            let payload = match msg {
                WsMessage::Text(text) => text.as_str().as_bytes().to_vec(),
                WsMessage::Binary(bytes) => bytes.to_vec(),
                WsMessage::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(f.code), f.reason.as_str().to_owned()),
                        None => (None, String::new()),
                    };
                    return TerminalEvent::ClientClosed { code, reason };
                }
                // Pings are answered by the WebSocket layer itself.
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            };

            if let Some(trace) = trace {
                trace
                    .lock()
                    .await
                    .record(Direction::ClientToTarget, &payload, session.elapsed_ms())
                    .await;
            }

            debug!("session {sid}: client → target {} bytes", payload.len());
            if let Err(e) = write_half.write_all(&payload).await {
                return TerminalEvent::TargetError(e.to_string());
            }
        }
    };

    let target_to_client = async {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match read_half.read(&mut buf).await {
                Ok(0) => return TerminalEvent::TargetEof,
                Ok(n) => n,
                Err(e) => return TerminalEvent::TargetError(e.to_string()),
            };
            let chunk = &buf[..n];

            if let Some(trace) = trace {
                trace
                    .lock()
                    .await
                    .record(Direction::TargetToClient, chunk, session.elapsed_ms())
                    .await;
            }

            debug!("session {sid}: target → client {n} bytes");
            if ws_tx.send(WsMessage::Binary(chunk.to_vec().into())).await.is_err() {
                return TerminalEvent::ClientSendFailed;
            }
        }
    };

    let event = tokio::select! {
        event = client_to_target => event,
        event = target_to_client => event,
    };

    // ── Step 4: Teardown ──────────────────────────────────────────────────────
    info!("session {sid}: {event}");
    lifecycle.begin_teardown(&event)?;

    if lifecycle.take_open(Leg::Target) {
        shutdown_target(&mut write_half, &sid).await;
    }
    if lifecycle.take_open(Leg::Client) {
        if let Err(e) = ws_tx.close().await {
            debug!("session {sid}: WebSocket close: {e}");
        }
    }
    drop((ws_tx, ws_rx, read_half, write_half));

    finalize_recorder(recorder.map(Mutex::into_inner), &sid).await;
    lifecycle.finish();

    Ok(SessionSummary {
        event,
        duration: session.elapsed(),
    })
}

/// Tells the browser the IRC server is unreachable and closes the socket.
async fn close_client_after_dial_failure(ws: &mut WebSocket, sid: &str) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: "unable to reach IRC server".into(),
    };
    if let Err(e) = ws.send(WsMessage::Close(Some(frame))).await {
        debug!("session {sid}: WebSocket close: {e}");
    }
}

async fn shutdown_target<W>(write_half: &mut W, sid: &str)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = write_half.shutdown().await {
        debug!("session {sid}: target shutdown: {e}");
    }
}

async fn finalize_recorder(recorder: Option<SessionRecorder>, sid: &str) {
    let Some(recorder) = recorder else {
        return;
    };
    match recorder.finalize().await {
        Ok(path) => debug!("session {sid}: recording saved to {}", path.display()),
        Err(e) => warn!("session {sid}: {e}"),
    }
}
