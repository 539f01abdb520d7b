//! WebSocket server: listener, routing, and per-session setup.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Routing every request through one axum handler:
//!    - WebSocket upgrades (on any path) become sessions;
//!    - other requests get the status page or a 403.
//! 3. Counting upgraded sessions in the registry.
//! 4. Resolving the client's hostname and opening its trace file.
//! 5. Handing the session to [`run_bridge`].
//! 6. Stopping the listener when the `running` flag is cleared.
//!
//! # Scalability
//!
//! Each connection runs in its own Tokio task, and each upgraded session
//! runs in the task axum spawns for it.  The listener never waits on a
//! session, so nothing one session does can block or fail another.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::Uri;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use webirc_core::SessionRegistry;

use crate::application::BridgeError;
use crate::domain::{ClientIdentity, GatewayConfig, SessionInfo};
use crate::infrastructure::bridge::run_bridge;
use crate::infrastructure::recorder::SessionRecorder;
use crate::infrastructure::resolver::HostnameResolver;
use crate::infrastructure::status;

/// How often the shutdown watcher checks the `running` flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Everything a request handler needs, cheap to clone.
#[derive(Clone)]
pub struct ServerContext {
    /// Validated gateway settings.
    pub config: Arc<GatewayConfig>,
    /// Live-session counter shown on the status page.
    pub registry: Arc<SessionRegistry>,
    /// Reverse-DNS lookup for the WEBIRC host field.
    pub resolver: Arc<dyn HostnameResolver>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `ctx.config.listen_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(ctx: ServerContext, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listen_addr = ctx.config.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {listen_addr}"))?;

    serve(listener, ctx, running).await
}

/// Builds the router: a single fallback handler sees every request.
pub fn build_router(ctx: ServerContext) -> Router {
    Router::new().fallback(handle_request).with_state(ctx)
}

/// Serves on an already-bound listener until `running` is cleared.
///
/// Split out from [`run_server`] so tests can bind port 0 and learn the
/// real port before serving.  Sessions already upgraded keep running after
/// the listener stops.
///
/// # Errors
///
/// Returns an error if the listener's local address cannot be read or the
/// server fails.
pub async fn serve(
    listener: TcpListener,
    ctx: ServerContext,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("WebSocket gateway listening on {local_addr}");

    let app = build_router(ctx).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(running))
        .await
        .context("WebSocket gateway server failed")?;

    Ok(())
}

/// Resolves once the `running` flag has been cleared.
async fn wait_for_shutdown(running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        sleep(SHUTDOWN_POLL).await;
    }
    info!("shutdown flag set; stopping listener");
}

// ── Request handler ───────────────────────────────────────────────────────────

/// Upgrades WebSocket requests into sessions; answers everything else with
/// the status page.
async fn handle_request(
    State(ctx): State<ServerContext>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            info!("WebSocket connection from {peer_addr}");
            ws.on_failed_upgrade(move |e: axum::Error| {
                let e = BridgeError::Handshake(e.to_string());
                warn!("connection {peer_addr} closed with error: {e}");
            })
            .on_upgrade(move |socket| handle_client_session(socket, peer_addr, ctx))
        }
        Err(_) => {
            debug!("HTTP request from {peer_addr}: {uri}");
            status::respond(&uri, ctx.registry.read())
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Top-level handler for a single browser session.
///
/// Wraps [`run_session`] and logs the outcome.  The registry guard taken in
/// `run_session` is released when it returns, whatever the outcome.
async fn handle_client_session(socket: WebSocket, peer_addr: SocketAddr, ctx: ServerContext) {
    match run_session(socket, peer_addr, ctx).await {
        Ok(()) => debug!("connection {peer_addr} finished"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e}"),
    }
}

/// Runs the complete lifecycle of a single upgraded session.
///
/// 1. Counts the session in the registry.
/// 2. Opens the trace file, if recording is enabled.
/// 3. Resolves the client's hostname (bounded, never fatal).
/// 4. Bridges to the IRC server until either side closes.
///
/// # Errors
///
/// Returns an error if the IRC server cannot be reached.
async fn run_session(
    socket: WebSocket,
    peer_addr: SocketAddr,
    ctx: ServerContext,
) -> Result<(), BridgeError> {
    // ── Step 1: Count the session ─────────────────────────────────────────────
    let _guard = ctx.registry.increment();

    let mut session = SessionInfo::start(ClientIdentity::new(peer_addr));
    let sid = session.short_id();
    info!(
        "session {sid}: client {} ({} live)",
        peer_addr,
        ctx.registry.read()
    );

    // ── Step 2: Trace file ────────────────────────────────────────────────────
    let recorder = match &ctx.config.record_dir {
        Some(dir) => match SessionRecorder::create(dir, session.id).await {
            Ok(recorder) => {
                debug!("session {sid}: recording to {}", recorder.path().display());
                Some(recorder)
            }
            Err(e) => {
                warn!("session {sid}: recording disabled for this session: {e}");
                None
            }
        },
        None => None,
    };

    // ── Step 3: Reverse DNS ───────────────────────────────────────────────────
    session.client.hostname = ctx.resolver.reverse_lookup(peer_addr.ip()).await;
    match &session.client.hostname {
        Some(name) => info!("session {sid}: resolved dns: {name}"),
        None => debug!("session {sid}: no hostname, announcing by IP"),
    }

    // ── Step 4: Bridge ────────────────────────────────────────────────────────
    let summary = run_bridge(socket, &session, recorder, &ctx.config).await?;
    info!(
        "session {sid}: closed after {:.1}s ({})",
        summary.duration.as_secs_f64(),
        summary.event
    );

    Ok(())
}
