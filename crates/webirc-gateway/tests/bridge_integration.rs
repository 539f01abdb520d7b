//! Integration tests for the gateway's session bridge.
//!
//! # Purpose
//!
//! These tests run the real server on `127.0.0.1:0`, a throwaway TCP
//! listener standing in for the IRC server, and a `tokio-tungstenite` client
//! standing in for the browser.  They verify, end to end:
//!
//! - the WEBIRC line is the first thing the IRC server receives;
//! - bytes flow verbatim and in order in both directions;
//! - closing either leg closes the other, and the registry returns to zero,
//!   including when the browser vanishes without a Close frame or breaks
//!   the WebSocket protocol;
//! - a resolved hostname, or the IPv6 fallback, reaches the WEBIRC line;
//! - a dead IRC server closes the WebSocket without crashing anything;
//! - recording produces the expected trace file;
//! - the status page reports the live session count.
//!
//! ```text
//! tokio-tungstenite client ──ws──▶ gateway (serve) ──tcp──▶ fake IRC listener
//! ```

use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async, connect_async, MaybeTlsStream, WebSocketStream};

use webirc_core::{SessionRegistry, WebIrcCredentials};
use webirc_gateway::domain::GatewayConfig;
use webirc_gateway::infrastructure::{serve, HostnameResolver, NoopResolver, ServerContext};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running gateway plus the handles tests need to observe it.
struct Gateway {
    /// `host:port` of the listener, bracketed for IPv6.
    authority: String,
    registry: Arc<SessionRegistry>,
    running: Arc<AtomicBool>,
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Resolver that always answers with the same name.
struct FixedResolver(&'static str);

#[async_trait]
impl HostnameResolver for FixedResolver {
    async fn reverse_lookup(&self, _ip: IpAddr) -> Option<String> {
        Some(self.0.to_string())
    }
}

async fn start_gateway(target_port: u16, record_dir: Option<&Path>) -> Gateway {
    start_gateway_on("127.0.0.1:0", target_port, record_dir, Arc::new(NoopResolver)).await
}

async fn start_gateway_on(
    bind: &str,
    target_port: u16,
    record_dir: Option<&Path>,
    resolver: Arc<dyn HostnameResolver>,
) -> Gateway {
    let listener = TcpListener::bind(bind).await.unwrap();
    let authority = listener.local_addr().unwrap().to_string();

    let mut config = GatewayConfig::new(
        listener.local_addr().unwrap(),
        "127.0.0.1",
        target_port,
        WebIrcCredentials::new("gw", "pw").unwrap(),
    );
    config.record_dir = record_dir.map(Path::to_path_buf);
    config.connect_timeout = Duration::from_secs(2);
    config.dns_timeout = None;

    let registry = Arc::new(SessionRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    let ctx = ServerContext {
        config: Arc::new(config),
        registry: Arc::clone(&registry),
        resolver,
    };

    tokio::spawn(serve(listener, ctx, Arc::clone(&running)));

    Gateway {
        authority,
        registry,
        running,
    }
}

async fn connect_client(gw: &Gateway) -> Client {
    let (ws, _) = timeout(TEST_TIMEOUT, connect_async(format!("ws://{}/", gw.authority)))
        .await
        .expect("connect timed out")
        .expect("WebSocket connect failed");
    ws
}

/// Accepts the gateway's TCP connection and consumes the WEBIRC line.
async fn accept_target(listener: &TcpListener) -> (BufReader<TcpStream>, String) {
    let (sock, _) = timeout(TEST_TIMEOUT, listener.accept())
        .await
        .expect("gateway never dialed the target")
        .unwrap();
    let mut reader = BufReader::new(sock);
    let mut line = String::new();
    timeout(TEST_TIMEOUT, reader.read_line(&mut line))
        .await
        .expect("no WEBIRC line")
        .unwrap();
    (reader, line)
}

async fn wait_for_count(registry: &SessionRegistry, expected: usize) {
    let waited = timeout(TEST_TIMEOUT, async {
        while registry.read() != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        waited.is_ok(),
        "registry stuck at {} (expected {expected})",
        registry.read()
    );
}

/// Reads from the client until the gateway closes the WebSocket.
/// Returns the close code, if a Close frame was received.
async fn wait_for_close(ws: &mut Client) -> Option<CloseCode> {
    timeout(TEST_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code),
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return None,
            }
        }
    })
    .await
    .expect("gateway never closed the WebSocket")
}

// ── Preamble and client → target relay ────────────────────────────────────────

#[tokio::test]
async fn test_preamble_is_first_line_then_client_bytes_verbatim_in_order() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let mut client = connect_client(&gw).await;
    let (mut target, preamble) = accept_target(&irc).await;

    // Act: mix text and binary frames; the gateway must not distinguish them
    client.send(Message::Text("NICK alice\r\n".into())).await.unwrap();
    client
        .send(Message::Binary(b"USER alice 0 * :Alice\r\n".to_vec()))
        .await
        .unwrap();
    client.send(Message::Binary(vec![0x00, 0xff, 0x7f])).await.unwrap();

    let expected: &[u8] = b"NICK alice\r\nUSER alice 0 * :Alice\r\n\x00\xff\x7f";
    let mut received = vec![0u8; expected.len()];
    timeout(TEST_TIMEOUT, target.read_exact(&mut received))
        .await
        .unwrap()
        .unwrap();

    // Assert
    assert_eq!(preamble, "WEBIRC pw gw 127.0.0.1 127.0.0.1 secure\r\n");
    assert_eq!(received, expected);
}

// ── Target → client relay ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_target_bytes_reach_client_in_order() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let mut client = connect_client(&gw).await;
    let (mut target, _) = accept_target(&irc).await;

    // Act: TCP may coalesce writes, so compare the concatenated stream
    let sent: [&[u8]; 3] = [
        &b":srv 001 alice :Welcome\r\n"[..],
        &b":srv 002 alice :Host\r\n"[..],
        &b"PING :x\r\n"[..],
    ];
    for chunk in &sent {
        target.get_mut().write_all(chunk).await.unwrap();
    }
    let expected: Vec<u8> = sent.concat();

    let mut received = Vec::new();
    timeout(TEST_TIMEOUT, async {
        while received.len() < expected.len() {
            match client.next().await {
                Some(Ok(Message::Binary(bytes))) => received.extend_from_slice(&bytes),
                Some(Ok(other)) => panic!("unexpected message: {other:?}"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket closed early"),
            }
        }
    })
    .await
    .unwrap();

    // Assert
    assert_eq!(received, expected);
}

// ── Teardown ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_client_close_closes_target_and_uncounts_session() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let mut client = connect_client(&gw).await;
    let (mut target, _) = accept_target(&irc).await;
    wait_for_count(&gw.registry, 1).await;

    // Act
    client.send(Message::Text("QUIT\r\n".into())).await.unwrap();
    client.close(None).await.unwrap();

    // Assert: the target sees the last bytes, then EOF
    let mut rest = Vec::new();
    timeout(TEST_TIMEOUT, target.read_to_end(&mut rest))
        .await
        .expect("target leg was never closed")
        .unwrap();
    assert_eq!(rest, b"QUIT\r\n");
    wait_for_count(&gw.registry, 0).await;
}

#[tokio::test]
async fn test_target_close_closes_client_and_uncounts_session() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let mut client = connect_client(&gw).await;
    let (target, _) = accept_target(&irc).await;
    wait_for_count(&gw.registry, 1).await;

    // Act
    drop(target);

    // Assert
    wait_for_close(&mut client).await;
    wait_for_count(&gw.registry, 0).await;
}

#[tokio::test]
async fn test_target_dial_failure_closes_client_and_restores_count() {
    // Arrange: a port with nothing listening
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_port = unused.local_addr().unwrap().port();
    drop(unused);
    let gw = start_gateway(dead_port, None).await;

    // Act
    let mut client = connect_client(&gw).await;
    let code = wait_for_close(&mut client).await;

    // Assert
    assert_eq!(code, Some(CloseCode::Error));
    wait_for_count(&gw.registry, 0).await;
}

#[tokio::test]
async fn test_sessions_are_independent_and_counted() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;

    let mut clients = Vec::new();
    let mut targets = Vec::new();
    for _ in 0..3 {
        clients.push(connect_client(&gw).await);
        targets.push(accept_target(&irc).await.0);
    }
    wait_for_count(&gw.registry, 3).await;

    // Act: one session ends
    let mut first = clients.remove(0);
    first.close(None).await.unwrap();

    // Assert: N − M live, and the survivors still relay
    wait_for_count(&gw.registry, 2).await;
    clients[0].send(Message::Text("PING :a\r\n".into())).await.unwrap();
    let mut buf = [0u8; 9];
    timeout(TEST_TIMEOUT, targets[1].read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"PING :a\r\n");
}

#[tokio::test]
async fn test_client_vanishing_without_close_frame_closes_target() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let client = connect_client(&gw).await;
    let (mut target, _) = accept_target(&irc).await;
    wait_for_count(&gw.registry, 1).await;

    // Act: drop the socket without a closing handshake, then have the
    // server keep talking to the vanished browser
    drop(client);
    let _ = target.get_mut().write_all(b"PING :x\r\n").await;

    // Assert
    let mut rest = Vec::new();
    let closed = timeout(TEST_TIMEOUT, target.read_to_end(&mut rest)).await;
    assert!(closed.is_ok(), "target leg was never closed");
    wait_for_count(&gw.registry, 0).await;
}

#[tokio::test]
async fn test_client_protocol_error_closes_target() {
    // Arrange: keep the raw socket so a malformed frame can be written
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let tcp = TcpStream::connect(gw.authority.as_str()).await.unwrap();
    let (mut client, _) = client_async(format!("ws://{}/", gw.authority), tcp)
        .await
        .unwrap();
    let (mut target, _) = accept_target(&irc).await;
    wait_for_count(&gw.registry, 1).await;

    // Act: an unmasked text frame, which a server must reject
    client.get_mut().write_all(&[0x81, 0x01, b'a']).await.unwrap();

    // Assert: nothing is relayed and the target leg is closed
    let mut rest = Vec::new();
    timeout(TEST_TIMEOUT, target.read_to_end(&mut rest))
        .await
        .expect("target leg was never closed")
        .unwrap();
    assert!(rest.is_empty());
    wait_for_count(&gw.registry, 0).await;
}

// ── Client identity in the WEBIRC line ────────────────────────────────────────

#[tokio::test]
async fn test_resolved_hostname_fills_host_field() {
    // Arrange
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway_on(
        "127.0.0.1:0",
        irc.local_addr().unwrap().port(),
        None,
        Arc::new(FixedResolver("client.example")),
    )
    .await;

    // Act
    let _client = connect_client(&gw).await;
    let (_target, preamble) = accept_target(&irc).await;

    // Assert
    assert_eq!(preamble, "WEBIRC pw gw client.example 127.0.0.1 secure\r\n");
}

#[tokio::test]
async fn test_ipv6_client_without_hostname_gets_zero_prefixed_host() {
    // Arrange: the browser connects over IPv6 loopback
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway_on(
        "[::1]:0",
        irc.local_addr().unwrap().port(),
        None,
        Arc::new(NoopResolver),
    )
    .await;

    // Act
    let _client = connect_client(&gw).await;
    let (_target, preamble) = accept_target(&irc).await;

    // Assert: host field adjusted, IP field sent as-is
    assert_eq!(preamble, "WEBIRC pw gw 0::1 ::1 secure\r\n");
}

// ── Recording ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_recorded_session_trace() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), Some(dir.path())).await;
    let mut client = connect_client(&gw).await;
    let (mut target, _) = accept_target(&irc).await;

    // Act
    client.send(Message::Text("PING".into())).await.unwrap();
    let mut ping = [0u8; 4];
    timeout(TEST_TIMEOUT, target.read_exact(&mut ping))
        .await
        .unwrap()
        .unwrap();
    target.get_mut().write_all(b"PONG").await.unwrap();
    let pong = timeout(TEST_TIMEOUT, client.next()).await.unwrap();
    assert!(matches!(pong, Some(Ok(Message::Binary(ref b))) if b == b"PONG"));
    client.close(None).await.unwrap();
    wait_for_count(&gw.registry, 0).await;

    // Assert
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1, "exactly one trace file per session");

    let trace = std::fs::read_to_string(&files[0]).unwrap();
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines.len(), 4, "header, two events, EOF: {trace:?}");
    assert_eq!(lines[0], "var VNC_frame_data = [");
    assert!(lines[1].starts_with("'}") && lines[1].ends_with("}PING',"), "{}", lines[1]);
    assert!(lines[2].starts_with("'{") && lines[2].ends_with("{PONG',"), "{}", lines[2]);
    assert_eq!(lines[3], "'EOF'];");
}

#[tokio::test]
async fn test_dial_failure_still_finalizes_recording() {
    let dir = tempfile::tempdir().unwrap();
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_port = unused.local_addr().unwrap().port();
    drop(unused);
    let gw = start_gateway(dead_port, Some(dir.path())).await;

    let mut client = connect_client(&gw).await;
    wait_for_close(&mut client).await;
    wait_for_count(&gw.registry, 0).await;

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let trace = std::fs::read_to_string(&files[0]).unwrap();
    assert_eq!(trace, "var VNC_frame_data = [\n'EOF'];\n");
}

// ── Status page ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_page_reports_live_sessions() {
    // Arrange: one live session
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;
    let _client = connect_client(&gw).await;
    let _target = accept_target(&irc).await;
    wait_for_count(&gw.registry, 1).await;

    // Act
    let resp = reqwest::get(format!("http://{}/status", gw.authority))
        .await
        .unwrap();

    // Assert
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["connections"], 1);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_other_paths_get_403() {
    let irc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gw = start_gateway(irc.local_addr().unwrap().port(), None).await;

    let resp = reqwest::get(format!("http://{}/index.html", gw.authority))
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    assert_eq!(resp.text().await.unwrap(), "403 Permission Denied\n");
    assert_eq!(gw.registry.read(), 0, "status requests are not sessions");
}
