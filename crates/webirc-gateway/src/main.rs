//! WebSocket-to-IRC gateway: entry point.
//!
//! This binary accepts WebSocket connections from web browsers and relays
//! them to an IRC server over plain TCP.  The first line the IRC server sees
//! on every connection is a WEBIRC line naming the browser's real address.
//!
//! # Usage
//!
//! ```text
//! webirc-gateway [OPTIONS] --username <NAME> --password <PASS> <SOURCE> <TARGET>
//!
//! Arguments:
//!   <SOURCE>  [host:]port to listen on
//!   <TARGET>  host:port of the IRC server
//!
//! Options:
//!   --username <NAME>           WEBIRC gateway name
//!   --password <PASS>           WEBIRC password
//!   --record <DIR>              Write a trace file per session into DIR
//!   --connect-timeout <SECS>    IRC server dial timeout [default: 10]
//!   --dns-timeout <SECS>        Reverse-DNS timeout [default: 2]
//!   --no-dns                    Skip reverse DNS; announce clients by IP
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Option              |
//! |--------------------------|---------------------|
//! | `WEBIRC_USERNAME`        | `--username`        |
//! | `WEBIRC_PASSWORD`        | `--password`        |
//! | `WEBIRC_RECORD_DIR`      | `--record`          |
//! | `WEBIRC_CONNECT_TIMEOUT` | `--connect-timeout` |
//! | `WEBIRC_DNS_TIMEOUT`     | `--dns-timeout`     |
//!
//! CLI arguments take precedence when both are present.  Log verbosity is
//! controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use webirc_core::{SessionRegistry, WebIrcCredentials};
use webirc_gateway::domain::config::{parse_source, parse_target};
use webirc_gateway::domain::GatewayConfig;
use webirc_gateway::infrastructure::{
    run_server, HostnameResolver, NoopResolver, ServerContext, SystemResolver,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// WebSocket-to-IRC gateway with WEBIRC client announcement.
#[derive(Debug, Parser)]
#[command(
    name = "webirc-gateway",
    about = "Relays browser WebSocket connections to an IRC server, announcing each client with WEBIRC",
    version
)]
struct Cli {
    /// Address to listen on, `[host:]port`.
    source: String,

    /// IRC server to relay to, `host:port`.
    target: String,

    /// WEBIRC gateway name, as configured on the IRC server.
    #[arg(long, env = "WEBIRC_USERNAME")]
    username: String,

    /// WEBIRC password, as configured on the IRC server.
    #[arg(long, env = "WEBIRC_PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory to write one trace file per session into.
    #[arg(long, env = "WEBIRC_RECORD_DIR")]
    record: Option<PathBuf>,

    /// Seconds to wait for the IRC server to accept a connection.
    #[arg(long, default_value_t = 10, env = "WEBIRC_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// Seconds to wait for a client's reverse-DNS name.
    #[arg(long, default_value_t = 2, env = "WEBIRC_DNS_TIMEOUT")]
    dns_timeout: u64,

    /// Skip reverse DNS and announce every client by IP.
    #[arg(long)]
    no_dns: bool,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`GatewayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are empty or contain whitespace,
    /// if `SOURCE` or `TARGET` is malformed, or if the recording directory
    /// does not exist.
    fn into_gateway_config(self) -> anyhow::Result<GatewayConfig> {
        let credentials = WebIrcCredentials::new(self.username, self.password)?;

        let listen_addr = parse_source(&self.source)
            .with_context(|| format!("invalid source '{}'", self.source))?;
        let (target_host, target_port) = parse_target(&self.target)
            .with_context(|| format!("invalid target '{}'", self.target))?;

        if let Some(dir) = &self.record {
            anyhow::ensure!(
                dir.is_dir(),
                "recording directory '{}' does not exist",
                dir.display()
            );
        }

        let mut config = GatewayConfig::new(listen_addr, target_host, target_port, credentials);
        config.record_dir = self.record;
        config.connect_timeout = Duration::from_secs(self.connect_timeout);
        config.dns_timeout = if self.no_dns {
            None
        } else {
            Some(Duration::from_secs(self.dns_timeout))
        };
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_gateway_config()?;

    info!("WebSocket settings:");
    info!(
        "    - proxying from {} to {}",
        config.listen_addr,
        config.target_display()
    );
    info!("    - WEBIRC gateway name: {}", config.credentials.username());
    match &config.record_dir {
        Some(dir) => info!("    - recording sessions into {}", dir.display()),
        None => info!("    - session recording disabled"),
    }

    let resolver: Arc<dyn HostnameResolver> = match config.dns_timeout {
        Some(limit) => Arc::new(SystemResolver::new(limit)),
        None => Arc::new(NoopResolver),
    };

    let ctx = ServerContext {
        config: Arc::new(config),
        registry: Arc::new(SessionRegistry::new()),
        resolver,
    };

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(ctx, running).await?;

    info!("WebSocket gateway stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
