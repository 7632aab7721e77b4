//! The server binary: wires configuration, logging, the cache, and the
//! resolver together around a UDP receive loop. Reads a datagram,
//! resolves it, writes a reply, repeats, with a periodic cache snapshot
//! and clean shutdown on Ctrl-C interleaved via `tokio::select!`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use resolvd::cache::{Cache, SharedCache};
use resolvd::config::{Mode, Settings};
use resolvd::protocol::types::Message;
use resolvd::resolver::{resolve_message, ResolverMode};

/// A recursive/forwarding DNS resolver.
#[derive(Debug, Parser)]
#[command(name = "resolvd", version, about)]
struct Args {
    /// Path to a YAML configuration file. Missing entirely is fine; the
    /// server runs on built-in defaults.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    bind_host: Option<std::net::IpAddr>,

    #[arg(long)]
    bind_port: Option<u16>,

    #[arg(long)]
    root_server: Option<std::net::IpAddr>,

    #[arg(long)]
    forwarder: Option<String>,

    #[arg(long)]
    cache_path: Option<String>,

    #[arg(long)]
    mode: Option<CliMode>,

    #[arg(long)]
    log_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliMode {
    Recursive,
    Forwarder,
}

fn apply_overrides(mut settings: Settings, args: &Args) -> Settings {
    if let Some(bind_host) = args.bind_host {
        settings.bind_host = bind_host;
    }
    if let Some(bind_port) = args.bind_port {
        settings.bind_port = bind_port;
    }
    if let Some(root_server) = args.root_server {
        settings.root_server = root_server;
    }
    if let Some(forwarder) = &args.forwarder {
        settings.forwarder = forwarder.clone();
    }
    if let Some(cache_path) = &args.cache_path {
        settings.cache_path = cache_path.clone();
    }
    if let Some(mode) = args.mode {
        settings.mode = match mode {
            CliMode::Recursive => Mode::Recursive,
            CliMode::Forwarder => Mode::Forwarder,
        };
    }
    if let Some(log_filter) = &args.log_filter {
        settings.log_filter = log_filter.clone();
    }
    settings
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => apply_overrides(settings, &args),
        Err(error) => {
            eprintln!("could not load configuration: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    if let Err(error) = run(settings).await {
        tracing::error!(%error, "server exited with an error");
        return std::process::ExitCode::FAILURE;
    }

    std::process::ExitCode::SUCCESS
}

async fn run(settings: Settings) -> std::io::Result<()> {
    let cache_path = Arc::new(PathBuf::from(&settings.cache_path));
    let cache = SharedCache::new(Cache::load(&cache_path).await);

    let resolver_mode = resolver_mode(&settings).await?;

    let bind_addr = SocketAddr::new(settings.bind_host, settings.bind_port);
    let socket = Arc::new(tokio::net::UdpSocket::bind(bind_addr).await?);
    tracing::info!(%bind_addr, mode = ?settings.mode, "listening");

    let mut snapshot_interval =
        tokio::time::interval(std::time::Duration::from_secs(settings.snapshot_interval_secs));
    // the first tick fires immediately; that snapshot would be a no-op
    // but there's no reason to special-case skipping it.

    let mut recv_buf = [0u8; 512];
    loop {
        tokio::select! {
            _ = snapshot_interval.tick() => {
                if let Err(error) = cache.save(&cache_path).await {
                    tracing::warn!(%error, "periodic cache snapshot failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            received = socket.recv_from(&mut recv_buf) => {
                let (n, client) = received?;
                let Ok(query) = Message::decode(&recv_buf[..n], false) else {
                    tracing::debug!(%client, "dropped malformed query");
                    continue;
                };

                let response = resolve_message(&cache, resolver_mode, &query).await;
                if let Err(error) = socket.send_to(&response.encode(), client).await {
                    tracing::warn!(%client, %error, "failed to send response");
                }
            }
        }
    }

    if let Err(error) = cache.save(&cache_path).await {
        tracing::warn!(%error, "final cache snapshot failed");
    }

    Ok(())
}

async fn resolver_mode(settings: &Settings) -> std::io::Result<ResolverMode> {
    match settings.mode {
        Mode::Recursive => Ok(ResolverMode::Recursive {
            root_server: SocketAddr::new(settings.root_server, 53),
        }),
        Mode::Forwarder => {
            let forwarder = tokio::net::lookup_host((settings.forwarder.as_str(), 53))
                .await?
                .next()
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("could not resolve forwarder address {}", settings.forwarder),
                    )
                })?;
            Ok(ResolverMode::Forwarding { forwarder })
        }
    }
}
