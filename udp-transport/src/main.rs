//! Entry point for `transport`.
//!
//! Parses CLI arguments, opens the output file, and runs one download.  All
//! protocol work is delegated to library modules; `main.rs` owns only process
//! setup (logging, argument parsing, exit status).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use udp_transport::config::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE, DEFAULT_WINDOW_SIZE};
use udp_transport::{Transfer, TransferConfig};

/// Download SIZE bytes from a UDP file server at IP:PORT into FILE.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// IPv4 address of the server.
    ip: Ipv4Addr,
    /// UDP port of the server.
    port: u16,
    /// Output file (created or truncated).
    file: PathBuf,
    /// Number of bytes to download.
    #[arg(value_parser = clap::value_parser!(u64).range(0..=DEFAULT_MAX_FILE_SIZE))]
    size: u64,

    /// Segments kept in flight.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window: usize,
    /// Bytes per requested chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = 500)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG to control verbosity.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let peer = SocketAddr::from((cli.ip, cli.port));
    let config = TransferConfig {
        chunk_size: cli.chunk_size,
        window_size: cli.window,
        retransmit_timeout: Duration::from_millis(cli.timeout_ms),
        ..TransferConfig::default()
    };

    let mut output = tokio::fs::File::create(&cli.file)
        .await
        .with_context(|| format!("cannot open {} for writing", cli.file.display()))?;

    let mut transfer = Transfer::open(peer, cli.size, config)
        .await
        .context("cannot set up transfer")?;
    log::info!("Downloading from {peer} via {}", transfer.local_addr());

    let summary = transfer
        .run(&mut output)
        .await
        .with_context(|| format!("transfer from {peer} failed"))?;
    log::info!("Saved {} byte(s) to {}", summary.bytes_written, cli.file.display());
    Ok(())
}
