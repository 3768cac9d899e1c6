// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ygg connector daemon (yggd)
//!
//! Background process that bridges a fleet of local worker processes to
//! a remote broker or HTTP long-poll endpoint over a local RPC surface.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use ygg_daemon::env::Config;
use ygg_daemon::{lifecycle, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("yggd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("yggd {}", env!("CARGO_PKG_VERSION"));
                println!("ygg connector daemon - bridges local workers to a remote broker");
                println!();
                println!("USAGE:");
                println!("    yggd");
                println!();
                println!("Configuration is read from YGG_* environment variables and an");
                println!("optional config.toml under the state directory. yggd is normally");
                println!("started by a process supervisor (systemd, launchd) rather than");
                println!("invoked directly.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: yggd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let _log_guard = logging::setup(&config)?;

    info!("starting ygg connector daemon");

    let daemon = match lifecycle::startup(config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            return Err(e.into());
        }
    };

    info!(client_id = %daemon.client_id(), "daemon ready");
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    daemon.shutdown().await;
    Ok(())
}
