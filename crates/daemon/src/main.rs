// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! foremand — the Foreman control-plane daemon.
//!
//! Accepts work items, dispatches each to an isolated worker inside a
//! detached session bound to a per-task checkout, tracks task lifecycle to
//! a terminal state, and manages atomic release snapshots of its own code.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

use fm_daemon::{Config, DaemonError};

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn print_help() {
    println!("foremand {}", env!("CARGO_PKG_VERSION"));
    println!("Foreman control-plane daemon");
    println!();
    println!("USAGE:");
    println!("    foremand");
    println!();
    println!("The daemon is a long-lived background process; it is typically");
    println!("started by a process supervisor, not invoked interactively.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("foremand {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: foremand [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path());
    let _log_guard = fm_daemon::setup_logging(&config.log_path())?;

    info!(?config, "starting foreman daemon");

    let daemon = match fm_daemon::startup(config).await {
        Ok(d) => d,
        Err(DaemonError::LockFailed(_)) => {
            eprintln!("foremand is already running");
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {e}");
            return Err(e.into());
        }
    };

    let shutdown_notify = Arc::new(Notify::new());
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(Arc::clone(&daemon.outbound_outbox).run());
    tokio::spawn(Arc::clone(&daemon.bridge_outbox).run());

    info!("daemon ready");
    println!("READY");

    let orchestrator = Arc::clone(&daemon.orchestrator);
    let mut poll = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = poll.tick() => {
                if let Err(e) = Arc::clone(&orchestrator).run_once().await {
                    error!("error in orchestrator run loop: {e}");
                }
            }
            _ = shutdown_notify.notified() => {
                info!("shutdown requested");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    drop(daemon);
    info!("daemon stopped");
    Ok(())
}
