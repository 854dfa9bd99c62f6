// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! musterd: the worker-fleet control plane daemon.

use muster_daemon::{Config, LifecycleError, Service, ZeroCollector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            error!(%err, "daemon failed");
            eprintln!("musterd: {err}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), LifecycleError> {
    let args = parse_args();

    let config = match args.state_dir {
        Some(dir) => Config::load_from(dir)?,
        None => Config::load()?,
    };

    // File logging with stderr fallback, non-blocking.
    std::fs::create_dir_all(&config.state_dir)?;
    let filter = EnvFilter::new(muster_daemon::env::log_filter());
    let _log_guard = match std::fs::File::create(&config.log_path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    };

    let lock_file = config.acquire_lock()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let service = Service::start(&config, Arc::new(ZeroCollector), Some(lock_file))?;
        info!(state_dir = %config.state_dir.display(), "musterd ready");

        wait_for_signal().await;
        service.shutdown().await;
        Ok::<(), LifecycleError>(())
    })?;

    // Remove the pid file on clean exit; the lock itself released with the
    // service drop.
    let _ = std::fs::remove_file(&config.lock_path);
    Ok(())
}

struct Args {
    state_dir: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut state_dir = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--state-dir" => state_dir = args.next().map(PathBuf::from),
            "--help" | "-h" => {
                println!("usage: musterd [--state-dir DIR]");
                std::process::exit(0);
            }
            other => {
                eprintln!("musterd: unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }
    Args { state_dir }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                error!(%err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = term.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c");
    }
}
