// # ddnsd - DDNS Daemon
//
// Thin integration layer: builds the configuration, wires the HTTP IP
// source, the dyndns2 provider and the file address store into a
// `MonitorLoop`, and runs it next to the TCP health listener until a
// signal arrives or either task stops.
//
// ## Configuration
//
// `DDNS_`-prefixed variables, read from the process environment or, with
// `--envfile <PATH>`, from a dotenv file only:
//
// - `DDNS_BASEHOST`: host of the public-IP echo service
// - `DDNS_UPDHOST`: host of the dyndns2 update API
// - `DDNS_UN` / `DDNS_PW`: account credentials
// - `DDNS_DNSHOST`: hostname to keep updated
// - `DDNS_WILDCARD`, `DDNS_MX`, `DDNS_BACKMX`: record options
// - `DDNS_DBPATH`: file holding the last known address
// - `DDNS_INTERVAL`: poll interval (`5m`, `90s`, `300`)
// - `DDNS_DEBUG`: debug logging (optional)
// - `DDNS_PERSIST_POLICY`: `always` (default) or `on_success`
// - `DDNS_HEALTH_ADDR`: health listener address (default `0.0.0.0:9376`)
// - `DDNS_UPDATE_TIMEOUT`: update request timeout (default `30s`)
//
// `RUST_LOG` overrides the log level derived from `DDNS_DEBUG`.
//
// ## Example
//
// ```bash
// export DDNS_BASEHOST=myip.dnsomatic.com
// export DDNS_UPDHOST=updates.dnsomatic.com
// export DDNS_UN=user DDNS_PW=secret
// export DDNS_DNSHOST=home.example.com
// export DDNS_WILDCARD=NOCHG DDNS_MX=NOCHG DDNS_BACKMX=NOCHG
// export DDNS_DBPATH=/var/lib/ddns/last_ip
// export DDNS_INTERVAL=5m
//
// ddnsd
// ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ddns_core::traits::AddressStore;
use ddns_core::{DdnsConfig, FileAddressStore, HealthListener, MonitorConfig, MonitorLoop};
use ddns_ip_http::HttpIpSource;
use ddns_provider_dyndns::DynDnsProvider;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::filter::LevelFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long stopping tasks get after cancellation
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (monitor or listener stopped)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Polling dynamic-DNS update agent
#[derive(Parser, Debug)]
#[command(name = "ddnsd", version)]
struct Cli {
    /// Read DDNS_* settings from this dotenv file instead of the environment
    #[arg(long)]
    envfile: Option<PathBuf>,
}

/// Why the daemon stopped waiting
enum Stopped {
    Signal(Result<&'static str>),
    Monitor(std::result::Result<ddns_core::Result<()>, JoinError>),
    Listener(std::result::Result<ddns_core::Result<()>, JoinError>),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also land here
            let _ = e.print();
            return if e.use_stderr() {
                DdnsExitCode::ConfigError.into()
            } else {
                DdnsExitCode::CleanShutdown.into()
            };
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(config.debug) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    debug!(?config, "Configuration loaded");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Load the configuration from exactly one source
fn load_config(cli: &Cli) -> Result<DdnsConfig> {
    match &cli.envfile {
        Some(path) => {
            let vars = dotenvy::from_path_iter(path)
                .with_context(|| format!("Failed to open {}", path.display()))?
                .collect::<std::result::Result<Vec<(String, String)>, _>>()
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(DdnsConfig::from_vars(vars)?)
        }
        None => Ok(DdnsConfig::from_vars(std::env::vars())?),
    }
}

/// Install the global fmt subscriber
fn init_tracing(debug: bool) -> Result<()> {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Run the daemon
async fn run_daemon(config: DdnsConfig) -> DdnsExitCode {
    let store = FileAddressStore::new(&config.db_path);
    if let Err(e) = store.ensure_exists().await {
        error!(path = %config.db_path.display(), error = %e, "Cannot create address file");
        return DdnsExitCode::ConfigError;
    }

    let source = match HttpIpSource::from_config(&config) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to create IP source: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let provider = match DynDnsProvider::from_config(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create DNS provider: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let (monitor, events) = match MonitorLoop::new(
        Box::new(source),
        Box::new(provider),
        Box::new(store),
        MonitorConfig::from(&config),
    ) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to create monitor: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };
    // Log lines already cover every event
    drop(events);

    let listener = match HealthListener::bind(config.health_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    info!(
        dns_host = %config.dns_host,
        interval = ?config.interval,
        db_path = %config.db_path.display(),
        health_addr = %listener.local_addr(),
        "Monitoring public address"
    );

    let cancel = CancellationToken::new();
    let mut monitor_task: JoinHandle<ddns_core::Result<()>> = tokio::spawn({
        let cancel = cancel.clone();
        async move { monitor.run(cancel).await }
    });
    let mut listener_task = tokio::spawn(listener.run(cancel.clone()));

    let stopped = tokio::select! {
        signal = wait_for_shutdown() => Stopped::Signal(signal),
        result = &mut monitor_task => Stopped::Monitor(result),
        result = &mut listener_task => Stopped::Listener(result),
    };

    cancel.cancel();

    let (code, remaining) = match stopped {
        Stopped::Signal(Ok(signal)) => {
            info!("Received shutdown signal: {}", signal);
            (
                DdnsExitCode::CleanShutdown,
                vec![("monitor", monitor_task), ("health listener", listener_task)],
            )
        }
        Stopped::Signal(Err(e)) => {
            error!("Shutdown error: {}", e);
            (
                DdnsExitCode::RuntimeError,
                vec![("monitor", monitor_task), ("health listener", listener_task)],
            )
        }
        Stopped::Monitor(result) => (
            task_exit_code("monitor", result),
            vec![("health listener", listener_task)],
        ),
        Stopped::Listener(result) => (
            task_exit_code("health listener", result),
            vec![("monitor", monitor_task)],
        ),
    };

    for (name, task) in remaining {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(Ok(()))) => debug!("{} stopped", name),
            Ok(Ok(Err(e))) => warn!(task = name, error = %e, "Task failed during shutdown"),
            Ok(Err(e)) => warn!(task = name, error = %e, "Task panicked during shutdown"),
            Err(_) => warn!(
                "{} did not stop within {:?}",
                name, SHUTDOWN_TIMEOUT
            ),
        }
    }

    info!("Shutting down daemon");
    code
}

/// Map a task that stopped on its own to an exit code
///
/// Both tasks only return `Ok` after cancellation, so any exit seen before
/// cancelling is a runtime failure.
fn task_exit_code(
    name: &str,
    result: std::result::Result<ddns_core::Result<()>, JoinError>,
) -> DdnsExitCode {
    match result {
        Ok(Ok(())) => error!(task = name, "Task exited unexpectedly"),
        Ok(Err(e)) => error!(task = name, error = %e, "Task failed"),
        Err(e) => error!(task = name, error = %e, "Task panicked"),
    }
    DdnsExitCode::RuntimeError
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
