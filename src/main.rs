mod cancel;
mod cli;
mod config;
mod control;
mod lifecycle;
mod privilege;
mod probe;
mod signal;
mod status;
mod watcher;

use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use log::{error, info, warn};

use crate::cancel::CancelToken;
use crate::config::PanelConfig;
use crate::lifecycle::{
    COMPLETION_GRACE, LifecycleError, LifecycleOperation,
    ServiceLifecycleController, run_bounded,
};
use crate::probe::ServiceProbe;
use crate::status::{ActionSet, ServiceSnapshot, derive_actions};
use crate::watcher::StatusWatcher;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(e) = real_main() {
        error!("{e:#}");
        process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let args = cli::Args::parse();
    let config = load_config(&args)?;

    match args.sub.unwrap_or(cli::Cmd::Watch {
        interval_ms: 1200,
        no_auto_start: false,
    }) {
        cli::Cmd::Status => handle_status(&config),
        cli::Cmd::Watch {
            interval_ms,
            no_auto_start,
        } => handle_watch(&config, interval_ms, no_auto_start),
        cli::Cmd::Start { timeout_secs } => handle_operation(
            &config,
            LifecycleOperation::Start,
            Duration::from_secs(timeout_secs),
        ),
        cli::Cmd::Stop { timeout_secs } => handle_operation(
            &config,
            LifecycleOperation::Stop,
            Duration::from_secs(timeout_secs),
        ),
        cli::Cmd::Restart { timeout_secs, yes } => {
            if !yes && !confirm_restart(&config) {
                println!("restart aborted");
                return Ok(());
            }
            handle_operation(
                &config,
                LifecycleOperation::Restart,
                Duration::from_secs(timeout_secs),
            )
        }
    }
}

/// `--service` wins over the config file; otherwise the file is
/// required and a blank service name is a hard failure.
fn load_config(args: &cli::Args) -> Result<PanelConfig> {
    if let Some(name) = &args.service {
        return PanelConfig::for_service(name);
    }
    let path = PanelConfig::resolve_path(args.config.clone())?;
    PanelConfig::load(&path)
}

/// Handle status command - one probe, exit code carries the answer.
fn handle_status(config: &PanelConfig) -> Result<()> {
    let control = control::for_service(config.service_name());
    let probe = ServiceProbe::new(config.service_name(), control);
    let snapshot = probe.snapshot();

    match &snapshot.status {
        Some(status) => {
            println!("{} is {status}", config.display_name());
            if snapshot.is_running() {
                process::exit(0);
            }
            process::exit(1);
        }
        None => {
            let detail =
                snapshot.error.as_deref().unwrap_or("no status available");
            eprintln!("{}: {detail}", config.display_name());
            eprintln!("check the service name and permissions");
            process::exit(1);
        }
    }
}

/// Handle watch command - the panel loop: refresh at a fixed cadence,
/// print status plus the derived action set, keep refreshing while an
/// operation is in flight.
fn handle_watch(
    config: &PanelConfig,
    interval_ms: u64,
    no_auto_start: bool,
) -> Result<()> {
    let controller = Arc::new(ServiceLifecycleController::new(
        config.service_name(),
    ));
    let interrupt = CancelToken::new();
    signal::cancel_on_interrupt(&interrupt)?;

    if config.service.auto_start && !no_auto_start {
        let first = controller.snapshot();
        if first.exists && !first.is_running() {
            info!("auto-start enabled, starting '{}'", config.service_name());
            let auto = Arc::clone(&controller);
            let auto_cancel = interrupt.clone();
            let name = config.service_name().to_string();
            thread::spawn(move || {
                match run_bounded(
                    auto,
                    LifecycleOperation::Start,
                    DEFAULT_TIMEOUT,
                    auto_cancel,
                    COMPLETION_GRACE,
                ) {
                    Ok(()) => info!("auto-start of '{name}' complete"),
                    Err(LifecycleError::Cancelled) => {
                        info!("auto-start of '{name}' cancelled")
                    }
                    Err(e) => warn!("auto-start of '{name}' failed: {e}"),
                }
            });
        }
    }

    let watcher = StatusWatcher::spawn(
        controller.probe(),
        Duration::from_millis(interval_ms),
    )
    .context("failed to spawn status watcher")?;

    loop {
        if interrupt.is_cancelled() {
            break;
        }
        match watcher
            .snapshots()
            .recv_timeout(Duration::from_millis(200))
        {
            Ok(snapshot) => {
                print_refresh(config, &snapshot, controller.is_busy())
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    watcher.stop();
    Ok(())
}

fn print_refresh(config: &PanelConfig, snapshot: &ServiceSnapshot, busy: bool) {
    let ts = chrono::Local::now().format("%H:%M:%S");
    let display = config.display_name();

    let mut line = match &snapshot.status {
        Some(status) => format!("[{ts}] {display}: {status}"),
        None => {
            let detail =
                snapshot.error.as_deref().unwrap_or("no status available");
            format!(
                "[{ts}] {display}: not found ({detail}); check the service name and permissions"
            )
        }
    };

    if busy {
        line.push_str("  [operation in flight]");
    } else if snapshot.exists {
        let actions = derive_actions(snapshot, busy);
        line.push_str("  actions: ");
        line.push_str(&render_actions(actions));
    }

    // Re-derived every refresh, not cached.
    if let Some(hint) = privilege::elevation_hint() {
        line.push_str("  [");
        line.push_str(hint);
        line.push(']');
    }

    println!("{line}");
}

fn render_actions(actions: ActionSet) -> String {
    let mut names = Vec::new();
    if actions.start {
        names.push("start");
    }
    if actions.stop {
        names.push("stop");
    }
    if actions.restart {
        names.push("restart");
    }
    if names.is_empty() {
        return "none".to_string();
    }
    names.join("|")
}

/// Handle start/stop/restart - run through the bounded wrapper so the
/// command can never hang, with interrupt signals wired to the token.
fn handle_operation(
    config: &PanelConfig,
    op: LifecycleOperation,
    timeout: Duration,
) -> Result<()> {
    let controller = Arc::new(ServiceLifecycleController::new(
        config.service_name(),
    ));
    let cancel = CancelToken::new();
    signal::cancel_on_interrupt(&cancel)?;

    if let Some(hint) = privilege::elevation_hint() {
        warn!("{hint}");
    }

    match run_bounded(controller, op, timeout, cancel, COMPLETION_GRACE) {
        Ok(()) => {
            println!("{}: {op} complete", config.display_name());
            process::exit(0);
        }
        Err(LifecycleError::Cancelled) => {
            println!("{}: {op} cancelled", config.display_name());
            process::exit(1);
        }
        Err(LifecycleError::NotFound(name)) => {
            eprintln!("service '{name}' was not found; check the name and permissions");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {op} failed: {e}", config.display_name());
            process::exit(1);
        }
    }
}

fn confirm_restart(config: &PanelConfig) -> bool {
    let prompt = format!(
        "Restart {} ({})?",
        config.display_name(),
        config.service_name()
    );
    inquire::Confirm::new(&prompt)
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}
