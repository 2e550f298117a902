use fwforge::config::RunConfig;
use fwforge::driver::Suspender;
use fwforge::scenario::{self, Runner, Scenario, ScanKind};
use fwforge::structs::*;
use fwforge::transport::UdpTransport;
use fwforge::*;
mod cmd;

use std::fs;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::bounded;

/// The entry point of the application.
///
/// Logs the error and exits with status 1 when the run fails or is interrupted.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    if let Err(e) = run(args) {
        log::error!("{e}");
        process::exit(1);
    }
}

/// Combine the configuration layers: defaults, then the TOML file, then the command line
fn resolve_config(args: &cmd::Args) -> Result<RunConfig> {
    let mut config = RunConfig::default();
    if let Some(path) = &args.config {
        let config_str = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        config = config.with_toml(&config_str)?;
        log::debug!("Configuration loaded from {}", path.display());
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.seed = args.seed.or(config.seed);
    Ok(config)
}

fn pacing(args: &cmd::PacingArgs, config: &RunConfig, default_delay: Duration) -> Result<Pacing> {
    let delay = match args.delay {
        Some(secs) => Delay::from_secs_f64(secs)?,
        None => Delay::Fixed(default_delay),
    };
    Pacing::new(args.batch.or(config.batch).unwrap_or(1), delay)
}

fn build_scenario(command: &cmd::Command, config: &RunConfig) -> Result<Scenario> {
    Ok(match command {
        cmd::Command::FastScan {
            format,
            sources,
            ports,
            pacing: p,
            ..
        } => Scenario::Scan {
            kind: ScanKind::Fast,
            ports: *ports,
            format: *format,
            sources: sources.clone(),
            pacing: pacing(p, config, scenario::FAST_SCAN_DELAY)?,
        },
        cmd::Command::SlowScan {
            format,
            sources,
            ports,
            pacing: p,
            ..
        } => Scenario::Scan {
            kind: ScanKind::Slow,
            ports: *ports,
            format: *format,
            sources: sources.clone(),
            pacing: pacing(p, config, scenario::SLOW_SCAN_DELAY)?,
        },
        cmd::Command::Normal {
            format,
            sources,
            count,
            ..
        } => Scenario::Normal {
            count: *count,
            format: *format,
            sources: sources.clone(),
        },
        cmd::Command::Replay { file, pacing: p } => Scenario::Replay {
            file: file.clone(),
            pacing: pacing(p, config, scenario::REPLAY_DELAY)?,
        },
        cmd::Command::Sample {
            file,
            mode,
            pacing: p,
            ..
        } => Scenario::Sample {
            file: file.clone(),
            mode: *mode,
            pacing: pacing(p, config, scenario::SAMPLE_DELAY)?,
        },
        cmd::Command::Preset {
            preset,
            cef,
            pacing: p,
            samples_dir,
        } => Scenario::Preset {
            preset: *preset,
            format: if *cef { LogFormat::Cef } else { LogFormat::Gaia },
            samples_dir: samples_dir.clone().or_else(|| config.samples_dir.clone()),
            pacing: pacing(p, config, preset.default_delay())?,
        },
    })
}

fn run(args: cmd::Args) -> Result<()> {
    let config = resolve_config(&args)?;
    let scenario = build_scenario(&args.command, &config)?;
    let target = config.target()?;

    // Handle ctrl+C: the first one interrupts the pacing, the second one exits
    let (tx_cancel, rx_cancel) = bounded::<()>(1);
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_ctrlc = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        if !interrupted_ctrlc.swap(true, Ordering::SeqCst) {
            log::warn!("Interrupting, press Ctrl-C again to exit immediately");
            let _ = tx_cancel.try_send(());
        } else {
            process::exit(1);
        }
    })
    .map_err(|e| Error::Config(format!("cannot install the Ctrl-C handler: {e}")))?;

    let transport = UdpTransport::connect(target)?;
    log::info!("Target: {} (UDP)", transport.target());
    let mut runner = Runner::new(
        transport,
        Suspender::new(rx_cancel),
        config.seed,
        config.envelope(args.command.syslog()),
    );
    let reports = runner.run(&scenario)?;

    for report in reports.iter() {
        if let Outcome::Skipped(reason) = &report.outcome {
            log::warn!("{} skipped: {reason}", report.scenario);
        }
    }
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| Error::Config(format!("cannot serialize the report: {e}")))?;
        fs::write(path, json).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}
