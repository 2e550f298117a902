use fwforge::scenario::{Preset, SampleMode};
use fwforge::structs::LogFormat;
use fwforge::utils::SourceSpec;

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, global = true, help = "Address of the detector [default: 127.0.0.1]")]
    pub host: Option<String>,
    #[arg(short, long, global = true, help = "UDP port of the detector [default: 5555]")]
    pub port: Option<u16>,
    #[arg(short, long, global = true, help = "Seed for random number generation")]
    pub seed: Option<u64>,
    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Write the run report as JSON to this file")]
    pub report: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

/// Batching and pacing options shared by most scenarios
#[derive(Debug, ClapArgs, Clone)]
pub struct PacingArgs {
    #[arg(short, long, help = "Delay in seconds between two datagrams")]
    pub delay: Option<f64>,
    #[arg(short, long, help = "Number of log lines per datagram [default: 1]")]
    pub batch: Option<usize>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Many distinct ports in a few seconds. Should trigger the fast scan detection.
    FastScan {
        #[arg(short, long, value_enum, default_value_t = LogFormat::Gaia)]
        format: LogFormat,
        #[arg(
            long = "source",
            help = "Attacker address: an IPv4 address, a CIDR block or class-a/b/c. Repeat to simulate several attackers one after the other"
        )]
        sources: Vec<SourceSpec>,
        #[arg(short = 'n', long, default_value_t = fwforge::scenario::FAST_SCAN_PORTS, help = "Number of distinct ports")]
        ports: usize,
        #[command(flatten)]
        pacing: PacingArgs,
        #[arg(long, default_value_t = false, help = "Prefix CEF lines with a syslog header")]
        syslog: bool,
    },
    /// Many distinct ports spread over several minutes. Should trigger the slow scan detection.
    SlowScan {
        #[arg(short, long, value_enum, default_value_t = LogFormat::Gaia)]
        format: LogFormat,
        #[arg(
            long = "source",
            help = "Attacker address: an IPv4 address, a CIDR block or class-a/b/c. Repeat to simulate several attackers one after the other"
        )]
        sources: Vec<SourceSpec>,
        #[arg(short = 'n', long, default_value_t = fwforge::scenario::SLOW_SCAN_PORTS, help = "Number of distinct ports")]
        ports: usize,
        #[command(flatten)]
        pacing: PacingArgs,
        #[arg(long, default_value_t = false, help = "Prefix CEF lines with a syslog header")]
        syslog: bool,
    },
    /// A few drops on common ports with random pauses. Should not raise any alert.
    Normal {
        #[arg(short, long, value_enum, default_value_t = LogFormat::Gaia)]
        format: LogFormat,
        #[arg(long = "source", help = "Source address, CIDR block or class-a/b/c")]
        sources: Vec<SourceSpec>,
        #[arg(short = 'n', long, default_value_t = fwforge::scenario::NORMAL_COUNT, help = "Number of logs")]
        count: usize,
        #[arg(long, default_value_t = false, help = "Prefix CEF lines with a syslog header")]
        syslog: bool,
    },
    /// Send the lines of a log file unmodified
    Replay {
        #[arg(help = "Log file to replay")]
        file: PathBuf,
        #[command(flatten)]
        pacing: PacingArgs,
    },
    /// Replay or regenerate the attack of a captured GAIA sample
    Sample {
        #[arg(help = "Captured GAIA log file")]
        file: PathBuf,
        #[arg(value_enum)]
        mode: SampleMode,
        #[command(flatten)]
        pacing: PacingArgs,
        #[arg(long, default_value_t = false, help = "Prefix CEF lines with a syslog header")]
        syslog: bool,
    },
    /// Replay one of the pre-generated sample files
    Preset {
        #[arg(value_enum)]
        preset: Preset,
        #[arg(long, default_value_t = false, help = "Use the CEF variant of the sample")]
        cef: bool,
        #[command(flatten)]
        pacing: PacingArgs,
        #[arg(long, help = "Directory holding custom sample files [default: the samples built into fwforge]")]
        samples_dir: Option<PathBuf>,
    },
}

impl Command {
    pub fn syslog(&self) -> bool {
        match self {
            Command::FastScan { syslog, .. }
            | Command::SlowScan { syslog, .. }
            | Command::Normal { syslog, .. }
            | Command::Sample { syslog, .. } => *syslog,
            Command::Replay { .. } | Command::Preset { .. } => false,
        }
    }
}
