use crate::analyzer;
use crate::cef;
use crate::driver::{Driver, Pause};
use crate::error::Result;
use crate::gaia;
use crate::structs::*;
use crate::synth::Synthesizer;
use crate::transport::Transport;
use crate::utils::{self, SourceSpec};

use rand::seq::index;
use rand::seq::SliceRandom;
use rand_core::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source used by synthetic scans when none is given
pub const DEFAULT_SOURCE: Ipv4Addr = Ipv4Addr::new(192, 168, 11, 7);

/// Default fast scan: a burst of distinct ports
pub const FAST_SCAN_PORTS: usize = 20;
pub const FAST_SCAN_DELAY: Duration = Duration::from_millis(100);
/// Default slow scan: many ports spread over several minutes
pub const SLOW_SCAN_PORTS: usize = 40;
pub const SLOW_SCAN_DELAY: Duration = Duration::from_secs(7);
pub const NORMAL_COUNT: usize = 10;
pub const REPLAY_DELAY: Duration = Duration::from_millis(100);
pub const SAMPLE_DELAY: Duration = Duration::from_millis(500);

/// Default detector threshold for fast scans: more than 15 distinct ports within 10 s
pub const FAST_SCAN_THRESHOLD: (usize, Duration) = (15, Duration::from_secs(10));
/// Default detector threshold for slow scans: more than 30 distinct ports within 5 min
pub const SLOW_SCAN_THRESHOLD: (usize, Duration) = (30, Duration::from_secs(300));

/// Ports a firewall would commonly block during normal operation
pub const COMMON_PORTS: [u16; 10] = [22, 80, 443, 8080, 3389, 25, 53, 110, 143, 993];
pub const NORMAL_PAUSE_LOW: Duration = Duration::from_millis(500);
pub const NORMAL_PAUSE_HIGH: Duration = Duration::from_millis(2000);

/// Ceiling of the delay of sample-derived fast scans
pub const FAST_RECONSTRUCTION_DELAY_CAP: Duration = Duration::from_millis(50);
/// Gap between two simulated sources of the same run
pub const SOURCE_GAP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Fast,
    Slow,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::Fast => write!(f, "FAST"),
            ScanKind::Slow => write!(f, "SLOW"),
        }
    }
}

/// How a captured GAIA sample is turned into traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SampleMode {
    /// Forward the lines carrying a GAIA header as-is
    RawGaia,
    /// Convert every GAIA event to CEF
    RawCef,
    /// Regenerate the sample's attack as a slow GAIA scan
    ScanGaia,
    /// Regenerate the sample's attack as a slow CEF scan
    ScanCef,
    /// Regenerate the sample's attack as a fast GAIA scan
    FastGaia,
    /// Regenerate the sample's attack as a fast CEF scan
    FastCef,
}

impl SampleMode {
    /// Format and scan kind of the regenerating modes
    fn scan(&self) -> Option<(LogFormat, ScanKind)> {
        match self {
            SampleMode::RawGaia | SampleMode::RawCef => None,
            SampleMode::ScanGaia => Some((LogFormat::Gaia, ScanKind::Slow)),
            SampleMode::ScanCef => Some((LogFormat::Cef, ScanKind::Slow)),
            SampleMode::FastGaia => Some((LogFormat::Gaia, ScanKind::Fast)),
            SampleMode::FastCef => Some((LogFormat::Cef, ScanKind::Fast)),
        }
    }
}

/// Pre-generated sample files replayed by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    Fast,
    Slow,
    Normal,
}

impl Preset {
    pub fn file_name(&self, format: LogFormat) -> String {
        let preset = match self {
            Preset::Fast => "fast",
            Preset::Slow => "slow",
            Preset::Normal => "normal",
        };
        let format = match format {
            LogFormat::Gaia => "gaia",
            LogFormat::Cef => "cef",
        };
        format!("sample_{preset}_{format}.log")
    }

    /// Copy of the sample file built into the binary
    pub fn bundled(&self, format: LogFormat) -> &'static str {
        match (self, format) {
            (Preset::Fast, LogFormat::Gaia) => include_str!("../samples/sample_fast_gaia.log"),
            (Preset::Fast, LogFormat::Cef) => include_str!("../samples/sample_fast_cef.log"),
            (Preset::Slow, LogFormat::Gaia) => include_str!("../samples/sample_slow_gaia.log"),
            (Preset::Slow, LogFormat::Cef) => include_str!("../samples/sample_slow_cef.log"),
            (Preset::Normal, LogFormat::Gaia) => include_str!("../samples/sample_normal_gaia.log"),
            (Preset::Normal, LogFormat::Cef) => include_str!("../samples/sample_normal_cef.log"),
        }
    }

    pub fn default_delay(&self) -> Duration {
        match self {
            Preset::Slow => SAMPLE_DELAY,
            Preset::Fast | Preset::Normal => REPLAY_DELAY,
        }
    }
}

/// A fully described traffic scenario
#[derive(Debug, Clone)]
pub enum Scenario {
    Scan {
        kind: ScanKind,
        ports: usize,
        format: LogFormat,
        sources: Vec<SourceSpec>,
        pacing: Pacing,
    },
    Normal {
        count: usize,
        format: LogFormat,
        sources: Vec<SourceSpec>,
    },
    Replay {
        file: PathBuf,
        pacing: Pacing,
    },
    Sample {
        file: PathBuf,
        mode: SampleMode,
        pacing: Pacing,
    },
    Preset {
        preset: Preset,
        format: LogFormat,
        /// Directory of custom sample files; the bundled ones are used otherwise
        samples_dir: Option<PathBuf>,
        pacing: Pacing,
    },
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Scan {
                kind: ScanKind::Fast,
                ..
            } => "fast-scan",
            Scenario::Scan {
                kind: ScanKind::Slow,
                ..
            } => "slow-scan",
            Scenario::Normal { .. } => "normal",
            Scenario::Replay { .. } => "replay",
            Scenario::Sample { .. } => "sample",
            Scenario::Preset { .. } => "preset",
        }
    }
}

/// `n` distinct destination ports drawn from 1-65535
pub fn sample_ports(rng: &mut impl RngCore, n: usize) -> Vec<u16> {
    let n = n.min(u16::MAX as usize);
    index::sample(rng, u16::MAX as usize, n)
        .into_iter()
        .map(|i| (i + 1) as u16)
        .collect()
}

/// `count` ports drawn with replacement from [`COMMON_PORTS`]
pub fn normal_ports(rng: &mut impl RngCore, count: usize) -> Vec<u16> {
    (0..count)
        .filter_map(|_| COMMON_PORTS.choose(rng).copied())
        .collect()
}

/// Drop events from `source` to each port, in the synthesizer's format
pub fn scan_lines<R: RngCore>(synth: &mut Synthesizer<R>, source: &str, ports: &[u16]) -> Vec<String> {
    ports
        .iter()
        .map(|port| synth.line("drop", source, *port))
        .collect()
}

/// Lines of the raw sample modes: GAIA lines as-is, or converted to CEF
pub fn raw_sample_lines(lines: &[String], mode: SampleMode, envelope: &CefEnvelope) -> Vec<String> {
    match mode {
        SampleMode::RawGaia => lines.iter().filter(|l| gaia::is_event(l)).cloned().collect(),
        SampleMode::RawCef => lines
            .iter()
            .filter_map(|l| gaia::parse_line(l))
            .filter_map(|e| cef::from_parsed(&e, envelope))
            .collect(),
        _ => vec![],
    }
}

fn report(scenario: &str, source: Option<String>, outcome: Outcome) -> ScenarioReport {
    ScenarioReport {
        scenario: scenario.to_string(),
        source,
        outcome,
    }
}

/// Runs scenarios against a transport.
///
/// The runner owns the single transport of the run; every scenario goes
/// through the same [`Driver`].
pub struct Runner<T: Transport, P: Pause> {
    driver: Driver<T, P>,
    rng: Pcg32,
    envelope: CefEnvelope,
}

impl<T: Transport, P: Pause> Runner<T, P> {
    pub fn new(transport: T, pause: P, seed: Option<u64>, envelope: CefEnvelope) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        log::debug!("Seed: {seed}");
        let mut rng = Pcg32::seed_from_u64(seed);
        let driver_rng = Pcg32::seed_from_u64(rng.next_u64());
        Runner {
            driver: Driver::new(transport, pause, driver_rng),
            rng,
            envelope,
        }
    }

    pub fn into_parts(self) -> (T, P) {
        self.driver.into_parts()
    }

    fn synthesizer(&mut self, format: LogFormat) -> Synthesizer<Pcg32> {
        Synthesizer::new(
            Pcg32::seed_from_u64(self.rng.next_u64()),
            format,
            self.envelope.clone(),
        )
    }

    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<ScenarioReport>> {
        match scenario {
            Scenario::Scan {
                kind,
                ports,
                format,
                sources,
                pacing,
            } => self.for_each_source(scenario.name(), sources, |runner, source| {
                let targets = sample_ports(&mut runner.rng, *ports);
                runner.scan(*kind, &source, &targets, *format, pacing)
            }),
            Scenario::Normal {
                count,
                format,
                sources,
            } => self.for_each_source(scenario.name(), sources, |runner, source| {
                runner.normal(&source, *count, *format)
            }),
            Scenario::Replay { file, pacing } => {
                let outcome = self.replay(file, pacing)?;
                Ok(vec![report(scenario.name(), None, outcome)])
            }
            Scenario::Sample {
                file,
                mode,
                pacing,
            } => {
                let outcome = self.sample(file, *mode, pacing)?;
                Ok(vec![report(scenario.name(), None, outcome)])
            }
            Scenario::Preset {
                preset,
                format,
                samples_dir,
                pacing,
            } => {
                let outcome = match samples_dir {
                    Some(dir) => {
                        let file = dir.join(preset.file_name(*format));
                        log::info!("Preset {:?} ({format}): replaying {}", preset, file.display());
                        self.replay(&file, pacing)?
                    }
                    None => {
                        let name = preset.file_name(*format);
                        log::info!("Preset {:?} ({format}): replaying the bundled {name}", preset);
                        let lines = utils::split_lines(preset.bundled(*format));
                        self.send_lines(&lines, &name, pacing)?
                    }
                };
                Ok(vec![report(scenario.name(), None, outcome)])
            }
        }
    }

    /// Run `f` once per simulated source, sequentially, with a gap in between
    fn for_each_source<F>(
        &mut self,
        name: &str,
        sources: &[SourceSpec],
        mut f: F,
    ) -> Result<Vec<ScenarioReport>>
    where
        F: FnMut(&mut Self, String) -> Result<Outcome>,
    {
        let default = [SourceSpec::Fixed(DEFAULT_SOURCE)];
        let sources = if sources.is_empty() { &default[..] } else { sources };
        let mut reports = Vec::with_capacity(sources.len());
        for (i, spec) in sources.iter().enumerate() {
            let source = spec.resolve(&mut self.rng).to_string();
            if sources.len() > 1 {
                log::info!("[Attacker {}/{}] source {source} ({spec})", i + 1, sources.len());
            }
            let outcome = f(self, source.clone())?;
            reports.push(report(name, Some(source), outcome));
            if i + 1 < sources.len() {
                self.driver.suspend(SOURCE_GAP)?;
            }
        }
        Ok(reports)
    }

    /// Synthetic scan from `source` to each of `ports`
    pub fn scan(
        &mut self,
        kind: ScanKind,
        source: &str,
        ports: &[u16],
        format: LogFormat,
        pacing: &Pacing,
    ) -> Result<Outcome> {
        log::info!("{kind} SCAN simulation from {source} ({format})");
        log::info!(
            "Ports: {} | Delay: {:?} | Batch: {}",
            ports.len(),
            pacing.delay.mean(),
            pacing.batch_capacity
        );
        if kind == ScanKind::Slow {
            log::info!(
                "Estimated duration: ~{}",
                humantime::format_duration(pacing.estimated_duration(ports.len()))
            );
        }
        if ports.is_empty() {
            log::warn!("No port to scan");
            return Ok(Outcome::Skipped(SkipReason::EmptyInput));
        }
        let mut synth = self.synthesizer(format);
        let lines = scan_lines(&mut synth, source, ports);
        let report = self.driver.drive(&lines, pacing)?;

        let (threshold, window) = match kind {
            ScanKind::Fast => FAST_SCAN_THRESHOLD,
            ScanKind::Slow => SLOW_SCAN_THRESHOLD,
        };
        log::info!(
            "{kind} scan complete: {} logs sent in {:.1}s ({format})",
            report.lines,
            report.elapsed.as_secs_f64()
        );
        log::info!(
            "The detector should flag the scan if its threshold is below {} ports (default: {threshold} ports in {})",
            ports.len(),
            humantime::format_duration(window)
        );
        Ok(Outcome::Completed(report))
    }

    /// Drops on common ports, one per datagram with random pauses, meant to stay
    /// below the detection thresholds
    pub fn normal(&mut self, source: &str, count: usize, format: LogFormat) -> Result<Outcome> {
        log::info!("NORMAL traffic from {source} ({format}): {count} logs");
        let ports = normal_ports(&mut self.rng, count);
        if ports.is_empty() {
            log::warn!("No log to send");
            return Ok(Outcome::Skipped(SkipReason::EmptyInput));
        }
        let mut synth = self.synthesizer(format);
        let lines = scan_lines(&mut synth, source, &ports);
        let pacing = Pacing {
            batch_capacity: 1,
            delay: Delay::Uniform {
                low: NORMAL_PAUSE_LOW,
                high: NORMAL_PAUSE_HIGH,
            },
        };
        let report = self.driver.drive(&lines, &pacing)?;
        let unique = ports.iter().collect::<BTreeSet<_>>().len();
        log::info!("Normal traffic complete: {count} logs, {unique} distinct ports ({format})");
        log::info!("The detector should not raise any alert");
        Ok(Outcome::Completed(report))
    }

    /// Send the lines of a file unmodified
    pub fn replay(&mut self, file: &Path, pacing: &Pacing) -> Result<Outcome> {
        log::info!("Replaying {}", file.display());
        let lines = utils::load_lines(file)?;
        self.send_lines(&lines, &file.display().to_string(), pacing)
    }

    fn send_lines(&mut self, lines: &[String], origin: &str, pacing: &Pacing) -> Result<Outcome> {
        if lines.is_empty() {
            log::warn!("{origin} is empty, nothing to send");
            return Ok(Outcome::Skipped(SkipReason::EmptyInput));
        }
        log::info!("{} lines loaded", lines.len());
        let report = self.driver.drive(lines, pacing)?;
        log::info!("Replay complete: {} logs sent from {origin}", report.lines);
        Ok(Outcome::Completed(report))
    }

    /// Turn a captured GAIA sample into traffic
    pub fn sample(&mut self, file: &Path, mode: SampleMode, pacing: &Pacing) -> Result<Outcome> {
        let lines = utils::load_lines(file)?;
        if lines.is_empty() {
            log::warn!("{} is empty", file.display());
            return Ok(Outcome::Skipped(SkipReason::EmptyInput));
        }
        log::info!("Sample loaded: {} ({} lines), mode {:?}", file.display(), lines.len(), mode);

        let Some((format, kind)) = mode.scan() else {
            let raw = raw_sample_lines(&lines, mode, &self.envelope);
            log::info!("{} usable lines out of {}", raw.len(), lines.len());
            if raw.is_empty() {
                log::warn!("No usable line in the sample");
                return Ok(Outcome::Skipped(SkipReason::EmptyInput));
            }
            return Ok(Outcome::Completed(self.driver.drive(&raw, pacing)?));
        };

        let pacing = match (kind, pacing.delay) {
            (ScanKind::Fast, Delay::Fixed(d)) => Pacing {
                delay: Delay::Fixed(d.min(FAST_RECONSTRUCTION_DELAY_CAP)),
                ..*pacing
            },
            _ => *pacing,
        };
        let profile = match analyzer::profile(&lines, format, pacing) {
            Ok(profile) => profile,
            Err(reason) => {
                log::warn!("{reason}");
                return Ok(Outcome::Skipped(reason));
            }
        };
        log::info!(
            "Sample {kind}-SCAN from {}: {} distinct ports",
            profile.source_address,
            profile.ports.len()
        );
        self.scan(
            kind,
            &profile.source_address,
            &profile.ports,
            profile.format,
            &profile.pacing,
        )
    }
}
