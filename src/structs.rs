use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// The two log formats understood by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Check Point GAIA syslog lines
    Gaia,
    /// Common Event Format
    Cef,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Gaia => write!(f, "GAIA"),
            LogFormat::Cef => write!(f, "CEF"),
        }
    }
}

/// Optional syslog header put in front of CEF lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CefEnvelope {
    #[default]
    Bare,
    Syslog { priority: u8, host: String },
}

/// One firewall event about to be written as a log line
#[derive(Debug, Clone)]
pub struct SyntheticEvent<'a> {
    pub action: &'a str,
    pub source_address: &'a str,
    pub destination_port: u16,
    pub source_port: u16,
    pub rule_id: u32,
    /// Seconds field of the synthetic timestamps
    pub second: u8,
}

/// Fields extracted from a GAIA line. Any extension may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedEvent {
    pub action: String,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub proto: Option<String>,
    pub service: Option<String>,
    pub rule: Option<String>,
}

/// Attack characteristics recovered from a captured sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProfile {
    pub source_address: String,
    /// Distinct destination ports, ascending
    pub ports: Vec<u16>,
    pub format: LogFormat,
    pub pacing: Pacing,
}

/// Time spent suspended between two datagrams
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Delay {
    Fixed(Duration),
    /// Drawn uniformly in `[low, high]` before each suspension
    Uniform { low: Duration, high: Duration },
}

impl Delay {
    pub fn from_secs_f64(secs: f64) -> crate::Result<Self> {
        if !secs.is_finite() || secs < 0. {
            return Err(crate::Error::Config(format!(
                "delay must be a non-negative number of seconds, got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map(Delay::Fixed)
            .map_err(|e| crate::Error::Config(format!("delay of {secs} s is out of range: {e}")))
    }

    /// Mean suspension, used for duration estimates
    pub fn mean(&self) -> Duration {
        match self {
            Delay::Fixed(d) => *d,
            Delay::Uniform { low, high } => (*low + *high) / 2,
        }
    }
}

/// Batching and pacing parameters of the traffic driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pacing {
    pub batch_capacity: usize,
    pub delay: Delay,
}

impl Pacing {
    pub fn new(batch_capacity: usize, delay: Delay) -> crate::Result<Self> {
        if batch_capacity == 0 {
            return Err(crate::Error::Config(
                "batch capacity must be at least 1".to_string(),
            ));
        }
        Ok(Pacing {
            batch_capacity,
            delay,
        })
    }

    /// Number of datagrams needed for `line_count` lines
    pub fn datagram_count(&self, line_count: usize) -> usize {
        line_count.div_ceil(self.batch_capacity)
    }

    /// Expected time spent suspended; there is no suspension after the last datagram
    pub fn estimated_duration(&self, line_count: usize) -> Duration {
        let pauses = self.datagram_count(line_count).saturating_sub(1);
        u32::try_from(pauses)
            .ok()
            .and_then(|n| self.delay.mean().checked_mul(n))
            .unwrap_or(Duration::MAX)
    }
}

/// What the driver did for one line sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriveReport {
    pub datagrams: u64,
    pub lines: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Why a scenario ended without sending anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No usable line after loading or filtering
    EmptyInput,
    /// The sample held no drop event with a source and a service
    NoDropEvents,
    /// The drop events held no numeric destination port
    NoNumericPorts,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyInput => write!(f, "nothing to send"),
            SkipReason::NoDropEvents => write!(f, "no valid drop event found in the sample"),
            SkipReason::NoNumericPorts => write!(f, "no numeric destination port in the drop events"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Completed(DriveReport),
    Skipped(SkipReason),
}

/// Summary of one scenario run, for one simulated source when several are used
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub source: Option<String>,
    pub outcome: Outcome,
}
