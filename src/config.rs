use crate::cef;
use crate::error::{Error, Result};
use crate::structs::CefEnvelope;

use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5555;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    target: TargetToml,
    #[serde(default)]
    defaults: DefaultsToml,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct TargetToml {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct DefaultsToml {
    batch: Option<usize>,
    seed: Option<u64>,
    samples_dir: Option<PathBuf>,
    syslog_priority: Option<u8>,
    syslog_host: Option<String>,
}

/// Settings of a run, resolved from the built-in defaults, an optional TOML
/// file, and the command line, in increasing order of precedence.
///
/// ```toml
/// [target]
/// host = "10.0.0.5"
/// port = 5555
///
/// [defaults]
/// batch = 5
/// seed = 42
/// samples_dir = "tester"
/// syslog_priority = 134
/// syslog_host = "gw-checkpoint"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub host: String,
    pub port: u16,
    pub batch: Option<usize>,
    pub seed: Option<u64>,
    pub samples_dir: Option<PathBuf>,
    pub syslog_priority: u8,
    pub syslog_host: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            batch: None,
            seed: None,
            samples_dir: None,
            syslog_priority: cef::DEFAULT_SYSLOG_PRIORITY,
            syslog_host: cef::DEFAULT_SYSLOG_HOST.to_string(),
        }
    }
}

impl RunConfig {
    /// Apply the values of a TOML configuration on top of the current ones
    pub fn with_toml(mut self, config_str: &str) -> Result<Self> {
        let config: ConfigToml = toml::from_str(config_str)
            .map_err(|e| Error::Config(format!("ill-formed configuration file: {e}")))?;
        if let Some(host) = config.target.host {
            self.host = host;
        }
        if let Some(port) = config.target.port {
            self.port = port;
        }
        self.batch = config.defaults.batch.or(self.batch);
        self.seed = config.defaults.seed.or(self.seed);
        self.samples_dir = config.defaults.samples_dir.or(self.samples_dir);
        if let Some(priority) = config.defaults.syslog_priority {
            self.syslog_priority = priority;
        }
        if let Some(host) = config.defaults.syslog_host {
            self.syslog_host = host;
        }
        Ok(self)
    }

    /// Destination of the datagrams
    pub fn target(&self) -> Result<SocketAddr> {
        if self.port == 0 {
            return Err(Error::Config("the target port must be in 1-65535".into()));
        }
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("cannot resolve {}: {e}", self.host)))?
            .next()
            .ok_or_else(|| Error::Config(format!("no address for {}", self.host)))
    }

    pub fn envelope(&self, syslog: bool) -> CefEnvelope {
        if syslog {
            CefEnvelope::Syslog {
                priority: self.syslog_priority,
                host: self.syslog_host.clone(),
            }
        } else {
            CefEnvelope::Bare
        }
    }
}
