use crate::error::{Error, Result};

use pnet::ipnetwork::Ipv4Network;
use rand::Rng;
use rand_core::RngCore;
use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;

/// Load the non-blank lines of a log file, without their line terminators
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(split_lines(&content))
}

/// Non-blank lines of a text, without their line terminators
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim_end_matches(['\r', '\n']).to_string())
        .collect()
}

/// How the simulated attacker address is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Fixed(Ipv4Addr),
    /// A random host of the block, network and broadcast addresses excluded
    RandomIn(Ipv4Network),
}

impl SourceSpec {
    pub const CLASS_A: &'static str = "10.0.0.0/8";
    pub const CLASS_B: &'static str = "172.16.0.0/12";
    pub const CLASS_C: &'static str = "192.168.0.0/16";

    pub fn resolve(&self, rng: &mut impl RngCore) -> Ipv4Addr {
        match self {
            SourceSpec::Fixed(ip) => *ip,
            SourceSpec::RandomIn(net) => {
                let first = u32::from(net.network()) + 1;
                let last = u32::from(net.broadcast()) - 1;
                Ipv4Addr::from(rng.gen_range(first..=last))
            }
        }
    }
}

impl FromStr for SourceSpec {
    type Err = Error;

    /// Accepts an address, a CIDR block, or `class-a`, `class-b`, `class-c`
    fn from_str(s: &str) -> Result<Self> {
        let block = match s.to_ascii_lowercase().as_str() {
            "class-a" => Self::CLASS_A,
            "class-b" => Self::CLASS_B,
            "class-c" => Self::CLASS_C,
            _ if s.contains('/') => s,
            _ => {
                return s
                    .parse()
                    .map(SourceSpec::Fixed)
                    .map_err(|_| Error::Config(format!("invalid IPv4 address: {s}")))
            }
        };
        let net: Ipv4Network = block
            .parse()
            .map_err(|_| Error::Config(format!("invalid CIDR block: {s}")))?;
        // /31 and /32 have no host address once network and broadcast are excluded
        if net.prefix() > 30 {
            return Err(Error::Config(format!(
                "block {s} is too small (less than 2 usable addresses)"
            )));
        }
        Ok(SourceSpec::RandomIn(net))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Fixed(ip) => write!(f, "{ip}"),
            SourceSpec::RandomIn(net) => write!(f, "random in {net}"),
        }
    }
}
