/// Extraction of attack characteristics from captured GAIA samples
pub mod analyzer;
/// CEF lines, synthetic or converted from GAIA events
pub mod cef;
/// Run configuration: built-in defaults, TOML file, command line
pub mod config;
/// Batching and pacing of log lines into datagrams
pub mod driver;
pub mod error;
/// GAIA lines: synthesis and parsing
pub mod gaia;
/// Traffic scenarios and their runner
pub mod scenario;
pub mod stats;
/// Shared data types
pub mod structs;
/// Log line synthesis in either format
pub mod synth;
/// Datagram transports
pub mod transport;
pub mod utils;

pub use error::{Error, Result};
