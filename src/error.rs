use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a scenario.
///
/// Parse gaps and empty inputs are not errors: they are reported through
/// [`crate::structs::Outcome::Skipped`].
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be read or written
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The datagram socket could not be opened or a send failed
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// The user interrupted the run
    #[error("interrupted by user")]
    Cancelled,

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
