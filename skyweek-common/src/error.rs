//! Error type shared by skyweek crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Bootstrap failures: configuration, logging setup and local files
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing, unreadable or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
