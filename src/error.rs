// Error types for counter reads, the SMC channel, and runtime settings

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single raw counter read. Monitors never propagate these; they
/// map them to last-known-good values or empty defaults.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("{0} is not available on this platform")]
    Unsupported(&'static str),
}

impl ReadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        ReadError::Parse {
            what,
            detail: detail.into(),
        }
    }
}

/// Errors from the vendor hardware-monitor (SMC) channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmcError {
    #[error("SMC key {0} not found")]
    KeyNotFound(String),

    #[error("{0:?} is not a four-character ASCII key")]
    InvalidKey(String),

    #[error("SMC call for key {key} failed with kernel status {status:#x}")]
    Kernel { key: String, status: i32 },

    #[error("SMC rejected key {key} with result code {code}")]
    Rejected { key: String, code: u8 },

    #[error("SMC payload for {key} is {len} bytes, limit is 32")]
    PayloadTooLarge { key: String, len: usize },

    #[error("SMC connection is closed")]
    Closed,
}

/// Errors surfaced by the monitor's public mutators.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{name} must be > 0")]
    InvalidSetting { name: &'static str },

    #[error("fan control is not available (no SMC access or insufficient privilege)")]
    FanControlUnavailable,

    #[error("fan {index} does not exist (fan count {count})")]
    NoSuchFan { index: usize, count: usize },

    #[error("fan control write failed: {0}")]
    Smc(#[from] SmcError),
}
