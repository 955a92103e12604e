use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching the listing snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by the dedup store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Base price is not an integer: {0:?}")]
    NotAnInteger(String),

    #[error("Base price out of range: {0}")]
    OutOfRange(String),
}

/// Anything that can abort a single poll tick.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Listing source failed: {0}")]
    Source(#[from] SourceError),

    #[error("Dedup store failed: {0}")]
    Store(#[from] StoreError),
}
