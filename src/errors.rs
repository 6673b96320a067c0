use std::io;

use thiserror::Error;

/// Error type for sampler configuration, capacity, and IO failures.
#[derive(Debug, Error)]
pub enum QbankError {
    /// Invalid request or input, detected before any emission begins.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The sampler ran out of usable candidates mid-run.
    #[error("candidates exhausted: {0}")]
    Exhausted(String),
    /// Underlying file or stream failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
