//! Error types for the simulation harness.

use scintrack_core::ConfigError;
use thiserror::Error;

/// Errors raised while setting up or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Detector, tracking or optics configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread panicked while processing events
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
