//! Configuration errors.
//!
//! Runtime contention is not an error (admission reports it as `false`), and
//! contract violations panic, so configuration is the only fallible surface.

use crate::actor::Species;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("pool layout has no pools")]
    NoPools,

    #[error("pool {index} has zero slots")]
    ZeroSlots { index: usize },

    #[error("invalid random layout: {0}")]
    InvalidRange(String),

    #[error("{species} {field} must be a positive, representable number of seconds, got {value}")]
    InvalidMean {
        species: Species,
        field: &'static str,
        value: f64,
    },
}
