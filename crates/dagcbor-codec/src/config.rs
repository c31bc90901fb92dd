use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Sizing for a [`Transcoder`](crate::Transcoder)'s pooled state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Instances per pool. Callers beyond this many block until one frees up.
    pub workers: usize,
    /// Bytes of scratch space each decoder reads string chunks through.
    pub scratch_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            scratch_size: 4096,
        }
    }
}

impl CodecConfig {
    /// A configuration with exactly `workers` instances per pool.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }
}

/// Available parallelism plus one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        + 1
}
