//! Tunables of the combine and reduce operators.

use sliceflow_common::{Result, verify_arg};
use sliceflow_frame::hasher::DEFAULT_PARTITION_SEED;

/// Capacity of every internal chunk buffer (upstream pulls in the combiner,
/// per-partition buffers in the merger).
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Seed of the combining index hash. Distinct from the partitioning seed so that
/// keys colliding in one structure are not biased to collide in the other.
pub const COMBINE_HASH_SEED: u32 = 0x436f_6d62; // "Comb" in hex

/// Configuration of a [`reduce`](crate::reduce::reduce) pipeline.
#[derive(Debug, Clone)]
pub struct ReduceConfig {
    /// Number of rows pulled from an upstream reader per call.
    pub chunk_size: usize,
    /// Seed of the hash used by the map-side combining index.
    pub combine_hash_seed: u32,
    /// Seed of the hash used to route keys to shuffle partitions.
    pub partition_hash_seed: u32,
    /// Upper bound on the number of distinct keys one combiner may hold.
    /// `None` means the working set is bounded by available memory only.
    pub max_combined_keys: Option<usize>,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            combine_hash_seed: COMBINE_HASH_SEED,
            partition_hash_seed: DEFAULT_PARTITION_SEED,
            max_combined_keys: None,
        }
    }
}

impl ReduceConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_combined_keys(mut self, max_keys: usize) -> Self {
        self.max_combined_keys = Some(max_keys);
        self
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        verify_arg!(chunk_size, self.chunk_size > 0);
        verify_arg!(
            max_combined_keys,
            self.max_combined_keys.is_none_or(|max| max > 0)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ReduceConfig::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_ne!(config.combine_hash_seed, config.partition_hash_seed);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid() {
        assert!(ReduceConfig::default().with_chunk_size(0).validate().is_err());
        assert!(
            ReduceConfig::default()
                .with_max_combined_keys(0)
                .validate()
                .is_err()
        );
        ReduceConfig::default()
            .with_chunk_size(1)
            .with_max_combined_keys(1)
            .validate()
            .unwrap();
    }
}
