//! Key hashing used to route rows to shuffle partitions.

use std::sync::Arc;

use sliceflow_common::{Result, verify_arg};

use crate::{frame::Frame, ops::Ops, registry, schema::Schema};

/// Seed used for partitioning hashes unless configured otherwise.
pub const DEFAULT_PARTITION_SEED: u32 = 0;

/// Hashes the key column of frames to assign rows to partitions.
///
/// Rows with equal keys always land in the same partition for a given seed and
/// partition count; this is what lets a post-shuffle reducer see every value of
/// a key.
#[derive(Clone)]
pub struct FrameHasher {
    column: usize,
    seed: u32,
    ops: Arc<dyn Ops>,
}

impl FrameHasher {
    pub fn new(column: usize, seed: u32, ops: Arc<dyn Ops>) -> FrameHasher {
        FrameHasher { column, seed, ops }
    }

    /// Resolves the ops of column `column` of `schema` from the registry.
    ///
    /// Fails with a type error if the column type is not partitionable.
    pub fn for_schema(schema: &Schema, column: usize, seed: u32) -> Result<FrameHasher> {
        verify_arg!(column, column < schema.len());
        let ops = registry::get(schema.column(column))?;
        Ok(FrameHasher::new(column, seed, ops))
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    #[inline]
    pub fn hash_row(&self, frame: &Frame, row: usize) -> u32 {
        self.ops
            .hash_with_seed(frame.column(self.column), row, self.seed)
    }

    /// Hashes every row of `frame` into `hashes`.
    pub fn hash_frame(&self, frame: &Frame, hashes: &mut Vec<u32>) {
        hashes.clear();
        hashes.extend((0..frame.len()).map(|row| self.hash_row(frame, row)));
    }

    /// Returns the partition, in `0..num_partitions`, that row `row` belongs to.
    #[inline]
    pub fn partition_of(&self, frame: &Frame, row: usize, num_partitions: usize) -> usize {
        debug_assert!(num_partitions > 0);
        self.hash_row(frame, row) as usize % num_partitions
    }

    /// Splits `frame` into `num_partitions` frames, preserving the relative
    /// order of rows within each partition.
    pub fn split(&self, frame: &Frame, num_partitions: usize) -> Result<Vec<Frame>> {
        verify_arg!(num_partitions, num_partitions > 0);
        let mut rows = vec![Vec::new(); num_partitions];
        for row in 0..frame.len() {
            rows[self.partition_of(frame, row, num_partitions)].push(row);
        }
        Ok(rows.iter().map(|indices| frame.take(indices)).collect())
    }
}
