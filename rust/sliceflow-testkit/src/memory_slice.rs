//! In-memory source slices.

use sliceflow_common::{Result, error::Error, verify_arg};
use sliceflow_frame::{ColumnValue, Frame, Schema};
use sliceflow_reduce::{
    Dep, Slice,
    reader::{FrameReader, Reader},
};

use crate::readers::{CancelAfter, FailingReader, LimitReader};

/// A source slice whose shards are fixed frames.
///
/// Shards can be made to produce small batches ([`MemorySlice::with_read_limit`]),
/// to fail after their rows ([`MemorySlice::with_failure`]) or to cancel the
/// context mid-stream ([`MemorySlice::with_cancel_after`]).
pub struct MemorySlice {
    schema: Schema,
    shards: Vec<Frame>,
    failures: Vec<Option<Error>>,
    cancellations: Vec<Option<usize>>,
    read_limit: Option<usize>,
}

impl MemorySlice {
    /// Creates a slice with one shard per frame. All frames must share a
    /// schema.
    pub fn new(shards: Vec<Frame>) -> Result<MemorySlice> {
        verify_arg!(shards, !shards.is_empty());
        let schema = shards[0].schema().clone();
        if let Some(other) = shards.iter().find(|frame| *frame.schema() != schema) {
            return Err(Error::invalid_arg(
                "shards",
                format!("mixed schemas {schema} and {}", other.schema()),
            ));
        }
        Ok(MemorySlice {
            schema,
            failures: vec![None; shards.len()],
            cancellations: vec![None; shards.len()],
            shards,
            read_limit: None,
        })
    }

    /// Distributes `pairs` over `num_shards` shards round-robin.
    pub fn from_pairs<K, V>(num_shards: usize, pairs: Vec<(K, V)>) -> MemorySlice
    where
        K: ColumnValue,
        V: ColumnValue,
    {
        assert_ne!(num_shards, 0);
        let mut buckets = (0..num_shards).map(|_| Vec::new()).collect::<Vec<_>>();
        for (i, pair) in pairs.into_iter().enumerate() {
            buckets[i % num_shards].push(pair);
        }
        let shards = buckets
            .into_iter()
            .map(|rows| Frame::from_pairs(rows))
            .collect::<Vec<_>>();
        MemorySlice {
            schema: Schema::pair::<K, V>(),
            failures: vec![None; shards.len()],
            cancellations: vec![None; shards.len()],
            shards,
            read_limit: None,
        }
    }

    /// Readers of this slice produce at most `max_rows` rows per call.
    pub fn with_read_limit(mut self, max_rows: usize) -> MemorySlice {
        self.read_limit = Some(max_rows);
        self
    }

    /// The reader of `shard` fails with `failure` after producing its rows.
    pub fn with_failure(mut self, shard: usize, failure: Error) -> MemorySlice {
        self.failures[shard] = Some(failure);
        self
    }

    /// The reader of `shard` cancels the context it is read with once it has
    /// served `reads` calls.
    pub fn with_cancel_after(mut self, shard: usize, reads: usize) -> MemorySlice {
        self.cancellations[shard] = Some(reads);
        self
    }

    pub fn shard(&self, shard: usize) -> &Frame {
        &self.shards[shard]
    }
}

impl Slice for MemorySlice {
    fn op(&self) -> &str {
        "const"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn num_shard(&self) -> usize {
        self.shards.len()
    }

    fn num_dep(&self) -> usize {
        0
    }

    fn dep(&self, index: usize) -> Dep {
        panic!("const slice has no dependency {index}")
    }

    fn reader(&self, shard: usize, deps: Vec<Box<dyn Reader>>) -> Box<dyn Reader> {
        assert!(deps.is_empty());
        let mut reader: Box<dyn Reader> = Box::new(FrameReader::new(self.shards[shard].clone()));
        if let Some(max_rows) = self.read_limit {
            reader = Box::new(LimitReader::new(reader, max_rows));
        }
        if let Some(failure) = &self.failures[shard] {
            reader = Box::new(FailingReader::new(reader, failure.clone()));
        }
        if let Some(reads) = self.cancellations[shard] {
            reader = Box::new(CancelAfter::new(reader, reads));
        }
        reader
    }
}
