//! The reduce operator: post-shuffle k-way merge of combined partitions.
//!
//! [`reduce`] expands into two slices. A [`CombineSlice`] pre-aggregates every
//! input shard and emits its keys in ascending order; the shuffle routes each
//! key to one reduce shard by [`Slice::hasher`]; every reduce shard then merges
//! the sorted streams it receives (one per upstream shard) and folds values of
//! equal keys with the reduce function.

use std::{
    collections::{BinaryHeap, binary_heap::PeekMut},
    sync::Arc,
};

use sliceflow_common::{Result, error::Error, verify_type};
use sliceflow_frame::{Frame, FrameHasher, Schema, Sorter, registry};

use crate::{
    combine::CombineSlice,
    combining_frame::{KEY_COLUMN, VALUE_COLUMN},
    config::ReduceConfig,
    context::Context,
    merge::{FrameBuffer, MergeCursor},
    reader::{ReadStatus, Reader},
    reducer::Reducer,
    slice::{Dep, Slice, SliceRef},
};

/// Returns a slice that reduces `slice`'s `(key, value)` rows by key with the
/// default configuration.
///
/// The output holds exactly one row per distinct key: the fold of all values
/// of that key under `reducer`. Within each output shard rows are sorted by
/// key. `reducer` must be commutative and associative.
///
/// Fails with a type error unless `slice` has exactly two columns, the key type
/// has registered ops and `reducer` operates on the value type.
pub fn reduce(slice: SliceRef, reducer: Arc<dyn Reducer>) -> Result<SliceRef> {
    reduce_with_config(slice, reducer, ReduceConfig::default())
}

/// Like [`reduce`], with explicit tunables.
pub fn reduce_with_config(
    slice: SliceRef,
    reducer: Arc<dyn Reducer>,
    config: ReduceConfig,
) -> Result<SliceRef> {
    config.validate()?;
    let schema = slice.schema().clone();
    verify_type!(
        schema.len() == 2,
        "reduce expects (key, value) columns, got {schema}"
    );
    let value_type = schema.column(VALUE_COLUMN);
    verify_type!(
        reducer.value_type() == value_type,
        "reduce function must be of type fn({value_type}, {value_type}) -> {value_type}, not fn({r}, {r}) -> {r}",
        r = reducer.value_type()
    );
    let key_type = schema.column(KEY_COLUMN);
    let key_ops = registry::lookup(key_type).ok_or_else(|| {
        Error::type_mismatch(format!(
            "key type {key_type} cannot be combined: it is not ordered and hashable"
        ))
    })?;

    let combined: SliceRef = Arc::new(CombineSlice::new(
        slice,
        key_ops.clone(),
        reducer.clone(),
        config.clone(),
    ));
    Ok(Arc::new(ReduceSlice {
        input: combined,
        schema,
        sorter: Sorter::new(KEY_COLUMN, key_ops.clone()),
        hasher: FrameHasher::new(KEY_COLUMN, config.partition_hash_seed, key_ops),
        reducer,
        config,
    }))
}

/// Slice merging the shuffled, sorted output of a [`CombineSlice`].
pub struct ReduceSlice {
    input: SliceRef,
    schema: Schema,
    sorter: Sorter,
    hasher: FrameHasher,
    reducer: Arc<dyn Reducer>,
    config: ReduceConfig,
}

impl Slice for ReduceSlice {
    fn op(&self) -> &str {
        "reduce"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn num_shard(&self) -> usize {
        self.input.num_shard()
    }

    fn num_dep(&self) -> usize {
        1
    }

    fn dep(&self, _index: usize) -> Dep {
        Dep::shuffled_sorted(self.input.clone())
    }

    fn hasher(&self) -> Option<FrameHasher> {
        Some(self.hasher.clone())
    }

    fn reader(&self, shard: usize, deps: Vec<Box<dyn Reader>>) -> Box<dyn Reader> {
        Box::new(ReduceReader::new(
            shard,
            self.schema.clone(),
            self.sorter.clone(),
            self.reducer.clone(),
            self.config.chunk_size,
            deps,
        ))
    }
}

enum ReduceState {
    /// Upstream buffers have not been filled yet.
    Pending(Vec<Box<dyn Reader>>),
    /// The heap holds every partition that still has rows.
    Merging,
    /// Every partition is drained.
    Exhausted,
    /// A fatal error was observed; it is returned on every pull.
    Failed(Error),
}

/// Reader of one shard of a [`ReduceSlice`].
///
/// Each upstream reader must yield rows in ascending key order with at most one
/// row per key. The reader keeps one chunk buffer per upstream partition and a
/// min-heap of those buffers keyed by their current row. Every output row gathers
/// all buffers positioned at the least key, folds their values from the lowest
/// partition index upwards and advances them.
pub struct ReduceReader {
    shard: usize,
    schema: Schema,
    sorter: Sorter,
    reducer: Arc<dyn Reducer>,
    chunk_size: usize,
    heap: BinaryHeap<MergeCursor>,
    /// Scratch space for the cursors sharing the current key.
    group: Vec<MergeCursor>,
    state: ReduceState,
    rows_out: usize,
}

impl ReduceReader {
    pub fn new(
        shard: usize,
        schema: Schema,
        sorter: Sorter,
        reducer: Arc<dyn Reducer>,
        chunk_size: usize,
        deps: Vec<Box<dyn Reader>>,
    ) -> ReduceReader {
        ReduceReader {
            shard,
            schema,
            sorter,
            reducer,
            chunk_size,
            heap: BinaryHeap::with_capacity(deps.len()),
            group: Vec::new(),
            state: ReduceState::Pending(deps),
            rows_out: 0,
        }
    }

    /// Fills one buffer per upstream partition and heaps the non-empty ones.
    fn init(&mut self, ctx: &Context, deps: Vec<Box<dyn Reader>>) -> Result<()> {
        let num_partitions = deps.len();
        for (partition, reader) in deps.into_iter().enumerate() {
            let mut buffer = FrameBuffer::new(&self.schema, self.chunk_size, reader);
            if buffer.fill(ctx)? {
                self.heap
                    .push(MergeCursor::new(partition, buffer, self.sorter.clone()));
            }
        }
        log::debug!(
            "reduce shard {}: merging {} of {} partitions",
            self.shard,
            self.heap.len(),
            num_partitions
        );
        Ok(())
    }

    /// Writes up to `out.len()` merged rows to `out`.
    fn merge(&mut self, ctx: &Context, out: &mut Frame) -> Result<usize> {
        let mut n = 0;
        while n < out.len() {
            let Some(first) = self.heap.pop() else {
                break;
            };
            self.group.push(first);
            while let Some(top) = self.heap.peek_mut() {
                if self.group[0].key_cmp(&top).is_lt() {
                    break;
                }
                self.group.push(PeekMut::pop(top));
            }

            let head = &self.group[0].buffer;
            out.set_row_from(n, &head.frame, head.off);
            for cursor in &self.group[1..] {
                self.reducer.reduce_into(
                    out.column_mut(VALUE_COLUMN),
                    n,
                    cursor.buffer.frame.column(VALUE_COLUMN),
                    cursor.buffer.off,
                );
            }
            n += 1;

            let mut failure = None;
            for mut cursor in self.group.drain(..) {
                match cursor.buffer.advance(ctx) {
                    Ok(true) => self.heap.push(cursor),
                    Ok(false) => {}
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
            if let Some(err) = failure {
                return Err(err);
            }
        }
        Ok(n)
    }

    fn fail(&mut self, err: Error) -> Error {
        log::warn!("reduce shard {} failed: {err}", self.shard);
        self.heap.clear();
        self.group.clear();
        self.state = ReduceState::Failed(err.clone());
        err
    }
}

impl Reader for ReduceReader {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        match &mut self.state {
            ReduceState::Failed(err) => return Err(err.clone()),
            ReduceState::Exhausted => return Ok(ReadStatus::eof(0)),
            ReduceState::Merging => {}
            ReduceState::Pending(deps) => {
                let deps = std::mem::take(deps);
                self.state = ReduceState::Merging;
                if let Err(err) = self.init(ctx, deps) {
                    return Err(self.fail(err));
                }
            }
        }
        if let Err(err) = ctx.check() {
            return Err(self.fail(err));
        }

        let rows = match self.merge(ctx, out) {
            Ok(rows) => rows,
            Err(err) => return Err(self.fail(err)),
        };
        self.rows_out += rows;
        log::trace!("reduce shard {}: emitted {} rows", self.shard, rows);
        if self.heap.is_empty() {
            log::debug!(
                "reduce shard {}: exhausted after {} rows",
                self.shard,
                self.rows_out
            );
            self.state = ReduceState::Exhausted;
            Ok(ReadStatus::eof(rows))
        } else {
            Ok(ReadStatus::more(rows))
        }
    }
}
