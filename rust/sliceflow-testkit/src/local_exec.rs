//! Single-process evaluation of slice graphs.

use std::{collections::HashMap, sync::Arc};

use sliceflow_common::{Result, error::Error, verify_arg};
use sliceflow_frame::Frame;
use sliceflow_reduce::{
    Context, SliceRef,
    config::DEFAULT_CHUNK_SIZE,
    reader::{FrameReader, Reader, read_all},
};

use crate::readers::LimitReader;

/// Evaluates slices in the current process.
///
/// Pipelined dependencies are wired shard to shard. A shuffle dependency is
/// materialized: every upstream shard is drained and split with the dependent
/// slice's hasher, and shard `i` of the dependent receives one reader per
/// upstream shard over that shard's partition `i`. Splitting preserves row
/// order, so sorted upstream shards yield sorted partitions.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    chunk_size: usize,
    read_limit: Option<usize>,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        LocalExecutor {
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_limit: None,
        }
    }
}

impl LocalExecutor {
    pub fn new() -> LocalExecutor {
        LocalExecutor::default()
    }

    /// Batch size used to drain slices.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> LocalExecutor {
        self.chunk_size = chunk_size;
        self
    }

    /// Caps the rows served per call by every shuffled reader.
    pub fn with_read_limit(mut self, max_rows: usize) -> LocalExecutor {
        self.read_limit = Some(max_rows);
        self
    }

    /// Evaluates every shard of `slice` and returns their outputs in shard
    /// order.
    pub fn run(&self, ctx: &Context, slice: &SliceRef) -> Result<Vec<Frame>> {
        verify_arg!(chunk_size, self.chunk_size > 0);
        Evaluation {
            executor: self,
            shuffled: HashMap::new(),
        }
        .run(ctx, slice)
    }

    /// Evaluates `slice` and concatenates the outputs of all shards.
    pub fn collect(&self, ctx: &Context, slice: &SliceRef) -> Result<Frame> {
        let shards = self.run(ctx, slice)?;
        let mut all = Frame::make(slice.schema(), 0);
        for shard in shards {
            let start = all.len();
            all.resize(start + shard.len());
            all.copy_rows(start, &shard, 0..shard.len());
        }
        Ok(all)
    }
}

/// Partitions of a shuffled slice, indexed by upstream shard, then partition.
struct Shuffled {
    _slice: SliceRef,
    partitions: Vec<Vec<Frame>>,
}

struct Evaluation<'a> {
    executor: &'a LocalExecutor,
    shuffled: HashMap<*const (), Shuffled>,
}

impl Evaluation<'_> {
    fn run(&mut self, ctx: &Context, slice: &SliceRef) -> Result<Vec<Frame>> {
        (0..slice.num_shard())
            .map(|shard| {
                let mut reader = self.open(ctx, slice, shard)?;
                read_all(ctx, &mut reader, slice.schema(), self.executor.chunk_size)
            })
            .collect()
    }

    fn open(&mut self, ctx: &Context, slice: &SliceRef, shard: usize) -> Result<Box<dyn Reader>> {
        let mut deps: Vec<Box<dyn Reader>> = Vec::new();
        for index in 0..slice.num_dep() {
            let dep = slice.dep(index);
            if !dep.shuffle {
                deps.push(self.open(ctx, &dep.slice, shard)?);
                continue;
            }
            let key = Arc::as_ptr(&dep.slice) as *const ();
            if !self.shuffled.contains_key(&key) {
                let shuffled = self.shuffle(ctx, slice, &dep.slice)?;
                self.shuffled.insert(key, shuffled);
            }
            for partitions in &self.shuffled[&key].partitions {
                let reader = FrameReader::new(partitions[shard].clone());
                let reader: Box<dyn Reader> = match self.executor.read_limit {
                    Some(max_rows) => Box::new(LimitReader::new(reader, max_rows)),
                    None => Box::new(reader),
                };
                deps.push(reader);
            }
        }
        Ok(slice.reader(shard, deps))
    }

    fn shuffle(&mut self, ctx: &Context, consumer: &SliceRef, upstream: &SliceRef) -> Result<Shuffled> {
        let hasher = consumer.hasher().ok_or_else(|| {
            Error::invalid_operation(format!(
                "{} declares a shuffle dependency but no hasher",
                consumer.op()
            ))
        })?;
        let outputs = self.run(ctx, upstream)?;
        log::debug!(
            "shuffling {} shards of {} into {} partitions",
            outputs.len(),
            upstream.op(),
            consumer.num_shard()
        );
        let partitions = outputs
            .iter()
            .map(|frame| hasher.split(frame, consumer.num_shard()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Shuffled {
            _slice: upstream.clone(),
            partitions,
        })
    }
}
