//! Map-side combining.
//!
//! The combine operator drains its single upstream reader into a
//! [`CombiningFrame`], sorts the aggregated rows by key and then serves them as a
//! plain sequential stream. Its output therefore holds at most one row per key,
//! ascending, which is exactly what the post-shuffle merge expects from each of
//! its inputs.

use std::sync::Arc;

use sliceflow_common::{Result, error::Error};
use sliceflow_frame::{Frame, Ops, Schema, Sorter};

use crate::{
    combining_frame::{CombiningFrame, KEY_COLUMN},
    config::ReduceConfig,
    context::Context,
    reader::{FrameReader, ReadStatus, Reader},
    reducer::Reducer,
    slice::{Dep, Slice, SliceRef},
};

/// Slice performing map-side combining of its input, shard by shard.
pub struct CombineSlice {
    input: SliceRef,
    key_ops: Arc<dyn Ops>,
    reducer: Arc<dyn Reducer>,
    config: ReduceConfig,
}

impl CombineSlice {
    /// The caller is responsible for validating `input`'s schema against
    /// `key_ops` and `reducer` (see [`reduce`](crate::reduce::reduce)).
    pub(crate) fn new(
        input: SliceRef,
        key_ops: Arc<dyn Ops>,
        reducer: Arc<dyn Reducer>,
        config: ReduceConfig,
    ) -> Self {
        CombineSlice {
            input,
            key_ops,
            reducer,
            config,
        }
    }
}

impl Slice for CombineSlice {
    fn op(&self) -> &str {
        "combine"
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn num_shard(&self) -> usize {
        self.input.num_shard()
    }

    fn num_dep(&self) -> usize {
        1
    }

    fn dep(&self, _index: usize) -> Dep {
        Dep::pipelined(self.input.clone())
    }

    fn reader(&self, shard: usize, mut deps: Vec<Box<dyn Reader>>) -> Box<dyn Reader> {
        assert_eq!(deps.len(), 1, "combine expects a single dependency reader");
        let upstream = deps.remove(0);
        Box::new(CombineReader::new(
            shard,
            self.schema().clone(),
            self.key_ops.clone(),
            self.reducer.clone(),
            self.config.clone(),
            upstream,
        ))
    }
}

enum CombineState {
    /// Nothing has been pulled from upstream yet.
    Pending,
    /// Upstream is drained; serving the sorted, combined rows.
    Serving(FrameReader),
    /// Every combined row has been served.
    Exhausted,
    /// A fatal error was observed; it is returned on every pull.
    Failed(Error),
}

/// Reader of one shard of a [`CombineSlice`].
pub struct CombineReader {
    shard: usize,
    schema: Schema,
    key_ops: Arc<dyn Ops>,
    reducer: Arc<dyn Reducer>,
    config: ReduceConfig,
    upstream: Box<dyn Reader>,
    state: CombineState,
}

impl CombineReader {
    pub fn new(
        shard: usize,
        schema: Schema,
        key_ops: Arc<dyn Ops>,
        reducer: Arc<dyn Reducer>,
        config: ReduceConfig,
        upstream: Box<dyn Reader>,
    ) -> CombineReader {
        CombineReader {
            shard,
            schema,
            key_ops,
            reducer,
            config,
            upstream,
            state: CombineState::Pending,
        }
    }

    /// Drains upstream and returns the combined rows sorted by key.
    fn compute(&mut self, ctx: &Context) -> Result<Frame> {
        let mut comb = CombiningFrame::new(
            &self.schema,
            self.key_ops.clone(),
            self.reducer.clone(),
            self.config.combine_hash_seed,
        )
        .with_max_keys(self.config.max_combined_keys);
        let mut chunk = Frame::make(&self.schema, self.config.chunk_size);
        let mut input_rows = 0;
        loop {
            ctx.check()?;
            let status = self.upstream.read(ctx, &mut chunk)?;
            comb.combine_rows(&chunk, 0..status.rows)?;
            input_rows += status.rows;
            if status.eof {
                break;
            }
        }
        let mut frame = comb.into_frame();
        Sorter::new(KEY_COLUMN, self.key_ops.clone()).sort(&mut frame);
        log::debug!(
            "combine shard {}: {} input rows combined into {} keys",
            self.shard,
            input_rows,
            frame.len()
        );
        Ok(frame)
    }
}

impl Reader for CombineReader {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        if let CombineState::Pending = self.state {
            self.state = match self.compute(ctx) {
                Ok(frame) => CombineState::Serving(FrameReader::new(frame)),
                Err(err) => {
                    log::warn!("combine shard {} failed: {err}", self.shard);
                    CombineState::Failed(err)
                }
            };
        }
        let result = match &mut self.state {
            CombineState::Serving(reader) => reader.read(ctx, out),
            CombineState::Exhausted => return Ok(ReadStatus::eof(0)),
            CombineState::Failed(err) => return Err(err.clone()),
            CombineState::Pending => unreachable!("combine state is resolved above"),
        };
        match &result {
            Ok(status) if status.eof => self.state = CombineState::Exhausted,
            Ok(_) => {}
            Err(err) => {
                log::warn!("combine shard {} failed: {err}", self.shard);
                self.state = CombineState::Failed(err.clone());
            }
        }
        result
    }
}
