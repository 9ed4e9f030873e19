//! Buffered cursors over sorted upstream readers, ordered for a k-way merge.

use std::cmp::Ordering;

use sliceflow_common::Result;
use sliceflow_frame::{Frame, Schema, Sorter};

use crate::{context::Context, reader::Reader};

/// One chunk of an upstream reader together with a read position.
///
/// Invariant: `off <= len <= frame.len()`; rows `off..len` are still unread.
pub(crate) struct FrameBuffer {
    pub(crate) frame: Frame,
    pub(crate) off: usize,
    len: usize,
    eof: bool,
    reader: Box<dyn Reader>,
}

impl FrameBuffer {
    pub(crate) fn new(schema: &Schema, chunk_size: usize, reader: Box<dyn Reader>) -> FrameBuffer {
        FrameBuffer {
            frame: Frame::make(schema, chunk_size),
            off: 0,
            len: 0,
            eof: false,
            reader,
        }
    }

    /// Refills the buffer from its reader.
    ///
    /// Returns `false` once the reader is exhausted and no rows were produced;
    /// a final partial batch delivered together with end-of-stream is still
    /// served before that.
    pub(crate) fn fill(&mut self, ctx: &Context) -> Result<bool> {
        while !self.eof {
            ctx.check()?;
            let status = self.reader.read(ctx, &mut self.frame)?;
            self.off = 0;
            self.len = status.rows;
            self.eof = status.eof;
            if status.rows > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Moves past the current row, refilling when the chunk is consumed.
    /// Returns `false` when the buffer is permanently exhausted.
    pub(crate) fn advance(&mut self, ctx: &Context) -> Result<bool> {
        self.off += 1;
        if self.off < self.len {
            Ok(true)
        } else {
            self.fill(ctx)
        }
    }
}

/// Heap entry of the merge: a buffer positioned at its current key.
///
/// `Ord` is reversed so that a max-heap (`BinaryHeap`) yields the smallest key
/// first; equal keys are ordered by ascending upstream partition.
pub(crate) struct MergeCursor {
    pub(crate) partition: usize,
    pub(crate) buffer: FrameBuffer,
    sorter: Sorter,
}

impl MergeCursor {
    pub(crate) fn new(partition: usize, buffer: FrameBuffer, sorter: Sorter) -> MergeCursor {
        MergeCursor {
            partition,
            buffer,
            sorter,
        }
    }

    /// Compares the current keys of two cursors.
    #[inline]
    pub(crate) fn key_cmp(&self, other: &MergeCursor) -> Ordering {
        self.sorter.compare(
            &self.buffer.frame,
            self.buffer.off,
            &other.buffer.frame,
            other.buffer.off,
        )
    }
}

impl PartialEq for MergeCursor {
    fn eq(&self, other: &MergeCursor) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCursor {}

impl Ord for MergeCursor {
    #[inline]
    fn cmp(&self, other: &MergeCursor) -> Ordering {
        // BinaryHeap is a max-heap, but the least key must be on top.
        self.key_cmp(other)
            .then_with(|| self.partition.cmp(&other.partition))
            .reverse()
    }
}

impl PartialOrd for MergeCursor {
    fn partial_cmp(&self, other: &MergeCursor) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
