//! The pull protocol shared by all operators.

use sliceflow_common::Result;
use sliceflow_frame::{Frame, Schema};

use crate::context::Context;

/// Outcome of a successful [`Reader::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStatus {
    /// Number of rows written to the front of the output frame.
    pub rows: usize,
    /// Set when the stream is exhausted. A call may produce a final partial
    /// batch and report end-of-stream at the same time.
    pub eof: bool,
}

impl ReadStatus {
    /// `rows` were produced; more data may follow.
    pub fn more(rows: usize) -> ReadStatus {
        ReadStatus { rows, eof: false }
    }

    /// `rows` were produced and the stream is exhausted.
    pub fn eof(rows: usize) -> ReadStatus {
        ReadStatus { rows, eof: true }
    }
}

/// A pull-based stream of frames.
///
/// Each call writes up to `out.len()` rows to the front of `out`. An `Err` is
/// fatal and non-retryable; end-of-stream is not an error but a flag on the
/// returned [`ReadStatus`]. Once a reader has reported end-of-stream, every
/// subsequent call reports end-of-stream with zero rows.
///
/// The caller owns `out`; the reader must not retain it across calls.
pub trait Reader: Send {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        (**self).read(ctx, out)
    }
}

/// Reads an owned frame sequentially.
pub struct FrameReader {
    frame: Frame,
    off: usize,
}

impl FrameReader {
    pub fn new(frame: Frame) -> FrameReader {
        FrameReader { frame, off: 0 }
    }

    /// Rows not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frame.len() - self.off
    }
}

impl Reader for FrameReader {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        if self.remaining() == 0 {
            return Ok(ReadStatus::eof(0));
        }
        ctx.check()?;
        let n = self.remaining().min(out.len());
        out.copy_rows(0, &self.frame, self.off..self.off + n);
        self.off += n;
        if self.off == self.frame.len() {
            Ok(ReadStatus::eof(n))
        } else {
            Ok(ReadStatus::more(n))
        }
    }
}

/// A reader that is exhausted from the start.
#[derive(Debug, Default)]
pub struct EmptyReader;

impl Reader for EmptyReader {
    fn read(&mut self, _ctx: &Context, _out: &mut Frame) -> Result<ReadStatus> {
        Ok(ReadStatus::eof(0))
    }
}

/// Drains `reader` into a single frame of the given schema, pulling
/// `chunk_size` rows at a time.
pub fn read_all(
    ctx: &Context,
    reader: &mut dyn Reader,
    schema: &Schema,
    chunk_size: usize,
) -> Result<Frame> {
    sliceflow_common::verify_arg!(chunk_size, chunk_size > 0);
    let mut chunk = Frame::make(schema, chunk_size);
    let mut result = Frame::make(schema, 0);
    loop {
        let status = reader.read(ctx, &mut chunk)?;
        let start = result.len();
        result.resize(start + status.rows);
        result.copy_rows(start, &chunk, 0..status.rows);
        if status.eof {
            return Ok(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_reader_batches() {
        let ctx = Context::new();
        let mut reader = FrameReader::new(Frame::from_pairs((0..5u32).map(|k| (k, k * 10))));
        let mut out = Frame::make(&Schema::pair::<u32, u32>(), 2);

        assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::more(2));
        assert_eq!(out.to_pairs::<u32, u32>(), vec![(0, 0), (1, 10)]);
        assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::more(2));
        assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::eof(1));
        assert_eq!(out.values::<u32>(0)[0], 4);
        for _ in 0..3 {
            assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::eof(0));
        }
    }

    #[test]
    fn test_frame_reader_exact_fit() {
        let ctx = Context::new();
        let mut reader = FrameReader::new(Frame::from_pairs(vec![(1i8, 1i8), (2, 2)]));
        let mut out = Frame::make(&Schema::pair::<i8, i8>(), 2);
        assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::eof(2));
    }

    #[test]
    fn test_empty_reader() {
        let ctx = Context::new();
        let mut out = Frame::make(&Schema::pair::<i8, i8>(), 4);
        assert_eq!(EmptyReader.read(&ctx, &mut out).unwrap(), ReadStatus::eof(0));
    }

    #[test]
    fn test_frame_reader_observes_cancellation() {
        let ctx = Context::new();
        let mut reader = FrameReader::new(Frame::from_pairs(vec![(1u8, 1u8)]));
        let mut out = Frame::make(&Schema::pair::<u8, u8>(), 4);
        ctx.cancel();
        assert!(reader.read(&ctx, &mut out).unwrap_err().is_cancelled());
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_frame_reader_eof_survives_cancellation() {
        let ctx = Context::new();
        let mut reader = FrameReader::new(Frame::from_pairs(vec![(1u8, 1u8)]));
        let mut out = Frame::make(&Schema::pair::<u8, u8>(), 4);
        assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::eof(1));
        ctx.cancel();
        for _ in 0..3 {
            assert_eq!(reader.read(&ctx, &mut out).unwrap(), ReadStatus::eof(0));
        }
    }

    #[test]
    fn test_read_all() {
        let ctx = Context::new();
        let frame = Frame::from_pairs((0..300i64).map(|k| (k, -k)));
        let schema = frame.schema().clone();
        let mut reader = FrameReader::new(frame.clone());
        let all = read_all(&ctx, &mut reader, &schema, 7).unwrap();
        assert_eq!(all.to_pairs::<i64, i64>(), frame.to_pairs::<i64, i64>());

        let mut empty = EmptyReader;
        assert!(read_all(&ctx, &mut empty, &schema, 7).unwrap().is_empty());
        assert!(read_all(&ctx, &mut empty, &schema, 0).is_err());
    }
}
