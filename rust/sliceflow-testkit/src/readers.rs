//! Readers that reshape or sabotage another reader's stream.

use sliceflow_common::{Result, error::Error};
use sliceflow_frame::Frame;
use sliceflow_reduce::{Context, ReadStatus, Reader};

/// Caps the number of rows `inner` produces per call, regardless of the size of
/// the caller's frame.
pub struct LimitReader<R> {
    inner: R,
    max_rows: usize,
    scratch: Option<Frame>,
}

impl<R: Reader> LimitReader<R> {
    pub fn new(inner: R, max_rows: usize) -> LimitReader<R> {
        assert_ne!(max_rows, 0);
        LimitReader {
            inner,
            max_rows,
            scratch: None,
        }
    }
}

impl<R: Reader> Reader for LimitReader<R> {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        if out.len() <= self.max_rows {
            return self.inner.read(ctx, out);
        }
        let scratch = self
            .scratch
            .get_or_insert_with(|| Frame::make(out.schema(), self.max_rows));
        let status = self.inner.read(ctx, scratch)?;
        out.copy_rows(0, scratch, 0..status.rows);
        Ok(status)
    }
}

/// Passes through the rows of `inner`, then fails with `failure` where `inner`
/// would have reported end-of-stream.
pub struct FailingReader<R> {
    inner: R,
    failure: Error,
}

impl<R: Reader> FailingReader<R> {
    pub fn new(inner: R, failure: Error) -> FailingReader<R> {
        FailingReader { inner, failure }
    }
}

impl<R: Reader> Reader for FailingReader<R> {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        let status = self.inner.read(ctx, out)?;
        match status {
            ReadStatus { eof: false, .. } => Ok(status),
            ReadStatus { rows: 0, eof: true } => Err(self.failure.clone()),
            ReadStatus { rows, eof: true } => Ok(ReadStatus::more(rows)),
        }
    }
}

/// Cancels the context it is read with once `inner` has served `reads` calls.
pub struct CancelAfter<R> {
    inner: R,
    reads: usize,
}

impl<R: Reader> CancelAfter<R> {
    pub fn new(inner: R, reads: usize) -> CancelAfter<R> {
        CancelAfter { inner, reads }
    }
}

impl<R: Reader> Reader for CancelAfter<R> {
    fn read(&mut self, ctx: &Context, out: &mut Frame) -> Result<ReadStatus> {
        ctx.check()?;
        if self.reads == 0 {
            ctx.cancel();
            return Err(Error::cancelled());
        }
        self.reads -= 1;
        self.inner.read(ctx, out)
    }
}
