//! Cancellation-bearing context passed to every read call.

use sliceflow_common::{Result, error::Error};
use tokio_util::sync::CancellationToken;

/// Context threaded through [`Reader::read`](crate::reader::Reader::read).
///
/// Readers that may block (on the network, on disk) are expected to observe the
/// context; operators in this crate check it before each upstream pull. Once the
/// token is cancelled, the next pull fails with
/// [`ErrorKind::Cancelled`](sliceflow_common::error::ErrorKind::Cancelled).
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails with a cancellation error if the context has been cancelled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }
}
