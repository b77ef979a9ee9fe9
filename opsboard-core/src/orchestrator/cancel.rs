//! Advisory cancellation for dispatched list requests.

use std::future::Future;

use tokio::sync::watch;

use crate::error::ErrorEnvelope;

/// Owner side: requests cancellation of one dispatched request.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Worker side: observed by list sources that can stop early.
///
/// Honoring the token is optional. Results of abandoned requests are discarded
/// by the subscription whether or not the source stops.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_tx, token) = pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the owner
    /// goes away without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Runs `work` unless cancellation arrives first, in which case the
    /// result is a `Cancelled` envelope.
    pub async fn run<T, F>(&self, work: F) -> Result<T, ErrorEnvelope>
    where
        F: Future<Output = Result<T, ErrorEnvelope>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ErrorEnvelope::cancelled()),
            result = work => result,
        }
    }
}

/// Creates a linked handle and token.
pub fn pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}
