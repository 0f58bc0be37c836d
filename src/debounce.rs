// Latest-wins async debouncer.
//
// Scheduling a job supersedes whatever came before it: a pending timer is
// aborted, an in-flight request task is aborted, and any response that still
// arrives carries a stale token the caller can detect with `is_current`.
// The abort is soft in the same sense a browser abort signal is: it
// suppresses the effect of the old work, it does not promise the network
// call stops instantly.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

pub struct LatestWins {
    delay: Duration,
    seq: u64,
    pending: Option<JoinHandle<()>>,
}

impl LatestWins {
    pub fn new(delay: Duration) -> Self {
        LatestWins {
            delay,
            seq: 0,
            pending: None,
        }
    }

    /// Schedule `make(token)` to run after the debounce delay, superseding
    /// any pending or in-flight predecessor. Returns the token identifying
    /// this scheduling; only the most recent token is current.
    pub fn schedule<F, Fut>(&mut self, make: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.supersede();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            make(token).await;
        });
        self.pending = Some(handle);
        token
    }

    /// Abort any pending/in-flight work and reserve the next token without
    /// scheduling anything.
    pub fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            debug!(stale = self.seq, "superseded pending job");
        }
        self.seq += 1;
        self.seq
    }

    /// Abort pending work and invalidate all outstanding tokens.
    pub fn cancel(&mut self) {
        self.supersede();
    }

    /// Whether `token` identifies the most recent scheduling. Responses
    /// carrying a stale token must be discarded.
    pub fn is_current(&self, token: u64) -> bool {
        token == self.seq
    }
}

impl Drop for LatestWins {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
