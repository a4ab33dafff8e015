//! Fetch sessions: the cancellation scope for one subunit identity.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::application::backend::BackendError;

/// Cooperative cancellation signal shared by every request of a session.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    signal: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.signal.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// In-flight requests for one subunit identity and one mount lifetime.
#[derive(Debug, Clone)]
pub struct FetchSession {
    id: Uuid,
    subunit_id: Arc<str>,
    token: CancellationToken,
}

impl FetchSession {
    pub fn new(subunit_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            subunit_id: Arc::from(subunit_id),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subunit_id(&self) -> &str {
        &self.subunit_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Race `request` against cancellation, dropping it when the session ends.
    ///
    /// Dropping the future aborts the underlying request only as far as the
    /// transport supports it.
    pub async fn guard<T, F>(&self, request: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        if self.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(BackendError::Cancelled),
            result = request => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn token_reports_cancellation() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn guard_drops_pending_request_on_cancel() {
        let session = FetchSession::new("s1");
        let canceller = session.clone();

        let pending = session.guard(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, BackendError>(1)
        });
        let cancel = async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        };

        let (result, ()) = tokio::join!(pending, cancel);
        assert_eq!(result, Err(BackendError::Cancelled));
    }

    #[tokio::test]
    async fn guard_passes_results_through_while_active() {
        let session = FetchSession::new("s1");
        let result = session.guard(async { Ok::<_, BackendError>("done") }).await;
        assert_eq!(result, Ok("done"));
        assert_eq!(session.subunit_id(), "s1");
    }

    #[tokio::test]
    async fn guard_short_circuits_when_already_cancelled() {
        let session = FetchSession::new("s1");
        session.cancel();
        let result = session
            .guard(async { Ok::<_, BackendError>("never") })
            .await;
        assert_eq!(result, Err(BackendError::Cancelled));
    }
}
