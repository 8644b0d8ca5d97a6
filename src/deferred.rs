use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
enum Settlement<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    fn is_pending(&self) -> bool {
        matches!(self, Settlement::Pending)
    }
}

/// One-shot completion signal settled from outside.
///
/// Any number of [`Promise`]s may wait on it. Only the first `resolve` or
/// `reject` takes effect; later calls are ignored.
#[derive(Debug)]
pub struct Deferred<T, E = String> {
    tx: Arc<watch::Sender<Settlement<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Deferred { tx: self.tx.clone() }
    }
}

impl<T: Clone, E: Clone> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Settlement::Pending);
        Deferred { tx: Arc::new(tx) }
    }

    /// Returns `true` if this call settled the deferred.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Settlement::Resolved(value))
    }

    /// Returns `true` if this call settled the deferred.
    #[allow(dead_code)]
    pub fn reject(&self, error: E) -> bool {
        self.settle(Settlement::Rejected(error))
    }

    #[allow(dead_code)]
    pub fn is_settled(&self) -> bool {
        !self.tx.borrow().is_pending()
    }

    pub fn promise(&self) -> Promise<T, E> {
        Promise { rx: self.tx.subscribe() }
    }

    fn settle(&self, outcome: Settlement<T, E>) -> bool {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|current| {
            if !current.is_pending() {
                return false;
            }
            if let Some(next) = outcome.take() {
                *current = next;
            }
            true
        })
    }
}

/// Awaitable side of a [`Deferred`].
#[derive(Debug)]
pub struct Promise<T, E = String> {
    rx: watch::Receiver<Settlement<T, E>>,
}

impl<T: Clone, E: Clone> Promise<T, E> {
    /// Waits for the deferred to settle. A deferred dropped while pending
    /// never settles, so the wait never completes.
    pub async fn wait(mut self) -> Result<T, E> {
        let settled = self
            .rx
            .wait_for(|s| !s.is_pending())
            .await
            .map(|s| s.clone());
        match settled {
            Ok(Settlement::Resolved(value)) => Ok(value),
            Ok(Settlement::Rejected(error)) => Err(error),
            _ => std::future::pending().await,
        }
    }
}
