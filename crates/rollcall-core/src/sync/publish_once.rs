//! Run-exactly-once cell whose result every caller shares.

use crate::Result;
use std::future::Future;
use tokio::sync::OnceCell;

/// Runs an initializer at most once and publishes its outcome.
///
/// The first caller runs the initializer; concurrent callers wait for it and
/// read the same published result. If the running initializer is cancelled,
/// a waiting caller takes over. Errors are published like values and never
/// retried, so a failed bootstrap step stays failed.
#[derive(Debug)]
pub struct PublishOnce<T> {
    cell: OnceCell<Result<T>>,
}

impl<T> PublishOnce<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the published value, running `init` if nothing is published yet.
    pub async fn get_or_publish<F, Fut>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell
            .get_or_init(init)
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The published value, if initialization finished successfully.
    pub fn get(&self) -> Option<&T> {
        self.cell.get().and_then(|result| result.as_ref().ok())
    }

    /// Whether an outcome (value or error) has been published.
    pub fn is_published(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> Default for PublishOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
