//! Bounded monotonic id source.

use std::future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::warn;

/// Hands out `0, 1, 2, ...` up to a fixed capacity.
///
/// A draw past capacity never completes and never issues an id.
#[derive(Debug)]
pub struct IdAllocator<T> {
    name: &'static str,
    capacity: u32,
    next: AtomicU32,
    _id: PhantomData<fn() -> T>,
}

impl<T: From<u32>> IdAllocator<T> {
    /// Create an allocator issuing at most `capacity` ids.
    pub fn new(name: &'static str, capacity: u32) -> Self {
        Self {
            name,
            capacity,
            next: AtomicU32::new(0),
            _id: PhantomData,
        }
    }

    /// Draw the next id, parking forever once capacity is exhausted.
    pub async fn draw(&self) -> T {
        let drawn = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                Some(next.saturating_add(1))
            })
            .unwrap_or_else(|current| current);

        if drawn >= self.capacity {
            warn!(
                allocator = self.name,
                capacity = self.capacity,
                "Id allocator exhausted; caller parked"
            );
            return future::pending().await;
        }

        T::from(drawn)
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Acquire).min(self.capacity)
    }

    /// Maximum number of ids this allocator will issue.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identifiers::WorkerId;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_draws_are_sequential() {
        let allocator = IdAllocator::<WorkerId>::new("worker", 3);
        assert_eq!(allocator.draw().await, WorkerId(0));
        assert_eq!(allocator.draw().await, WorkerId(1));
        assert_eq!(allocator.draw().await, WorkerId(2));
        assert_eq!(allocator.issued(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_allocator_parks_caller() {
        let allocator = IdAllocator::<WorkerId>::new("worker", 1);
        allocator.draw().await;
        let parked = tokio::time::timeout(Duration::from_millis(50), allocator.draw()).await;
        assert!(parked.is_err(), "draw past capacity must not complete");
        assert_eq!(allocator.issued(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_draws_are_unique_and_dense() {
        let allocator = Arc::new(IdAllocator::<WorkerId>::new("worker", 64));
        let draws = (0..64).map(|_| {
            let allocator = Arc::clone(&allocator);
            tokio::spawn(async move { allocator.draw().await })
        });
        let ids: BTreeSet<u32> = futures::future::join_all(draws)
            .await
            .into_iter()
            .map(|id| id.unwrap().0)
            .collect();
        assert_eq!(ids, (0..64).collect::<BTreeSet<u32>>());
    }
}
