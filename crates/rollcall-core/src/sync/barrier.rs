//! Fixed-size, single-use rendezvous barrier.

use crate::{Result, RollcallError};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// Outcome of one arrival at a [`RendezvousBarrier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    /// 1-based arrival order
    pub arrival: usize,
    /// Whether this arrival completed the barrier
    pub is_leader: bool,
}

/// Releases every caller at once, after exactly `capacity` arrivals.
///
/// The barrier is never re-armed: once released, further arrivals are
/// rejected. An arrival counts even if its caller stops waiting.
#[derive(Debug)]
pub struct RendezvousBarrier {
    name: &'static str,
    capacity: usize,
    arrived: Mutex<usize>,
    released: watch::Sender<bool>,
}

impl RendezvousBarrier {
    /// Create a barrier for `capacity` participants.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (released, _) = watch::channel(capacity == 0);
        Self {
            name,
            capacity,
            arrived: Mutex::new(0),
            released,
        }
    }

    /// Count this caller in and wait until all participants have arrived.
    pub async fn arrive_and_wait(&self) -> Result<BarrierWaitResult> {
        // Subscribe before counting in so the release cannot be missed.
        let mut released = self.released.subscribe();

        let arrival = {
            let mut arrived = self.arrived.lock();
            if *arrived >= self.capacity {
                return Err(RollcallError::invalid(format!(
                    "{} barrier already has all {} arrivals",
                    self.name, self.capacity
                )));
            }
            *arrived += 1;
            *arrived
        };

        if arrival == self.capacity {
            debug!(barrier = self.name, arrivals = arrival, "Barrier released");
            self.released.send_replace(true);
            return Ok(BarrierWaitResult {
                arrival,
                is_leader: true,
            });
        }

        debug!(
            barrier = self.name,
            arrival,
            capacity = self.capacity,
            "Waiting at barrier"
        );
        released
            .wait_for(|released| *released)
            .await
            .map_err(|_| RollcallError::internal(format!("{} barrier dropped", self.name)))?;

        Ok(BarrierWaitResult {
            arrival,
            is_leader: false,
        })
    }

    /// Wait for the release without counting as an arrival.
    pub async fn released(&self) {
        let mut released = self.released.subscribe();
        // The sender lives as long as `self`, so this only returns on release.
        let _ = released.wait_for(|released| *released).await;
    }

    /// Whether the barrier has released.
    pub fn is_released(&self) -> bool {
        *self.released.borrow()
    }

    /// Arrivals counted so far.
    pub fn arrivals(&self) -> usize {
        *self.arrived.lock()
    }

    /// Number of arrivals needed for release.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
