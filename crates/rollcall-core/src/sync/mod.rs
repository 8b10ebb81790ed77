//! Synchronization primitives for the bootstrap ceremony
//!
//! - [`IdAllocator`]: bounded monotonic id source
//! - [`RendezvousBarrier`]: fixed-size, single-use barrier
//! - [`PublishOnce`]: run-once action whose result all callers share
//! - [`Handoff`]: single-slot synchronous mailbox

pub mod allocator;
pub mod barrier;
pub mod handoff;
pub mod publish_once;

pub use allocator::IdAllocator;
pub use barrier::{BarrierWaitResult, RendezvousBarrier};
pub use handoff::Handoff;
pub use publish_once::PublishOnce;
