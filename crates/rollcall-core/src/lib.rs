//! # Rollcall Core
//!
//! Foundation types for the cluster bootstrap coordinator: the error type,
//! identifiers, peer identities and roster, key material, configuration, the
//! key provider seam, and the synchronization primitives the ceremony is
//! built from.
//!
//! ## Architecture
//!
//! - **errors**: unified [`RollcallError`] and [`Result`]
//! - **identifiers**: peer, client, worker, and command ids
//! - **identity**: [`NodeIdentity`] and the frozen [`PeerRoster`]
//! - **keys**: peer key pairs and threshold key material
//! - **crypto**: [`KeyProvider`] and the FROST dealer implementation
//! - **command**: master commands and worker reports
//! - **config**: [`CoordinatorConfig`]
//! - **sync**: allocator, barrier, publish-once cell, single-slot handoff

#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod identifiers;
pub mod identity;
pub mod keys;
pub mod sync;

pub use command::{Command, CommandKind, WorkerRef, WorkerReport};
pub use config::CoordinatorConfig;
pub use crypto::{DealerKeyProvider, KeyProvider};
pub use errors::{Result, RollcallError};
pub use identifiers::{ClientId, CommandId, PeerId, WorkerId};
pub use identity::{NodeIdentity, PeerRoster};
pub use keys::{PeerKeyPair, SigningMode, ThresholdKeyMaterial, ThresholdParams};
