//! # Rollcall Coordinator
//!
//! The transport-independent coordinator service: the peer bootstrap
//! ceremony, client registration, and the worker orchestrator.
//!
//! ## Architecture
//!
//! - **bootstrap**: peer registration barrier, roster freeze, threshold key
//!   dealing, sync barrier, client registration
//! - **orchestrator**: worker NextCommand long-poll and master broadcasts
//! - **coordinator**: [`Coordinator`], the facade RPC handlers call into
//! - **master**: TOML-scripted master driving the orchestrator
//! - **registry**: typed write-once keyed store
//! - **caller**: caller address carried for logging

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod caller;
pub mod coordinator;
pub mod master;
pub mod orchestrator;
pub mod registry;

pub use bootstrap::{ClientRegistration, PeerBootstrap, PeerRegistration};
pub use caller::CallerAddr;
pub use coordinator::Coordinator;
pub use master::{run_master, MasterScript, MasterStep};
pub use orchestrator::{BroadcastOutcome, WorkerOrchestrator, WorkerSummary};
pub use registry::Registry;
