//! # Rollcall RPC
//!
//! HTTP/JSON transport for the coordinator: the axum server, the reqwest
//! client, the worker runner, and the wire messages they exchange.

#![forbid(unsafe_code)]

pub mod client;
pub mod messages;
pub mod server;
pub mod worker;

pub use client::CoordinatorClient;
pub use server::{router, serve, ApiError};
pub use worker::{run_worker, CommandHandler, CommandOutput};
