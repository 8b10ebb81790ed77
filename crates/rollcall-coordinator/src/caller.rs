//! Caller address carried for logging.

use std::fmt;
use std::net::SocketAddr;

/// Network address of the party invoking an operation.
///
/// Only ever logged; no decision depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallerAddr(pub Option<SocketAddr>);

impl CallerAddr {
    /// A caller whose address the transport could not supply.
    pub const UNKNOWN: CallerAddr = CallerAddr(None);
}

impl From<SocketAddr> for CallerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self(Some(addr))
    }
}

impl fmt::Display for CallerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(addr) => write!(f, "{addr}"),
            None => write!(f, "unknown"),
        }
    }
}
