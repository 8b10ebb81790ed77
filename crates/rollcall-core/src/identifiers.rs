//! Numeric identifiers handed out during bootstrap
//!
//! Peers, clients, and workers draw from independent counters, so each gets
//! its own newtype to keep the id spaces apart at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Get the raw counter value.
            pub const fn value(self) -> u32 {
                self.0
            }

            /// Position of this id in a dense `0..n` sequence.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Identity of an ordering peer; dense over `0..n` for a cluster of `n`.
    PeerId,
    "peer"
);

sequential_id!(
    /// Identity of a client that submits requests to the cluster.
    ClientId,
    "client"
);

sequential_id!(
    /// Identity of an orchestrated worker process.
    WorkerId,
    "worker"
);

/// Identifier a master attaches to each command it dispatches.
///
/// Workers echo it back when they report completion so that a waiting
/// broadcast can tell which command a status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub i32);

impl CommandId {
    /// Reserved for the Init command sent on first contact.
    pub const INIT: CommandId = CommandId(0);

    /// Get the raw value.
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Whether this is the reserved Init id.
    pub const fn is_init(self) -> bool {
        self.0 == Self::INIT.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}
