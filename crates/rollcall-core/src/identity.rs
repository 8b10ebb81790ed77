//! Peer identities and the frozen membership roster.

use crate::identifiers::PeerId;
use crate::{Result, RollcallError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Network identity assigned to a peer at registration.
///
/// Written once by the registering call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Assigned peer id
    pub peer_id: PeerId,
    /// Address other clusters and clients reach this peer on
    pub public_addr: String,
    /// Address used inside the peer's own network
    pub private_addr: String,
    /// Port derived from the peer id
    pub port: u16,
    /// Serialized public half of the peer's key pair
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
}

/// Ordered, immutable membership list of one cluster instance.
///
/// Built exactly once after every peer has registered. Cloning shares the
/// underlying list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRoster {
    peers: Arc<[NodeIdentity]>,
}

impl PeerRoster {
    /// Freeze a set of identities, sorted ascending by peer id.
    pub fn freeze(mut identities: Vec<NodeIdentity>) -> Self {
        identities.sort_by_key(|identity| identity.peer_id);
        Self {
            peers: identities.into(),
        }
    }

    /// Check that the roster holds exactly `expected` peers with ids `0..expected`.
    pub fn verify_dense(&self, expected: usize) -> Result<()> {
        if self.peers.len() != expected {
            return Err(RollcallError::invalid(format!(
                "roster holds {} peers, expected {expected}",
                self.peers.len()
            )));
        }
        for (index, identity) in self.peers.iter().enumerate() {
            if identity.peer_id.index() != index {
                return Err(RollcallError::invalid(format!(
                    "roster position {index} holds {}",
                    identity.peer_id
                )));
            }
        }
        Ok(())
    }

    /// Identities in ascending peer id order.
    pub fn peers(&self) -> &[NodeIdentity] {
        &self.peers
    }

    /// Look up a peer by id.
    pub fn get(&self, peer_id: PeerId) -> Option<&NodeIdentity> {
        self.peers
            .binary_search_by_key(&peer_id, |identity| identity.peer_id)
            .ok()
            .map(|index| &self.peers[index])
    }

    /// Number of peers in the roster.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Copy the identities out, e.g. for a response message.
    pub fn to_vec(&self) -> Vec<NodeIdentity> {
        self.peers.to_vec()
    }
}
