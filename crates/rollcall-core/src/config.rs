//! Coordinator configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//! Command-line flags are applied on top by the binary before `validate`.

use crate::identifiers::PeerId;
use crate::{Result, RollcallError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one bootstrap ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Cluster size: number of peers that must register
    pub peers: u32,
    /// Capacity of the client id allocator
    pub max_clients: u32,
    /// Capacity of the worker id allocator
    pub max_workers: u32,
    /// Port assigned to peer 0
    pub peer_base_port: u16,
    /// Distance between consecutive peers' ports
    pub peer_port_stride: u16,
    /// Address the RPC server binds to
    pub listen_addr: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            peers: 4,
            max_clients: 1024,
            max_workers: 1024,
            peer_base_port: 10_000,
            peer_port_stride: 11,
            listen_addr: "0.0.0.0:9999".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Configuration for a cluster of `peers`, everything else default.
    pub fn for_cluster(peers: u32) -> Self {
        Self {
            peers,
            ..Self::default()
        }
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RollcallError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject settings the ceremony cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.peers == 0 {
            return Err(RollcallError::config("peers must be at least 1"));
        }
        if self.peers > u32::from(u16::MAX) {
            return Err(RollcallError::config(format!(
                "peers = {} exceeds the threshold share index range",
                self.peers
            )));
        }
        if self.max_clients == 0 {
            return Err(RollcallError::config("max_clients must be at least 1"));
        }
        if self.max_workers == 0 {
            return Err(RollcallError::config("max_workers must be at least 1"));
        }
        if self.peer_port_stride == 0 {
            return Err(RollcallError::config("peer_port_stride must be non-zero"));
        }
        let last = PeerId(self.peers - 1);
        if self.port_for(last).is_none() {
            return Err(RollcallError::config(format!(
                "ports for {} peers starting at {} with stride {} overflow",
                self.peers, self.peer_base_port, self.peer_port_stride
            )));
        }
        if self.listen_addr.trim().is_empty() {
            return Err(RollcallError::config("listen_addr must not be empty"));
        }
        Ok(())
    }

    /// Port assigned to `peer_id`, if it fits in a `u16`.
    pub fn port_for(&self, peer_id: PeerId) -> Option<u16> {
        let offset = u32::from(self.peer_port_stride).checked_mul(peer_id.value())?;
        let port = u32::from(self.peer_base_port).checked_add(offset)?;
        u16::try_from(port).ok()
    }
}
