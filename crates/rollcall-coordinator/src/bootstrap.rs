//! Peer bootstrap ceremony
//!
//! Every peer registers exactly once. Registrations accumulate at the
//! registration barrier; once all `n` peers have arrived, the roster is
//! frozen and the threshold key is dealt, each exactly once, and every peer
//! receives the same results. A second barrier lets peers start dialing each
//! other at the same moment. Clients wait for the frozen roster without
//! taking part in the peer count.

use crate::caller::CallerAddr;
use crate::registry::Registry;
use rollcall_core::sync::{IdAllocator, PublishOnce, RendezvousBarrier};
use rollcall_core::{
    ClientId, CoordinatorConfig, KeyProvider, NodeIdentity, PeerId, PeerRoster, Result,
    RollcallError, ThresholdKeyMaterial, ThresholdParams,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything a peer learns from registering.
#[derive(Debug, Clone)]
pub struct PeerRegistration {
    /// Id assigned to the peer
    pub peer_id: PeerId,
    /// Private half of the peer's own key pair
    pub private_key: Vec<u8>,
    /// Threshold group public key
    pub threshold_public_key: Vec<u8>,
    /// This peer's threshold private key share
    pub threshold_private_key_share: Vec<u8>,
    /// Frozen membership
    pub roster: PeerRoster,
}

/// Everything a client learns from registering.
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    /// Id assigned to the client
    pub client_id: ClientId,
    /// Frozen membership
    pub roster: PeerRoster,
}

/// Peer and client side of the ceremony.
pub struct PeerBootstrap {
    config: CoordinatorConfig,
    keys: Arc<dyn KeyProvider>,
    peer_ids: IdAllocator<PeerId>,
    client_ids: IdAllocator<ClientId>,
    peers: Registry<PeerId, NodeIdentity>,
    registration: RendezvousBarrier,
    sync: RendezvousBarrier,
    roster: PublishOnce<PeerRoster>,
    threshold_keys: PublishOnce<ThresholdKeyMaterial>,
}

impl PeerBootstrap {
    /// Create the ceremony state for `config.peers` peers.
    pub fn new(config: CoordinatorConfig, keys: Arc<dyn KeyProvider>) -> Self {
        let cluster = config.peers as usize;
        Self {
            peer_ids: IdAllocator::new("peer", config.peers),
            client_ids: IdAllocator::new("client", config.max_clients),
            peers: Registry::new("peer"),
            registration: RendezvousBarrier::new("registration", cluster),
            sync: RendezvousBarrier::new("sync", cluster),
            roster: PublishOnce::new(),
            threshold_keys: PublishOnce::new(),
            keys,
            config,
        }
    }

    /// Register one peer and wait until the whole cluster has registered.
    pub async fn register_peer(
        &self,
        public_addr: String,
        private_addr: String,
        caller: CallerAddr,
    ) -> Result<PeerRegistration> {
        let peer_id = self.peer_ids.draw().await;

        info!(
            peer_id = %peer_id,
            caller = %caller,
            public_addr = %public_addr,
            private_addr = %private_addr,
            "Discovered peer"
        );

        let key_pair = self.keys.generate_key_pair().await.map_err(|e| {
            error!(peer_id = %peer_id, error = %e, "Failed to generate key pair for registering peer");
            e.into_fatal()
        })?;

        let port = self.config.port_for(peer_id).ok_or_else(|| {
            RollcallError::fatal(format!("no port available for {peer_id}"))
        })?;

        let identity = NodeIdentity {
            peer_id,
            public_addr,
            private_addr,
            port,
            public_key: key_pair.public_key,
        };
        self.peers
            .insert_new(peer_id, identity)
            .map_err(RollcallError::into_fatal)?;

        debug!(peer_id = %peer_id, "Waiting for remaining peers to register");
        let arrival = self.registration.arrive_and_wait().await?;
        if arrival.is_leader {
            debug!(peer_id = %peer_id, "Registration barrier completed by this peer");
        }

        let roster = self.frozen_roster().await?;
        let threshold_keys = self.dealt_keys(&roster).await?;
        let share = threshold_keys.share_for(peer_id)?.to_vec();

        Ok(PeerRegistration {
            peer_id,
            private_key: key_pair.private_key,
            threshold_public_key: threshold_keys.public_key.clone(),
            threshold_private_key_share: share,
            roster,
        })
    }

    /// Second rendezvous: release all peers together once each has called in.
    pub async fn sync_peer(&self, peer_id: PeerId, caller: CallerAddr) -> Result<()> {
        info!(peer_id = %peer_id, caller = %caller, "Peer initialized");
        self.sync.arrive_and_wait().await?;
        debug!(peer_id = %peer_id, "Sync barrier released");
        Ok(())
    }

    /// Assign a client id and hand out the roster once it is frozen.
    pub async fn register_client(&self, caller: CallerAddr) -> Result<ClientRegistration> {
        let client_id = self.client_ids.draw().await;
        info!(client_id = %client_id, caller = %caller, "New client");

        self.registration.released().await;
        let roster = self.frozen_roster().await?;

        Ok(ClientRegistration { client_id, roster })
    }

    /// The frozen roster, if the registration barrier has released.
    pub fn roster(&self) -> Option<PeerRoster> {
        self.roster.get().cloned()
    }

    /// Peers registered so far.
    pub fn registered_peers(&self) -> usize {
        self.peers.len()
    }

    /// Freeze the roster from the registry, at most once.
    ///
    /// Only called after the registration barrier released, so every
    /// identity is already stored.
    async fn frozen_roster(&self) -> Result<PeerRoster> {
        let roster = self
            .roster
            .get_or_publish(|| async {
                info!(peers = self.peers.len(), "Generating membership list");
                let roster = PeerRoster::freeze(self.peers.snapshot());
                roster
                    .verify_dense(self.config.peers as usize)
                    .map_err(|e| {
                        error!(error = %e, "Frozen roster is not dense");
                        e.into_fatal()
                    })?;
                Ok(roster)
            })
            .await?;
        Ok(roster.clone())
    }

    /// Deal threshold key material sized to the roster, at most once.
    async fn dealt_keys(&self, roster: &PeerRoster) -> Result<&ThresholdKeyMaterial> {
        self.threshold_keys
            .get_or_publish(|| async {
                let params = ThresholdParams::for_cluster(roster.len())
                    .map_err(RollcallError::into_fatal)?;
                info!(
                    participants = params.participants,
                    fault_tolerance = params.fault_tolerance,
                    threshold = params.threshold,
                    "Generating threshold keys"
                );
                let material = self
                    .keys
                    .generate_threshold_keys(params)
                    .await
                    .and_then(|material| {
                        material.verify_complete()?;
                        Ok(material)
                    })
                    .map_err(|e| {
                        error!(error = %e, "Could not generate threshold key material");
                        e.into_fatal()
                    })?;
                info!(mode = %material.mode, "Threshold keys ready");
                Ok(material)
            })
            .await
    }
}

impl std::fmt::Debug for PeerBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerBootstrap")
            .field("peers", &self.config.peers)
            .field("registered", &self.peers.len())
            .field("registration", &self.registration)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
