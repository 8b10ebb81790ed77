//! The coordinator service object shared by every RPC handler.

use crate::bootstrap::{ClientRegistration, PeerBootstrap, PeerRegistration};
use crate::caller::CallerAddr;
use crate::orchestrator::{BroadcastOutcome, WorkerOrchestrator, WorkerSummary};
use rollcall_core::{
    Command, CoordinatorConfig, DealerKeyProvider, KeyProvider, PeerId, PeerRoster, Result,
    WorkerReport,
};
use std::sync::Arc;
use tracing::info;

/// Bootstrap coordinator for one cluster.
///
/// Created once per process and shared as `Arc<Coordinator>`.
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinatorConfig,
    bootstrap: PeerBootstrap,
    orchestrator: WorkerOrchestrator,
}

impl Coordinator {
    /// Coordinator dealing keys with [`DealerKeyProvider`].
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        Self::with_key_provider(config, Arc::new(DealerKeyProvider::new()))
    }

    /// Coordinator using a caller-supplied key provider.
    pub fn with_key_provider(
        config: CoordinatorConfig,
        keys: Arc<dyn KeyProvider>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            peers = config.peers,
            max_clients = config.max_clients,
            max_workers = config.max_workers,
            "Coordinator configured"
        );
        Ok(Self {
            bootstrap: PeerBootstrap::new(config.clone(), keys),
            orchestrator: WorkerOrchestrator::new(config.max_workers),
            config,
        })
    }

    /// See [`PeerBootstrap::register_peer`].
    pub async fn register_peer(
        &self,
        public_addr: String,
        private_addr: String,
        caller: CallerAddr,
    ) -> Result<PeerRegistration> {
        self.bootstrap
            .register_peer(public_addr, private_addr, caller)
            .await
    }

    /// See [`PeerBootstrap::sync_peer`].
    pub async fn sync_peer(&self, peer_id: PeerId, caller: CallerAddr) -> Result<()> {
        self.bootstrap.sync_peer(peer_id, caller).await
    }

    /// See [`PeerBootstrap::register_client`].
    pub async fn register_client(&self, caller: CallerAddr) -> Result<ClientRegistration> {
        self.bootstrap.register_client(caller).await
    }

    /// See [`WorkerOrchestrator::next_command`].
    pub async fn next_command(&self, report: WorkerReport, caller: CallerAddr) -> Result<Command> {
        self.orchestrator.next_command(report, caller).await
    }

    /// See [`WorkerOrchestrator::broadcast_and_wait`].
    pub async fn broadcast_and_wait(&self, command: Command) -> Result<BroadcastOutcome> {
        self.orchestrator.broadcast_and_wait(command).await
    }

    /// The frozen roster, once every peer has registered.
    pub fn roster(&self) -> Option<PeerRoster> {
        self.bootstrap.roster()
    }

    /// Number of peers registered so far.
    pub fn registered_peers(&self) -> usize {
        self.bootstrap.registered_peers()
    }

    /// Snapshot of registered workers.
    pub fn workers(&self) -> Vec<WorkerSummary> {
        self.orchestrator.workers()
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.orchestrator.worker_count()
    }

    /// Active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}
