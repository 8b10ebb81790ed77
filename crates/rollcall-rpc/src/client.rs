//! HTTP client for the coordinator.

use crate::messages::{
    endpoints, ErrorBody, MasterCommand, RegisterClientRequest, RegisterClientResponse,
    RegisterPeerRequest, RegisterPeerResponse, SyncPeerRequest, SyncPeerResponse,
    WorkerStatusReport,
};
use rollcall_core::{PeerId, Result, RollcallError, WorkerReport};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Client for the four coordinator RPCs.
///
/// Requests carry no timeout: registration, sync, and NextCommand all block
/// on the server until the rest of the cluster catches up.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoordinatorClient {
    /// Client for the coordinator at `base_url`, e.g. `http://10.0.0.1:9999`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RollcallError::network(format!("failed to create HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Register as a peer; returns once every peer has registered.
    pub async fn register_peer(
        &self,
        public_addr: impl Into<String>,
        private_addr: impl Into<String>,
    ) -> Result<RegisterPeerResponse> {
        let request = RegisterPeerRequest {
            public_addr: public_addr.into(),
            private_addr: private_addr.into(),
        };
        self.post(endpoints::REGISTER_PEER, &request).await
    }

    /// Wait at the sync barrier.
    pub async fn sync_peer(&self, peer_id: PeerId) -> Result<()> {
        let _: SyncPeerResponse = self
            .post(endpoints::SYNC_PEER, &SyncPeerRequest { peer_id })
            .await?;
        Ok(())
    }

    /// Register as a client; returns once the roster is frozen.
    pub async fn register_client(&self) -> Result<RegisterClientResponse> {
        self.post(endpoints::REGISTER_CLIENT, &RegisterClientRequest {})
            .await
    }

    /// Report `report` and long-poll for the next command.
    pub async fn next_command(&self, report: &WorkerReport) -> Result<MasterCommand> {
        let request = WorkerStatusReport::try_from(report)?;
        self.post(endpoints::NEXT_COMMAND, &request).await
    }

    /// Probe the coordinator's health endpoint.
    pub async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url(endpoints::HEALTH))
            .send()
            .await
            .map_err(|e| RollcallError::network(format!("health check failed: {e}")))?;
        if !response.status().is_success() {
            return Err(RollcallError::network(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(request)
            .send()
            .await
            .map_err(|e| RollcallError::network(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<ErrorBody>().await {
                Ok(body) => body.into(),
                Err(_) => RollcallError::network(format!("{path} returned {status}")),
            });
        }

        response.json().await.map_err(|e| {
            RollcallError::serialization(format!("malformed reply from {path}: {e}"))
        })
    }
}
