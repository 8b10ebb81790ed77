//! JSON request and response bodies.
//!
//! Byte fields travel hex-encoded.

use rollcall_core::{
    ClientId, Command, CommandId, NodeIdentity, PeerId, Result, RollcallError, WorkerId,
    WorkerRef, WorkerReport,
};
use serde::{Deserialize, Serialize};

/// Endpoint paths.
pub mod endpoints {
    /// Peer registration
    pub const REGISTER_PEER: &str = "/v1/peers/register";
    /// Peer sync barrier
    pub const SYNC_PEER: &str = "/v1/peers/sync";
    /// Client registration
    pub const REGISTER_CLIENT: &str = "/v1/clients/register";
    /// Worker long-poll
    pub const NEXT_COMMAND: &str = "/v1/workers/next-command";
    /// Liveness probe
    pub const HEALTH: &str = "/health";
}

/// Wire worker id sent by a worker that has not been assigned one yet.
pub const FIRST_CONTACT_WORKER_ID: i32 = -1;

/// Body of a peer registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPeerRequest {
    /// Address the peer is reachable on from outside its network
    pub public_addr: String,
    /// Address the peer is reachable on inside its network
    pub private_addr: String,
}

/// Reply to a peer registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPeerResponse {
    /// Assigned peer id
    pub peer_id: PeerId,
    /// Private half of the peer's key pair
    #[serde(with = "hex::serde")]
    pub private_key: Vec<u8>,
    /// Threshold group public key
    #[serde(with = "hex::serde")]
    pub threshold_public_key: Vec<u8>,
    /// The peer's threshold private key share
    #[serde(with = "hex::serde")]
    pub threshold_private_key_share: Vec<u8>,
    /// Frozen roster, ordered by peer id
    pub peers: Vec<NodeIdentity>,
}

/// Body of a sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPeerRequest {
    /// Peer calling in
    pub peer_id: PeerId,
}

/// Reply to a sync call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPeerResponse {}

/// Body of a client registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterClientRequest {}

/// Reply to a client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterClientResponse {
    /// Assigned client id
    pub client_id: ClientId,
    /// Frozen roster, ordered by peer id
    pub peers: Vec<NodeIdentity>,
}

/// Body of a NextCommand call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatusReport {
    /// Worker id, or [`FIRST_CONTACT_WORKER_ID`] on first contact
    pub worker_id: i32,
    /// Command the worker just finished
    pub command_id: CommandId,
    /// Exit status of that command
    pub status: i32,
    /// Free-text output
    #[serde(default)]
    pub message: String,
    /// Worker label, used on first contact
    #[serde(default)]
    pub tag: String,
}

/// Reply to a NextCommand call.
pub type MasterCommand = Command;

/// Body of every error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error kind, as in [`RollcallError::kind`]
    pub error: String,
    /// Human-readable detail
    pub message: String,
}

impl From<&RollcallError> for ErrorBody {
    fn from(err: &RollcallError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.message().to_string(),
        }
    }
}

impl From<ErrorBody> for RollcallError {
    fn from(body: ErrorBody) -> Self {
        RollcallError::from_kind(&body.error, body.message)
    }
}

impl TryFrom<WorkerStatusReport> for WorkerReport {
    type Error = RollcallError;

    fn try_from(wire: WorkerStatusReport) -> Result<Self> {
        let worker = match wire.worker_id {
            FIRST_CONTACT_WORKER_ID => WorkerRef::FirstContact { tag: wire.tag },
            id => {
                let id = u32::try_from(id)
                    .map_err(|_| RollcallError::invalid(format!("invalid worker id {id}")))?;
                WorkerRef::Known(WorkerId(id))
            }
        };
        Ok(WorkerReport {
            worker,
            command_id: wire.command_id,
            status: wire.status,
            message: wire.message,
        })
    }
}

impl TryFrom<&WorkerReport> for WorkerStatusReport {
    type Error = RollcallError;

    fn try_from(report: &WorkerReport) -> Result<Self> {
        let (worker_id, tag) = match &report.worker {
            WorkerRef::FirstContact { tag } => (FIRST_CONTACT_WORKER_ID, tag.clone()),
            WorkerRef::Known(id) => {
                let wire = i32::try_from(id.value()).map_err(|_| {
                    RollcallError::invalid(format!("{id} does not fit the wire format"))
                })?;
                (wire, String::new())
            }
        };
        Ok(Self {
            worker_id,
            command_id: report.command_id,
            status: report.status,
            message: report.message.clone(),
            tag,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_contact_sentinel() {
        let wire: WorkerStatusReport = serde_json::from_str(
            r#"{"worker_id": -1, "command_id": 0, "status": 0, "tag": "bench-3"}"#,
        )
        .unwrap();
        let report = WorkerReport::try_from(wire).unwrap();
        assert_eq!(
            report.worker,
            WorkerRef::FirstContact {
                tag: "bench-3".to_string()
            }
        );
    }

    #[test]
    fn test_negative_worker_id_rejected() {
        let wire = WorkerStatusReport {
            worker_id: -7,
            command_id: CommandId(1),
            status: 0,
            message: String::new(),
            tag: String::new(),
        };
        let err = WorkerReport::try_from(wire).unwrap_err();
        assert!(matches!(err, RollcallError::Invalid { .. }));
    }

    #[test]
    fn test_keys_are_hex_encoded() {
        let response = RegisterPeerResponse {
            peer_id: PeerId(2),
            private_key: vec![0xab, 0x01],
            threshold_public_key: vec![0xff],
            threshold_private_key_share: vec![0x00, 0x10],
            peers: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["peer_id"], 2);
        assert_eq!(json["private_key"], "ab01");
        assert_eq!(json["threshold_private_key_share"], "0010");
    }

    #[test]
    fn test_error_body_preserves_kind() {
        let body = ErrorBody::from(&RollcallError::not_found("unknown worker worker-9"));
        assert_eq!(body.error, "not_found");
        let err = RollcallError::from(body);
        assert_eq!(err, RollcallError::not_found("unknown worker worker-9"));
    }
}
