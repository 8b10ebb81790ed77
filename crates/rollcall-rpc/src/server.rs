//! HTTP server exposing the coordinator.
//!
//! Registrations run in their own task so a caller that disconnects cannot
//! abandon a registration between its id draw and its roster entry. The
//! NextCommand long-poll runs inline: if the worker disconnects, the pending
//! receive is dropped and the command stays in the worker's mailbox.

use crate::messages::{
    endpoints, ErrorBody, MasterCommand, RegisterClientRequest, RegisterClientResponse,
    RegisterPeerRequest, RegisterPeerResponse, SyncPeerRequest, SyncPeerResponse,
    WorkerStatusReport,
};
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rollcall_coordinator::{CallerAddr, Coordinator};
use rollcall_core::{RollcallError, WorkerReport};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Error reply carrying a [`RollcallError`].
#[derive(Debug)]
pub struct ApiError(pub RollcallError);

impl From<RollcallError> for ApiError {
    fn from(err: RollcallError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RollcallError::Invalid { .. } => StatusCode::BAD_REQUEST,
            RollcallError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Build the router for `coordinator`.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(endpoints::REGISTER_PEER, post(register_peer))
        .route(endpoints::SYNC_PEER, post(sync_peer))
        .route(endpoints::REGISTER_CLIENT, post(register_client))
        .route(endpoints::NEXT_COMMAND, post(next_command))
        .route(endpoints::HEALTH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

/// Serve `coordinator` on `listener` until the server fails.
pub async fn serve(
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
) -> rollcall_core::Result<()> {
    info!(addr = %listener.local_addr()?, "Coordinator listening");
    axum::serve(
        listener,
        router(coordinator).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn caller_addr(connect: Option<ConnectInfo<SocketAddr>>) -> CallerAddr {
    match connect {
        Some(ConnectInfo(addr)) => addr.into(),
        None => {
            error!("Failed to read caller address");
            CallerAddr::UNKNOWN
        }
    }
}

/// Run `work` to completion even if the HTTP caller goes away.
async fn detached<T, F>(work: F) -> Result<T, RollcallError>
where
    F: Future<Output = Result<T, RollcallError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| RollcallError::internal(format!("request task failed: {e}")))?
}

/// Terminate the process on a fatal error; pass anything else through.
fn escalate(err: RollcallError) -> ApiError {
    if err.is_fatal() {
        error!(error = %err, "Unrecoverable bootstrap failure; exiting");
        std::process::exit(1);
    }
    ApiError(err)
}

async fn register_peer(
    State(coordinator): State<Arc<Coordinator>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<RegisterPeerRequest>,
) -> ApiResult<RegisterPeerResponse> {
    let caller = caller_addr(connect);
    let registration = detached(async move {
        coordinator
            .register_peer(request.public_addr, request.private_addr, caller)
            .await
    })
    .await
    .map_err(escalate)?;

    Ok(Json(RegisterPeerResponse {
        peer_id: registration.peer_id,
        private_key: registration.private_key,
        threshold_public_key: registration.threshold_public_key,
        threshold_private_key_share: registration.threshold_private_key_share,
        peers: registration.roster.to_vec(),
    }))
}

async fn sync_peer(
    State(coordinator): State<Arc<Coordinator>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<SyncPeerRequest>,
) -> ApiResult<SyncPeerResponse> {
    let caller = caller_addr(connect);
    detached(async move { coordinator.sync_peer(request.peer_id, caller).await })
        .await
        .map_err(escalate)?;
    Ok(Json(SyncPeerResponse {}))
}

async fn register_client(
    State(coordinator): State<Arc<Coordinator>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Json(_): Json<RegisterClientRequest>,
) -> ApiResult<RegisterClientResponse> {
    let caller = caller_addr(connect);
    let registration = detached(async move { coordinator.register_client(caller).await })
        .await
        .map_err(escalate)?;
    Ok(Json(RegisterClientResponse {
        client_id: registration.client_id,
        peers: registration.roster.to_vec(),
    }))
}

async fn next_command(
    State(coordinator): State<Arc<Coordinator>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<WorkerStatusReport>,
) -> ApiResult<MasterCommand> {
    let report = WorkerReport::try_from(request)?;
    let command = coordinator.next_command(report, caller_addr(connect)).await?;
    Ok(Json(command))
}

async fn health() -> &'static str {
    "OK"
}
