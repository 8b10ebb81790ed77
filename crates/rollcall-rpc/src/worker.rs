//! Worker side of the NextCommand protocol.

use crate::client::CoordinatorClient;
use async_trait::async_trait;
use rollcall_core::{CommandId, CommandKind, Result, RollcallError, WorkerId, WorkerReport};
use tracing::{debug, info, warn};

/// Outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; zero means success
    pub status: i32,
    /// Free-text output reported to the coordinator
    pub message: String,
}

impl CommandOutput {
    /// Successful completion.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            message: message.into(),
        }
    }

    /// Failed completion with `status`.
    pub fn failure(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Executes the opaque instructions a master broadcasts.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run one instruction and describe how it went.
    async fn execute(&self, tag: &str, payload: &str) -> CommandOutput;
}

/// Register as a worker labelled `tag` and serve commands until the master
/// sends Stop. Returns the id the worker was assigned.
pub async fn run_worker(
    client: &CoordinatorClient,
    tag: &str,
    handler: &dyn CommandHandler,
) -> Result<WorkerId> {
    let init = client.next_command(&WorkerReport::first_contact(tag)).await?;
    let CommandKind::Init { worker_id } = init.kind else {
        return Err(RollcallError::invalid(format!(
            "expected init on first contact, got {}",
            init.id
        )));
    };
    info!(worker_id = %worker_id, tag, "Registered as worker");

    let mut report = WorkerReport::completed(worker_id, CommandId::INIT, 0, "ready");
    loop {
        let command = client.next_command(&report).await?;
        match command.kind {
            CommandKind::Exec {
                tag: command_tag,
                payload,
            } => {
                debug!(worker_id = %worker_id, command_id = %command.id, tag = %command_tag, "Executing");
                let output = handler.execute(&command_tag, &payload).await;
                if output.status != 0 {
                    warn!(
                        worker_id = %worker_id,
                        command_id = %command.id,
                        status = output.status,
                        "Command failed"
                    );
                }
                report =
                    WorkerReport::completed(worker_id, command.id, output.status, output.message);
            }
            CommandKind::Stop => {
                info!(worker_id = %worker_id, command_id = %command.id, "Stopping");
                return Ok(worker_id);
            }
            CommandKind::Init { .. } => {
                return Err(RollcallError::invalid(format!(
                    "{worker_id} received a second init"
                )));
            }
        }
    }
}
