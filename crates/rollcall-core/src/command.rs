//! Master commands and worker status reports.

use crate::identifiers::{CommandId, WorkerId};
use serde::{Deserialize, Serialize};

/// A command pushed by a master to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Id the worker echoes back when it reports completion
    pub id: CommandId,
    /// What the worker is asked to do
    pub kind: CommandKind,
}

/// Command payloads understood by workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// First-contact reply carrying the worker's freshly assigned id
    Init {
        /// Newly assigned worker id
        worker_id: WorkerId,
    },
    /// Opaque master instruction; only the worker interprets it
    Exec {
        /// Short label for the instruction
        tag: String,
        /// Instruction body
        payload: String,
    },
    /// Ask the worker to leave its poll loop
    Stop,
}

impl Command {
    /// The Init command for a newly registered worker.
    pub fn init(worker_id: WorkerId) -> Self {
        Self {
            id: CommandId::INIT,
            kind: CommandKind::Init { worker_id },
        }
    }

    /// An opaque instruction.
    pub fn exec(id: CommandId, tag: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id,
            kind: CommandKind::Exec {
                tag: tag.into(),
                payload: payload.into(),
            },
        }
    }

    /// A stop request.
    pub fn stop(id: CommandId) -> Self {
        Self {
            id,
            kind: CommandKind::Stop,
        }
    }
}

/// Who is reporting: a brand-new worker or one that already holds an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRef {
    /// First contact; the worker has no id yet
    FirstContact {
        /// Free-form label describing the worker
        tag: String,
    },
    /// A worker registered earlier
    Known(WorkerId),
}

/// One NextCommand call: the outcome of the previous command plus a request
/// for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Reporting worker
    pub worker: WorkerRef,
    /// Command the worker just finished
    pub command_id: CommandId,
    /// Exit status of that command; zero means success
    pub status: i32,
    /// Free-text output
    pub message: String,
}

impl WorkerReport {
    /// Report sent by a worker that has not been assigned an id yet.
    pub fn first_contact(tag: impl Into<String>) -> Self {
        Self {
            worker: WorkerRef::FirstContact { tag: tag.into() },
            command_id: CommandId::INIT,
            status: 0,
            message: String::new(),
        }
    }

    /// Completion report from a registered worker.
    pub fn completed(
        worker_id: WorkerId,
        command_id: CommandId,
        status: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            worker: WorkerRef::Known(worker_id),
            command_id,
            status,
            message: message.into(),
        }
    }
}
