//! Scripted master
//!
//! A master script is a TOML list of steps run against the local
//! coordinator:
//!
//! ```toml
//! [[steps]]
//! step = "wait_workers"
//! count = 4
//!
//! [[steps]]
//! step = "exec"
//! tag = "bench"
//! payload = "run --duration 30s"
//!
//! [[steps]]
//! step = "stop"
//! ```

use crate::coordinator::Coordinator;
use crate::orchestrator::BroadcastOutcome;
use rollcall_core::{Command, CommandId, Result, RollcallError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One step of a master script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MasterStep {
    /// Wait until at least `count` workers have registered
    WaitWorkers {
        /// Number of workers to wait for
        count: usize,
    },
    /// Broadcast an instruction and wait for every worker to finish it
    Exec {
        /// Short label for the instruction
        tag: String,
        /// Instruction body passed to workers verbatim
        #[serde(default)]
        payload: String,
    },
    /// Tell every worker to leave its poll loop
    Stop,
}

/// Ordered list of master steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasterScript {
    /// Steps, executed in order
    #[serde(default)]
    pub steps: Vec<MasterStep>,
}

impl MasterScript {
    /// Load a script from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RollcallError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a script from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Run `script` against `coordinator`, returning the outcome of every
/// broadcast in order.
///
/// Command ids are assigned 1, 2, 3, ... in script order. A broadcast whose
/// worst status is non-zero aborts the script.
pub async fn run_master(
    coordinator: &Coordinator,
    script: &MasterScript,
) -> Result<Vec<BroadcastOutcome>> {
    let mut outcomes = Vec::new();
    let mut next_id = CommandId::INIT.value();

    for step in &script.steps {
        match step {
            MasterStep::WaitWorkers { count } => {
                info!(count, "Waiting for workers");
                while coordinator.worker_count() < *count {
                    tokio::time::sleep(WORKER_POLL_INTERVAL).await;
                }
                debug!(registered = coordinator.worker_count(), "Workers ready");
            }
            MasterStep::Exec { tag, payload } => {
                next_id += 1;
                let command = Command::exec(CommandId(next_id), tag.clone(), payload.clone());
                let outcome = coordinator.broadcast_and_wait(command).await?;
                outcomes.push(outcome);
                if outcome.worst_status != 0 {
                    error!(
                        command_id = %outcome.command_id,
                        tag = %tag,
                        worst_status = outcome.worst_status,
                        "Workers reported failure; aborting script"
                    );
                    return Err(RollcallError::internal(format!(
                        "{} ({tag}) failed with status {}",
                        outcome.command_id, outcome.worst_status
                    )));
                }
            }
            MasterStep::Stop => {
                next_id += 1;
                let outcome = coordinator
                    .broadcast_and_wait(Command::stop(CommandId(next_id)))
                    .await?;
                outcomes.push(outcome);
            }
        }
    }

    info!(broadcasts = outcomes.len(), "Master script finished");
    Ok(outcomes)
}
