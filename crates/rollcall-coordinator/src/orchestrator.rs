//! Worker orchestration
//!
//! Workers drive a pull-based protocol through a single call: each
//! NextCommand reports the outcome of the previous command and then
//! long-polls for the next one. A worker's first call carries no id and is
//! answered immediately with an Init command holding a fresh id.
//!
//! The master side pushes one command into every worker's single-slot
//! mailbox and waits until each of those workers has reported back, then
//! reads the worst (maximum) exit status.

use crate::caller::CallerAddr;
use crate::registry::Registry;
use parking_lot::Mutex;
use rollcall_core::sync::{Handoff, IdAllocator};
use rollcall_core::{
    Command, CommandId, CommandKind, Result, RollcallError, WorkerId, WorkerRef, WorkerReport,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Result of a completed broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastOutcome {
    /// Command that was broadcast
    pub command_id: CommandId,
    /// Number of workers the command was delivered to
    pub workers: usize,
    /// Highest exit status reported, never below zero
    pub worst_status: i32,
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    /// Worker id
    pub worker_id: WorkerId,
    /// Label the worker registered with
    pub tag: String,
    /// Last reported exit status
    pub status: i32,
    /// Last command the worker reported on
    pub last_command: Option<CommandId>,
    /// Whether the worker has collected a Stop command
    pub stopped: bool,
}

#[derive(Debug, Default)]
struct WorkerState {
    status: i32,
    last_reported: Option<CommandId>,
    stopped: bool,
}

#[derive(Debug)]
struct Worker {
    id: WorkerId,
    tag: String,
    mailbox: Handoff<Command>,
    state: Mutex<WorkerState>,
}

impl Worker {
    fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    fn mark_stopped(&self) {
        self.state.lock().stopped = true;
    }
}

/// Completion tracking for the broadcast currently in flight.
struct PendingBroadcast {
    command_id: CommandId,
    awaiting: BTreeSet<WorkerId>,
    worst_status: i32,
    done: Option<oneshot::Sender<i32>>,
}

#[derive(Debug, Default)]
struct DispatchState {
    last_command: Option<CommandId>,
}

/// Registers workers, relays master commands, and aggregates completions.
pub struct WorkerOrchestrator {
    worker_ids: IdAllocator<WorkerId>,
    workers: Registry<WorkerId, Arc<Worker>>,
    pending: Mutex<Option<PendingBroadcast>>,
    dispatch: tokio::sync::Mutex<DispatchState>,
}

impl WorkerOrchestrator {
    /// Create an orchestrator admitting at most `max_workers` workers.
    pub fn new(max_workers: u32) -> Self {
        Self {
            worker_ids: IdAllocator::new("worker", max_workers),
            workers: Registry::new("worker"),
            pending: Mutex::new(None),
            dispatch: tokio::sync::Mutex::new(DispatchState::default()),
        }
    }

    /// Handle one NextCommand call.
    ///
    /// First contact returns an Init command right away. A known worker has
    /// its report recorded and then waits until the master pushes the next
    /// command. An unknown worker id is a `NotFound` error, and a worker
    /// that already collected Stop is `Invalid`.
    pub async fn next_command(&self, report: WorkerReport, caller: CallerAddr) -> Result<Command> {
        debug!(
            worker = ?report.worker,
            command_id = %report.command_id,
            status = report.status,
            "Request from worker"
        );

        let worker_id = match report.worker {
            WorkerRef::FirstContact { ref tag } => {
                let worker = self.add_worker(tag.clone(), caller).await?;
                return Ok(Command::init(worker.id));
            }
            WorkerRef::Known(worker_id) => worker_id,
        };

        let Some(worker) = self.workers.get(&worker_id) else {
            error!(worker_id = %worker_id, caller = %caller, "Unknown worker");
            return Err(RollcallError::not_found(format!("unknown worker {worker_id}")));
        };

        if worker.is_stopped() {
            warn!(worker_id = %worker_id, caller = %caller, "Request from stopped worker");
            return Err(RollcallError::invalid(format!("{worker_id} has been stopped")));
        }

        self.record_report(&worker, &report, caller);

        debug!(
            worker_id = %worker.id,
            finished_command = %report.command_id,
            "Waiting for next command for worker"
        );
        let command = worker.mailbox.recv().await?;
        if command.kind == CommandKind::Stop {
            worker.mark_stopped();
        }
        debug!(
            worker_id = %worker.id,
            command_id = %command.id,
            "Sending next command to worker"
        );
        Ok(command)
    }

    /// Push `command` to every live worker and wait for all of them to
    /// report completion. Workers that collected Stop are no longer targeted.
    ///
    /// Broadcasts run one at a time and command ids must strictly increase.
    /// A worker that never polls again stalls the broadcast; there is no
    /// timeout. A Stop command completes once every worker has collected it.
    pub async fn broadcast_and_wait(&self, command: Command) -> Result<BroadcastOutcome> {
        if command.id.is_init() {
            return Err(RollcallError::invalid(format!(
                "{} is reserved for worker initialization",
                command.id
            )));
        }

        let mut dispatch = self.dispatch.lock().await;
        if let Some(last) = dispatch.last_command {
            if command.id <= last {
                return Err(RollcallError::invalid(format!(
                    "{} does not follow previously broadcast {last}",
                    command.id
                )));
            }
        }
        dispatch.last_command = Some(command.id);

        let targets = self.live_workers();
        if targets.is_empty() {
            warn!(command_id = %command.id, "Broadcast with no live workers");
            return Ok(BroadcastOutcome {
                command_id: command.id,
                workers: 0,
                worst_status: 0,
            });
        }

        if command.kind == CommandKind::Stop {
            // Stopped workers never report again; delivery is completion.
            info!(command_id = %command.id, workers = targets.len(), "Stopping workers");
            Self::deliver(&targets, &command).await?;
            targets.iter().for_each(|worker| worker.mark_stopped());
            return Ok(BroadcastOutcome {
                command_id: command.id,
                workers: targets.len(),
                worst_status: 0,
            });
        }

        // Start watching before any worker can receive the command, so a
        // fast report is never missed.
        let (done, on_done) = oneshot::channel();
        *self.pending.lock() = Some(PendingBroadcast {
            command_id: command.id,
            awaiting: targets.iter().map(|worker| worker.id).collect(),
            worst_status: 0,
            done: Some(done),
        });
        let _watch = WatchGuard(&self.pending);

        info!(
            command_id = %command.id,
            workers = targets.len(),
            "Broadcasting command"
        );
        Self::deliver(&targets, &command).await?;

        debug!(command_id = %command.id, "Command delivered; waiting for completions");
        let worst_status = on_done
            .await
            .map_err(|_| RollcallError::internal("broadcast completion tracking dropped"))?;

        info!(
            command_id = %command.id,
            workers = targets.len(),
            worst_status,
            "Broadcast completed"
        );
        Ok(BroadcastOutcome {
            command_id: command.id,
            workers: targets.len(),
            worst_status,
        })
    }

    /// Number of registered workers that have not been stopped.
    pub fn worker_count(&self) -> usize {
        self.live_workers().len()
    }

    /// Summaries of all registered workers in id order.
    pub fn workers(&self) -> Vec<WorkerSummary> {
        self.workers
            .snapshot()
            .iter()
            .map(|worker| {
                let state = worker.state.lock();
                WorkerSummary {
                    worker_id: worker.id,
                    tag: worker.tag.clone(),
                    status: state.status,
                    last_command: state.last_reported,
                    stopped: state.stopped,
                }
            })
            .collect()
    }

    fn live_workers(&self) -> Vec<Arc<Worker>> {
        self.workers
            .snapshot()
            .into_iter()
            .filter(|worker| !worker.is_stopped())
            .collect()
    }

    async fn deliver(targets: &[Arc<Worker>], command: &Command) -> Result<()> {
        let deliveries = targets
            .iter()
            .map(|worker| worker.mailbox.send(command.clone()));
        for delivery in futures::future::join_all(deliveries).await {
            delivery?;
        }
        Ok(())
    }

    async fn add_worker(&self, tag: String, caller: CallerAddr) -> Result<Arc<Worker>> {
        let worker_id = self.worker_ids.draw().await;
        info!(worker_id = %worker_id, tag = %tag, caller = %caller, "New worker");

        let worker = Arc::new(Worker {
            id: worker_id,
            tag,
            mailbox: Handoff::new(),
            state: Mutex::new(WorkerState::default()),
        });
        self.workers.insert_new(worker_id, Arc::clone(&worker))?;
        Ok(worker)
    }

    fn record_report(&self, worker: &Worker, report: &WorkerReport, caller: CallerAddr) {
        let fresh = {
            let mut state = worker.state.lock();
            if state.last_reported == Some(report.command_id) {
                false
            } else {
                state.status = report.status;
                state.last_reported = Some(report.command_id);
                true
            }
        };

        if !fresh {
            debug!(
                worker_id = %worker.id,
                command_id = %report.command_id,
                "Repeated report ignored"
            );
            return;
        }

        if report.status != 0 {
            error!(
                worker_id = %worker.id,
                command_id = %report.command_id,
                status = report.status,
                caller = %caller,
                "{}",
                report.message
            );
        } else {
            info!(
                worker_id = %worker.id,
                command_id = %report.command_id,
                status = report.status,
                caller = %caller,
                "{}",
                report.message
            );
        }

        let mut pending = self.pending.lock();
        let Some(broadcast) = pending.as_mut() else {
            return;
        };
        if broadcast.command_id != report.command_id || !broadcast.awaiting.remove(&worker.id) {
            return;
        }
        // Seeded with zero, so all-negative reports aggregate to zero.
        broadcast.worst_status = broadcast.worst_status.max(report.status);
        if broadcast.awaiting.is_empty() {
            if let Some(done) = broadcast.done.take() {
                let _ = done.send(broadcast.worst_status);
            }
        }
    }
}

impl std::fmt::Debug for WorkerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerOrchestrator")
            .field("workers", &self.workers.len())
            .field("capacity", &self.worker_ids.capacity())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight broadcast when the master stops waiting.
struct WatchGuard<'a>(&'a Mutex<Option<PendingBroadcast>>);

impl Drop for WatchGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn register(orchestrator: &WorkerOrchestrator, tag: &str) -> WorkerId {
        let init = orchestrator
            .next_command(WorkerReport::first_contact(tag), CallerAddr::UNKNOWN)
            .await
            .unwrap();
        match init.kind {
            CommandKind::Init { worker_id } => worker_id,
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_contact_returns_init() {
        let orchestrator = WorkerOrchestrator::new(8);
        assert_eq!(register(&orchestrator, "a").await, WorkerId(0));
        assert_eq!(register(&orchestrator, "b").await, WorkerId(1));
        let summaries = orchestrator.workers();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].tag, "b");
        assert_eq!(summaries[1].last_command, None);
    }

    #[tokio::test]
    async fn test_unknown_worker_is_not_found() {
        let orchestrator = WorkerOrchestrator::new(8);
        let err = orchestrator
            .next_command(
                WorkerReport::completed(WorkerId(42), CommandId(1), 0, ""),
                CallerAddr::UNKNOWN,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_known_worker_long_polls() {
        let orchestrator = WorkerOrchestrator::new(8);
        let worker_id = register(&orchestrator, "a").await;
        let poll = orchestrator.next_command(
            WorkerReport::completed(worker_id, CommandId::INIT, 0, "ready"),
            CallerAddr::UNKNOWN,
        );
        assert!(tokio::time::timeout(Duration::from_millis(30), poll)
            .await
            .is_err());
        assert_eq!(orchestrator.workers()[0].last_command, Some(CommandId::INIT));
    }

    #[tokio::test]
    async fn test_reserved_and_stale_command_ids_rejected() {
        let orchestrator = WorkerOrchestrator::new(8);
        let err = orchestrator
            .broadcast_and_wait(Command::init(WorkerId(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Invalid { .. }));

        let empty = orchestrator
            .broadcast_and_wait(Command::exec(CommandId(3), "noop", ""))
            .await
            .unwrap();
        assert_eq!(empty.workers, 0);

        let stale = orchestrator
            .broadcast_and_wait(Command::exec(CommandId(3), "noop", ""))
            .await
            .unwrap_err();
        assert!(matches!(stale, RollcallError::Invalid { .. }));
    }
}
