//! Properties of worker registration and master broadcasts.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use rollcall_coordinator::{run_master, CallerAddr, Coordinator, MasterScript, MasterStep};
use rollcall_core::{
    Command, CommandId, CommandKind, CoordinatorConfig, RollcallError, WorkerId, WorkerReport,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn coordinator() -> Arc<Coordinator> {
    Arc::new(Coordinator::new(CoordinatorConfig::for_cluster(4)).unwrap())
}

async fn first_contact(coordinator: &Coordinator, tag: &str) -> WorkerId {
    let init = coordinator
        .next_command(WorkerReport::first_contact(tag), CallerAddr::UNKNOWN)
        .await
        .unwrap();
    assert_eq!(init.id, CommandId::INIT);
    match init.kind {
        CommandKind::Init { worker_id } => worker_id,
        other => panic!("expected init, got {other:?}"),
    }
}

/// Drive one worker until Stop, answering every command with `status`.
/// Returns the ids of the commands it received.
fn spawn_worker(
    coordinator: &Arc<Coordinator>,
    tag: &'static str,
    status: i32,
) -> tokio::task::JoinHandle<Vec<CommandId>> {
    let coordinator = Arc::clone(coordinator);
    tokio::spawn(async move {
        let worker_id = first_contact(&coordinator, tag).await;
        let mut report = WorkerReport::completed(worker_id, CommandId::INIT, 0, "ready");
        let mut received = Vec::new();
        loop {
            let command = coordinator
                .next_command(report, CallerAddr::UNKNOWN)
                .await
                .unwrap();
            received.push(command.id);
            if command.kind == CommandKind::Stop {
                return received;
            }
            report = WorkerReport::completed(worker_id, command.id, status, format!("{tag} done"));
        }
    })
}

async fn wait_for_workers(coordinator: &Coordinator, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.worker_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("workers registered");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_contacts_get_dense_ids() {
    let coordinator = coordinator();
    let handles: Vec<_> = (0..32)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { first_contact(&coordinator, "load").await })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().value());
    }
    assert_eq!(ids, (0..32).collect::<BTreeSet<u32>>());
    assert_eq!(coordinator.worker_count(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_reports_worst_status() {
    let coordinator = coordinator();
    let workers: Vec<_> = [0, 0, 3, 0]
        .into_iter()
        .map(|status| spawn_worker(&coordinator, "bench", status))
        .collect();
    wait_for_workers(&coordinator, 4).await;

    let outcome = coordinator
        .broadcast_and_wait(Command::exec(CommandId(1), "bench", "run"))
        .await
        .unwrap();
    assert_eq!(outcome.workers, 4);
    assert_eq!(outcome.worst_status, 3);

    let statuses: Vec<i32> = coordinator.workers().iter().map(|w| w.status).collect();
    assert_eq!(statuses.iter().max(), Some(&3));
    assert!(coordinator
        .workers()
        .iter()
        .all(|w| w.last_command == Some(CommandId(1))));

    coordinator
        .broadcast_and_wait(Command::stop(CommandId(2)))
        .await
        .unwrap();
    for worker in workers {
        assert_eq!(worker.await.unwrap(), vec![CommandId(1), CommandId(2)]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcast_waits_for_every_worker() {
    let coordinator = coordinator();
    let prompt = spawn_worker(&coordinator, "fast", 0);
    wait_for_workers(&coordinator, 1).await;

    // A second worker that collects the command but has not reported yet.
    let slow_id = first_contact(&coordinator, "slow").await;
    let slow_poll = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .next_command(
                    WorkerReport::completed(slow_id, CommandId::INIT, 0, "ready"),
                    CallerAddr::UNKNOWN,
                )
                .await
        })
    };

    let broadcast = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .broadcast_and_wait(Command::exec(CommandId(1), "step", ""))
                .await
        })
    };

    let command = slow_poll.await.unwrap().unwrap();
    assert_eq!(command.id, CommandId(1));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!broadcast.is_finished(), "slow worker has not reported");

    // A repeated report of the previous command changes nothing.
    let stale = coordinator.next_command(
        WorkerReport::completed(slow_id, CommandId::INIT, 9, "retry"),
        CallerAddr::UNKNOWN,
    );
    assert!(tokio::time::timeout(Duration::from_millis(20), stale)
        .await
        .is_err());
    assert!(!broadcast.is_finished());

    let report = coordinator.next_command(
        WorkerReport::completed(slow_id, CommandId(1), 0, "done"),
        CallerAddr::UNKNOWN,
    );
    let _ = tokio::time::timeout(Duration::from_millis(20), report).await;

    let outcome = broadcast.await.unwrap().unwrap();
    assert_eq!(outcome.workers, 2);
    assert_eq!(outcome.worst_status, 0);
    assert!(!prompt.is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_report_counts_once() {
    let coordinator = coordinator();
    let first = first_contact(&coordinator, "a").await;
    let second = first_contact(&coordinator, "b").await;

    // Both workers park in their long-poll.
    let polls: Vec<_> = [first, second]
        .into_iter()
        .map(|worker_id| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .next_command(
                        WorkerReport::completed(worker_id, CommandId::INIT, 0, "ready"),
                        CallerAddr::UNKNOWN,
                    )
                    .await
            })
        })
        .collect();

    let broadcast = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .broadcast_and_wait(Command::exec(CommandId(1), "step", ""))
                .await
        })
    };
    for poll in polls {
        assert_eq!(poll.await.unwrap().unwrap().id, CommandId(1));
    }

    // The first worker reports the same completion twice.
    for _ in 0..2 {
        let report = coordinator.next_command(
            WorkerReport::completed(first, CommandId(1), 5, "done"),
            CallerAddr::UNKNOWN,
        );
        let _ = tokio::time::timeout(Duration::from_millis(20), report).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!broadcast.is_finished(), "second worker still outstanding");

    let report = coordinator.next_command(
        WorkerReport::completed(second, CommandId(1), 1, "done"),
        CallerAddr::UNKNOWN,
    );
    let _ = tokio::time::timeout(Duration::from_millis(20), report).await;

    let outcome = broadcast.await.unwrap().unwrap();
    assert_eq!(outcome.worst_status, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn negative_statuses_aggregate_to_zero() {
    let coordinator = coordinator();
    let _workers: Vec<_> = [-1, -5]
        .into_iter()
        .map(|status| spawn_worker(&coordinator, "bench", status))
        .collect();
    wait_for_workers(&coordinator, 2).await;

    let outcome = coordinator
        .broadcast_and_wait(Command::exec(CommandId(1), "bench", "run"))
        .await
        .unwrap();
    assert_eq!(outcome.workers, 2);
    assert_eq!(outcome.worst_status, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stopped_workers_leave_later_broadcasts() {
    let coordinator = coordinator();
    let first = spawn_worker(&coordinator, "first", 0);
    wait_for_workers(&coordinator, 1).await;

    coordinator
        .broadcast_and_wait(Command::stop(CommandId(1)))
        .await
        .unwrap();
    assert_eq!(first.await.unwrap(), vec![CommandId(1)]);
    assert_eq!(coordinator.worker_count(), 0);

    let late = spawn_worker(&coordinator, "late", 0);
    wait_for_workers(&coordinator, 1).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        coordinator.broadcast_and_wait(Command::exec(CommandId(2), "bench", "run")),
    )
    .await
    .expect("broadcast skips stopped workers")
    .unwrap();
    assert_eq!(outcome.workers, 1);
    assert_eq!(outcome.worst_status, 0);

    let summaries = coordinator.workers();
    assert_eq!(summaries.len(), 2);
    assert!(summaries[0].stopped);
    assert!(!summaries[1].stopped);

    let err = coordinator
        .next_command(
            WorkerReport::completed(summaries[0].worker_id, CommandId(1), 0, "again"),
            CallerAddr::UNKNOWN,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RollcallError::Invalid { .. }));

    coordinator
        .broadcast_and_wait(Command::stop(CommandId(3)))
        .await
        .unwrap();
    assert_eq!(late.await.unwrap(), vec![CommandId(2), CommandId(3)]);
}

#[tokio::test]
async fn unknown_worker_is_rejected() {
    let coordinator = coordinator();
    let err = coordinator
        .next_command(
            WorkerReport::completed(WorkerId(7), CommandId(1), 0, ""),
            CallerAddr::UNKNOWN,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RollcallError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn master_script_drives_workers_to_stop() {
    let coordinator = coordinator();
    let workers: Vec<_> = (0..3)
        .map(|_| spawn_worker(&coordinator, "bench", 0))
        .collect();

    let script = MasterScript {
        steps: vec![
            MasterStep::WaitWorkers { count: 3 },
            MasterStep::Exec {
                tag: "warmup".to_string(),
                payload: String::new(),
            },
            MasterStep::Exec {
                tag: "measure".to_string(),
                payload: "30s".to_string(),
            },
            MasterStep::Stop,
        ],
    };
    let outcomes = run_master(&coordinator, &script).await.unwrap();
    let ids: Vec<CommandId> = outcomes.iter().map(|o| o.command_id).collect();
    assert_eq!(ids, vec![CommandId(1), CommandId(2), CommandId(3)]);
    assert!(outcomes.iter().all(|o| o.workers == 3 && o.worst_status == 0));

    for worker in workers {
        assert_eq!(
            worker.await.unwrap(),
            vec![CommandId(1), CommandId(2), CommandId(3)]
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn master_script_aborts_on_failure() {
    let coordinator = coordinator();
    let _workers: Vec<_> = [0, 2]
        .into_iter()
        .map(|status| spawn_worker(&coordinator, "bench", status))
        .collect();

    let script = MasterScript {
        steps: vec![
            MasterStep::WaitWorkers { count: 2 },
            MasterStep::Exec {
                tag: "measure".to_string(),
                payload: String::new(),
            },
            MasterStep::Stop,
        ],
    };
    let err = run_master(&coordinator, &script).await.unwrap_err();
    assert!(matches!(err, RollcallError::Internal { .. }));
}
