use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

use super::domain::{ExecutorTask, PendingTask, TaskId, TaskResult, TaskStatus};

/// Fixed per-task retry budget for failed executions.
pub const MAX_RETRIES: u8 = 2;

/// How long a claimed task may stay unreported before a sweep reclaims it.
pub const DEFAULT_CLAIM_LEASE_SECONDS: i64 = 300;

/// Default batch size handed to a polling executor.
pub const DEFAULT_CLAIM_LIMIT: usize = 3;

#[derive(Default)]
struct DispatchState {
    pending: VecDeque<PendingTask>,
    in_flight: HashMap<TaskId, PendingTask>,
    completed: HashMap<TaskId, TaskResult>,
}

/// Outcome of reporting a result back to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    pub requeued: bool,
}

/// What a sweep did with one expired lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseExpiry {
    pub task_id: TaskId,
    pub requeued: bool,
}

/// At-least-once, pull-based delivery of executor tasks with a bounded
/// retry budget. A task id lives in exactly one of pending, in-flight, or
/// completed at any time.
pub struct TaskDispatchQueue {
    state: Mutex<DispatchState>,
    lease_ttl: Duration,
}

impl Default for TaskDispatchQueue {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CLAIM_LEASE_SECONDS))
    }
}

impl TaskDispatchQueue {
    pub fn new(lease_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(DispatchState::default()),
            lease_ttl,
        }
    }

    /// Append a task to the tail of the pending FIFO with a fresh retry
    /// counter, returning the enriched queue entry.
    pub fn enqueue(&self, task: ExecutorTask) -> PendingTask {
        let pending = PendingTask {
            task,
            retries: 0,
            created_at: Utc::now(),
            lease_deadline: None,
        };

        let mut guard = self.state.lock().expect("dispatch mutex poisoned");
        guard.pending.push_back(pending.clone());
        pending
    }

    /// Atomically move up to `limit` tasks from the head of pending into the
    /// in-flight set, stamping each with a lease deadline. Returned tasks
    /// preserve FIFO order and never include an id already in flight.
    pub fn claim(&self, limit: usize) -> Vec<PendingTask> {
        let deadline = Utc::now() + self.lease_ttl;
        let mut guard = self.state.lock().expect("dispatch mutex poisoned");

        let mut claimed = Vec::new();
        while claimed.len() < limit {
            let Some(mut task) = guard.pending.pop_front() else {
                break;
            };
            task.lease_deadline = Some(deadline);
            guard
                .in_flight
                .insert(task.task.task_id.clone(), task.clone());
            claimed.push(task);
        }
        claimed
    }

    /// Record an executor-reported outcome.
    ///
    /// Results for ids that are not in flight (unknown, or already
    /// finalized by an earlier report) are stored without side effects so
    /// duplicate delivery stays idempotent. A FAILED result with budget
    /// remaining re-queues the same task id at the tail; everything else
    /// finalizes into the completed map.
    pub fn receive_result(&self, result: TaskResult) -> DispatchReceipt {
        let mut guard = self.state.lock().expect("dispatch mutex poisoned");

        let Some(mut task) = guard.in_flight.remove(&result.task_id) else {
            guard.completed.insert(result.task_id.clone(), result);
            return DispatchReceipt { requeued: false };
        };

        if result.status == TaskStatus::Failed && task.retries < MAX_RETRIES {
            task.retries += 1;
            task.lease_deadline = None;
            guard.pending.push_back(task);
            return DispatchReceipt { requeued: true };
        }

        guard.completed.insert(result.task_id.clone(), result);
        DispatchReceipt { requeued: false }
    }

    /// Read-only lookup of a previously stored completed result.
    pub fn peek_result(&self, task_id: &TaskId) -> Option<TaskResult> {
        let guard = self.state.lock().expect("dispatch mutex poisoned");
        guard.completed.get(task_id).cloned()
    }

    /// Return expired leases to the pending tail under the same retry
    /// budget. Leases with no budget left finalize as a synthetic FAILED
    /// result so the owning application can be failed by the caller.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<LeaseExpiry> {
        let mut guard = self.state.lock().expect("dispatch mutex poisoned");

        let expired: Vec<TaskId> = guard
            .in_flight
            .iter()
            .filter(|(_, task)| task.lease_deadline.is_some_and(|deadline| deadline <= now))
            .map(|(task_id, _)| task_id.clone())
            .collect();

        expired
            .into_iter()
            .map(|task_id| {
                let mut task = guard
                    .in_flight
                    .remove(&task_id)
                    .expect("expired lease still in flight");

                if task.retries < MAX_RETRIES {
                    task.retries += 1;
                    task.lease_deadline = None;
                    guard.pending.push_back(task);
                    LeaseExpiry {
                        task_id,
                        requeued: true,
                    }
                } else {
                    guard.completed.insert(
                        task_id.clone(),
                        TaskResult {
                            task_id: task_id.clone(),
                            status: TaskStatus::Failed,
                            data: Some(json!({ "reason": "lease expired after retry budget" })),
                            screenshot_url: None,
                        },
                    );
                    LeaseExpiry {
                        task_id,
                        requeued: false,
                    }
                }
            })
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        let guard = self.state.lock().expect("dispatch mutex poisoned");
        guard.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        let guard = self.state.lock().expect("dispatch mutex poisoned");
        guard.in_flight.len()
    }
}
