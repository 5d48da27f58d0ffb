use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStatus, JobId, TaskId};

/// Per-posting application state machine. Holds exactly one record per job
/// id, created lazily on the first lifecycle-affecting operation; every
/// mutation refreshes `updated_at`.
#[derive(Default)]
pub struct ApplicationLedger {
    records: Mutex<HashMap<JobId, ApplicationRecord>>,
}

impl ApplicationLedger {
    /// Transition the record to `Queued` with the linked executor task.
    pub fn record_queued(&self, job_id: &JobId, task_id: TaskId, notes: String) -> ApplicationRecord {
        self.mutate(job_id, |record| {
            record.status = ApplicationStatus::Queued;
            record.task_id = Some(task_id);
            record.notes = Some(notes);
        })
    }

    /// Park the record until a human decides.
    pub fn record_needs_approval(&self, job_id: &JobId, notes: String) -> ApplicationRecord {
        self.mutate(job_id, |record| {
            record.status = ApplicationStatus::NeedsApproval;
            record.notes = Some(notes);
        })
    }

    pub fn record_blocked(&self, job_id: &JobId, notes: String) -> ApplicationRecord {
        self.mutate(job_id, |record| {
            record.status = ApplicationStatus::Blocked;
            record.notes = Some(notes);
        })
    }

    /// Finalize a successful submission. Existing notes survive when the
    /// caller supplies none.
    pub fn record_submitted(
        &self,
        job_id: &JobId,
        screenshot_url: Option<String>,
        notes: Option<String>,
    ) -> ApplicationRecord {
        self.mutate(job_id, |record| {
            record.status = ApplicationStatus::Submitted;
            record.screenshot_url = screenshot_url;
            if notes.is_some() {
                record.notes = notes;
            }
        })
    }

    pub fn record_failed(&self, job_id: &JobId, reason: String) -> ApplicationRecord {
        self.mutate(job_id, |record| {
            record.status = ApplicationStatus::Failed;
            record.notes = Some(reason);
        })
    }

    pub fn get(&self, job_id: &JobId) -> Option<ApplicationRecord> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        guard.get(job_id).cloned()
    }

    pub fn list(&self) -> Vec<ApplicationRecord> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        guard.values().cloned().collect()
    }

    /// Route an asynchronous task result back to the owning application.
    pub fn find_by_task(&self, task_id: &TaskId) -> Option<ApplicationRecord> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        guard
            .values()
            .find(|record| record.task_id.as_ref() == Some(task_id))
            .cloned()
    }

    fn mutate(
        &self,
        job_id: &JobId,
        apply: impl FnOnce(&mut ApplicationRecord),
    ) -> ApplicationRecord {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        let record = guard.entry(job_id.clone()).or_insert_with(|| {
            let now = Utc::now();
            ApplicationRecord {
                id: ApplicationId::generate(),
                job_id: job_id.clone(),
                status: ApplicationStatus::InProgress,
                task_id: None,
                screenshot_url: None,
                notes: None,
                created_at: now,
                updated_at: now,
            }
        });
        apply(record);
        record.updated_at = Utc::now();
        record.clone()
    }
}
