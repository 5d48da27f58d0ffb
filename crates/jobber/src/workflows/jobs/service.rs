use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::autopilot::{evaluate_autopilot, AutopilotAction, AutopilotSettings};
use super::catalog::PostingCatalog;
use super::collaborators::{
    FitnessEvaluator, HeuristicFitnessEvaluator, TemplateTextGenerator, TextGenerator,
};
use super::dispatch::{LeaseExpiry, TaskDispatchQueue, DEFAULT_CLAIM_LEASE_SECONDS};
use super::domain::{
    ApplicationRecord, ApplicationStatus, CandidateProfile, DraftArtifacts, EventKind,
    ExecutorTask, FitnessScore, JobId, JobPosting, PendingTask, PostingDraft, TaskId, TaskKind,
    TaskResult, TaskStatus,
};
use super::drafting;
use super::events::NotificationBus;
use super::ledger::ApplicationLedger;
use super::scoring;

/// Error raised by workspace operations. Only reference errors surface;
/// collaborator failures degrade to deterministic fallbacks instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("unknown job id {0}")]
    UnknownJob(JobId),
}

/// Status and policy rationale returned to the caller of `queue_apply`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueOutcome {
    pub status: ApplicationStatus,
    pub reasons: Vec<String>,
}

/// Acknowledgement returned to the executor after a result report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutorReceipt {
    pub ok: bool,
    pub requeued: bool,
}

/// Point-in-time view of the catalog, latest scores, and ledger state.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    pub jobs: Vec<JobPosting>,
    pub scores: Vec<FitnessScore>,
    pub applications: Vec<ApplicationRecord>,
}

/// Shared orchestration context wiring the posting catalog, score and draft
/// caches, application ledger, dispatch queue, notification bus, and the
/// pluggable collaborators.
///
/// Constructed once per process and injected into every operation; there is
/// no ambient module-level state. Mutating operations on the same posting id
/// are serialized through a per-key async lock so read-modify-write
/// sequences spanning awaits stay atomic end-to-end.
pub struct JobWorkspace {
    profile: CandidateProfile,
    settings: AutopilotSettings,
    catalog: PostingCatalog,
    scores: Mutex<HashMap<JobId, FitnessScore>>,
    drafts: Mutex<HashMap<JobId, DraftArtifacts>>,
    ledger: ApplicationLedger,
    queue: TaskDispatchQueue,
    events: Arc<NotificationBus>,
    evaluator: Arc<dyn FitnessEvaluator>,
    generator: Arc<dyn TextGenerator>,
    posting_locks: Mutex<HashMap<JobId, Arc<tokio::sync::Mutex<()>>>>,
}

impl JobWorkspace {
    /// Workspace with the deterministic heuristic collaborators and the
    /// default claim lease.
    pub fn new(
        profile: CandidateProfile,
        settings: AutopilotSettings,
        events: Arc<NotificationBus>,
    ) -> Self {
        Self::with_collaborators(
            profile,
            settings,
            events,
            Arc::new(HeuristicFitnessEvaluator::default()),
            Arc::new(TemplateTextGenerator),
            Duration::seconds(DEFAULT_CLAIM_LEASE_SECONDS),
        )
    }

    pub fn with_collaborators(
        profile: CandidateProfile,
        settings: AutopilotSettings,
        events: Arc<NotificationBus>,
        evaluator: Arc<dyn FitnessEvaluator>,
        generator: Arc<dyn TextGenerator>,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            profile,
            settings,
            catalog: PostingCatalog::default(),
            scores: Mutex::new(HashMap::new()),
            drafts: Mutex::new(HashMap::new()),
            ledger: ApplicationLedger::default(),
            queue: TaskDispatchQueue::new(lease_ttl),
            events,
            evaluator,
            generator,
            posting_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest a batch of posting descriptors. Discovery never touches the
    /// application ledger.
    pub fn discover(&self, drafts: Vec<PostingDraft>) -> Vec<JobPosting> {
        let postings = self.catalog.discover(drafts);
        info!(count = postings.len(), "postings discovered");
        postings
    }

    /// Score a posting, store the latest rating, and publish `job_scored`.
    /// Idempotent: callable repeatedly, never changes application state.
    pub async fn score(&self, job_id: &JobId) -> Result<FitnessScore, WorkspaceError> {
        let posting = self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;
        Ok(self.score_locked(&posting).await)
    }

    /// Generate and store draft artifacts for a posting. Generator failures
    /// degrade to the deterministic template; nothing surfaces to the caller
    /// beyond a reference error.
    pub async fn draft(&self, job_id: &JobId) -> Result<DraftArtifacts, WorkspaceError> {
        let posting = self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        let cover_letter = match self.generator.generate(&posting, &self.profile).await {
            Ok(raw) => drafting::normalize_draft(&raw)
                .unwrap_or_else(|| drafting::fallback_cover_letter(&posting, &self.profile)),
            Err(err) => {
                warn!(job_id = %posting.id, %err, "text generator failed, using template");
                drafting::fallback_cover_letter(&posting, &self.profile)
            }
        };

        let artifacts = drafting::build_artifacts(&posting, cover_letter);
        let mut guard = self.drafts.lock().expect("draft mutex poisoned");
        guard.insert(posting.id.clone(), artifacts.clone());
        Ok(artifacts)
    }

    /// Evaluate the autopilot for a posting and record the outcome: an
    /// `AUTO_APPLY` decision enqueues an executor task and queues the
    /// application, `REQUIRE_APPROVAL` parks it for a human, and `BLOCK`
    /// closes it out. Scores the posting first if no rating is cached.
    pub async fn queue_apply(&self, job_id: &JobId) -> Result<QueueOutcome, WorkspaceError> {
        let posting = self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        let scored = match self.latest_score(job_id) {
            Some(scored) => scored,
            None => self.score_locked(&posting).await,
        };
        let decision = evaluate_autopilot(&posting, &scored, &self.profile, &self.settings);
        info!(job_id = %posting.id, action = ?decision.action, "autopilot decision");

        let record = match decision.action {
            AutopilotAction::AutoApply => {
                let task = self.build_apply_task(&posting, false);
                let pending = self.queue.enqueue(task);
                self.ledger.record_queued(
                    job_id,
                    pending.task.task_id.clone(),
                    decision.reasons.join(" "),
                )
            }
            AutopilotAction::RequireApproval => {
                let record = self
                    .ledger
                    .record_needs_approval(job_id, decision.reasons.join(" "));
                self.events.publish(
                    EventKind::ApprovalRequired,
                    json!({
                        "job_id": job_id.0,
                        "score": scored.total_score,
                        "reasons": decision.reasons,
                    }),
                );
                record
            }
            AutopilotAction::Block => self
                .ledger
                .record_blocked(job_id, decision.reasons.join(" ")),
        };

        Ok(QueueOutcome {
            status: record.status,
            reasons: decision.reasons,
        })
    }

    /// Manual override bypassing the autopilot: always enqueues an APPLY
    /// task tagged as manually approved and queues the application.
    pub async fn approve(&self, job_id: &JobId) -> Result<ApplicationRecord, WorkspaceError> {
        let posting = self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        let task = self.build_apply_task(&posting, true);
        let pending = self.queue.enqueue(task);
        Ok(self.ledger.record_queued(
            job_id,
            pending.task.task_id.clone(),
            "Approved by user for manual-gated flow.".to_string(),
        ))
    }

    pub async fn reject(&self, job_id: &JobId) -> Result<ApplicationRecord, WorkspaceError> {
        self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        Ok(self
            .ledger
            .record_blocked(job_id, "Rejected by user.".to_string()))
    }

    /// Force the application into `NEEDS_APPROVAL` and announce it; used
    /// when the executor reports a checkpoint needing a human.
    pub async fn require_approval(
        &self,
        job_id: &JobId,
        reason: &str,
    ) -> Result<ApplicationRecord, WorkspaceError> {
        self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        let record = self
            .ledger
            .record_needs_approval(job_id, reason.to_string());
        self.events.publish(
            EventKind::ApprovalRequired,
            json!({ "job_id": job_id.0, "reasons": [reason] }),
        );
        Ok(record)
    }

    /// Finalize a submitted application with its evidence reference and
    /// announce `application_submitted`.
    pub async fn mark_applied(
        &self,
        job_id: &JobId,
        screenshot_url: Option<String>,
        notes: Option<String>,
    ) -> Result<ApplicationRecord, WorkspaceError> {
        self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        let record = self
            .ledger
            .record_submitted(job_id, screenshot_url, notes);
        self.events.publish(
            EventKind::ApplicationSubmitted,
            json!({
                "job_id": job_id.0,
                "screenshot_url": record.screenshot_url,
            }),
        );
        Ok(record)
    }

    /// Move the application to terminal `FAILED`; used once the retry
    /// budget on the linked task is exhausted.
    pub async fn fail(
        &self,
        job_id: &JobId,
        reason: &str,
    ) -> Result<ApplicationRecord, WorkspaceError> {
        self.posting(job_id)?;
        let lock = self.posting_lock(job_id);
        let _guard = lock.lock().await;

        Ok(self.ledger.record_failed(job_id, reason.to_string()))
    }

    /// Hand up to `limit` pending tasks to a polling executor.
    pub fn claim_tasks(&self, limit: usize) -> Vec<PendingTask> {
        self.queue.claim(limit)
    }

    /// Route an executor-reported result through the dispatch queue and
    /// back into the ledger. Results whose task id maps to no application
    /// are acknowledged without further effect.
    pub async fn handle_executor_result(
        &self,
        result: TaskResult,
    ) -> Result<ExecutorReceipt, WorkspaceError> {
        let receipt = self.queue.receive_result(result.clone());

        let Some(application) = self.ledger.find_by_task(&result.task_id) else {
            return Ok(ExecutorReceipt {
                ok: true,
                requeued: receipt.requeued,
            });
        };

        match result.status {
            TaskStatus::Success => {
                self.mark_applied(
                    &application.job_id,
                    result.screenshot_url.clone(),
                    Some("Executor completed task successfully.".to_string()),
                )
                .await?;
            }
            TaskStatus::NeedsApproval => {
                self.require_approval(
                    &application.job_id,
                    "Executor detected a captcha or manual checkpoint.",
                )
                .await?;
            }
            TaskStatus::Failed => {
                if !receipt.requeued {
                    self.fail(&application.job_id, "Executor failed after retry budget.")
                        .await?;
                }
            }
        }

        Ok(ExecutorReceipt {
            ok: true,
            requeued: receipt.requeued,
        })
    }

    /// Return expired claim leases to the queue; applications whose task
    /// spent its whole budget in dead leases move to terminal `FAILED`.
    pub async fn sweep_leases(&self) -> Result<Vec<LeaseExpiry>, WorkspaceError> {
        let swept = self.queue.sweep_expired(Utc::now());

        for expiry in &swept {
            if expiry.requeued {
                continue;
            }
            if let Some(application) = self.ledger.find_by_task(&expiry.task_id) {
                self.fail(
                    &application.job_id,
                    "Task lease expired after retry budget.",
                )
                .await?;
            }
        }

        Ok(swept)
    }

    pub fn peek_result(&self, task_id: &TaskId) -> Option<TaskResult> {
        self.queue.peek_result(task_id)
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let scores = {
            let guard = self.scores.lock().expect("score mutex poisoned");
            guard.values().cloned().collect()
        };
        WorkspaceSnapshot {
            jobs: self.catalog.list(),
            scores,
            applications: self.ledger.list(),
        }
    }

    pub fn events(&self) -> Arc<NotificationBus> {
        self.events.clone()
    }

    pub fn application(&self, job_id: &JobId) -> Option<ApplicationRecord> {
        self.ledger.get(job_id)
    }

    pub fn application_by_task(&self, task_id: &TaskId) -> Option<ApplicationRecord> {
        self.ledger.find_by_task(task_id)
    }

    pub fn latest_score(&self, job_id: &JobId) -> Option<FitnessScore> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        guard.get(job_id).cloned()
    }

    pub fn latest_draft(&self, job_id: &JobId) -> Option<DraftArtifacts> {
        let guard = self.drafts.lock().expect("draft mutex poisoned");
        guard.get(job_id).cloned()
    }

    fn posting(&self, job_id: &JobId) -> Result<JobPosting, WorkspaceError> {
        self.catalog
            .get(job_id)
            .ok_or_else(|| WorkspaceError::UnknownJob(job_id.clone()))
    }

    /// Score with the configured evaluator, degrading to the heuristic
    /// rating when it fails. Caller holds the per-posting lock.
    async fn score_locked(&self, posting: &JobPosting) -> FitnessScore {
        let scored = match self.evaluator.evaluate(posting, &self.profile).await {
            Ok(scored) => FitnessScore {
                // Ratings are keyed by the catalog id, not whatever the
                // collaborator echoed back.
                job_id: posting.id.clone(),
                ..scored
            },
            Err(err) => {
                warn!(job_id = %posting.id, %err, "fitness evaluator failed, using heuristics");
                scoring::heuristic_score(posting, &self.profile)
            }
        };

        {
            let mut guard = self.scores.lock().expect("score mutex poisoned");
            guard.insert(posting.id.clone(), scored.clone());
        }
        self.events.publish(
            EventKind::JobScored,
            json!({
                "job_id": posting.id.0,
                "total_score": scored.total_score,
                "risk_flags": scored.risk_flags,
            }),
        );
        scored
    }

    fn build_apply_task(&self, posting: &JobPosting, manual_approval: bool) -> ExecutorTask {
        let draft = self.latest_draft(&posting.id);
        let mut payload = json!({
            "job_id": posting.id.0,
            "url": posting.url,
            "company": posting.company,
            "title": posting.title,
            "draft": draft,
        });
        if manual_approval {
            payload["manual_approval"] = json!(true);
        }

        ExecutorTask {
            task_id: TaskId::generate(),
            kind: TaskKind::Apply,
            payload,
        }
    }

    fn posting_lock(&self, job_id: &JobId) -> Arc<tokio::sync::Mutex<()>> {
        let mut guard = self
            .posting_locks
            .lock()
            .expect("lock registry mutex poisoned");
        guard.entry(job_id.clone()).or_default().clone()
    }
}
