use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use crate::workflows::jobs::autopilot::AutopilotSettings;
use crate::workflows::jobs::collaborators::{
    CollaboratorError, FitnessEvaluator, TemplateTextGenerator, TextGenerator,
};
use crate::workflows::jobs::domain::{
    ApplyFlow, CandidateProfile, ExecutorTask, FitnessScore, JobId, JobPosting, LocationKind,
    PostingDraft, RiskFlag, ScoreBreakdown, TaskId, TaskKind, TaskResult, TaskStatus,
};
use crate::workflows::jobs::events::NotificationBus;
use crate::workflows::jobs::service::JobWorkspace;

pub(super) fn profile() -> CandidateProfile {
    CandidateProfile {
        name: "Test Candidate".to_string(),
        target_titles: vec!["Software Engineer".to_string()],
        skills: vec!["rust".to_string(), "tokio".to_string()],
        remote_required: true,
        min_compensation: Some(130_000),
    }
}

pub(super) fn posting(id: &str) -> JobPosting {
    JobPosting {
        id: JobId(id.to_string()),
        title: "Software Engineer".to_string(),
        company: "Acme".to_string(),
        url: "https://example.com/jobs/1".to_string(),
        description: "Build distributed systems.".to_string(),
        skills: vec!["rust".to_string(), "tokio".to_string()],
        compensation: Some(150_000),
        apply_flow: ApplyFlow::Simple,
        location: LocationKind::Remote,
        requires_clearance: false,
        discovered_at: Utc::now(),
    }
}

pub(super) fn draft() -> PostingDraft {
    PostingDraft {
        id: None,
        title: "Software Engineer".to_string(),
        company: "Acme".to_string(),
        url: "https://example.com/jobs/1".to_string(),
        description: "Build distributed systems.".to_string(),
        skills: vec!["rust".to_string(), "tokio".to_string()],
        compensation: Some(150_000),
        apply_flow: ApplyFlow::Simple,
        location: LocationKind::Remote,
        requires_clearance: false,
    }
}

pub(super) fn fitness(job_id: JobId, total: u8, risk_flags: Vec<RiskFlag>) -> FitnessScore {
    FitnessScore {
        job_id,
        total_score: total,
        risk_flags,
        breakdown: ScoreBreakdown {
            title_match: total,
            skills_match: total,
            compensation_match: total,
            remote_match: total,
            semantic_fit: total,
            weighted_total: total,
        },
        scored_at: Utc::now(),
    }
}

pub(super) fn task(id: &str) -> ExecutorTask {
    ExecutorTask {
        task_id: TaskId(id.to_string()),
        kind: TaskKind::Apply,
        payload: json!({ "url": "https://example.com/jobs/1" }),
    }
}

pub(super) fn result(id: &str, status: TaskStatus) -> TaskResult {
    TaskResult {
        task_id: TaskId(id.to_string()),
        status,
        data: None,
        screenshot_url: None,
    }
}

/// Evaluator that always reports the same rating.
pub(super) struct FixedEvaluator {
    pub(super) total: u8,
    pub(super) risk_flags: Vec<RiskFlag>,
}

#[async_trait]
impl FitnessEvaluator for FixedEvaluator {
    async fn evaluate(
        &self,
        posting: &JobPosting,
        _profile: &CandidateProfile,
    ) -> Result<FitnessScore, CollaboratorError> {
        Ok(fitness(
            posting.id.clone(),
            self.total,
            self.risk_flags.clone(),
        ))
    }
}

/// Evaluator standing in for an unreachable scoring backend.
pub(super) struct FailingEvaluator;

#[async_trait]
impl FitnessEvaluator for FailingEvaluator {
    async fn evaluate(
        &self,
        _posting: &JobPosting,
        _profile: &CandidateProfile,
    ) -> Result<FitnessScore, CollaboratorError> {
        Err(CollaboratorError::Transport(
            "scoring backend offline".to_string(),
        ))
    }
}

/// Generator standing in for an unreachable text backend.
pub(super) struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(
        &self,
        _posting: &JobPosting,
        _profile: &CandidateProfile,
    ) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Transport(
            "text backend offline".to_string(),
        ))
    }
}

/// Generator that responds with unusable whitespace.
pub(super) struct BlankGenerator;

#[async_trait]
impl TextGenerator for BlankGenerator {
    async fn generate(
        &self,
        _posting: &JobPosting,
        _profile: &CandidateProfile,
    ) -> Result<String, CollaboratorError> {
        Ok("   \n  ".to_string())
    }
}

pub(super) fn workspace() -> Arc<JobWorkspace> {
    Arc::new(JobWorkspace::new(
        profile(),
        AutopilotSettings::default(),
        Arc::new(NotificationBus::default()),
    ))
}

pub(super) fn workspace_with(
    evaluator: Arc<dyn FitnessEvaluator>,
    generator: Arc<dyn TextGenerator>,
) -> Arc<JobWorkspace> {
    Arc::new(JobWorkspace::with_collaborators(
        profile(),
        AutopilotSettings::default(),
        Arc::new(NotificationBus::default()),
        evaluator,
        generator,
        Duration::seconds(300),
    ))
}

/// Workspace whose claim leases expire immediately, for sweep scenarios.
pub(super) fn workspace_with_dead_leases() -> Arc<JobWorkspace> {
    Arc::new(JobWorkspace::with_collaborators(
        profile(),
        AutopilotSettings::default(),
        Arc::new(NotificationBus::default()),
        Arc::new(FixedEvaluator {
            total: 95,
            risk_flags: Vec::new(),
        }),
        Arc::new(TemplateTextGenerator),
        Duration::zero(),
    ))
}

pub(super) fn discover_one(workspace: &JobWorkspace, descriptor: PostingDraft) -> JobId {
    let mut postings = workspace.discover(vec![descriptor]);
    postings.remove(0).id
}
