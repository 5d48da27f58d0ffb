use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for discovered job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for application records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Identifier wrapper for executor tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a posting expects applications to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyFlow {
    Simple,
    Workday,
    Greenhouse,
    Lever,
    Custom,
}

/// Where the role is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Remote,
    Hybrid,
    Onsite,
}

/// A job opportunity record ingested by discovery. Immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub url: String,
    pub description: String,
    pub skills: Vec<String>,
    pub compensation: Option<u32>,
    pub apply_flow: ApplyFlow,
    pub location: LocationKind,
    pub requires_clearance: bool,
    pub discovered_at: DateTime<Utc>,
}

/// Posting descriptor accepted at the ingestion boundary. Ids and discovery
/// timestamps are assigned for entries missing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingDraft {
    #[serde(default)]
    pub id: Option<JobId>,
    pub title: String,
    pub company: String,
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub compensation: Option<u32>,
    pub apply_flow: ApplyFlow,
    pub location: LocationKind,
    #[serde(default)]
    pub requires_clearance: bool,
}

/// Candidate preferences the scoring heuristics and autopilot evaluate against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub target_titles: Vec<String>,
    pub skills: Vec<String>,
    pub remote_required: bool,
    pub min_compensation: Option<u32>,
}

/// Discrete risk tags consumed by the autopilot policy rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFlag {
    ClearanceRequired,
    OnsiteOnly,
    WorkdayFlow,
}

/// Per-component fitness scores alongside the weighted composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub title_match: u8,
    pub skills_match: u8,
    pub compensation_match: u8,
    pub remote_match: u8,
    pub semantic_fit: u8,
    pub weighted_total: u8,
}

/// Latest fitness rating for a posting. Re-scoring overwrites the prior value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessScore {
    pub job_id: JobId,
    pub total_score: u8,
    pub risk_flags: Vec<RiskFlag>,
    pub breakdown: ScoreBreakdown,
    pub scored_at: DateTime<Utc>,
}

/// Generated application collateral, keyed by posting id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftArtifacts {
    pub resume_summary: String,
    pub cover_letter: String,
    pub outreach_draft: String,
    pub generated_at: DateTime<Utc>,
}

/// Application lifecycle states. `InProgress` is the implicit state on first
/// touch; the other five are reached through ledger operations and, aside
/// from `Queued`, no operation leaves them automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    InProgress,
    Queued,
    NeedsApproval,
    Submitted,
    Blocked,
    Failed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::Queued => "QUEUED",
            ApplicationStatus::NeedsApproval => "NEEDS_APPROVAL",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::Blocked => "BLOCKED",
            ApplicationStatus::Failed => "FAILED",
        }
    }
}

/// Exactly one per posting, created lazily on the first lifecycle-affecting
/// operation. Owned and exclusively mutated by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of work delegated to the external executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Apply,
    Outreach,
}

/// A unit of delegated work handed to the external executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorTask {
    pub task_id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub payload: serde_json::Value,
}

/// Queue entry wrapping a task with its retry counter and lease state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    #[serde(flatten)]
    pub task: ExecutorTask,
    pub retries: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_deadline: Option<DateTime<Utc>>,
}

/// Executor-reported outcome status for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failed,
    NeedsApproval,
}

/// Reported outcome for a claimed task. Duplicate or late reports for an
/// already finalized task id are accepted without error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
}

/// Closed set of lifecycle events broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobScored,
    ApplicationSubmitted,
    ApprovalRequired,
}

impl EventKind {
    pub const fn label(self) -> &'static str {
        match self {
            EventKind::JobScored => "job_scored",
            EventKind::ApplicationSubmitted => "application_submitted",
            EventKind::ApprovalRequired => "approval_required",
        }
    }
}

/// Tagged payload published once per lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
