//! Job-application orchestration: posting discovery, fitness scoring,
//! autopilot decisioning, and delegated execution with bounded retries.
//!
//! The workflow advances each discovered posting through a lifecycle of
//! scoring, policy-gated decisioning, and pull-based delegation to an
//! external executor, publishing every transition to realtime observers.

pub mod autopilot;
pub mod catalog;
pub mod collaborators;
pub mod dispatch;
pub mod domain;
mod drafting;
pub mod events;
pub mod ledger;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use autopilot::{
    evaluate_autopilot, AutopilotAction, AutopilotDecision, AutopilotSettings,
    DEFAULT_APPROVAL_THRESHOLD, DEFAULT_AUTO_APPLY_THRESHOLD,
};
pub use catalog::PostingCatalog;
pub use collaborators::{
    CollaboratorError, FitnessEvaluator, HeuristicFitnessEvaluator, TemplateTextGenerator,
    TextGenerator,
};
pub use dispatch::{
    DispatchReceipt, LeaseExpiry, TaskDispatchQueue, DEFAULT_CLAIM_LEASE_SECONDS,
    DEFAULT_CLAIM_LIMIT, MAX_RETRIES,
};
pub use domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplyFlow, CandidateProfile,
    DraftArtifacts, EventKind, ExecutorTask, FitnessScore, JobId, JobPosting, LocationKind,
    NotificationEvent, PendingTask, PostingDraft, RiskFlag, ScoreBreakdown, TaskId, TaskKind,
    TaskResult, TaskStatus,
};
pub use events::{NotificationBus, Subscription};
pub use ledger::ApplicationLedger;
pub use router::job_router;
pub use scoring::{collect_risk_flags, compose_score, heuristic_score, ScoreWeights};
pub use service::{
    ExecutorReceipt, JobWorkspace, QueueOutcome, WorkspaceError, WorkspaceSnapshot,
};
