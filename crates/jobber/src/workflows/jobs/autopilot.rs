use serde::{Deserialize, Serialize};

use super::domain::{
    ApplyFlow, CandidateProfile, FitnessScore, JobPosting, LocationKind, RiskFlag,
};

pub const DEFAULT_AUTO_APPLY_THRESHOLD: u8 = 85;
pub const DEFAULT_APPROVAL_THRESHOLD: u8 = 70;

/// Decision gates for the autopilot. Thresholds are 0..=100; invalid
/// configuration falls back to the defaults at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutopilotSettings {
    pub auto_apply_threshold: u8,
    pub approval_threshold: u8,
    /// Overrides the candidate's remote preference when set.
    pub remote_required: Option<bool>,
}

impl Default for AutopilotSettings {
    fn default() -> Self {
        Self {
            auto_apply_threshold: DEFAULT_AUTO_APPLY_THRESHOLD,
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            remote_required: None,
        }
    }
}

/// The three outcomes the policy engine can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutopilotAction {
    AutoApply,
    RequireApproval,
    Block,
}

/// Action plus the ordered, human-readable reasons that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotDecision {
    pub action: AutopilotAction,
    pub reasons: Vec<String>,
}

/// Pure decision function gating automated action on a scored posting.
///
/// Rules are evaluated in strict precedence order and the first match wins.
/// The function is total: every input reaches one of the branches below, and
/// the default is `Block` rather than any automated positive action.
pub fn evaluate_autopilot(
    posting: &JobPosting,
    scored: &FitnessScore,
    profile: &CandidateProfile,
    settings: &AutopilotSettings,
) -> AutopilotDecision {
    let needs_remote = settings.remote_required.unwrap_or(profile.remote_required);
    let mut reasons = Vec::new();

    if posting.requires_clearance || scored.risk_flags.contains(&RiskFlag::ClearanceRequired) {
        reasons.push("Clearance is required for this role.".to_string());
        return AutopilotDecision {
            action: AutopilotAction::Block,
            reasons,
        };
    }

    if needs_remote
        && (posting.location == LocationKind::Onsite
            || scored.risk_flags.contains(&RiskFlag::OnsiteOnly))
    {
        reasons.push("Role is onsite-only while remote is required.".to_string());
        return AutopilotDecision {
            action: AutopilotAction::Block,
            reasons,
        };
    }

    if posting.apply_flow == ApplyFlow::Workday {
        reasons.push("Workday flow requires manual review.".to_string());
        return AutopilotDecision {
            action: AutopilotAction::RequireApproval,
            reasons,
        };
    }

    if scored.total_score >= settings.auto_apply_threshold
        && scored.risk_flags.is_empty()
        && posting.apply_flow == ApplyFlow::Simple
    {
        reasons.push(format!(
            "Score {} meets auto-apply threshold.",
            scored.total_score
        ));
        return AutopilotDecision {
            action: AutopilotAction::AutoApply,
            reasons,
        };
    }

    if scored.total_score >= settings.approval_threshold
        && scored.total_score < settings.auto_apply_threshold
    {
        reasons.push(format!(
            "Score {} is in manual approval range.",
            scored.total_score
        ));
        return AutopilotDecision {
            action: AutopilotAction::RequireApproval,
            reasons,
        };
    }

    // Fail closed: anything unmatched is blocked, never auto-applied.
    reasons.push(format!(
        "Score {} is below approval threshold.",
        scored.total_score
    ));
    AutopilotDecision {
        action: AutopilotAction::Block,
        reasons,
    }
}
