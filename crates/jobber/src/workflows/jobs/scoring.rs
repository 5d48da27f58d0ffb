use std::collections::BTreeSet;

use chrono::Utc;

use super::domain::{
    CandidateProfile, FitnessScore, JobPosting, LocationKind, RiskFlag, ScoreBreakdown,
};

/// Relative weight of each fitness component in the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub title_match: f32,
    pub skills_match: f32,
    pub compensation_match: f32,
    pub remote_match: f32,
    pub semantic_fit: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title_match: 0.2,
            skills_match: 0.35,
            compensation_match: 0.15,
            remote_match: 0.1,
            semantic_fit: 0.2,
        }
    }
}

fn clamp_score(value: f32) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn token_set(value: &str) -> BTreeSet<String> {
    value
        .to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '#' | '-')))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn overlap_percent(candidate: &BTreeSet<String>, reference: &BTreeSet<String>) -> u8 {
    if candidate.is_empty() || reference.is_empty() {
        return 0;
    }

    let hits = candidate.intersection(reference).count();
    clamp_score(hits as f32 / candidate.len() as f32 * 100.0)
}

pub(crate) fn title_score(posting: &JobPosting, profile: &CandidateProfile) -> u8 {
    let target_tokens = token_set(&profile.target_titles.join(" "));
    let posting_tokens = token_set(&posting.title);
    overlap_percent(&target_tokens, &posting_tokens)
}

pub(crate) fn skills_score(posting: &JobPosting, profile: &CandidateProfile) -> u8 {
    let posting_tokens = token_set(&posting.skills.join(" "));
    let profile_tokens = token_set(&profile.skills.join(" "));
    overlap_percent(&posting_tokens, &profile_tokens)
}

pub(crate) fn compensation_score(posting: &JobPosting, profile: &CandidateProfile) -> u8 {
    let (Some(minimum), Some(offered)) = (profile.min_compensation, posting.compensation) else {
        // Neutral when either side is undisclosed.
        return 70;
    };

    if offered >= minimum {
        return 100;
    }

    let gap_ratio = (1.0 - offered as f32 / minimum as f32).max(0.0);
    clamp_score(100.0 - gap_ratio * 100.0)
}

pub(crate) fn remote_score(posting: &JobPosting, profile: &CandidateProfile) -> u8 {
    if !profile.remote_required {
        return 100;
    }

    match posting.location {
        LocationKind::Remote => 100,
        LocationKind::Hybrid => 50,
        LocationKind::Onsite => 0,
    }
}

/// Deterministic stand-in for an AI semantic rating: the average of the
/// title and skills overlap scores.
pub(crate) fn heuristic_semantic_fit(posting: &JobPosting, profile: &CandidateProfile) -> u8 {
    clamp_score((title_score(posting, profile) as f32 + skills_score(posting, profile) as f32) / 2.0)
}

/// Risk tags the autopilot rules key on.
pub fn collect_risk_flags(posting: &JobPosting, profile: &CandidateProfile) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    if posting.requires_clearance {
        flags.push(RiskFlag::ClearanceRequired);
    }
    if profile.remote_required && posting.location == LocationKind::Onsite {
        flags.push(RiskFlag::OnsiteOnly);
    }
    if posting.apply_flow == super::domain::ApplyFlow::Workday {
        flags.push(RiskFlag::WorkdayFlow);
    }
    flags
}

/// Assemble a full fitness rating from component scores and a semantic fit
/// value supplied by the caller.
pub fn compose_score(
    posting: &JobPosting,
    profile: &CandidateProfile,
    semantic_fit: u8,
    weights: &ScoreWeights,
) -> FitnessScore {
    let title_match = title_score(posting, profile);
    let skills_match = skills_score(posting, profile);
    let compensation_match = compensation_score(posting, profile);
    let remote_match = remote_score(posting, profile);

    let weighted_total = clamp_score(
        title_match as f32 * weights.title_match
            + skills_match as f32 * weights.skills_match
            + compensation_match as f32 * weights.compensation_match
            + remote_match as f32 * weights.remote_match
            + semantic_fit as f32 * weights.semantic_fit,
    );

    FitnessScore {
        job_id: posting.id.clone(),
        total_score: weighted_total,
        risk_flags: collect_risk_flags(posting, profile),
        breakdown: ScoreBreakdown {
            title_match,
            skills_match,
            compensation_match,
            remote_match,
            semantic_fit,
            weighted_total,
        },
        scored_at: Utc::now(),
    }
}

/// Fully deterministic rating used as the fallback whenever the configured
/// evaluator fails.
pub fn heuristic_score(posting: &JobPosting, profile: &CandidateProfile) -> FitnessScore {
    let semantic_fit = heuristic_semantic_fit(posting, profile);
    compose_score(posting, profile, semantic_fit, &ScoreWeights::default())
}
