use chrono::Utc;

use super::domain::{CandidateProfile, DraftArtifacts, JobPosting};

/// Deterministic cover letter used whenever the text generator fails or
/// returns unusable output.
pub(crate) fn fallback_cover_letter(posting: &JobPosting, profile: &CandidateProfile) -> String {
    format!(
        "Hi {} team,\n\nI am excited about the {} role and believe my profile aligns well with your requirements.\n\nBest,\n{}",
        posting.company, posting.title, profile.name
    )
}

fn resume_summary(posting: &JobPosting) -> String {
    let top_skills = posting
        .skills
        .iter()
        .take(4)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Target role: {}. Top matching skills: {}.",
        posting.title, top_skills
    )
}

fn outreach_draft(posting: &JobPosting) -> String {
    format!(
        "Hi {} recruiter, I just applied to the {} role and would love to connect.",
        posting.company, posting.title
    )
}

/// Normalize generated text into usable draft content: trimmed, non-empty
/// prose or nothing. Replaces ad-hoc shape probing of generator output.
pub(crate) fn normalize_draft(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Assemble the stored artifact bundle around a finished cover letter.
pub(crate) fn build_artifacts(posting: &JobPosting, cover_letter: String) -> DraftArtifacts {
    DraftArtifacts {
        resume_summary: resume_summary(posting),
        cover_letter,
        outreach_draft: outreach_draft(posting),
        generated_at: Utc::now(),
    }
}
