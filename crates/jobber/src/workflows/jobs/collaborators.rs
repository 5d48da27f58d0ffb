use async_trait::async_trait;

use super::domain::{CandidateProfile, FitnessScore, JobPosting};
use super::drafting;
use super::scoring::{self, ScoreWeights};

/// Failure reported by an external collaborator. Callers recover locally
/// with a deterministic fallback; these never surface to API clients.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator transport failed: {0}")]
    Transport(String),
    #[error("collaborator returned an unusable response: {0}")]
    Malformed(String),
}

/// Produces a fitness rating for a posting against a candidate profile.
/// May be called any number of times per posting and must not mutate
/// either input.
#[async_trait]
pub trait FitnessEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<FitnessScore, CollaboratorError>;
}

/// Generates role-specific cover letter text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<String, CollaboratorError>;
}

/// Deterministic evaluator backed by the token-overlap heuristics. Also
/// serves as the fallback when a configured evaluator errors.
#[derive(Debug, Default, Clone)]
pub struct HeuristicFitnessEvaluator {
    weights: ScoreWeights,
}

impl HeuristicFitnessEvaluator {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

#[async_trait]
impl FitnessEvaluator for HeuristicFitnessEvaluator {
    async fn evaluate(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<FitnessScore, CollaboratorError> {
        let semantic_fit = scoring::heuristic_semantic_fit(posting, profile);
        Ok(scoring::compose_score(
            posting,
            profile,
            semantic_fit,
            &self.weights,
        ))
    }
}

/// Deterministic generator producing the templated cover letter.
#[derive(Debug, Default, Clone)]
pub struct TemplateTextGenerator;

#[async_trait]
impl TextGenerator for TemplateTextGenerator {
    async fn generate(
        &self,
        posting: &JobPosting,
        profile: &CandidateProfile,
    ) -> Result<String, CollaboratorError> {
        Ok(drafting::fallback_cover_letter(posting, profile))
    }
}
