use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use jobber::workflows::jobs::{ApplyFlow, CandidateProfile, LocationKind, PostingDraft};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Candidate profile used until per-user profiles exist.
pub(crate) fn default_candidate_profile() -> CandidateProfile {
    CandidateProfile {
        name: "Default Candidate".to_string(),
        target_titles: vec![
            "Software Engineer".to_string(),
            "Full Stack Engineer".to_string(),
            "Platform Engineer".to_string(),
        ],
        skills: vec![
            "rust".to_string(),
            "tokio".to_string(),
            "axum".to_string(),
            "postgres".to_string(),
            "api design".to_string(),
        ],
        remote_required: true,
        min_compensation: Some(150_000),
    }
}

/// Posting batch the CLI demo walks through the full lifecycle.
pub(crate) fn demo_postings() -> Vec<PostingDraft> {
    vec![
        PostingDraft {
            id: None,
            title: "Platform Engineer".to_string(),
            company: "Northwind Systems".to_string(),
            url: "https://jobs.example.com/northwind/platform-engineer".to_string(),
            description: "Own the Rust services powering our ingestion pipeline.".to_string(),
            skills: vec![
                "rust".to_string(),
                "tokio".to_string(),
                "postgres".to_string(),
            ],
            compensation: Some(185_000),
            apply_flow: ApplyFlow::Simple,
            location: LocationKind::Remote,
            requires_clearance: false,
        },
        PostingDraft {
            id: None,
            title: "Full Stack Engineer".to_string(),
            company: "Contoso Labs".to_string(),
            url: "https://jobs.example.com/contoso/full-stack".to_string(),
            description: "Ship product features across an axum + TypeScript stack.".to_string(),
            skills: vec!["rust".to_string(), "axum".to_string(), "react".to_string()],
            compensation: Some(170_000),
            apply_flow: ApplyFlow::Workday,
            location: LocationKind::Hybrid,
            requires_clearance: false,
        },
        PostingDraft {
            id: None,
            title: "Software Engineer, Mission Systems".to_string(),
            company: "Aerodyne Defense".to_string(),
            url: "https://jobs.example.com/aerodyne/mission-systems".to_string(),
            description: "Embedded tooling for classified flight programs.".to_string(),
            skills: vec!["rust".to_string(), "c++".to_string()],
            compensation: Some(160_000),
            apply_flow: ApplyFlow::Custom,
            location: LocationKind::Onsite,
            requires_clearance: true,
        },
    ]
}
