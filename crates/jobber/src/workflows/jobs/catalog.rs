use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use super::domain::{JobId, JobPosting, PostingDraft};

/// Append/lookup store of discovered postings, keyed by generated id.
/// Postings are never mutated after discovery.
#[derive(Default)]
pub struct PostingCatalog {
    postings: Mutex<HashMap<JobId, JobPosting>>,
}

impl PostingCatalog {
    /// Normalize and insert a batch of posting descriptors, assigning ids
    /// and discovery timestamps to entries missing them.
    pub fn discover(&self, drafts: Vec<PostingDraft>) -> Vec<JobPosting> {
        let discovered_at = Utc::now();
        let mut guard = self.postings.lock().expect("catalog mutex poisoned");

        drafts
            .into_iter()
            .map(|draft| {
                let posting = JobPosting {
                    id: draft.id.unwrap_or_else(JobId::generate),
                    title: draft.title,
                    company: draft.company,
                    url: draft.url,
                    description: draft.description,
                    skills: draft.skills,
                    compensation: draft.compensation,
                    apply_flow: draft.apply_flow,
                    location: draft.location,
                    requires_clearance: draft.requires_clearance,
                    discovered_at,
                };
                guard.insert(posting.id.clone(), posting.clone());
                posting
            })
            .collect()
    }

    pub fn get(&self, id: &JobId) -> Option<JobPosting> {
        let guard = self.postings.lock().expect("catalog mutex poisoned");
        guard.get(id).cloned()
    }

    pub fn list(&self) -> Vec<JobPosting> {
        let guard = self.postings.lock().expect("catalog mutex poisoned");
        guard.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let guard = self.postings.lock().expect("catalog mutex poisoned");
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
