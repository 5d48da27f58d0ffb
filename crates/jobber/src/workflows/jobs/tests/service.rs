use std::sync::{Arc, Mutex};

use chrono::Duration;
use serde_json::Value;

use super::common::*;
use crate::workflows::jobs::autopilot::AutopilotSettings;
use crate::workflows::jobs::collaborators::{FitnessEvaluator, TemplateTextGenerator};
use crate::workflows::jobs::domain::{
    ApplicationStatus, ApplyFlow, EventKind, JobId, RiskFlag, TaskId, TaskKind, TaskStatus,
};
use crate::workflows::jobs::events::NotificationBus;
use crate::workflows::jobs::scoring::heuristic_score;
use crate::workflows::jobs::service::{JobWorkspace, WorkspaceError};

fn workspace_with_bus(
    evaluator: Arc<dyn FitnessEvaluator>,
) -> (Arc<JobWorkspace>, Arc<NotificationBus>) {
    let bus = Arc::new(NotificationBus::default());
    let workspace = Arc::new(JobWorkspace::with_collaborators(
        profile(),
        AutopilotSettings::default(),
        bus.clone(),
        evaluator,
        Arc::new(TemplateTextGenerator),
        Duration::seconds(300),
    ));
    (workspace, bus)
}

fn capture(bus: &NotificationBus, kind: EventKind) -> Arc<Mutex<Vec<Value>>> {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    bus.on(kind, move |payload| {
        sink.lock().expect("event log").push(payload.clone());
    });
    captured
}

#[tokio::test]
async fn score_caches_rating_and_publishes_event() {
    let (workspace, bus) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 88,
        risk_flags: Vec::new(),
    }));
    let scored_events = capture(&bus, EventKind::JobScored);
    let job_id = discover_one(&workspace, draft());

    let scored = workspace.score(&job_id).await.expect("score succeeds");
    assert_eq!(scored.total_score, 88);
    assert_eq!(workspace.latest_score(&job_id), Some(scored));

    // Repeat scoring is allowed and never touches application state.
    workspace.score(&job_id).await.expect("rescore succeeds");
    assert_eq!(scored_events.lock().expect("event log").len(), 2);
    assert!(workspace.application(&job_id).is_none());
}

#[tokio::test]
async fn score_rejects_unknown_job_ids() {
    let workspace = workspace();

    match workspace.score(&JobId("ghost".into())).await {
        Err(WorkspaceError::UnknownJob(id)) => assert_eq!(id.0, "ghost"),
        other => panic!("expected unknown job error, got {other:?}"),
    }
}

#[tokio::test]
async fn evaluator_failure_degrades_to_heuristics() {
    let (workspace, _) = workspace_with_bus(Arc::new(FailingEvaluator));
    let job_id = discover_one(&workspace, draft());

    let scored = workspace.score(&job_id).await.expect("fallback rating");

    let expected = heuristic_score(&posting(&job_id.0), &profile());
    assert_eq!(scored.total_score, expected.total_score);
    assert_eq!(scored.breakdown, expected.breakdown);
}

#[tokio::test]
async fn draft_falls_back_to_template_when_generator_fails() {
    let workspace = workspace_with(
        Arc::new(FixedEvaluator {
            total: 90,
            risk_flags: Vec::new(),
        }),
        Arc::new(FailingGenerator),
    );
    let job_id = discover_one(&workspace, draft());

    let artifacts = workspace.draft(&job_id).await.expect("draft succeeds");

    assert!(artifacts.cover_letter.contains("Acme"));
    assert!(artifacts.cover_letter.contains("Test Candidate"));
    assert!(artifacts.resume_summary.contains("Software Engineer"));
    assert_eq!(workspace.latest_draft(&job_id), Some(artifacts));
}

#[tokio::test]
async fn blank_generator_output_is_replaced_by_template() {
    let workspace = workspace_with(
        Arc::new(FixedEvaluator {
            total: 90,
            risk_flags: Vec::new(),
        }),
        Arc::new(BlankGenerator),
    );
    let job_id = discover_one(&workspace, draft());

    let artifacts = workspace.draft(&job_id).await.expect("draft succeeds");
    assert!(artifacts.cover_letter.contains("excited about the"));
}

#[tokio::test]
async fn queue_apply_auto_path_enqueues_and_links_a_task() {
    let (workspace, _) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 92,
        risk_flags: Vec::new(),
    }));
    let job_id = discover_one(&workspace, draft());

    let outcome = workspace.queue_apply(&job_id).await.expect("queueable");
    assert_eq!(outcome.status, ApplicationStatus::Queued);
    assert!(outcome.reasons[0].contains("auto-apply"));

    let record = workspace.application(&job_id).expect("record created");
    let task_id = record.task_id.expect("task linked");

    let claimed = workspace.claim_tasks(1);
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].task.task_id, task_id);
    assert_eq!(claimed[0].task.kind, TaskKind::Apply);
    assert_eq!(claimed[0].task.payload["job_id"], job_id.0);
}

#[tokio::test]
async fn queue_apply_scores_when_no_rating_is_cached() {
    let (workspace, bus) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 92,
        risk_flags: Vec::new(),
    }));
    let scored_events = capture(&bus, EventKind::JobScored);
    let job_id = discover_one(&workspace, draft());

    workspace.queue_apply(&job_id).await.expect("queueable");

    assert!(workspace.latest_score(&job_id).is_some());
    assert_eq!(scored_events.lock().expect("event log").len(), 1);
}

#[tokio::test]
async fn queue_apply_approval_path_announces_checkpoint() {
    let (workspace, bus) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 75,
        risk_flags: Vec::new(),
    }));
    let approvals = capture(&bus, EventKind::ApprovalRequired);
    let job_id = discover_one(&workspace, draft());

    let outcome = workspace.queue_apply(&job_id).await.expect("queueable");

    assert_eq!(outcome.status, ApplicationStatus::NeedsApproval);
    let events = approvals.lock().expect("event log");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["score"], 75);
    assert!(workspace.claim_tasks(1).is_empty(), "no task for approvals");
}

#[tokio::test]
async fn queue_apply_block_path_records_reasons() {
    let (workspace, _) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 95,
        risk_flags: Vec::new(),
    }));
    let mut clearance = draft();
    clearance.requires_clearance = true;
    let job_id = discover_one(&workspace, clearance);

    let outcome = workspace.queue_apply(&job_id).await.expect("queueable");

    assert_eq!(outcome.status, ApplicationStatus::Blocked);
    let record = workspace.application(&job_id).expect("record created");
    assert!(record.notes.expect("notes recorded").contains("Clearance"));
}

#[tokio::test]
async fn approve_creates_record_and_queues_immediately() {
    let workspace = workspace();
    let job_id = discover_one(&workspace, draft());
    assert!(workspace.application(&job_id).is_none());

    let record = workspace.approve(&job_id).await.expect("approve succeeds");

    assert_eq!(record.status, ApplicationStatus::Queued);
    let task_id = record.task_id.expect("task linked");

    let claimed = workspace.claim_tasks(1);
    assert_eq!(claimed[0].task.task_id, task_id);
    assert_eq!(claimed[0].task.payload["manual_approval"], true);
}

#[tokio::test]
async fn reject_blocks_with_a_fixed_note() {
    let workspace = workspace();
    let job_id = discover_one(&workspace, draft());

    let record = workspace.reject(&job_id).await.expect("reject succeeds");

    assert_eq!(record.status, ApplicationStatus::Blocked);
    assert_eq!(record.notes.as_deref(), Some("Rejected by user."));
}

#[tokio::test]
async fn require_approval_publishes_the_given_reason() {
    let (workspace, bus) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 92,
        risk_flags: Vec::new(),
    }));
    let approvals = capture(&bus, EventKind::ApprovalRequired);
    let job_id = discover_one(&workspace, draft());

    let record = workspace
        .require_approval(&job_id, "Captcha checkpoint reported.")
        .await
        .expect("operation succeeds");

    assert_eq!(record.status, ApplicationStatus::NeedsApproval);
    let events = approvals.lock().expect("event log");
    assert_eq!(events[0]["reasons"][0], "Captcha checkpoint reported.");
}

#[tokio::test]
async fn mark_applied_stores_evidence_and_publishes() {
    let (workspace, bus) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 92,
        risk_flags: Vec::new(),
    }));
    let submissions = capture(&bus, EventKind::ApplicationSubmitted);
    let job_id = discover_one(&workspace, draft());

    let record = workspace
        .mark_applied(
            &job_id,
            Some("https://example.com/shot.png".to_string()),
            None,
        )
        .await
        .expect("operation succeeds");

    assert_eq!(record.status, ApplicationStatus::Submitted);
    assert_eq!(
        record.screenshot_url.as_deref(),
        Some("https://example.com/shot.png")
    );
    assert_eq!(submissions.lock().expect("event log").len(), 1);
}

#[tokio::test]
async fn updated_at_refreshes_on_every_mutation() {
    let workspace = workspace();
    let job_id = discover_one(&workspace, draft());

    let first = workspace.reject(&job_id).await.expect("first mutation");
    let second = workspace
        .fail(&job_id, "executor gave up")
        .await
        .expect("second mutation");

    assert_eq!(first.created_at, second.created_at);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn executor_success_finalizes_the_application() {
    let workspace = workspace();
    let job_id = discover_one(&workspace, draft());
    workspace.approve(&job_id).await.expect("queued");
    let claimed = workspace.claim_tasks(1);

    let mut success = result(&claimed[0].task.task_id.0, TaskStatus::Success);
    success.screenshot_url = Some("https://example.com/shot.png".to_string());

    let receipt = workspace
        .handle_executor_result(success)
        .await
        .expect("result handled");

    assert!(receipt.ok);
    assert!(!receipt.requeued);
    let record = workspace.application(&job_id).expect("record present");
    assert_eq!(record.status, ApplicationStatus::Submitted);
    assert!(record.screenshot_url.is_some());
}

#[tokio::test]
async fn executor_checkpoint_routes_back_to_approval() {
    let workspace = workspace();
    let job_id = discover_one(&workspace, draft());
    workspace.approve(&job_id).await.expect("queued");
    let claimed = workspace.claim_tasks(1);

    let receipt = workspace
        .handle_executor_result(result(&claimed[0].task.task_id.0, TaskStatus::NeedsApproval))
        .await
        .expect("result handled");

    assert!(!receipt.requeued);
    let record = workspace.application(&job_id).expect("record present");
    assert_eq!(record.status, ApplicationStatus::NeedsApproval);
}

#[tokio::test]
async fn executor_failures_exhaust_the_budget_then_fail_the_application() {
    let workspace = workspace();
    let job_id = discover_one(&workspace, draft());
    workspace.approve(&job_id).await.expect("queued");

    for attempt in 1..=2 {
        let claimed = workspace.claim_tasks(1);
        let receipt = workspace
            .handle_executor_result(result(&claimed[0].task.task_id.0, TaskStatus::Failed))
            .await
            .expect("result handled");
        assert!(receipt.requeued, "attempt {attempt} still has budget");
        assert_eq!(
            workspace.application(&job_id).expect("record").status,
            ApplicationStatus::Queued
        );
    }

    let claimed = workspace.claim_tasks(1);
    let receipt = workspace
        .handle_executor_result(result(&claimed[0].task.task_id.0, TaskStatus::Failed))
        .await
        .expect("result handled");

    assert!(!receipt.requeued);
    let record = workspace.application(&job_id).expect("record present");
    assert_eq!(record.status, ApplicationStatus::Failed);
    assert!(record
        .notes
        .expect("failure note")
        .contains("retry budget"));
}

#[tokio::test]
async fn executor_result_for_unlinked_task_is_acknowledged() {
    let workspace = workspace();

    let receipt = workspace
        .handle_executor_result(result("ghost", TaskStatus::Success))
        .await
        .expect("result handled");

    assert!(receipt.ok);
    assert!(!receipt.requeued);
    assert!(workspace
        .peek_result(&TaskId("ghost".into()))
        .is_some());
}

#[tokio::test]
async fn sweeping_dead_leases_eventually_fails_the_application() {
    let workspace = workspace_with_dead_leases();
    let job_id = discover_one(&workspace, draft());
    workspace.approve(&job_id).await.expect("queued");

    for _ in 0..2 {
        assert_eq!(workspace.claim_tasks(1).len(), 1);
        let swept = workspace.sweep_leases().await.expect("sweep succeeds");
        assert!(swept[0].requeued);
    }

    assert_eq!(workspace.claim_tasks(1).len(), 1);
    let swept = workspace.sweep_leases().await.expect("sweep succeeds");
    assert!(!swept[0].requeued);

    let record = workspace.application(&job_id).expect("record present");
    assert_eq!(record.status, ApplicationStatus::Failed);
    assert!(record.notes.expect("note").contains("lease expired"));
}

#[tokio::test]
async fn snapshot_reflects_catalog_scores_and_ledger() {
    let (workspace, _) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 92,
        risk_flags: Vec::new(),
    }));
    let job_id = discover_one(&workspace, draft());
    workspace.queue_apply(&job_id).await.expect("queueable");

    let snapshot = workspace.snapshot();
    assert_eq!(snapshot.jobs.len(), 1);
    assert_eq!(snapshot.scores.len(), 1);
    assert_eq!(snapshot.applications.len(), 1);
    assert_eq!(snapshot.applications[0].status, ApplicationStatus::Queued);
}

#[tokio::test]
async fn workday_draft_flows_park_for_approval() {
    let (workspace, _) = workspace_with_bus(Arc::new(FixedEvaluator {
        total: 95,
        risk_flags: vec![RiskFlag::WorkdayFlow],
    }));
    let mut workday = draft();
    workday.apply_flow = ApplyFlow::Workday;
    let job_id = discover_one(&workspace, workday);

    let outcome = workspace.queue_apply(&job_id).await.expect("queueable");
    assert_eq!(outcome.status, ApplicationStatus::NeedsApproval);

    // The human can still push it through manually afterward.
    let record = workspace.approve(&job_id).await.expect("approve succeeds");
    assert_eq!(record.status, ApplicationStatus::Queued);
}
