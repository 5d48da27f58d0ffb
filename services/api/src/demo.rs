use std::sync::{Arc, Mutex};

use clap::Args;
use jobber::config::AppConfig;
use jobber::error::AppError;
use jobber::workflows::jobs::{
    ApplicationStatus, EventKind, JobWorkspace, NotificationBus, TaskResult, TaskStatus,
};

use crate::infra::{default_candidate_profile, demo_postings};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of tasks the simulated executor claims per poll
    #[arg(long, default_value_t = 3)]
    pub(crate) claim_limit: usize,
    /// Report FAILED results until the retry budget is exhausted instead of
    /// succeeding on the first attempt
    #[arg(long)]
    pub(crate) exhaust_retries: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let events = Arc::new(NotificationBus::default());
    let observed = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        EventKind::JobScored,
        EventKind::ApplicationSubmitted,
        EventKind::ApprovalRequired,
    ] {
        let log = observed.clone();
        events.on(kind, move |_| {
            log.lock().expect("event log").push(kind.label());
        });
    }

    let workspace = JobWorkspace::new(default_candidate_profile(), config.autopilot, events);

    println!("Job application orchestration demo");
    println!(
        "Autopilot thresholds: auto-apply {} / approval {}",
        config.autopilot.auto_apply_threshold, config.autopilot.approval_threshold
    );

    let postings = workspace.discover(demo_postings());
    println!("\nDiscovered postings");
    for posting in &postings {
        println!(
            "- {} at {} ({:?} flow, {:?})",
            posting.title, posting.company, posting.apply_flow, posting.location
        );
    }

    println!("\nScoring and autopilot decisions");
    for posting in &postings {
        let scored = workspace.score(&posting.id).await?;
        let outcome = workspace.queue_apply(&posting.id).await?;
        println!(
            "- {}: score {} (flags {:?}) -> {}",
            posting.title,
            scored.total_score,
            scored.risk_flags,
            outcome.status.label()
        );
        for reason in &outcome.reasons {
            println!("    {}", reason);
        }
    }

    println!("\nManual review queue");
    let parked: Vec<_> = workspace
        .snapshot()
        .applications
        .into_iter()
        .filter(|application| application.status == ApplicationStatus::NeedsApproval)
        .collect();
    if parked.is_empty() {
        println!("- nothing awaiting approval");
    }
    for application in parked {
        let record = workspace.approve(&application.job_id).await?;
        println!(
            "- approved {} -> {}",
            application.job_id,
            record.status.label()
        );
    }

    println!("\nSimulated executor poll (limit {})", args.claim_limit);
    loop {
        let claimed = workspace.claim_tasks(args.claim_limit);
        if claimed.is_empty() {
            break;
        }
        for task in claimed {
            let status = if args.exhaust_retries {
                TaskStatus::Failed
            } else {
                TaskStatus::Success
            };
            let receipt = workspace
                .handle_executor_result(TaskResult {
                    task_id: task.task.task_id.clone(),
                    status,
                    data: None,
                    screenshot_url: (!args.exhaust_retries)
                        .then(|| "https://example.com/screenshots/demo.png".to_string()),
                })
                .await?;
            println!(
                "- task {} (attempt {}) -> {:?}, requeued {}",
                task.task.task_id,
                task.retries + 1,
                status,
                receipt.requeued
            );
        }
    }

    println!("\nFinal application states");
    for application in workspace.snapshot().applications {
        println!(
            "- {} -> {}{}",
            application.job_id,
            application.status.label(),
            application
                .notes
                .map(|notes| format!(" ({notes})"))
                .unwrap_or_default()
        );
    }

    let observed = observed.lock().expect("event log");
    println!("\nRealtime events published: {}", observed.join(", "));

    Ok(())
}
