use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Duration;
use jobber::config::AppConfig;
use jobber::error::AppError;
use jobber::telemetry;
use jobber::workflows::jobs::{JobWorkspace, NotificationBus};
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{default_candidate_profile, AppState};
use crate::routes::with_job_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let events = Arc::new(NotificationBus::default());
    let workspace = Arc::new(JobWorkspace::with_collaborators(
        default_candidate_profile(),
        config.autopilot,
        events,
        Arc::new(jobber::workflows::jobs::HeuristicFitnessEvaluator::default()),
        Arc::new(jobber::workflows::jobs::TemplateTextGenerator),
        Duration::seconds(config.dispatch.claim_lease_seconds),
    ));

    let app = with_job_routes(workspace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job application orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
