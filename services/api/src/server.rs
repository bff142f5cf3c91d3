use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAuditRepository, InMemorySnapshotRepository};
use crate::routes::with_pulse_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hiring_pulse::config::AppConfig;
use hiring_pulse::error::AppError;
use hiring_pulse::telemetry;
use hiring_pulse::workflows::pulse::PulseService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;
    let analysis = config.analysis.load()?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pulse_service = Arc::new(PulseService::new(
        Arc::new(InMemorySnapshotRepository::default()),
        Arc::new(InMemoryAuditRepository::default()),
        analysis,
    ));

    let app = with_pulse_routes(pulse_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        analysis_config = ?config.analysis.config_path,
        "hiring pulse service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
