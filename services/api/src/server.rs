use crate::cli::ServeArgs;
use crate::infra::{
    policy_config_from_env, AppState, InMemoryPlacementRepository, InMemorySettingsStore,
    LoggingEventPublisher,
};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_cell::config::AppConfig;
use placement_cell::error::AppError;
use placement_cell::placements::PlacementService;
use placement_cell::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryPlacementRepository::default());
    let settings = Arc::new(InMemorySettingsStore::default());
    let events = Arc::new(LoggingEventPublisher);
    let placement_service = Arc::new(PlacementService::new(
        repository,
        settings,
        events,
        policy_config_from_env(),
    ));

    let app = with_placement_routes(placement_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "placement backend ready");

    axum::serve(listener, app).await?;
    Ok(())
}
