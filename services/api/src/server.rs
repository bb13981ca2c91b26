use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{demo_directory, AppState};
use crate::routes::with_service_routes;
use govease_transfers::config::AppConfig;
use govease_transfers::error::AppError;
use govease_transfers::notifications::{
    InMemoryNotificationStore, LogMailer, NotificationDispatcher,
};
use govease_transfers::realtime::ConnectionRegistry;
use govease_transfers::sequence::InMemorySequences;
use govease_transfers::telemetry;
use govease_transfers::transfers::{
    InMemoryMatchStore, InMemoryRequestStore, TransferService,
};

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

    let directory = Arc::new(demo_directory());
    let sequences = Arc::new(InMemorySequences::default());
    let registry = Arc::new(ConnectionRegistry::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(InMemoryNotificationStore::default()),
        sequences.clone(),
        directory.clone(),
        registry.clone(),
        Arc::new(LogMailer),
    ));
    let service = Arc::new(TransferService::new(
        Arc::new(InMemoryRequestStore::default()),
        Arc::new(InMemoryMatchStore::default()),
        directory,
        sequences,
        dispatcher.clone(),
    ));

    let app = with_service_routes(service, dispatcher, registry)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "transfer matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
