use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryDocumentStore, InMemoryFilingRepository, SeededDirectory,
    SharedSecretVerifier,
};
use crate::routes::with_filing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use filing_desk::config::AppConfig;
use filing_desk::error::AppError;
use filing_desk::telemetry;
use filing_desk::workflows::filing::{FilingWorkflowService, HttpDocumentStore};

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

    let repository = Arc::new(InMemoryFilingRepository::default());
    let agents = Arc::new(SharedSecretVerifier::from_env());
    let directory = Arc::new(SeededDirectory::standard());

    let app = match &config.document_store.endpoint {
        Some(endpoint) => {
            info!(endpoint, "using external document store");
            let documents = Arc::new(
                HttpDocumentStore::new(endpoint.clone(), config.document_store.timeout)
                    .map_err(filing_desk::workflows::filing::FilingServiceError::Storage)?,
            );
            let service = Arc::new(FilingWorkflowService::new(
                repository, documents, agents, directory,
            ));
            with_filing_routes(service)
        }
        None => {
            info!("using in-memory document store");
            let documents = Arc::new(InMemoryDocumentStore::default());
            let service = Arc::new(FilingWorkflowService::new(
                repository, documents, agents, directory,
            ));
            with_filing_routes(service)
        }
    }
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);
    info!("listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
