use crate::cli::ServeArgs;
use crate::infra::{
    AppState, DigestScoring, InMemoryActionLog, InMemoryAgreementRepository,
    InMemoryRuleRepository, InMemoryTaskRepository, LoggingMessenger,
};
use crate::routes::{with_service_routes, Services};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use collection_engine::agreements::{AgreementOrchestrator, MemoryWebhookLedger, WebhookService};
use collection_engine::collection::{CollectionEngine, CollectionPorts, MemoryScoreCache};
use collection_engine::config::AppConfig;
use collection_engine::error::AppError;
use collection_engine::payments::{provider_from_config, RetryPolicy};
use collection_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

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

    let provider = provider_from_config(&config.payments)?;
    let messenger = Arc::new(LoggingMessenger::default());
    let agreements = Arc::new(InMemoryAgreementRepository::default());
    let ports = CollectionPorts {
        rules: Arc::new(InMemoryRuleRepository::default()),
        tasks: Arc::new(InMemoryTaskRepository::default()),
        logs: Arc::new(InMemoryActionLog::default()),
        scoring: Arc::new(DigestScoring),
        messenger: messenger.clone(),
        cache: Arc::new(MemoryScoreCache::default()),
    };

    let shutdown = CancellationToken::new();
    let services = Services {
        engine: Arc::new(CollectionEngine::new(&config.engine, ports)),
        orchestrator: Arc::new(AgreementOrchestrator::new(
            provider.clone(),
            agreements.clone(),
            messenger,
            RetryPolicy::from_config(&config.engine),
        )),
        webhooks: Arc::new(WebhookService::new(
            provider,
            agreements,
            Arc::new(MemoryWebhookLedger::default()),
        )),
        shutdown: shutdown.clone(),
    };

    let app = with_service_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, provider = ?config.payments.provider, "collection engine ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown, readiness_flag))
        .await?;
    Ok(())
}

/// Resolves on ctrl-c; running batches stop picking up new debts.
async fn shutdown_signal(shutdown: CancellationToken, readiness: Arc<std::sync::atomic::AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested, draining in-flight work");
    readiness.store(false, Ordering::Release);
    shutdown.cancel();
}
