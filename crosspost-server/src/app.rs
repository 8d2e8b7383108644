//! Application state and router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use libcrosspost::delivery::AdapterSet;
use libcrosspost::{BatchDispatcher, Config, Database, PublishOrchestrator, QuotaGate, Result};

use crate::routes::{cron_publish_handler, health_handler, manual_publish_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub orchestrator: PublishOrchestrator,
    pub quota: QuotaGate,
    pub dispatcher: Arc<BatchDispatcher>,
    pub cron_secret: Option<String>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Database::new(&config.database.path).await?;
        let adapters = Arc::new(AdapterSet::from_config(&config.delivery));
        let orchestrator = PublishOrchestrator::new(
            adapters,
            Duration::from_secs(config.dispatch.adapter_timeout_secs),
        );
        let quota = QuotaGate::for_x(config.quota.x_monthly_limit);
        let dispatcher = Arc::new(BatchDispatcher::new(
            db.clone(),
            orchestrator.clone(),
            quota,
            &config.dispatch,
        ));

        Ok(Self {
            db,
            orchestrator,
            quota,
            dispatcher,
            cron_secret: config.server.cron_secret.clone(),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/cron/publish",
            get(cron_publish_handler).post(cron_publish_handler),
        )
        .route("/publish", post(manual_publish_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
