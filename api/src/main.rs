//! SafetyDesk API Server
//!
//! Trust & safety moderation core for a dating platform: report triage,
//! trust scoring, verification review, panic handling and badge expiry.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod domain;
mod entity;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;


use adapters::{
    LogNotifier, PostgresModerationStore, PostgresPanicActivationRepository,
    PostgresReportRepository, PostgresSafetyScoreRepository, PostgresUserRepository,
    PostgresVerificationRequestRepository, PostgresVerifiedBadgeRepository,
};
use app::{BadgeService, PanicService, ReportingService, SafetyService, VerificationService};
use config::Config;

pub type AppSafetyService = SafetyService<
    PostgresSafetyScoreRepository,
    PostgresUserRepository,
    PostgresModerationStore,
    LogNotifier,
>;

pub type AppReportingService = ReportingService<
    PostgresReportRepository,
    PostgresSafetyScoreRepository,
    PostgresUserRepository,
    PostgresModerationStore,
    LogNotifier,
>;

pub type AppVerificationService = VerificationService<
    PostgresVerificationRequestRepository,
    PostgresVerifiedBadgeRepository,
    PostgresModerationStore,
    LogNotifier,
>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub reporting_service: Arc<AppReportingService>,
    pub safety_service: Arc<AppSafetyService>,
    pub verification_service: Arc<AppVerificationService>,
    pub panic_service: Arc<PanicService<PostgresPanicActivationRepository, LogNotifier>>,
    pub badge_service: Arc<BadgeService<PostgresVerifiedBadgeRepository, LogNotifier>>,
    pub config: Config,
}

impl AppState {
    /// Wire every service over one database connection
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let notifier = Arc::new(LogNotifier);

        let report_repo = Arc::new(PostgresReportRepository::new(db.clone()));
        let score_repo = Arc::new(PostgresSafetyScoreRepository::new(db.clone()));
        let user_repo = Arc::new(PostgresUserRepository::new(db.clone()));
        let verification_repo = Arc::new(PostgresVerificationRequestRepository::new(db.clone()));
        let panic_repo = Arc::new(PostgresPanicActivationRepository::new(db.clone()));
        let badge_repo = Arc::new(PostgresVerifiedBadgeRepository::new(db.clone()));
        let store = Arc::new(PostgresModerationStore::new(db));

        let safety_service = Arc::new(SafetyService::new(
            score_repo,
            user_repo,
            store.clone(),
            notifier.clone(),
        ));

        let reporting_service = Arc::new(ReportingService::new(
            report_repo,
            safety_service.clone(),
            notifier.clone(),
            config.duplicate_report_window_days,
            config.high_priority_threshold,
        ));

        let verification_service = Arc::new(VerificationService::new(
            verification_repo,
            badge_repo.clone(),
            store,
            notifier.clone(),
            config.require_complete_documents,
        ));

        let panic_service = Arc::new(PanicService::new(panic_repo, notifier.clone()));
        let badge_service = Arc::new(BadgeService::new(badge_repo, notifier));

        Self {
            reporting_service,
            safety_service,
            verification_service,
            panic_service,
            badge_service,
            config,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the HTTP router; everything except `/health` requires an admin token
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        // Reports
        .route("/reports", post(handlers::submit_report))
        .route("/reports/queue", get(handlers::review_queue))
        .route("/reports/dashboard", get(handlers::report_dashboard))
        .route("/reports/:id", get(handlers::get_report))
        .route("/reports/:id/review", post(handlers::review_report))
        .route("/reports/:id/recompute", post(handlers::recompute_priority))
        // Safety scores
        .route("/users/:id/safety", get(handlers::get_safety_overview))
        .route(
            "/users/:id/safety/events",
            post(handlers::record_safety_event),
        )
        .route(
            "/users/:id/safety/recalculate",
            post(handlers::recalculate_safety),
        )
        .route("/safety/needs-review", get(handlers::safety_needs_review))
        // Verification requests
        .route("/verifications", post(handlers::submit_verification))
        .route("/verifications/:id", get(handlers::get_verification))
        .route(
            "/verifications/:id/approve",
            post(handlers::approve_verification),
        )
        .route(
            "/verifications/:id/reject",
            post(handlers::reject_verification),
        )
        .route(
            "/verifications/:id/needs-review",
            post(handlers::verification_needs_review),
        )
        // Panic activations
        .route("/panics", post(handlers::trigger_panic))
        .route("/panics/active", get(handlers::open_panics))
        .route("/panics/:id", get(handlers::get_panic))
        .route("/panics/:id/resolve", post(handlers::resolve_panic))
        .route("/panics/:id/escalate", post(handlers::escalate_panic))
        // Badges
        .route("/badges", post(handlers::request_badge))
        .route("/users/:id/badges", get(handlers::list_user_badges))
        .route("/badges/:id/verify", post(handlers::verify_badge))
        .route("/badges/:id/reject", post(handlers::reject_badge))
        .route("/badges/:id/renew", post(handlers::renew_badge))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_auth_middleware,
        ));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health))
        .merge(admin_routes)
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,safetydesk_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SafetyDesk API...");

    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    if config.admins.is_empty() {
        tracing::warn!("ADMIN_TOKENS is empty; every admin route will answer 401");
    }

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    let port = config.port;
    let app = build_router(AppState::new(db, config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
