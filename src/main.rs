use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use skipline::config::AppConfig;
use skipline::db;
use skipline::db::queries;
use skipline::handlers;
use skipline::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let expired = queries::delete_expired_sessions(&conn)?;
    if expired > 0 {
        tracing::info!("removed {expired} expired sessions");
    }

    let (events_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        events_tx,
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/companies/:qr_code",
            get(handlers::public::company_by_qr),
        )
        .route("/api/entries/:id", get(handlers::public::entry_status))
        .route("/api/queues/:id/join", post(handlers::customer::join_queue))
        .route(
            "/api/entries/:id/leave",
            post(handlers::customer::leave_queue),
        )
        .route(
            "/api/customer/dashboard",
            get(handlers::customer::dashboard),
        )
        .route("/api/customer/history", get(handlers::customer::history))
        .route(
            "/api/customer/profile",
            post(handlers::customer::update_profile),
        )
        .route("/api/company/dashboard", get(handlers::company::dashboard))
        .route(
            "/api/company/queues",
            get(handlers::company::list_queues).post(handlers::company::create_queue),
        )
        .route(
            "/api/company/queues/:id",
            get(handlers::company::queue_detail),
        )
        .route(
            "/api/company/queues/:id/settings",
            post(handlers::company::update_queue_settings),
        )
        .route(
            "/api/company/queues/:id/pause",
            post(handlers::company::pause_queue),
        )
        .route(
            "/api/company/queues/:id/resume",
            post(handlers::company::resume_queue),
        )
        .route(
            "/api/company/queues/:id/deactivate",
            post(handlers::company::deactivate_queue),
        )
        .route(
            "/api/company/queues/:id/call-next",
            post(handlers::company::call_next),
        )
        .route(
            "/api/company/queues/:id/walk-in",
            post(handlers::company::walk_in),
        )
        .route(
            "/api/company/entries/:id/served",
            post(handlers::company::mark_served),
        )
        .route(
            "/api/company/entries/:id/cancel",
            post(handlers::company::cancel_entry),
        )
        .route(
            "/api/company/profile",
            post(handlers::company::update_profile),
        )
        .route("/api/events", get(handlers::events::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
