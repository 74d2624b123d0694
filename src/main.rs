//! Attendance Server
//!
//! REST API for attendance sessions and verification codes.

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attendance_server::{
    api,
    clock::SystemClock,
    config::AppConfig,
    repository::Repository,
    services::{cleanup::spawn_session_cleanup, redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("attendance_server={},tower_http=debug", config.logging.level).into()
    });

    let json = config.logging.format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting Attendance Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let redis_service = RedisService::new(&config.redis.url).await?;

    tracing::info!("Connected to Redis");

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let cleanup_period = Duration::from_secs(config.attendance.cleanup_interval_secs);

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.attendance.clone(),
        Arc::new(SystemClock),
        Arc::new(redis_service),
    );

    let _cleanup = spawn_session_cleanup(services.sessions.clone(), cleanup_period);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Sessions
        .route("/attendance/sessions", post(api::sessions::create_session))
        .route("/attendance/sessions/active", get(api::sessions::list_active_sessions))
        .route("/attendance/sessions/:id/attendees", get(api::sessions::list_attendees))
        .route(
            "/attendance/sessions/class-days/:course_id",
            get(api::sessions::get_class_days),
        )
        .route(
            "/attendance/sessions/class-days/:course_id/reset",
            post(api::sessions::reset_class_days),
        )
        // Attendance
        .route("/attendance/records", post(api::attendance::record_attendance))
        .route(
            "/attendance/courses/:course_id/records",
            get(api::attendance::my_attendance),
        )
        .route(
            "/attendance/courses/:course_id/today",
            get(api::attendance::present_today),
        )
        .route(
            "/attendance/courses/:course_id/days/:date",
            get(api::attendance::course_day_records),
        )
        .route(
            "/attendance/courses/:course_id/days/:date/attendees",
            get(api::attendance::course_day_attendees),
        )
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
