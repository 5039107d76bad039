/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_layer},
    routes,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::session::USER_ID_HEADER;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /health                               GET
/// /roles                                GET
/// /signup                               POST
/// /tasks                                GET POST
/// /tasks/:id                            GET PUT PATCH DELETE
/// /tasks/:id/users                      DELETE
/// /users                                GET POST
/// /users/me                             GET
/// /users/:id                            GET PUT DELETE
/// /users/:id/tasks                      DELETE
/// /users/:id/notifications              GET
/// /users/:id/notifications/read         POST
/// /notifications                        GET POST
/// /notifications/:id                    GET DELETE
/// /notifications/:id/read               POST
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, session
/// context. `/health` is outside the session layer.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .patch(routes::tasks::assign_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/users", delete(routes::tasks::unassign_task_users));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route("/me", get(routes::users::current_user))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/:id/tasks", delete(routes::users::unassign_user_tasks))
        .route("/:id/notifications", get(routes::notifications::list_user_notifications))
        .route(
            "/:id/notifications/read",
            post(routes::notifications::mark_user_notifications_read),
        );

    let notification_routes = Router::new()
        .route(
            "/",
            get(routes::notifications::list_notifications).post(routes::notifications::create_notification),
        )
        .route(
            "/:id",
            get(routes::notifications::get_notification).delete(routes::notifications::delete_notification),
        )
        .route("/:id/read", post(routes::notifications::mark_notification_read));

    let api_routes = Router::new()
        .route("/roles", get(routes::roles::list_roles))
        .route("/signup", post(routes::users::signup))
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/notifications", notification_routes)
        .layer(axum::middleware::from_fn_with_state(state.clone(), session_layer));

    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Permissive CORS when no origins are configured, otherwise an allow list
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
