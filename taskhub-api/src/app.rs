/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskhub_api::{app::AppState, config::Config};
/// use taskhub_shared::broadcast::memory::InMemoryChannel;
/// use sqlx::PgPool;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(InMemoryChannel::new()), CancellationToken::new());
/// let app = taskhub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::security::SecurityHeadersLayer,
    realtime::{self, GatewayState},
    routes,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::{
    auth::middleware::authenticate_headers, broadcast::SharedChannel, notifier::ChangeNotifier,
    store::TaskStore,
};
use tokio_util::sync::CancellationToken;
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

    /// Task write path; announces every change
    pub store: TaskStore,

    /// Broadcast channel shared by the notifier and realtime connections
    pub channel: SharedChannel,

    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        channel: SharedChannel,
        shutdown: CancellationToken,
    ) -> Self {
        let store = TaskStore::new(db.clone(), ChangeNotifier::new(channel.clone()));

        Self {
            db,
            config: Arc::new(config),
            store,
            channel,
            shutdown,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// State for the realtime gateway, reading snapshots through the store
    pub fn gateway(&self) -> GatewayState {
        GatewayState {
            channel: self.channel.clone(),
            snapshots: Arc::new(self.store.clone()),
            jwt_secret: Arc::from(self.jwt_secret()),
            scope: self.config.realtime.snapshot_scope,
            queue_capacity: self.config.realtime.queue_capacity,
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health                      # public
/// ├── GET  /ws/tasks/                   # WebSocket, optional ?token=
/// └── /api/
///     ├── POST /register/               # public
///     ├── POST /token/                  # public
///     ├── POST /token/refresh/          # public
///     ├── GET|POST /categories/         # JWT
///     ├── DELETE /categories/:id/       # JWT
///     ├── GET|POST /tasks/              # JWT
///     └── GET|PUT|PATCH|DELETE /tasks/:id/  # JWT
/// ```
///
/// Every response passes through request tracing, CORS and the security
/// headers layer.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/register/", post(routes::auth::register))
        .route("/token/", post(routes::auth::obtain_token))
        .route("/token/refresh/", post(routes::auth::refresh_token));

    let protected_routes = Router::new()
        .route(
            "/categories/",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route("/categories/:id/", delete(routes::categories::delete_category))
        .route(
            "/tasks/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id/",
            get(routes::tasks::get_task)
                .put(routes::tasks::replace_task)
                .patch(routes::tasks::patch_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
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
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;
    let gateway = state.gateway();

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .with_state(state)
        .merge(realtime::router(gateway))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and puts an `AuthContext` in the request
/// extensions for handlers to extract.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate_headers(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
