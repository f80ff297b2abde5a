/// Realtime task updates over WebSocket
///
/// `GET /ws/tasks/` upgrades to a WebSocket. Every connection joins the
/// `tasks` broadcast group and receives a full task snapshot whenever any
/// task changes.
///
/// # Authentication
///
/// Browsers can't set headers on a WebSocket handshake, so an access token
/// may be passed as `?token=<jwt>`. A token that doesn't validate is
/// rejected with 401 before the upgrade.
///
/// With the `all` snapshot scope a token is optional and every connection
/// sees every task. With the `owner` scope a token is required and each
/// connection only sees its user's tasks.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskhub_api::config::SnapshotScopeMode;
/// use taskhub_api::realtime::{router, GatewayState};
/// use taskhub_shared::broadcast::memory::InMemoryChannel;
/// use taskhub_shared::store::TaskStore;
/// use tokio_util::sync::CancellationToken;
///
/// # fn example(store: TaskStore) {
/// let gateway = GatewayState {
///     channel: Arc::new(InMemoryChannel::new()),
///     snapshots: Arc::new(store),
///     jwt_secret: Arc::from("secret"),
///     scope: SnapshotScopeMode::All,
///     queue_capacity: 64,
///     shutdown: CancellationToken::new(),
/// };
/// let app: axum::Router = router(gateway);
/// # }
/// ```

pub mod connection;
pub mod messages;

use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use taskhub_shared::{
    auth::middleware::{authenticate_token, AuthContext, AuthError},
    broadcast::SharedChannel,
    models::task::Task,
    store::{SnapshotScope, TaskStore},
};
use tokio_util::sync::CancellationToken;

use crate::config::SnapshotScopeMode;

/// Where connections read their snapshots from
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, scope: SnapshotScope) -> Result<Vec<Task>, sqlx::Error>;
}

#[async_trait]
impl SnapshotSource for TaskStore {
    async fn snapshot(&self, scope: SnapshotScope) -> Result<Vec<Task>, sqlx::Error> {
        TaskStore::snapshot(self, scope).await
    }
}

/// Everything a realtime connection needs
#[derive(Clone)]
pub struct GatewayState {
    pub channel: SharedChannel,
    pub snapshots: Arc<dyn SnapshotSource>,
    pub jwt_secret: Arc<str>,
    pub scope: SnapshotScopeMode,

    /// Per-connection event queue size
    pub queue_capacity: usize,

    /// Cancelled on server shutdown; open connections close with 1001
    pub shutdown: CancellationToken,
}

impl GatewayState {
    /// Picks the snapshot scope for a connection, or rejects it
    pub fn scope_for(&self, user: Option<&AuthContext>) -> Result<SnapshotScope, AuthError> {
        match (self.scope, user) {
            (SnapshotScopeMode::All, _) => Ok(SnapshotScope::All),
            (SnapshotScopeMode::Owner, Some(user)) => Ok(SnapshotScope::Owner(user.user_id)),
            (SnapshotScopeMode::Owner, None) => Err(AuthError::MissingCredentials),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Builds the `/ws/tasks/` route
pub fn router(gateway: GatewayState) -> Router {
    Router::new()
        .route("/ws/tasks/", get(tasks_socket))
        .with_state(gateway)
}

/// WebSocket handshake for task updates
pub async fn tasks_socket(
    State(gateway): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AuthError> {
    let user = match params.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => Some(authenticate_token(token, &gateway.jwt_secret).map_err(|e| {
            tracing::debug!(error = ?e, "Realtime handshake rejected");
            e
        })?),
        None => None,
    };

    let scope = gateway.scope_for(user.as_ref())?;

    if let Some(user) = &user {
        tracing::debug!(user_id = user.user_id, "Authenticated realtime handshake");
    }

    Ok(ws.on_upgrade(move |socket| connection::run(socket, gateway, scope)))
}
