/// Authentication middleware for Axum
///
/// Turns a bearer access token into an [`AuthContext`] in the request
/// extensions. The REST routes get the token from the `Authorization`
/// header; the realtime socket passes it as a `?token=` query parameter and
/// calls [`authenticate_token`] directly.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::{self, Next}, response::Response, routing::get, Router};
/// use taskhub_shared::auth::middleware::{authenticate_headers, AuthContext, AuthError};
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.username)
/// }
///
/// async fn require_token(mut req: Request, next: Next) -> Result<Response, AuthError> {
///     let auth = authenticate_headers(req.headers(), "secret")?;
///     req.extensions_mut().insert(auth);
///     Ok(next.run(req).await)
/// }
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(require_token));
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::jwt::{validate_access_token, JwtError};

/// Authenticated caller, added to request extensions
///
/// Handlers can take it directly as an extractor; a request that never
/// passed the middleware is rejected with 401.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// No credentials were presented
    MissingCredentials,

    /// Authorization header isn't `Bearer <token>`
    InvalidFormat(String),

    /// Token failed validation
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => {
                "Authentication credentials were not provided".to_string()
            }
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized", "message": message })),
        )
            .into_response()
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

/// Validates an access token and builds the caller's context
pub fn authenticate_token(token: &str, secret: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_access_token(token, secret)?;
    let user_id = claims.user_id()?;

    Ok(AuthContext {
        user_id,
        username: claims.username,
    })
}

/// Reads `Authorization: Bearer <token>` and authenticates it
pub fn authenticate_headers(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    authenticate_token(token, secret)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
