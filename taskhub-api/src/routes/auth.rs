/// Authentication endpoints
///
/// - `POST /api/register/` - Create an account
/// - `POST /api/token/` - Exchange username and password for a token pair
/// - `POST /api/token/refresh/` - Exchange a refresh token for a new access token
///
/// Access tokens go in `Authorization: Bearer <token>` on every other
/// `/api` route, and in `?token=` on the realtime socket.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ApiJson,
    validation,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskhub_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "This field is required."),
        custom(function = "validation::validate_username")
    )]
    pub username: Option<String>,

    /// Checked for strength after the field rules pass
    #[validate(required(message = "This field is required."))]
    pub password: Option<String>,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(custom(function = "validation::validate_bio"))]
    pub bio: Option<String>,
}

/// Token request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(required(message = "This field is required."))]
    pub username: Option<String>,

    #[validate(required(message = "This field is required."))]
    pub password: Option<String>,
}

/// Token pair
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(required(message = "This field is required."))]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/register/
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "correct horse",
///   "email": "alice@example.com",
///   "bio": ""
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the user (never the password hash):
///
/// ```json
/// { "id": 1, "username": "alice", "email": "alice@example.com", "bio": "", "created_at": "..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the username is taken
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    // A blank email is the same as none
    req.email = req.email.filter(|e| !e.trim().is_empty());
    req.validate()?;

    let (Some(username), Some(plaintext)) = (req.username, req.password) else {
        return Err(ApiError::InternalError(
            "validated register request is missing fields".to_string(),
        ));
    };

    password::validate_password_strength(&plaintext).map_err(|problems| {
        ApiError::ValidationError(
            problems
                .into_iter()
                .map(|message| ValidationErrorDetail::new("password", message))
                .collect(),
        )
    })?;

    let password_hash = password::hash_password(&plaintext)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username,
            email: req.email.unwrap_or_default(),
            password_hash,
            bio: req.bio.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Obtain a token pair
///
/// # Endpoint
///
/// ```text
/// POST /api/token/
///
/// { "username": "alice", "password": "correct horse" }
/// ```
///
/// # Response
///
/// ```json
/// { "access": "eyJ...", "refresh": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: A field is missing
/// - `401 Unauthorized`: Unknown user or wrong password
pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let (Some(username), Some(plaintext)) = (req.username, req.password) else {
        return Err(ApiError::InternalError(
            "validated token request is missing fields".to_string(),
        ));
    };

    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&plaintext, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "Password mismatch");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let lifetimes = state.config.jwt.lifetimes();
    let secret = state.jwt_secret();

    Ok(Json(TokenResponse {
        access: jwt::issue_token(
            user.id,
            &user.username,
            jwt::TokenType::Access,
            &lifetimes,
            secret,
        )?,
        refresh: jwt::issue_token(
            user.id,
            &user.username,
            jwt::TokenType::Refresh,
            &lifetimes,
            secret,
        )?,
    }))
}

/// Refresh an access token
///
/// # Endpoint
///
/// ```text
/// POST /api/token/refresh/
///
/// { "refresh": "eyJ..." }
/// ```
///
/// # Response
///
/// ```json
/// { "access": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or an access token
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    req.validate()?;

    let refresh = req.refresh.unwrap_or_default();
    let access = jwt::refresh_access_token(
        &refresh,
        &state.config.jwt.lifetimes(),
        state.jwt_secret(),
    )?;

    Ok(Json(RefreshResponse { access }))
}
