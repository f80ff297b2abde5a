/// Category endpoints
///
/// - `GET /api/categories/` - The caller's categories, in ID order
/// - `POST /api/categories/` - Create a category
/// - `DELETE /api/categories/{id}/` - Delete a category; its tasks keep
///   existing without one
///
/// Categories of other users are invisible: deleting one is a 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    validation,
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskhub_shared::{
    auth::middleware::AuthContext,
    models::category::{Category, CreateCategory},
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(
        required(message = "This field is required."),
        custom(function = "validation::validate_category_name")
    )]
    pub name: Option<String>,
}

impl CategoryRequest {
    /// Trims the name; the stored value is the trimmed one
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
        }
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = Category::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(categories))
}

/// Creates a category owned by the caller
///
/// ```text
/// POST /api/categories/
///
/// { "name": "Work" }
/// ```
///
/// Responds `201 Created` with `{ "id", "name", "user", "created_at" }`.
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let req = req.trimmed();
    req.validate()?;

    let category = Category::create(
        &state.db,
        CreateCategory {
            name: req.name.unwrap_or_default(),
            user_id: auth.user_id,
        },
    )
    .await?;

    tracing::debug!(category_id = category.id, user_id = auth.user_id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_category(id, auth.user_id).await? {
        return Err(ApiError::NotFound("Not found.".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
