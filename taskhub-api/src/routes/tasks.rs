/// Task endpoints
///
/// - `GET /api/tasks/` - The caller's tasks, optionally filtered by
///   `status`, `priority` and `category`
/// - `POST /api/tasks/` - Create a task
/// - `GET /api/tasks/{id}/` - One task
/// - `PUT /api/tasks/{id}/` - Update a task (`title` required)
/// - `PATCH /api/tasks/{id}/` - Update only the given fields
/// - `DELETE /api/tasks/{id}/` - Delete a task
///
/// Responses carry the read view, with the category nested. Requests use
/// the write view: `title`, `description`, `status`, `priority` and
/// `category_id`. Anything else in the body (`id`, `user`, timestamps) is
/// ignored.
///
/// Every successful write triggers one realtime `task_update` push.

use std::collections::HashMap;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{ApiJson, ApiPath, ApiQuery},
    validation,
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};
use taskhub_shared::{
    auth::middleware::AuthContext,
    models::task::{Task, TaskFilter, TaskPriority, TaskStatus, TaskView, TaskWrite},
};

/// Task body as sent by clients
///
/// `status` and `priority` arrive as raw strings so an unknown value is
/// reported on its field instead of failing the whole body. Every field
/// tells an absent key (`None`) from an explicit `null` (`Some(None)`).
#[derive(Debug, Default, Deserialize)]
pub struct TaskInput {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<Option<String>>,

    /// Absent leaves the category alone; `null` clears it
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<i64>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Whether the body must carry every required field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Full,
    Partial,
}

impl TaskInput {
    /// Validates the body and converts it to the write view
    ///
    /// Text fields are stored trimmed. All field problems are reported
    /// together.
    pub fn into_write(self, mode: WriteMode) -> Result<TaskWrite, ApiError> {
        let mut errors = Vec::new();

        if self.title.is_none() && mode == WriteMode::Full {
            errors.push(ValidationErrorDetail::new("title", validation::REQUIRED));
        }
        let title = not_null("title", self.title, &mut errors).map(|t| t.trim().to_string());
        if let Some(title) = &title {
            if let Err(e) = validation::validate_title(title) {
                errors.push(ValidationErrorDetail::new(
                    "title",
                    e.message.map(|m| m.to_string()).unwrap_or_default(),
                ));
            }
        }

        let description = not_null("description", self.description, &mut errors)
            .map(|d| d.trim().to_string());

        let status = not_null("status", self.status, &mut errors)
            .and_then(|raw| parse_choice::<TaskStatus>("status", &raw, &mut errors));
        let priority = not_null("priority", self.priority, &mut errors)
            .and_then(|raw| parse_choice::<TaskPriority>("priority", &raw, &mut errors));

        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        Ok(TaskWrite {
            title,
            description,
            status,
            priority,
            category_id: self.category_id,
        })
    }
}

/// Unwraps a present value, reporting an explicit `null`
fn not_null<T>(
    field: &str,
    value: Option<Option<T>>,
    errors: &mut Vec<ValidationErrorDetail>,
) -> Option<T> {
    match value? {
        Some(value) => Some(value),
        None => {
            errors.push(ValidationErrorDetail::new(field, validation::NULL));
            None
        }
    }
}

fn parse_choice<T>(field: &str, raw: &str, errors: &mut Vec<ValidationErrorDetail>) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(ValidationErrorDetail::new(field, e.to_string()));
            None
        }
    }
}

/// Parses `?status=&priority=&category=` into a filter
///
/// Empty values mean "no filter". Unknown parameters are ignored.
pub fn parse_filter(params: &HashMap<String, String>) -> Result<TaskFilter, ApiError> {
    let mut errors = Vec::new();
    let value = |key: &str| params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    let status = value("status").and_then(|raw| match raw.parse::<TaskStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.push(invalid_choice("status", raw));
            None
        }
    });

    let priority = value("priority").and_then(|raw| match raw.parse::<TaskPriority>() {
        Ok(priority) => Some(priority),
        Err(_) => {
            errors.push(invalid_choice("priority", raw));
            None
        }
    });

    let category_id = value("category").and_then(|raw| match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(ValidationErrorDetail::new(
                "category",
                "Select a valid choice. That choice is not one of the available choices.",
            ));
            None
        }
    });

    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    Ok(TaskFilter {
        status,
        priority,
        category_id,
    })
}

fn invalid_choice(field: &str, value: &str) -> ValidationErrorDetail {
    ValidationErrorDetail::new(
        field,
        format!(
            "Select a valid choice. {} is not one of the available choices.",
            value
        ),
    )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Not found.".to_string())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let filter = parse_filter(&params)?;
    let tasks = Task::list_views(&state.db, auth.user_id, &filter).await?;
    Ok(Json(tasks))
}

/// Creates a task owned by the caller
///
/// ```text
/// POST /api/tasks/
///
/// { "title": "Write report", "priority": "HIGH", "category_id": 3 }
/// ```
///
/// Missing `status` and `priority` default to `TODO` and `MEDIUM`.
/// A `category_id` that isn't one of the caller's categories is a 400.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let write = input.into_write(WriteMode::Full)?;
    let task = state.store.create_task(auth.user_id, write).await?;

    tracing::debug!(task_id = task.id, user_id = auth.user_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TaskView>> {
    Task::find_view(&state.db, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn replace_task(
    state: State<AppState>,
    auth: AuthContext,
    id: ApiPath<i64>,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<Json<TaskView>> {
    apply_update(state, auth, id, input, WriteMode::Full).await
}

pub async fn patch_task(
    state: State<AppState>,
    auth: AuthContext,
    id: ApiPath<i64>,
    ApiJson(input): ApiJson<TaskInput>,
) -> ApiResult<Json<TaskView>> {
    apply_update(state, auth, id, input, WriteMode::Partial).await
}

async fn apply_update(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    input: TaskInput,
    mode: WriteMode,
) -> ApiResult<Json<TaskView>> {
    // A task the caller can't see is a 404 whatever the body says
    if Task::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .is_none()
    {
        return Err(not_found());
    }

    let write = input.into_write(mode)?;
    let task = state
        .store
        .update_task(id, auth.user_id, write)
        .await?
        .ok_or_else(not_found)?;

    tracing::debug!(task_id = task.id, user_id = auth.user_id, "Task updated");

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_task(id, auth.user_id).await? {
        return Err(not_found());
    }

    tracing::debug!(task_id = id, user_id = auth.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}
