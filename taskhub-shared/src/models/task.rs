/// Task model and database operations
///
/// Tasks are the core entity of TaskHub. Every task belongs to exactly one
/// user and optionally to one of that user's categories.
///
/// Three shapes of the same row are exposed:
///
/// - [`Task`]: the flat record, also the element type of realtime snapshots
///   (`category_id` and `user_id` as plain IDs)
/// - [`TaskView`]: what the REST API returns, with the category nested
/// - [`TaskWrite`]: the fields a client may set; server-assigned fields are
///   not part of it
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'IN_PROGRESS', 'DONE');
/// CREATE TYPE task_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status task_status NOT NULL DEFAULT 'TODO',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::task::{Task, TaskFilter, TaskStatus, TaskWrite};
/// use sqlx::{PgExecutor, PgPool};
///
/// # async fn example(pool: PgPool, user_id: i64) -> Result<(), sqlx::Error> {
/// let write = TaskWrite {
///     title: Some("Write report".to_string()),
///     ..Default::default()
/// };
/// let task = Task::create(&pool, write.into_create(user_id)).await?;
///
/// let todo = Task::list_views(&pool, user_id, &TaskFilter {
///     status: Some(TaskStatus::Todo),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

use super::category::Category;

/// Maximum task title length
pub const TITLE_MAX_LEN: usize = 200;

/// A string that doesn't name any variant of a choice field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidChoice(pub String);

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Wire and database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(InvalidChoice(other.to_string())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    /// Wire and database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            other => Err(InvalidChoice(other.to_string())),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat task record
///
/// This is the row as stored and the element type of realtime snapshots.
/// Timestamps serialize as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category_id: Option<i64>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read projection returned by the REST API
///
/// The category is nested (or null); the owner is exposed as `user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: Option<Category>,
    pub user: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Builds the view from a task row and its already-loaded category
    pub fn from_parts(task: Task, category: Option<Category>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            category,
            user: task.user_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Task joined with its category, prior to nesting
#[derive(Debug, sqlx::FromRow)]
struct TaskViewRow {
    id: i64,
    title: String,
    description: String,
    status: TaskStatus,
    priority: TaskPriority,
    user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_user_id: Option<i64>,
    category_created_at: Option<DateTime<Utc>>,
}

impl From<TaskViewRow> for TaskView {
    fn from(row: TaskViewRow) -> Self {
        let category = match (
            row.category_id,
            row.category_name,
            row.category_user_id,
            row.category_created_at,
        ) {
            (Some(id), Some(name), Some(user_id), Some(created_at)) => Some(Category {
                id,
                name,
                user_id,
                created_at,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            category,
            user: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Client-writable task fields
///
/// Every field is optional so the same shape serves create, full update and
/// partial update. `category_id` distinguishes "leave unchanged" (`None`)
/// from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskWrite {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category_id: Option<Option<i64>>,
}

impl TaskWrite {
    /// Builds a create input owned by `user_id`, filling column defaults
    pub fn into_create(self, user_id: i64) -> CreateTask {
        CreateTask {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            category_id: self.category_id.flatten(),
            user_id,
        }
    }
}

/// Input for creating a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category_id: Option<i64>,
    pub user_id: i64,
}

/// Optional filters for listing a user's tasks
///
/// Filters combine with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category_id: Option<i64>,
}

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, category_id, user_id, created_at, updated_at";

const TASK_VIEW_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.user_id,
           t.created_at, t.updated_at,
           c.id AS category_id, c.name AS category_name,
           c.user_id AS category_user_id, c.created_at AS category_created_at
    FROM tasks t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

impl Task {
    /// Creates a task
    ///
    /// The caller is responsible for checking that `category_id`, if set,
    /// belongs to `user_id`. Runs on a pool or inside a transaction.
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO tasks (title, description, status, priority, category_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.category_id)
            .bind(data.user_id)
            .fetch_one(executor)
            .await?;

        Ok(task)
    }

    /// Finds a task by ID regardless of owner
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task by ID, only if `user_id` owns it
    ///
    /// This is the lookup API handlers use; a task owned by someone else is
    /// indistinguishable from a missing one.
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists every task of every user in ID order
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id");

        let tasks = sqlx::query_as::<_, Task>(&query).fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Lists one user's tasks in ID order
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY id");

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Lists one user's tasks as read views, applying `filter`
    pub async fn list_views(
        pool: &PgPool,
        user_id: i64,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskView>, sqlx::Error> {
        let query = format!(
            r#"{TASK_VIEW_SELECT}
            WHERE t.user_id = $1
              AND ($2::task_status IS NULL OR t.status = $2)
              AND ($3::task_priority IS NULL OR t.priority = $3)
              AND ($4::BIGINT IS NULL OR t.category_id = $4)
            ORDER BY t.id
            "#
        );

        let rows = sqlx::query_as::<_, TaskViewRow>(&query)
            .bind(user_id)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(filter.category_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(TaskView::from).collect())
    }

    /// Finds one of `user_id`'s tasks as a read view
    pub async fn find_view(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<TaskView>, sqlx::Error> {
        let query = format!("{TASK_VIEW_SELECT} WHERE t.id = $1 AND t.user_id = $2");

        let row = sqlx::query_as::<_, TaskViewRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(TaskView::from))
    }

    /// Applies `changes` to a task owned by `user_id`
    ///
    /// Only `Some` fields are written; `updated_at` is always refreshed.
    /// Returns `None` if the task doesn't exist or isn't owned by `user_id`.
    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        user_id: i64,
        changes: TaskWrite,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (set_category, category_id) = match changes.category_id {
            Some(category_id) => (true, category_id),
            None => (false, None),
        };

        let query = format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                status = COALESCE($5, status),
                priority = COALESCE($6, priority),
                category_id = CASE WHEN $7::BOOLEAN THEN $8 ELSE category_id END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.status)
            .bind(changes.priority)
            .bind(set_category)
            .bind(category_id)
            .fetch_optional(executor)
            .await?;

        Ok(task)
    }

    /// Deletes a task owned by `user_id`
    ///
    /// Returns true if a row was deleted.
    pub async fn delete_for_user(pool: &PgPool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            title: "Write report".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            category_id: None,
            user_id: 42,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(TaskStatus::Done.to_string(), "DONE");
        assert_eq!(
            "done".parse::<TaskStatus>(),
            Err(InvalidChoice("done".to_string()))
        );
    }

    #[test]
    fn test_priority_parse_and_display() {
        assert_eq!("HIGH".parse::<TaskPriority>(), Ok(TaskPriority::High));
        assert_eq!(TaskPriority::Low.as_str(), "LOW");
        assert!("URGENT".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_defaults_match_schema() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_invalid_choice_message() {
        let err = "URGENT".parse::<TaskPriority>().unwrap_err();
        assert_eq!(err.to_string(), "\"URGENT\" is not a valid choice.");
    }

    #[test]
    fn test_snapshot_row_is_flat() {
        let json = serde_json::to_value(sample_task()).unwrap();

        assert_eq!(json["status"], "TODO");
        assert_eq!(json["priority"], "MEDIUM");
        assert_eq!(json["category_id"], json!(null));
        assert_eq!(json["user_id"], 42);
        assert!(json.get("category").is_none());

        let created = json["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn test_view_nests_category() {
        let now = Utc::now();
        let row = TaskViewRow {
            id: 5,
            title: "Ship".to_string(),
            description: "v1".to_string(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            user_id: 9,
            created_at: now,
            updated_at: now,
            category_id: Some(2),
            category_name: Some("Work".to_string()),
            category_user_id: Some(9),
            category_created_at: Some(now),
        };

        let json = serde_json::to_value(TaskView::from(row)).unwrap();
        assert_eq!(json["user"], 9);
        assert_eq!(json["category"]["id"], 2);
        assert_eq!(json["category"]["name"], "Work");
        assert_eq!(json["category"]["user"], 9);
        assert!(json.get("category_id").is_none());
    }

    #[test]
    fn test_view_without_category_is_null() {
        let now = Utc::now();
        let row = TaskViewRow {
            id: 5,
            title: "Ship".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Low,
            user_id: 9,
            created_at: now,
            updated_at: now,
            category_id: None,
            category_name: None,
            category_user_id: None,
            category_created_at: None,
        };

        let view = TaskView::from(row);
        assert!(view.category.is_none());
        assert_eq!(serde_json::to_value(view).unwrap()["category"], json!(null));
    }

    #[test]
    fn test_write_into_create_fills_defaults() {
        let create = TaskWrite {
            title: Some("Plan".to_string()),
            category_id: Some(Some(4)),
            ..Default::default()
        }
        .into_create(11);

        assert_eq!(create.title, "Plan");
        assert_eq!(create.description, "");
        assert_eq!(create.status, TaskStatus::Todo);
        assert_eq!(create.priority, TaskPriority::Medium);
        assert_eq!(create.category_id, Some(4));
        assert_eq!(create.user_id, 11);
    }
}
