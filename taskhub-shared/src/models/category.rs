/// Category model and database operations
///
/// A category is a named bucket owned by one user. Deleting a category keeps
/// its tasks and clears their `category_id` (`ON DELETE SET NULL`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Maximum category name length
pub const NAME_MAX_LEN: usize = 100;

/// Category owned by a user
///
/// Serialized as `{id, name, user, created_at}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,

    pub name: String,

    /// Owning user
    #[serde(rename = "user")]
    pub user_id: i64,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub user_id: i64,
}

impl Category {
    /// Creates a category for `data.user_id`
    pub async fn create(pool: &PgPool, data: CreateCategory) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, user_id)
            VALUES ($1, $2)
            RETURNING id, name, user_id, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.user_id)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    /// Finds a category by ID, only if `user_id` owns it
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, user_id, created_at
            FROM categories
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Like [`Category::find_by_id_and_user`], but takes a share lock
    ///
    /// Inside a transaction this keeps the category from being deleted
    /// until the transaction ends.
    pub async fn lock_for_user<'e, E>(
        executor: E,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, user_id, created_at
            FROM categories
            WHERE id = $1 AND user_id = $2
            FOR SHARE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(category)
    }

    /// Lists a user's categories in ID order
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, user_id, created_at
            FROM categories
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    /// Deletes a category owned by `user_id`
    ///
    /// Returns `None` if nothing was deleted, otherwise the number of tasks
    /// whose `category_id` the foreign key cleared. Both statements run in
    /// one transaction so the count matches the delete.
    pub async fn delete_for_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM categories WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let (affected,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(affected as u64))
    }
}
