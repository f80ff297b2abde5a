/// Database models for TaskHub
///
/// Each model owns its CRUD queries as associated functions taking a
/// `&PgPool`.
///
/// # Models
///
/// - `user`: accounts and credentials
/// - `category`: per-user task buckets
/// - `task`: tasks plus their read/write projections and list filters
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::category::{Category, CreateCategory};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, user_id: i64) -> Result<(), sqlx::Error> {
/// let work = Category::create(&pool, CreateCategory {
///     name: "Work".to_string(),
///     user_id,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod category;
pub mod task;
pub mod user;
