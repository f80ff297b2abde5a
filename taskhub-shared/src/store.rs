/// Task write path
///
/// `TaskStore` wraps the model queries that change tasks and announces each
/// change through the [`ChangeNotifier`]. Every mutation that reports
/// success notifies exactly once; one that touched nothing (missing or not
/// owned) doesn't notify at all.
///
/// It also enforces that a task's category belongs to the task's owner.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskhub_shared::broadcast::memory::InMemoryChannel;
/// use taskhub_shared::models::task::TaskWrite;
/// use taskhub_shared::notifier::ChangeNotifier;
/// use taskhub_shared::store::TaskStore;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let notifier = ChangeNotifier::new(Arc::new(InMemoryChannel::new()));
/// let store = TaskStore::new(pool, notifier);
///
/// let view = store.create_task(1, TaskWrite {
///     title: Some("Write report".to_string()),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::models::category::Category;
use crate::models::task::{Task, TaskView, TaskWrite};
use crate::models::user::User;
use crate::notifier::ChangeNotifier;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// `category_id` doesn't name one of the caller's categories
    #[error("Invalid category \"{0}\" - object does not exist.")]
    InvalidCategory(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which tasks a realtime snapshot contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Every task of every user
    All,

    /// Only this user's tasks
    Owner(i64),
}

#[derive(Clone)]
pub struct TaskStore {
    pool: PgPool,
    notifier: ChangeNotifier,
}

impl TaskStore {
    pub fn new(pool: PgPool, notifier: ChangeNotifier) -> Self {
        Self { pool, notifier }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates a task owned by `user_id`
    ///
    /// Missing fields take the column defaults. Returns the read view.
    pub async fn create_task(&self, user_id: i64, write: TaskWrite) -> Result<TaskView, StoreError> {
        let mut tx = self.pool.begin().await?;

        let category = owned_category(&mut tx, write.category_id.flatten(), user_id).await?;
        let task = Task::create(&mut *tx, write.into_create(user_id)).await?;

        tx.commit().await?;
        self.notifier.task_changed().await;

        Ok(TaskView::from_parts(task, category))
    }

    /// Applies `changes` to one of `user_id`'s tasks
    ///
    /// Returns `None` (and doesn't notify) if the task doesn't exist or
    /// belongs to someone else.
    pub async fn update_task(
        &self,
        id: i64,
        user_id: i64,
        changes: TaskWrite,
    ) -> Result<Option<TaskView>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(Some(category_id)) = changes.category_id {
            owned_category(&mut tx, Some(category_id), user_id).await?;
        }

        let Some(task) = Task::update(&mut *tx, id, user_id, changes).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        tx.commit().await?;
        self.notifier.task_changed().await;

        let category = match task.category_id {
            Some(category_id) => {
                Category::find_by_id_and_user(&self.pool, category_id, user_id).await?
            }
            None => None,
        };

        Ok(Some(TaskView::from_parts(task, category)))
    }

    /// Deletes one of `user_id`'s tasks
    pub async fn delete_task(&self, id: i64, user_id: i64) -> Result<bool, StoreError> {
        let deleted = Task::delete_for_user(&self.pool, id, user_id).await?;
        if deleted {
            self.notifier.task_changed().await;
        }
        Ok(deleted)
    }

    /// Deletes one of `user_id`'s categories
    ///
    /// Tasks in the category keep existing with no category. Notifies only
    /// if at least one task was affected, since otherwise no snapshot
    /// changed.
    pub async fn delete_category(&self, id: i64, user_id: i64) -> Result<bool, StoreError> {
        match Category::delete_for_user(&self.pool, id, user_id).await? {
            None => Ok(false),
            Some(affected) => {
                if affected > 0 {
                    self.notifier.task_changed().await;
                }
                Ok(true)
            }
        }
    }

    /// Deletes a user together with their categories and tasks
    ///
    /// Notifies once if the cascade removed any task.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        match User::delete(&self.pool, user_id).await? {
            None => Ok(false),
            Some(removed) => {
                if removed > 0 {
                    self.notifier.task_changed().await;
                }
                tracing::info!(user_id, tasks = removed, "User deleted");
                Ok(true)
            }
        }
    }

    /// Reads the current task snapshot in ID order
    pub async fn snapshot(&self, scope: SnapshotScope) -> Result<Vec<Task>, sqlx::Error> {
        match scope {
            SnapshotScope::All => Task::list_all(&self.pool).await,
            SnapshotScope::Owner(user_id) => Task::list_by_user(&self.pool, user_id).await,
        }
    }
}

/// Locks `category_id` for the rest of `tx` if `user_id` owns it
///
/// The share lock keeps a concurrent delete from nulling the reference
/// between this check and the task write.
async fn owned_category(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Option<i64>,
    user_id: i64,
) -> Result<Option<Category>, StoreError> {
    let Some(category_id) = category_id else {
        return Ok(None);
    };

    Category::lock_for_user(&mut **tx, category_id, user_id)
        .await?
        .map(Some)
        .ok_or(StoreError::InvalidCategory(category_id))
}
