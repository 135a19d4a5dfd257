pub mod database;
#[cfg(test)]
pub mod memory;
pub mod query;
pub mod rows;
pub mod schema;

use uuid::Uuid;

use crate::models::subtask::{NewSubTask, SubTask};
use crate::models::todo::{NewTodo, TodoInput, TodoItemData, TodoPatch};
use query::ListOptions;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("could not get a database connection")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("database query failed")]
    Query(#[from] diesel::result::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage gateway for todos and their subtasks.
///
/// Writes take validated input; every method that returns a todo resolves
/// its subtasks and owner. Calls block on I/O.
#[cfg_attr(test, mockall::automock)]
pub trait TodoRepository: Send + Sync {
    /// One window of the listing plus the unwindowed total, read from the
    /// same snapshot.
    fn find_all(&self, options: &ListOptions) -> RepositoryResult<(Vec<TodoItemData>, i64)>;

    fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<TodoItemData>>;

    /// Inserts the todo and its nested subtasks atomically.
    fn create(&self, todo: NewTodo) -> RepositoryResult<TodoItemData>;

    /// Full replace. `None` when the todo does not exist.
    fn replace(&self, id: Uuid, todo: TodoInput) -> RepositoryResult<Option<TodoItemData>>;

    /// Partial update. `None` when the todo does not exist.
    fn patch(&self, id: Uuid, patch: TodoPatch) -> RepositoryResult<Option<TodoItemData>>;

    /// Hard delete, cascading to subtasks. `false` when nothing was removed.
    fn delete(&self, id: Uuid) -> RepositoryResult<bool>;

    /// `None` when the todo does not exist.
    fn find_subtasks(&self, todo_id: Uuid) -> RepositoryResult<Option<Vec<SubTask>>>;

    /// `None` when the todo does not exist.
    fn add_subtask(&self, todo_id: Uuid, subtask: NewSubTask) -> RepositoryResult<Option<SubTask>>;

    fn find_subtask_by_id(&self, id: Uuid) -> RepositoryResult<Option<SubTask>>;

    fn ping(&self) -> RepositoryResult<()>;
}
