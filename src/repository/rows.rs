//! Row mappings between the `todo_app` tables and the plain models.

use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use uuid::Uuid;

use crate::models::subtask::{SubTask, SubTaskStatus};
use crate::models::todo::{Todo, TodoPriority, TodoStatus};
use crate::models::user::User;
use crate::repository::schema::sql_types::{
    SubtaskStatus as SubtaskStatusSql, TodoPriority as TodoPrioritySql,
    TodoStatus as TodoStatusSql,
};
use crate::repository::schema::{subtasks, todos, users};

/// Binds a model enum to a PostgreSQL enum type through its wire token.
macro_rules! pg_enum_column {
    ($column:ident, $model:ident, $sql:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
        #[diesel(sql_type = $sql)]
        pub struct $column(pub $model);

        impl ToSql<$sql, Pg> for $column {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.0.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<$sql, Pg> for $column {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let token = std::str::from_utf8(bytes.as_bytes())?;
                Ok($column(token.parse()?))
            }
        }
    };
}

pg_enum_column!(TodoStatusColumn, TodoStatus, TodoStatusSql);
pg_enum_column!(TodoPriorityColumn, TodoPriority, TodoPrioritySql);
pg_enum_column!(SubTaskStatusColumn, SubTaskStatus, SubtaskStatusSql);

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = todos)]
#[diesel(check_for_backend(Pg))]
pub struct TodoRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatusColumn,
    pub priority: TodoPriorityColumn,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

/// Every mutable column of a todo; `None` writes `NULL`.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = todos)]
#[diesel(treat_none_as_null = true)]
pub struct TodoChanges {
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatusColumn,
    pub priority: TodoPriorityColumn,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, Clone)]
#[diesel(belongs_to(TodoRow, foreign_key = todo_id))]
#[diesel(table_name = subtasks)]
#[diesel(check_for_backend(Pg))]
pub struct SubTaskRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: SubTaskStatusColumn,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub todo_id: Uuid,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status.0,
            priority: row.priority.0,
            due_date: row.due_date,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_id: row.user_id,
        }
    }
}

impl From<&Todo> for TodoRow {
    fn from(todo: &Todo) -> Self {
        TodoRow {
            id: todo.id,
            title: todo.title.clone(),
            description: todo.description.clone(),
            status: TodoStatusColumn(todo.status),
            priority: TodoPriorityColumn(todo.priority),
            due_date: todo.due_date,
            tags: todo.tags.clone(),
            created_at: todo.created_at,
            updated_at: todo.updated_at,
            user_id: todo.user_id,
        }
    }
}

impl From<&Todo> for TodoChanges {
    fn from(todo: &Todo) -> Self {
        TodoChanges {
            title: todo.title.clone(),
            description: todo.description.clone(),
            status: TodoStatusColumn(todo.status),
            priority: TodoPriorityColumn(todo.priority),
            due_date: todo.due_date,
            tags: todo.tags.clone(),
            updated_at: todo.updated_at,
            user_id: todo.user_id,
        }
    }
}

impl From<SubTaskRow> for SubTask {
    fn from(row: SubTaskRow) -> Self {
        SubTask {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status.0,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            todo_id: row.todo_id,
        }
    }
}

impl From<&SubTask> for SubTaskRow {
    fn from(subtask: &SubTask) -> Self {
        SubTaskRow {
            id: subtask.id,
            title: subtask.title.clone(),
            description: subtask.description.clone(),
            status: SubTaskStatusColumn(subtask.status),
            due_date: subtask.due_date,
            created_at: subtask.created_at,
            updated_at: subtask.updated_at,
            todo_id: subtask.todo_id,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}
