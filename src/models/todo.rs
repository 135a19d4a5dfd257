use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::subtask::{NewSubTask, SubTask};
use super::user::User;
use super::{explicit_null, string_enum, validate_title, ValidationError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Deferred,
    Cancelled,
}

string_enum!(TodoStatus, "status", {
    Pending => "pending",
    InProgress => "in-progress",
    Completed => "completed",
    Deferred => "deferred",
    Cancelled => "cancelled",
});

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(TodoPriority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

impl Todo {
    pub fn new(id: Uuid, input: TodoInput, at: DateTime<Utc>) -> Self {
        Todo {
            id,
            title: input.title.unwrap_or_default(),
            description: input.description,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            tags: input.tags.unwrap_or_default(),
            created_at: at,
            updated_at: at,
            user_id: input.user_id,
        }
    }

    /// Overwrites every mutable field, re-applying the status/priority defaults.
    pub fn replace_with(&mut self, input: TodoInput, at: DateTime<Utc>) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Todo {
            created_at,
            ..Todo::new(id, input, at)
        };
    }
}

/// A todo with its subtasks and owner resolved, as served over HTTP.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoItemData {
    #[serde(flatten)]
    pub todo: Todo,
    pub sub_tasks: Vec<SubTask>,
    pub user: Option<User>,
}

/// Body of `PUT /todos/{id}`; also the todo part of a create request.
#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<Uuid>,
}

impl TodoInput {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.title = Some(validate_title(self.title.as_deref(), "Title is required")?);
        Ok(self)
    }
}

/// Body of `POST /todos`.
#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    #[serde(flatten)]
    pub todo: TodoInput,
    #[serde(default)]
    pub sub_tasks: Vec<NewSubTask>,
}

impl NewTodo {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(NewTodo {
            todo: self.todo.validate()?,
            sub_tasks: self
                .sub_tasks
                .into_iter()
                .map(NewSubTask::validate)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Body of `PATCH /todos/{id}`. Absent fields are left untouched; nullable
/// fields distinguish "absent" from an explicit `null`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub user_id: Option<Option<Uuid>>,
}

impl TodoPatch {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if let Some(title) = self.title.as_deref() {
            self.title = Some(validate_title(Some(title), "Title cannot be empty")?);
        }
        Ok(self)
    }

    pub fn apply(self, todo: &mut Todo, at: DateTime<Utc>) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(status) = self.status {
            todo.status = status;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            todo.tags = tags;
        }
        if let Some(user_id) = self.user_id {
            todo.user_id = user_id;
        }
        todo.updated_at = at;
    }
}
