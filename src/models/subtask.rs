use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{string_enum, validate_title, ValidationError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SubTaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

string_enum!(SubTaskStatus, "subtask status", {
    Pending => "pending",
    InProgress => "in-progress",
    Completed => "completed",
});

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: SubTaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub todo_id: Uuid,
}

impl SubTask {
    pub fn new(id: Uuid, todo_id: Uuid, input: NewSubTask, at: DateTime<Utc>) -> Self {
        SubTask {
            id,
            title: input.title.unwrap_or_default(),
            description: input.description,
            status: input.status.unwrap_or_default(),
            due_date: input.due_date,
            created_at: at,
            updated_at: at,
            todo_id,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSubTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<SubTaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewSubTask {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.title = Some(validate_title(self.title.as_deref(), "Subtask title is required")?);
        Ok(self)
    }
}
