use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::models::subtask::{NewSubTask, SubTask};
use crate::models::todo::{NewTodo, TodoInput, TodoItemData, TodoPatch, TodoPriority, TodoStatus};
use crate::models::ValidationError;
use crate::repository::query::{
    ListOptions, Page, Pagination, Sort, TodoFilters, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use crate::repository::{RepositoryResult, TodoRepository};

type Repo = web::Data<dyn TodoRepository>;

/// Raw query string of `GET /todos`. Every value arrives as text and is
/// checked by [`ListQuery::into_options`].
#[derive(Deserialize, Debug, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size, 1 to 100.
    pub limit: Option<String>,
    /// `field[:asc|desc]`, e.g. `dueDate:asc`.
    pub sort: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub user_id: Option<String>,
    /// Comma separated; matches todos carrying any of them.
    pub tags: Option<String>,
    pub due_after: Option<String>,
    pub due_before: Option<String>,
    pub search: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_integer(name: &str, raw: Option<String>, default: i64) -> Result<i64, ValidationError> {
    match present(raw) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ValidationError::new(format!("{name} must be an integer"))),
    }
}

fn parse_date(name: &str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ValidationError::new(format!("{name} must be an ISO 8601 date")))
}

impl ListQuery {
    pub fn into_options(self) -> Result<ListOptions, ValidationError> {
        let pagination = Pagination::new(
            parse_integer("page", self.page, DEFAULT_PAGE)?,
            parse_integer("limit", self.limit, DEFAULT_LIMIT)?,
        )?;

        let status = present(self.status)
            .map(|raw| raw.parse::<TodoStatus>())
            .transpose()
            .map_err(|err| ValidationError::new(err.to_string()))?;
        let priority = present(self.priority)
            .map(|raw| raw.parse::<TodoPriority>())
            .transpose()
            .map_err(|err| ValidationError::new(err.to_string()))?;
        let user_id = present(self.user_id)
            .map(|raw| Uuid::parse_str(&raw))
            .transpose()
            .map_err(|_| ValidationError::new("userId must be a UUID"))?;

        let tags = present(self.tags)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let due_after = present(self.due_after)
            .map(|raw| parse_date("dueAfter", &raw))
            .transpose()?;
        let due_before = present(self.due_before)
            .map(|raw| parse_date("dueBefore", &raw))
            .transpose()?;

        Ok(ListOptions {
            pagination,
            sort: present(self.sort)
                .map(|raw| Sort::parse(&raw))
                .unwrap_or_default(),
            filters: TodoFilters {
                status,
                priority,
                user_id,
                tags,
                due_after,
                due_before,
                // only blank means absent; surrounding spaces are part of the needle
                search: self.search.filter(|search| !search.trim().is_empty()),
            },
        })
    }
}

/// Runs a gateway call on the blocking pool, turning any failure into a 500
/// carrying `message`.
async fn blocking<T, F>(message: &'static str, call: F) -> Result<T, AppError>
where
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    match web::block(call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AppError::internal(message, err)),
        Err(err) => Err(AppError::internal(message, anyhow::anyhow!("{err}"))),
    }
}

// Ids that are not UUIDs can never name a stored row.
fn todo_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Todo not found"))
}

#[utoipa::path(
    get,
    path = "/todos",
    tag = "todos",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of matching todos", body = Page<TodoItemData>),
        (status = 400, description = "Invalid query parameter", body = ErrorBody),
        (status = 500, description = "Unexpected failure", body = ErrorBody),
    )
)]
#[get("/todos")]
#[tracing::instrument(skip_all, fields(path = %req.path()))]
pub async fn get_todos(
    req: HttpRequest,
    repo: Repo,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let options = query.into_inner().into_options()?;
    let pagination = options.pagination;
    let repo = repo.into_inner();
    let (items, total) = blocking("Failed to fetch todos", move || repo.find_all(&options)).await?;
    info!(
        total,
        page = pagination.page(),
        returned = items.len(),
        "Listed todos"
    );
    Ok(HttpResponse::Ok().json(Page::new(items, total, pagination)))
}

#[utoipa::path(
    get,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "The todo with its subtasks and owner", body = TodoItemData),
        (status = 404, description = "No such todo", body = ErrorBody),
    )
)]
#[get("/todos/{id}")]
#[tracing::instrument(skip_all, fields(path = %req.path(), todo_id = %id))]
pub async fn get_todo_by_id(
    req: HttpRequest,
    repo: Repo,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = todo_id(&id)?;
    let repo = repo.into_inner();
    match blocking("Failed to fetch todo", move || repo.find_by_id(id)).await? {
        Some(todo) => Ok(HttpResponse::Ok().json(todo)),
        None => Err(AppError::not_found("Todo not found")),
    }
}

#[utoipa::path(
    post,
    path = "/todos",
    tag = "todos",
    request_body = NewTodo,
    responses(
        (status = 201, description = "Created", body = TodoItemData),
        (status = 400, description = "Missing or empty title", body = ErrorBody),
    )
)]
#[post("/todos")]
#[tracing::instrument(skip_all, fields(path = %req.path()))]
pub async fn create_todo(
    req: HttpRequest,
    repo: Repo,
    body: web::Json<NewTodo>,
) -> Result<HttpResponse, AppError> {
    let new_todo = body.into_inner().validate()?;
    let repo = repo.into_inner();
    let created = blocking("Failed to create todo", move || repo.create(new_todo)).await?;
    info!(todo_id = %created.todo.id, subtasks = created.sub_tasks.len(), "Created todo");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    put,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = TodoInput,
    responses(
        (status = 200, description = "Replaced", body = TodoItemData),
        (status = 400, description = "Missing or empty title", body = ErrorBody),
        (status = 404, description = "No such todo", body = ErrorBody),
    )
)]
#[put("/todos/{id}")]
#[tracing::instrument(skip_all, fields(path = %req.path(), todo_id = %id))]
pub async fn update_todo_by_id(
    req: HttpRequest,
    repo: Repo,
    id: web::Path<String>,
    body: web::Json<TodoInput>,
) -> Result<HttpResponse, AppError> {
    let id = todo_id(&id)?;
    let input = body.into_inner().validate()?;
    let repo = repo.into_inner();
    match blocking("Failed to update todo", move || repo.replace(id, input)).await? {
        Some(todo) => {
            info!(todo_id = %id, "Replaced todo");
            Ok(HttpResponse::Ok().json(todo))
        }
        None => Err(AppError::not_found("Todo not found")),
    }
}

#[utoipa::path(
    patch,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = TodoPatch,
    responses(
        (status = 200, description = "Updated", body = TodoItemData),
        (status = 400, description = "Empty title", body = ErrorBody),
        (status = 404, description = "No such todo", body = ErrorBody),
    )
)]
#[patch("/todos/{id}")]
#[tracing::instrument(skip_all, fields(path = %req.path(), todo_id = %id))]
pub async fn patch_todo_by_id(
    req: HttpRequest,
    repo: Repo,
    id: web::Path<String>,
    body: web::Json<TodoPatch>,
) -> Result<HttpResponse, AppError> {
    let id = todo_id(&id)?;
    let patch = body.into_inner().validate()?;
    let repo = repo.into_inner();
    match blocking("Failed to update todo", move || repo.patch(id, patch)).await? {
        Some(todo) => {
            info!(todo_id = %id, "Patched todo");
            Ok(HttpResponse::Ok().json(todo))
        }
        None => Err(AppError::not_found("Todo not found")),
    }
}

#[utoipa::path(
    delete,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 204, description = "Deleted with its subtasks"),
        (status = 404, description = "No such todo", body = ErrorBody),
    )
)]
#[delete("/todos/{id}")]
#[tracing::instrument(skip_all, fields(path = %req.path(), todo_id = %id))]
pub async fn delete_todo_by_id(
    req: HttpRequest,
    repo: Repo,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = todo_id(&id)?;
    let repo = repo.into_inner();
    if blocking("Failed to delete todo", move || repo.delete(id)).await? {
        info!(todo_id = %id, "Deleted todo");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(AppError::not_found("Todo not found"))
    }
}

#[utoipa::path(
    get,
    path = "/todos/{id}/subtasks",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Subtasks in creation order", body = Vec<SubTask>),
        (status = 404, description = "No such todo", body = ErrorBody),
    )
)]
#[get("/todos/{id}/subtasks")]
#[tracing::instrument(skip_all, fields(path = %req.path(), todo_id = %id))]
pub async fn get_subtasks(
    req: HttpRequest,
    repo: Repo,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = todo_id(&id)?;
    let repo = repo.into_inner();
    match blocking("Failed to fetch subtasks", move || repo.find_subtasks(id)).await? {
        Some(subtasks) => Ok(HttpResponse::Ok().json(subtasks)),
        None => Err(AppError::not_found("Todo not found")),
    }
}

#[utoipa::path(
    post,
    path = "/todos/{id}/subtasks",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = NewSubTask,
    responses(
        (status = 201, description = "Created", body = SubTask),
        (status = 400, description = "Missing or empty title", body = ErrorBody),
        (status = 404, description = "No such todo", body = ErrorBody),
    )
)]
#[post("/todos/{id}/subtasks")]
#[tracing::instrument(skip_all, fields(path = %req.path(), todo_id = %id))]
pub async fn create_subtask(
    req: HttpRequest,
    repo: Repo,
    id: web::Path<String>,
    body: web::Json<NewSubTask>,
) -> Result<HttpResponse, AppError> {
    let id = todo_id(&id)?;
    let input = body.into_inner().validate()?;
    let repo = repo.into_inner();
    match blocking("Failed to create subtask", move || repo.add_subtask(id, input)).await? {
        Some(subtask) => {
            info!(todo_id = %id, subtask_id = %subtask.id, "Created subtask");
            Ok(HttpResponse::Created().json(subtask))
        }
        None => Err(AppError::not_found("Todo not found")),
    }
}

#[utoipa::path(
    get,
    path = "/todos/{id}/subtasks/{subtask_id}",
    tag = "todos",
    params(
        ("id" = Uuid, Path, description = "Todo id"),
        ("subtask_id" = Uuid, Path, description = "Subtask id"),
    ),
    responses(
        (status = 200, description = "The subtask", body = SubTask),
        (status = 404, description = "No such subtask under this todo", body = ErrorBody),
    )
)]
#[get("/todos/{id}/subtasks/{subtask_id}")]
#[tracing::instrument(skip_all, fields(path = %req.path()))]
pub async fn get_subtask_by_id(
    req: HttpRequest,
    repo: Repo,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (id, subtask_id) = path.into_inner();
    let missing = || AppError::not_found("Subtask not found");
    let id = todo_id(&id)?;
    let subtask_id = Uuid::parse_str(&subtask_id).map_err(|_| missing())?;
    let repo = repo.into_inner();
    match blocking("Failed to fetch subtask", move || repo.find_subtask_by_id(subtask_id)).await? {
        Some(subtask) if subtask.todo_id == id => Ok(HttpResponse::Ok().json(subtask)),
        _ => Err(missing()),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(get_todos)
        .service(create_todo)
        .service(get_todo_by_id)
        .service(update_todo_by_id)
        .service(patch_todo_by_id)
        .service(delete_todo_by_id)
        .service(get_subtasks)
        .service(create_subtask)
        .service(get_subtask_by_id);
}
