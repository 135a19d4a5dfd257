use actix_web::http::header;
use actix_web::HttpResponse;
use utoipa::openapi::server::Server;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, todos};
use crate::error::ErrorBody;
use crate::models::subtask::{NewSubTask, SubTask, SubTaskStatus};
use crate::models::todo::{
    NewTodo, Todo, TodoInput, TodoItemData, TodoPatch, TodoPriority, TodoStatus,
};
use crate::models::user::User;

#[derive(OpenApi)]
#[openapi(
    info(title = "TODO Service API", description = "Todos with subtasks and optional owners"),
    paths(
        todos::get_todos,
        todos::get_todo_by_id,
        todos::create_todo,
        todos::update_todo_by_id,
        todos::patch_todo_by_id,
        todos::delete_todo_by_id,
        todos::get_subtasks,
        todos::create_subtask,
        todos::get_subtask_by_id,
        health::healthcheck,
        health::readiness,
        health::liveness,
    ),
    components(schemas(
        Todo,
        TodoItemData,
        TodoInput,
        NewTodo,
        TodoPatch,
        TodoStatus,
        TodoPriority,
        SubTask,
        SubTaskStatus,
        NewSubTask,
        User,
        ErrorBody,
    )),
    tags((name = "todos"), (name = "health"))
)]
pub struct ApiDoc;

/// The OpenAPI document with the versioned prefix as its server base.
pub fn openapi(api_version: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(format!("/api/{api_version}"))]);
    doc
}

pub fn swagger_ui(api_version: &str) -> SwaggerUi {
    SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", openapi(api_version))
}

/// `/docs` itself is outside the UI's `/docs/` tail route.
pub async fn redirect_to_ui() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/docs/"))
        .finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::{header, StatusCode};
    use actix_web::test::{self, TestRequest};
    use serde_json::Value;

    use crate::repository::memory::InMemoryRepository;

    #[actix_web::test]
    async fn openapi_document_lists_the_todo_routes() {
        let app = test_app!(Arc::new(InMemoryRepository::new()));
        let req = TestRequest::get().uri("/api-docs/openapi.json").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let doc: Value = test::read_body_json(resp).await;
        assert_eq!(doc["servers"][0]["url"], "/api/v1");
        assert!(doc["paths"]["/todos"]["get"].is_object());
        assert!(doc["paths"]["/todos/{id}"]["patch"].is_object());
    }

    #[actix_web::test]
    async fn docs_are_reachable_with_and_without_trailing_slash() {
        let app = test_app!(Arc::new(InMemoryRepository::new()));

        let resp = test::call_service(&app, TestRequest::get().uri("/docs").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/docs/");

        let resp = test::call_service(&app, TestRequest::get().uri("/docs/").to_request()).await;
        assert_ne!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.status().is_success() || resp.status().is_redirection());
    }
}
