use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::database::models::Todo;
use crate::error::ApiError;

use super::AppState;

/// Page size used when `size` is not given
pub const DEFAULT_PAGE_SIZE: i64 = 5;

/// Upper bound on ids per delete, well under SQLite's bind-variable limit
pub const MAX_DELETE_IDS: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct ReadTodoQuery {
    /// Last id of the previous page; absent or 0 starts from the newest todo
    pub prev_id: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadTodoResponse {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoResponse {
    pub todo: Todo,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTodoRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeleteTodoResponse {}

/// GET /todos?prev_id=&size= - List todos newest first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ReadTodoQuery>, QueryRejection>,
) -> Result<Json<ReadTodoResponse>, ApiError> {
    let Query(query) = query?;
    let prev_id = query.prev_id.filter(|id| *id != 0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);

    let todos = state.todos.read_todos(prev_id, size).await?;
    Ok(Json(ReadTodoResponse { todos }))
}

/// POST /todos - Create a todo
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.subject.is_empty() {
        return Err(ApiError::bad_request("subject is required"));
    }

    let todo = state
        .todos
        .create_todo(&payload.subject, &payload.description)
        .await?;
    Ok(Json(TodoResponse { todo }))
}

/// PUT /todos - Replace subject and description of an existing todo
pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.id == 0 {
        return Err(ApiError::bad_request("id is required"));
    }
    if payload.subject.is_empty() {
        return Err(ApiError::bad_request("subject is required"));
    }

    let todo = state
        .todos
        .update_todo(payload.id, &payload.subject, &payload.description)
        .await?;
    Ok(Json(TodoResponse { todo }))
}

/// DELETE /todos - Delete todos by id
pub async fn delete(
    State(state): State<AppState>,
    payload: Result<Json<DeleteTodoRequest>, JsonRejection>,
) -> Result<Json<DeleteTodoResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.ids.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }
    if payload.ids.len() > MAX_DELETE_IDS {
        return Err(ApiError::bad_request(format!(
            "at most {} ids can be deleted at once",
            MAX_DELETE_IDS
        )));
    }

    state.todos.delete_todos(&payload.ids).await?;
    Ok(Json(DeleteTodoResponse {}))
}
