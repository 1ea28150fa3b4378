use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::extract::JsonBody;
use super::request::{AddTaskRequest, MissingField, UpdateTaskRequest};
use super::response::{TaskIdResponse, TaskResponse};
use crate::application::task_service::TaskUsecase;
use crate::errors::AppError;

fn bad_request(err: MissingField) -> AppError {
    tracing::error!(error = %err, "task request failed validation");
    AppError::BadRequest
}

pub(super) async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

pub(super) async fn add_task<U>(
    State(usecase): State<Arc<U>>,
    JsonBody(payload): JsonBody<AddTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError>
where
    U: TaskUsecase,
{
    let task = payload.into_domain().map_err(bad_request)?;
    let added = usecase.add_task(task).await?;
    Ok((StatusCode::CREATED, Json(added.into())))
}

pub(super) async fn get_task_list<U>(
    State(usecase): State<Arc<U>>,
) -> Result<Json<Vec<TaskResponse>>, AppError>
where
    U: TaskUsecase,
{
    let list = usecase.get_task_list().await?;
    Ok(Json(list.into_iter().map(TaskResponse::from).collect()))
}

pub(super) async fn get_task_by_id<U>(
    State(usecase): State<Arc<U>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, AppError>
where
    U: TaskUsecase,
{
    let task = usecase.get_task_by_id(&id).await?;
    Ok(Json(task.into()))
}

pub(super) async fn update_task<U>(
    State(usecase): State<Arc<U>>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError>
where
    U: TaskUsecase,
{
    let changes = payload.into_domain().map_err(bad_request)?;
    let updated = usecase.update_task(&id, changes).await?;
    Ok(Json(updated.into()))
}

pub(super) async fn delete_task<U>(
    State(usecase): State<Arc<U>>,
    Path(id): Path<String>,
) -> Result<Json<TaskIdResponse>, AppError>
where
    U: TaskUsecase,
{
    let id = usecase.delete_task(&id).await?;
    Ok(Json(TaskIdResponse { id }))
}
