use std::io;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Usecase-level failures. Messages are safe to show to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("failed to add a new task")]
    Add,

    #[error("failed to get task list")]
    GetList,

    #[error("failed to get a task by id")]
    GetById,

    #[error("failed to update a task")]
    Update,

    #[error("failed to delete a task")]
    Delete,

    #[error("task specified by requested id not found")]
    NotFound,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("request format is invalid")]
    InvalidRequestFormat,

    #[error("requested task info is incorrect")]
    BadRequest,

    #[error(transparent)]
    Task(#[from] TaskError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Undecodable bodies answer 500, not 400; existing clients rely on it.
            AppError::InvalidRequestFormat => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::Task(TaskError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status();
        let body = serde_json::to_string(&ErrorBody {
            message: self.to_string(),
        })
        .unwrap_or_else(|_| "{\"message\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("in-flight requests did not finish within {0:?}")]
    Timeout(Duration),
}

/// Outcome of the server lifecycle.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to create http listener on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("serve error: {0}")]
    Serve(#[source] io::Error),

    #[error("shutdown error: {0}")]
    Shutdown(#[source] ShutdownError),

    #[error("shutdown error: {shutdown}; serve error: {serve}")]
    Both {
        shutdown: ShutdownError,
        serve: io::Error,
    },
}
