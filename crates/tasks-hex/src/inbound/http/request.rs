use serde::{Deserialize, Serialize};
use tasks_types::domain::task::{NewTask, TaskChanges};
use thiserror::Error;

/// A required field was absent, null or empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{0}` is required")]
pub struct MissingField(pub &'static str);

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, MissingField> {
    value.ok_or(MissingField(field))
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, MissingField> {
    required(field, value.filter(|v| !v.is_empty()))
}

// Absent and null fields decode to `None` and are rejected by `into_domain`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AddTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AddTaskRequest {
    pub fn into_domain(self) -> Result<NewTask, MissingField> {
        Ok(NewTask::new(
            required_text("title", self.title)?,
            required_text("description", self.description)?,
        ))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<bool>,
}

impl UpdateTaskRequest {
    pub fn into_domain(self) -> Result<TaskChanges, MissingField> {
        Ok(TaskChanges {
            description: required_text("description", self.description)?,
            status: required("status", self.status)?,
        })
    }
}
