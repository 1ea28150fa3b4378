use serde::{Deserialize, Serialize};
use tasks_types::domain::task::Task;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: bool,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            status: t.status,
        }
    }
}

/// Body of a successful delete: the identifier only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskIdResponse {
    pub id: String,
}
