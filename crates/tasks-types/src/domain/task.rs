use serde::{Deserialize, Serialize};

/// A stored task. The `id` is assigned by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: bool,
}

/// Insert input. Carries no identifier; the repository generates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: false,
        }
    }
}

/// Mutable fields of a task. The title is fixed once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChanges {
    pub description: String,
    pub status: bool,
}

impl Task {
    pub fn apply(&mut self, changes: TaskChanges) {
        self.description = changes.description;
        self.status = changes.status;
    }
}
