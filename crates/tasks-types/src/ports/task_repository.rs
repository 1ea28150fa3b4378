use async_trait::async_trait;

use crate::domain::task::{NewTask, Task, TaskChanges};

/// Storage failures, already stripped of driver detail.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("internal server error")]
    Internal,
}

#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    async fn insert(&self, task: NewTask) -> Result<Task, RepoError>;
    async fn select_all(&self) -> Result<Vec<Task>, RepoError>;
    async fn select_by_id(&self, id: &str) -> Result<Task, RepoError>;
    async fn update(&self, id: &str, changes: TaskChanges) -> Result<Task, RepoError>;
    /// Removes the row and returns its identifier.
    async fn delete(&self, id: &str) -> Result<String, RepoError>;
}
