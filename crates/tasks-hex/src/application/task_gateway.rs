use async_trait::async_trait;
use tasks_types::domain::task::{NewTask, Task, TaskChanges};
use tasks_types::ports::task_repository::{RepoError, TaskRepository};

/// What the task service needs from storage, independent of the adapter.
#[async_trait]
pub trait TaskGateway: Send + Sync + 'static {
    async fn add_task(&self, task: NewTask) -> Result<Task, RepoError>;
    async fn get_task_list(&self) -> Result<Vec<Task>, RepoError>;
    async fn get_task_by_id(&self, id: &str) -> Result<Task, RepoError>;
    async fn update_task(&self, id: &str, changes: TaskChanges) -> Result<Task, RepoError>;
    async fn delete_task(&self, id: &str) -> Result<String, RepoError>;
}

/// Forwards every call to a [`TaskRepository`] unchanged.
#[derive(Clone)]
pub struct RepositoryGateway<R: TaskRepository> {
    repository: R,
}

impl<R: TaskRepository> RepositoryGateway<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: TaskRepository> TaskGateway for RepositoryGateway<R> {
    async fn add_task(&self, task: NewTask) -> Result<Task, RepoError> {
        self.repository.insert(task).await
    }

    async fn get_task_list(&self) -> Result<Vec<Task>, RepoError> {
        self.repository.select_all().await
    }

    async fn get_task_by_id(&self, id: &str) -> Result<Task, RepoError> {
        self.repository.select_by_id(id).await
    }

    async fn update_task(&self, id: &str, changes: TaskChanges) -> Result<Task, RepoError> {
        self.repository.update(id, changes).await
    }

    async fn delete_task(&self, id: &str) -> Result<String, RepoError> {
        self.repository.delete(id).await
    }
}
