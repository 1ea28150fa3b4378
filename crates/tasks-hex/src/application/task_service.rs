use async_trait::async_trait;

use crate::application::task_gateway::TaskGateway;
use crate::errors::TaskError;
use tasks_types::domain::task::{NewTask, Task, TaskChanges};
use tasks_types::ports::task_repository::RepoError;

/// Operations the HTTP handlers depend on.
#[async_trait]
pub trait TaskUsecase: Send + Sync + 'static {
    async fn add_task(&self, task: NewTask) -> Result<Task, TaskError>;
    async fn get_task_list(&self) -> Result<Vec<Task>, TaskError>;
    async fn get_task_by_id(&self, id: &str) -> Result<Task, TaskError>;
    async fn update_task(&self, id: &str, changes: TaskChanges) -> Result<Task, TaskError>;
    async fn delete_task(&self, id: &str) -> Result<String, TaskError>;
}

pub struct TaskService<G: TaskGateway> {
    gateway: G,
}

impl<G: TaskGateway> TaskService<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }
}

fn lookup_error(err: RepoError, other: TaskError) -> TaskError {
    match err {
        RepoError::NotFound => TaskError::NotFound,
        RepoError::Internal => other,
    }
}

#[async_trait]
impl<G: TaskGateway> TaskUsecase for TaskService<G> {
    async fn add_task(&self, mut task: NewTask) -> Result<Task, TaskError> {
        // New tasks always start open.
        task.status = false;
        self.gateway.add_task(task).await.map_err(|e| {
            tracing::warn!(error = %e, "add task failed");
            TaskError::Add
        })
    }

    async fn get_task_list(&self) -> Result<Vec<Task>, TaskError> {
        self.gateway.get_task_list().await.map_err(|e| {
            tracing::warn!(error = %e, "list tasks failed");
            TaskError::GetList
        })
    }

    async fn get_task_by_id(&self, id: &str) -> Result<Task, TaskError> {
        self.gateway.get_task_by_id(id).await.map_err(|e| {
            tracing::warn!(task_id = id, error = %e, "get task failed");
            lookup_error(e, TaskError::GetById)
        })
    }

    async fn update_task(&self, id: &str, changes: TaskChanges) -> Result<Task, TaskError> {
        self.gateway.update_task(id, changes).await.map_err(|e| {
            tracing::warn!(task_id = id, error = %e, "update task failed");
            lookup_error(e, TaskError::Update)
        })
    }

    async fn delete_task(&self, id: &str) -> Result<String, TaskError> {
        self.gateway.delete_task(id).await.map_err(|e| {
            tracing::warn!(task_id = id, error = %e, "delete task failed");
            lookup_error(e, TaskError::Delete)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::task_gateway::RepositoryGateway;
    use std::sync::Mutex;

    fn service() -> TaskService<RepositoryGateway<tasks_repo::memory::InMemoryTaskRepository>> {
        let repo = tasks_repo::memory::InMemoryTaskRepository::new();
        TaskService::new(RepositoryGateway::new(repo))
    }

    /// Gateway that fails every call with the same storage error and records
    /// what it was asked to insert.
    struct FailingGateway {
        err: RepoError,
        inserted: Mutex<Vec<NewTask>>,
    }

    impl FailingGateway {
        fn new(err: RepoError) -> Self {
            Self {
                err,
                inserted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TaskGateway for FailingGateway {
        async fn add_task(&self, task: NewTask) -> Result<Task, RepoError> {
            self.inserted.lock().unwrap().push(task);
            Err(self.err.clone())
        }

        async fn get_task_list(&self) -> Result<Vec<Task>, RepoError> {
            Err(self.err.clone())
        }

        async fn get_task_by_id(&self, _: &str) -> Result<Task, RepoError> {
            Err(self.err.clone())
        }

        async fn update_task(&self, _: &str, _: TaskChanges) -> Result<Task, RepoError> {
            Err(self.err.clone())
        }

        async fn delete_task(&self, _: &str) -> Result<String, RepoError> {
            Err(self.err.clone())
        }
    }

    #[tokio::test]
    async fn add_task_forces_open_status() {
        let svc = service();
        let mut task = NewTask::new("Widget", "assemble");
        task.status = true;

        let added = svc.add_task(task).await.unwrap();
        assert!(!added.status);
        assert_eq!(added.title, "Widget");

        let got = svc.get_task_by_id(&added.id).await.unwrap();
        assert_eq!(got, added);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let svc = service();
        let task = svc
            .add_task(NewTask::new("Bob", "first"))
            .await
            .unwrap();

        let updated = svc
            .update_task(
                &task.id,
                TaskChanges {
                    description: "second".into(),
                    status: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Bob");
        assert_eq!(updated.description, "second");
        assert!(updated.status);

        let deleted = svc.delete_task(&task.id).await.unwrap();
        assert_eq!(deleted, task.id);
        let missing = svc.get_task_by_id(&task.id).await;
        assert_eq!(missing, Err(TaskError::NotFound));
    }

    #[tokio::test]
    async fn not_found_paths() {
        let svc = service();
        let id = uuid::Uuid::new_v4().to_string();
        let changes = TaskChanges {
            description: "x".into(),
            status: true,
        };

        assert_eq!(svc.get_task_by_id(&id).await, Err(TaskError::NotFound));
        assert_eq!(svc.update_task(&id, changes).await, Err(TaskError::NotFound));
        assert_eq!(svc.delete_task(&id).await, Err(TaskError::NotFound));
    }

    #[tokio::test]
    async fn storage_failures_become_operation_errors() {
        let svc = TaskService::new(FailingGateway::new(RepoError::Internal));
        let changes = TaskChanges {
            description: "x".into(),
            status: true,
        };

        assert_eq!(
            svc.add_task(NewTask::new("t", "d")).await,
            Err(TaskError::Add)
        );
        assert_eq!(svc.get_task_list().await, Err(TaskError::GetList));
        assert_eq!(svc.get_task_by_id("abc123").await, Err(TaskError::GetById));
        assert_eq!(
            svc.update_task("abc123", changes).await,
            Err(TaskError::Update)
        );
        assert_eq!(svc.delete_task("abc123").await, Err(TaskError::Delete));
    }

    #[tokio::test]
    async fn add_task_failure_hides_not_found() {
        let gateway = FailingGateway::new(RepoError::NotFound);
        let svc = TaskService::new(gateway);
        let mut task = NewTask::new("t", "d");
        task.status = true;

        assert_eq!(svc.add_task(task).await, Err(TaskError::Add));
        assert_eq!(svc.get_task_list().await, Err(TaskError::GetList));

        let inserted = svc.gateway.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert!(!inserted[0].status);
    }
}
