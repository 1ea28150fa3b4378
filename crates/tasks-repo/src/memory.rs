use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tasks_types::domain::task::{NewTask, Task, TaskChanges};
use tasks_types::ports::task_repository::{RepoError, TaskRepository};
use uuid::Uuid;

/// Process-local task store. Identifiers are UUIDs, as in PostgreSQL, so a
/// malformed id fails the same way it does against the database.
#[derive(Clone)]
pub struct InMemoryTaskRepository {
    pub map: Arc<DashMap<Uuid, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            map: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_id(operation: &'static str, id: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(id).map_err(|e| {
        tracing::error!(operation, task_id = id, error = %e, "invalid task id");
        RepoError::Internal
    })
}

fn not_found(operation: &'static str, id: &str) -> RepoError {
    tracing::error!(operation, task_id = id, "no task row matched");
    RepoError::NotFound
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: NewTask) -> Result<Task, RepoError> {
        let id = Uuid::new_v4();
        let stored = Task {
            id: id.to_string(),
            title: task.title,
            description: task.description,
            status: task.status,
        };
        self.map.insert(id, stored.clone());
        Ok(stored)
    }

    async fn select_all(&self) -> Result<Vec<Task>, RepoError> {
        Ok(self.map.iter().map(|kv| kv.value().clone()).collect())
    }

    async fn select_by_id(&self, id: &str) -> Result<Task, RepoError> {
        let key = parse_id("select_by_id", id)?;
        self.map
            .get(&key)
            .map(|r| r.clone())
            .ok_or_else(|| not_found("select_by_id", id))
    }

    async fn update(&self, id: &str, changes: TaskChanges) -> Result<Task, RepoError> {
        let key = parse_id("update", id)?;
        if let Some(mut v) = self.map.get_mut(&key) {
            v.apply(changes);
            return Ok(v.clone());
        }
        Err(not_found("update", id))
    }

    async fn delete(&self, id: &str) -> Result<String, RepoError> {
        let key = parse_id("delete", id)?;
        self.map
            .remove(&key)
            .map(|(k, _)| k.to_string())
            .ok_or_else(|| not_found("delete", id))
    }
}
