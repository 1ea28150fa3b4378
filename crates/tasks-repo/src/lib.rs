#[cfg(not(any(feature = "memory", feature = "postgres")))]
compile_error!("Enable a repo feature: `memory` or `postgres`.");

use async_trait::async_trait;
use tasks_types::config::DatabaseConfig;
use tasks_types::domain::task::{NewTask, Task, TaskChanges};
use tasks_types::ports::task_repository::{RepoError, TaskRepository};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Storage adapter selected at startup.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryTaskRepository),
    #[cfg(feature = "postgres")]
    Postgres(postgres::PgTaskRepository),
}

/// Builds PostgreSQL storage when a database config is given and the
/// `postgres` feature is on, otherwise the in-memory store.
pub async fn build_repo(config: Option<&DatabaseConfig>) -> anyhow::Result<Repo> {
    Repo::build_repo(config).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "postgres")))]
    pub async fn build_repo(_: Option<&DatabaseConfig>) -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryTaskRepository::new()))
    }

    #[cfg(all(feature = "postgres", not(feature = "memory")))]
    pub async fn build_repo(config: Option<&DatabaseConfig>) -> anyhow::Result<Self> {
        let config =
            config.ok_or_else(|| anyhow::anyhow!("database configuration is required"))?;
        Ok(Self::Postgres(postgres::PgTaskRepository::connect(config).await?))
    }

    #[cfg(all(feature = "postgres", feature = "memory"))]
    pub async fn build_repo(config: Option<&DatabaseConfig>) -> anyhow::Result<Self> {
        match config {
            Some(config) => Ok(Self::Postgres(
                postgres::PgTaskRepository::connect(config).await?,
            )),
            None => Ok(Self::Memory(memory::InMemoryTaskRepository::new())),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $call,
            #[cfg(feature = "postgres")]
            Repo::Postgres($repo) => $call,
        }
    };
}

#[async_trait]
impl TaskRepository for Repo {
    async fn insert(&self, task: NewTask) -> Result<Task, RepoError> {
        dispatch!(self, repo => repo.insert(task).await)
    }

    async fn select_all(&self) -> Result<Vec<Task>, RepoError> {
        dispatch!(self, repo => repo.select_all().await)
    }

    async fn select_by_id(&self, id: &str) -> Result<Task, RepoError> {
        dispatch!(self, repo => repo.select_by_id(id).await)
    }

    async fn update(&self, id: &str, changes: TaskChanges) -> Result<Task, RepoError> {
        dispatch!(self, repo => repo.update(id, changes).await)
    }

    async fn delete(&self, id: &str) -> Result<String, RepoError> {
        dispatch!(self, repo => repo.delete(id).await)
    }
}
