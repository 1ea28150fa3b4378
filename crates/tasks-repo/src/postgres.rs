use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Connection, FromRow, PgPool};
use tasks_types::config::{ConnectionConfig, DatabaseConfig, PoolConfig};
use tasks_types::domain::task::{NewTask, Task, TaskChanges};
use tasks_types::ports::task_repository::{RepoError, TaskRepository};
use uuid::Uuid;

/// Upper bound for the liveness check performed after the pool is opened.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

const SUPPORTED_DRIVERS: [&str; 2] = ["postgres", "postgresql"];

/// Opens a pool with the configured limits and verifies the database answers.
///
/// The pool connects lazily, so a bad address surfaces from the liveness
/// check rather than from the open step.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let options = connect_options(config).context("failed to open database")?;
    let pool = pool_options(&config.pool).connect_lazy_with(options);

    check_alive(&pool)
        .await
        .context("database connection is not alive")?;

    tracing::info!(
        host = %config.connection.host,
        database = %config.connection.db_name,
        max_open = config.pool.max_open_conns,
        "database pool ready"
    );
    Ok(pool)
}

fn connect_options(config: &DatabaseConfig) -> anyhow::Result<PgConnectOptions> {
    if !SUPPORTED_DRIVERS.contains(&config.driver.as_str()) {
        anyhow::bail!("unsupported database driver '{}'", config.driver);
    }

    let ConnectionConfig {
        host,
        port,
        user,
        password,
        db_name,
        sslmode,
    } = &config.connection;

    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid database port '{port}'"))?;
    let ssl_mode = PgSslMode::from_str(sslmode)
        .with_context(|| format!("invalid sslmode '{sslmode}'"))?;

    Ok(PgConnectOptions::new()
        .host(host)
        .port(port)
        .username(user)
        .password(password)
        .database(db_name)
        .ssl_mode(ssl_mode))
}

/// Maps the pool limits onto sqlx.
///
/// sqlx has no unlimited pool, so a non-positive max open count gets
/// [`DEFAULT_MAX_OPEN_CONNS`]. sqlx also has no cap on idle connections: the
/// max idle count becomes `min_connections`, a floor of connections kept
/// open, clamped to the max open count. A non-positive max idle count keeps
/// no connections warm.
fn pool_options(pool: &PoolConfig) -> PgPoolOptions {
    let max_open = effective_max_open(pool.max_open_conns);
    PgPoolOptions::new()
        .acquire_timeout(PING_TIMEOUT)
        .max_connections(max_open)
        .min_connections(warm_connections(pool.max_idle_conns, max_open))
        .max_lifetime(non_zero(pool.conn_max_lifetime))
        .idle_timeout(non_zero(pool.conn_max_idle_time))
}

const DEFAULT_MAX_OPEN_CONNS: u32 = 10;

fn effective_max_open(max_open: i32) -> u32 {
    match u32::try_from(max_open) {
        Ok(n) if n > 0 => n,
        _ => DEFAULT_MAX_OPEN_CONNS,
    }
}

fn warm_connections(max_idle: i32, max_open: u32) -> u32 {
    u32::try_from(max_idle).unwrap_or(0).min(max_open)
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

async fn check_alive(pool: &PgPool) -> anyhow::Result<()> {
    let ping = async {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    };
    tokio::time::timeout(PING_TIMEOUT, ping)
        .await
        .map_err(|_| anyhow::anyhow!("ping timed out after {PING_TIMEOUT:?}"))??;
    Ok(())
}

#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct DbTask {
    id: Uuid,
    title: String,
    description: String,
    status: bool,
}

impl From<DbTask> for Task {
    fn from(row: DbTask) -> Self {
        Task {
            id: row.id.to_string(),
            title: row.title,
            description: row.description,
            status: row.status,
        }
    }
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with [`connect`] and makes sure the `tasks` table exists.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let repo = Self::new(connect(config).await?);
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        let ddl = include_str!("../migrations/0001_create_tasks.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .context("failed to create tasks table")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn classify(operation: &'static str, id: Option<&str>, err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => {
            tracing::error!(operation, task_id = id, "no task row matched");
            RepoError::NotFound
        }
        other => {
            tracing::error!(operation, task_id = id, error = %other, "task statement failed");
            RepoError::Internal
        }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, task: NewTask) -> Result<Task, RepoError> {
        let row: DbTask = sqlx::query_as(
            "INSERT INTO tasks (title, description, status)
             VALUES ($1, $2, $3)
             RETURNING id, title, description, status",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("insert", None, e))?;
        Ok(row.into())
    }

    async fn select_all(&self) -> Result<Vec<Task>, RepoError> {
        let rows: Vec<DbTask> =
            sqlx::query_as("SELECT id, title, description, status FROM tasks")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| classify("select_all", None, e))?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn select_by_id(&self, id: &str) -> Result<Task, RepoError> {
        let row: DbTask = sqlx::query_as(
            "SELECT id, title, description, status FROM tasks WHERE id = $1::uuid",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("select_by_id", Some(id), e))?;
        Ok(row.into())
    }

    async fn update(&self, id: &str, changes: TaskChanges) -> Result<Task, RepoError> {
        let row: DbTask = sqlx::query_as(
            "UPDATE tasks SET description = $1, status = $2
             WHERE id = $3::uuid
             RETURNING id, title, description, status",
        )
        .bind(&changes.description)
        .bind(changes.status)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("update", Some(id), e))?;
        Ok(row.into())
    }

    async fn delete(&self, id: &str) -> Result<String, RepoError> {
        let deleted: Uuid =
            sqlx::query_scalar("DELETE FROM tasks WHERE id = $1::uuid RETURNING id")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| classify("delete", Some(id), e))?;
        Ok(deleted.to_string())
    }
}
