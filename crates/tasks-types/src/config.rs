use std::time::Duration;

/// Everything needed to open the task database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub connection: ConnectionConfig,
    pub driver: String,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub sslmode: String,
}

/// Pool limits. The counts are signed: zero or a negative value means the
/// limit is not set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_open_conns: i32,
    pub max_idle_conns: i32,
    pub conn_max_lifetime: Duration,
    pub conn_max_idle_time: Duration,
}
