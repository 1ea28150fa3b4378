use anyhow::Context;
use tasks_hex::application::task_gateway::RepositoryGateway;
use tasks_hex::application::task_service::TaskService;
use tasks_hex::config::Config;
use tasks_hex::inbound::http::{HttpServer, HttpServerConfig};
use tasks_repo::{build_repo, Repo};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env when present; variables already set in the environment win.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let repo: Repo = build_repo(Some(&config.database))
        .await
        .context("failed to initialise task storage")?;
    let service = TaskService::new(RepositoryGateway::new(repo));

    let server_cfg = HttpServerConfig {
        port: config.app.port.clone(),
        timeout: config.app.timeout.clone(),
    };

    let http = HttpServer::new(service, server_cfg);
    http.run().await.context("server failed")?;
    tracing::info!("bye");
    Ok(())
}
