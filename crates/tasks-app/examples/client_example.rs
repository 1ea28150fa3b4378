///  To run :
///  cargo r -p tasks-app --no-default-features --features memory --example client_example
use tasks_client::{AddTaskRequest, ApiError, TasksClient, UpdateTaskRequest};
use tasks_hex::application::task_gateway::RepositoryGateway;
use tasks_hex::application::task_service::TaskService;
use tasks_hex::config::TimeoutConfig;
use tasks_hex::inbound::http::{HttpServer, HttpServerConfig};
use tasks_repo::build_repo;
use tokio::sync::oneshot;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Start the server on an ephemeral port. Without a database config the
    // in-memory store is used when the `memory` feature is on.
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    let repo = build_repo(None).await?;
    let service = TaskService::new(RepositoryGateway::new(repo));
    let server = HttpServer::new(
        service,
        HttpServerConfig {
            port: port.to_string(),
            timeout: TimeoutConfig::default(),
        },
    );

    let (stop, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .run_until(async move {
                let _ = stop_rx.await;
            })
            .await
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = TasksClient::new(&addr)?;
    let created = client
        .add_task(AddTaskRequest {
            title: "Example".into(),
            description: "created from the client example".into(),
        })
        .await?;
    println!("Created task id={} status={}", created.id, created.status);

    let updated = client
        .update_task(
            &created.id,
            UpdateTaskRequest {
                description: "marked done".into(),
                status: true,
            },
        )
        .await?;
    println!("Updated task id={} status={}", updated.id, updated.status);

    let listed = client.list_tasks().await?;
    println!("Listed {} task(s)", listed.len());

    let deleted = client.delete_task(&created.id).await?;
    println!("Deleted task id={deleted}");

    match client.get_task(&created.id).await {
        Ok(task) => println!("Task still present: {task:?}"),
        Err(err) => match err.downcast_ref::<ApiError>() {
            Some(api) => println!("Lookup after delete: {} {}", api.status, api.message),
            None => return Err(err),
        },
    }

    let _ = stop.send(());
    handle.await??;
    Ok(())
}
