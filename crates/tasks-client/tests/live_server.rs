use tasks_client::{AddTaskRequest, ApiError, TasksClient, UpdateTaskRequest};
use tasks_hex::application::task_gateway::RepositoryGateway;
use tasks_hex::application::task_service::TaskService;
use tasks_hex::config::TimeoutConfig;
use tasks_hex::inbound::http::{HttpServer, HttpServerConfig};
use tasks_repo::memory::InMemoryTaskRepository;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

// Client against a real server backed by the in-memory adapter.
#[tokio::test]
async fn client_round_trip_against_server() {
    let port = find_free_port();
    let service = TaskService::new(RepositoryGateway::new(InMemoryTaskRepository::new()));
    let server = HttpServer::new(
        service,
        HttpServerConfig {
            port: port.to_string(),
            timeout: TimeoutConfig::default(),
        },
    );
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = TasksClient::new(&format!("http://127.0.0.1:{port}/")).unwrap();
    let added = client
        .add_task(AddTaskRequest {
            title: "Call plumber".into(),
            description: "kitchen sink".into(),
        })
        .await
        .unwrap();
    assert!(!added.status);

    let updated = client
        .update_task(
            &added.id,
            UpdateTaskRequest {
                description: "kitchen sink, Tuesday".into(),
                status: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Call plumber");
    assert!(updated.status);

    assert_eq!(client.list_tasks().await.unwrap(), vec![updated.clone()]);
    assert_eq!(client.delete_task(&added.id).await.unwrap(), added.id);

    let err = client.get_task(&added.id).await.unwrap_err();
    let api = err.downcast_ref::<ApiError>().expect("api error");
    assert_eq!(api.status, reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}
