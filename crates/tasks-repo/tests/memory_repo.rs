#![cfg(feature = "memory")]

use tasks_repo::memory::InMemoryTaskRepository;
use tasks_types::domain::task::{NewTask, TaskChanges};
use tasks_types::ports::task_repository::{RepoError, TaskRepository};

#[tokio::test]
async fn memory_repo_crud_flow() {
    let repo = InMemoryTaskRepository::new();

    let created = repo
        .insert(NewTask::new("Test", "first draft"))
        .await
        .unwrap();
    assert!(uuid::Uuid::parse_str(&created.id).is_ok());
    assert!(!created.status);

    let fetched = repo.select_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, created);

    let listed = repo.select_all().await.unwrap();
    assert_eq!(listed.len(), 1);

    let updated = repo
        .update(
            &created.id,
            TaskChanges {
                description: "second draft".into(),
                status: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Test");
    assert_eq!(updated.description, "second draft");
    assert!(updated.status);

    let deleted = repo.delete(&created.id).await.unwrap();
    assert_eq!(deleted, created.id);
    assert_eq!(
        repo.select_by_id(&created.id).await,
        Err(RepoError::NotFound)
    );
}

#[tokio::test]
async fn memory_repo_empty_list_is_not_an_error() {
    let repo = InMemoryTaskRepository::new();
    let listed = repo.select_all().await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn memory_repo_classifies_missing_and_malformed_ids() {
    let repo = InMemoryTaskRepository::new();
    let missing = uuid::Uuid::new_v4().to_string();
    let changes = TaskChanges {
        description: "x".into(),
        status: true,
    };

    assert_eq!(repo.select_by_id(&missing).await, Err(RepoError::NotFound));
    assert_eq!(
        repo.update(&missing, changes.clone()).await,
        Err(RepoError::NotFound)
    );
    assert_eq!(repo.delete(&missing).await, Err(RepoError::NotFound));

    assert_eq!(repo.select_by_id("abc123").await, Err(RepoError::Internal));
    assert_eq!(repo.update("abc123", changes).await, Err(RepoError::Internal));
    assert_eq!(repo.delete("abc123").await, Err(RepoError::Internal));
}
