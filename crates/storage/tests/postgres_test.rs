use ai_bus_storage::PostgresStore;

fn get_test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set (use docker-compose.test.yml)")
}

async fn setup_test_db() -> PostgresStore {
    let store = PostgresStore::connect(&get_test_db_url())
        .await
        .expect("failed to connect to test database");
    store.run_migrations().await.expect("failed to run migrations");
    store
}

#[tokio::test]
#[ignore] // run only when a test Postgres instance is available
async fn user_workspace_sandbox_roundtrip() {
    let store = setup_test_db().await;

    let user = store
        .create_user(&format!("user-{}@example.com", uuid::Uuid::new_v4()), "hashed")
        .await
        .unwrap();

    let workspace = store.create_workspace("team-w", user.user_id).await.unwrap();
    let sandbox = store.create_sandbox(workspace.workspace_id, "agent-a").await.unwrap();

    assert!(store
        .is_agent_in_workspace(workspace.workspace_id, "agent-a")
        .await
        .unwrap());
    assert!(!store
        .is_agent_in_workspace(workspace.workspace_id, "agent-nonexistent")
        .await
        .unwrap());

    let fetched = store.get_sandbox(sandbox.sandbox_id).await.unwrap();
    assert_eq!(fetched.agent_id, "agent-a");
}

#[tokio::test]
#[ignore]
async fn message_audit_log_roundtrip() {
    let store = setup_test_db().await;

    let user = store
        .create_user(&format!("user-{}@example.com", uuid::Uuid::new_v4()), "hashed")
        .await
        .unwrap();
    let workspace = store.create_workspace("team-w", user.user_id).await.unwrap();
    let from = store.create_sandbox(workspace.workspace_id, "agent-a").await.unwrap();
    let to = store.create_sandbox(workspace.workspace_id, "agent-b").await.unwrap();

    let record = store
        .record_message("msg_1", from.sandbox_id, Some(to.sandbox_id), Some(workspace.workspace_id))
        .await
        .unwrap();
    assert_eq!(record.message_id, "msg_1");

    let messages = store
        .list_messages_for_sandbox(from.sandbox_id, 0, 10)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
}
