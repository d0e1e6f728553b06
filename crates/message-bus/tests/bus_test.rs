use std::sync::Arc;
use std::time::Duration;

use ai_bus_common::types::{DeliveryMode, Message, MessageKind};
use ai_bus_message_bus::{BrokerClient, MessageRouter, PubSubManager, QueueManager};

fn get_test_redis_url() -> String {
    std::env::var("REDIS_URL").expect("REDIS_URL must be set (use docker-compose.test.yml)")
}

async fn connect() -> Arc<BrokerClient> {
    Arc::new(
        BrokerClient::connect(&get_test_redis_url(), 4, 3, Duration::from_secs(2))
            .await
            .expect("failed to connect to test redis"),
    )
}

#[tokio::test]
#[ignore] // run only when a test Redis instance is available
async fn priority_ordering_is_lowest_score_first() {
    let broker = connect().await;
    let queue = QueueManager::new(broker, 3600);
    let name = format!("test:priority:{}", uuid::Uuid::new_v4());

    let low = Message::new("agent-a", serde_json::json!({"n": 1}), MessageKind::Notification, DeliveryMode::Queue);
    let high = Message::new("agent-a", serde_json::json!({"n": 2}), MessageKind::Notification, DeliveryMode::Queue);
    queue.enqueue(&name, low, 5, 3, None).await.unwrap();
    queue.enqueue(&name, high, 0, 3, None).await.unwrap();

    let first = queue.dequeue(&name).await.unwrap().unwrap();
    assert_eq!(first.payload.content["n"], 2);
    let second = queue.dequeue(&name).await.unwrap().unwrap();
    assert_eq!(second.payload.content["n"], 1);
}

#[tokio::test]
#[ignore]
async fn poison_message_is_moved_to_dead_letter_after_max_attempts() {
    let broker = connect().await;
    let queue = QueueManager::new(broker, 3600);
    let name = format!("test:poison:{}", uuid::Uuid::new_v4());

    let message = Message::new("agent-a", serde_json::json!({}), MessageKind::Command, DeliveryMode::Queue);
    let message_id = queue.enqueue(&name, message, 0, 2, None).await.unwrap();

    for _ in 0..2 {
        let dequeued = queue.dequeue(&name).await.unwrap().unwrap();
        assert_eq!(dequeued.message_id, message_id);
        queue.reject(&name, &message_id, true).await.unwrap();
    }

    let size = queue.size(&name).await.unwrap();
    assert_eq!(size.pending, 0);
    assert_eq!(size.dead_letter, 1);

    let dead = queue.dead_letter(&name, 10).await.unwrap();
    assert_eq!(dead[0].message_id, message_id);
}

#[tokio::test]
#[ignore]
async fn router_delivers_direct_message_via_pubsub() {
    let broker = connect().await;
    let pubsub = Arc::new(PubSubManager::new(Arc::clone(&broker), Duration::from_millis(100)));
    let queue = Arc::new(QueueManager::new(Arc::clone(&broker), 3600));
    let router = MessageRouter::new(Arc::clone(&pubsub), queue);

    let received = Arc::new(tokio::sync::Notify::new());
    let received_clone = Arc::clone(&received);
    router.subscribe("agent-b", &[]).await.unwrap();
    router
        .on_message(move |envelope| {
            if envelope.payload.to_agent.as_deref() == Some("agent-b") {
                received_clone.notify_one();
            }
        })
        .await;
    pubsub.start_listening().await;

    let message = Message::new("agent-a", serde_json::json!({"hello": "world"}), MessageKind::Notification, DeliveryMode::Pubsub);
    router.send_direct("agent-b", message).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), received.notified())
        .await
        .expect("direct message was never delivered");
    pubsub.stop_listening().await;
}

#[tokio::test]
#[ignore]
async fn broadcast_reaches_every_workspace_subscriber() {
    let broker = connect().await;
    let pubsub = Arc::new(PubSubManager::new(Arc::clone(&broker), Duration::from_millis(100)));
    let queue = Arc::new(QueueManager::new(Arc::clone(&broker), 3600));
    let router = MessageRouter::new(Arc::clone(&pubsub), queue);

    let workspace = format!("ws-{}", uuid::Uuid::new_v4());
    router.subscribe("agent-a", &[workspace.clone()]).await.unwrap();
    router.subscribe("agent-b", &[workspace.clone()]).await.unwrap();

    let message = Message::new("agent-a", serde_json::json!({}), MessageKind::Notification, DeliveryMode::Pubsub);
    let delivered = router.broadcast(&workspace, message).await.unwrap();
    assert_eq!(delivered, 2);
}
