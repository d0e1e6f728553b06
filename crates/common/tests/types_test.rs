use ai_bus_common::types::*;
use serde_json::json;

#[test]
fn session_id_is_unique() {
    let a = SessionId::new();
    let b = SessionId::new();
    assert_ne!(a, b);
    assert_eq!(a, a);
}

#[test]
fn message_id_has_stable_prefix() {
    let id = MessageId::new();
    assert!(id.0.starts_with("msg_"));
}

#[test]
fn message_new_defaults() {
    let msg = Message::new("agent-a", json!({"hello": 1}), MessageKind::Notification, DeliveryMode::Pubsub);
    assert_eq!(msg.from_agent, "agent-a");
    assert_eq!(msg.priority, 0);
    assert!(msg.to_agent.is_none());
}

#[test]
fn queued_message_preserves_id_and_priority() {
    let mut msg = Message::new("agent-a", json!({}), MessageKind::Request, DeliveryMode::Queue);
    msg.priority = 5;
    let queued = QueuedMessage::new(agent_inbox_queue("b"), msg.clone(), 3);
    assert_eq!(queued.message_id, msg.message_id);
    assert_eq!(queued.priority, 5);
    assert_eq!(queued.attempts, 0);
    assert_eq!(queued.max_attempts, 3);
}

#[test]
fn envelope_round_trips_message_id() {
    let msg = Message::new("agent-a", json!({"n": 1}), MessageKind::Notification, DeliveryMode::Pubsub);
    let envelope = Envelope::wrap(agent_topic("b"), msg.clone());
    assert_eq!(envelope.message_id, msg.message_id);

    let encoded = serde_json::to_string(&envelope).unwrap();
    let decoded: Envelope = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.message_id, envelope.message_id);
    assert_eq!(decoded.payload.content, envelope.payload.content);
}

#[test]
fn topic_helpers_match_reserved_prefixes() {
    assert_eq!(agent_topic("a"), "agent:a");
    assert_eq!(agent_inbox_queue("a"), "agent:a:inbox");
    assert_eq!(workspace_topic("w"), "workspace:w");
}
