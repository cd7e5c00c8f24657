use db8z::websockets::MessageType;

mod utils;

use utils::*;

#[tokio::test]
async fn test_message_is_echoed_to_sender_and_members() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.connect("bob").await;
    setup.join_quietly("alice", "r1").await;
    setup.join_quietly("bob", "r1").await;

    setup.send_chat("alice", "r1", "hello").await;

    MessageAssertion::for_clients(&setup, vec!["alice", "bob"])
        .received_message_type(MessageType::NewMessage)
        .with_id("m1")
        .with_room("r1")
        .with_user("alice")
        .with_content("hello");
    assert_eq!(
        setup.store.persisted(),
        vec![("r1".to_string(), "alice".to_string(), "hello".to_string())]
    );
}

#[tokio::test]
async fn test_persistence_failure_reports_to_sender_only() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.connect("bob").await;
    setup.join_quietly("alice", "r1").await;
    setup.join_quietly("bob", "r1").await;
    setup.store.set_behavior(StoreBehavior::Fail);

    setup.send_chat("alice", "r1", "hello").await;

    MessageAssertion::for_client(&setup, "alice")
        .received_message_type(MessageType::Error)
        .with_error_code("PERSISTENCE_ERROR");
    MessageAssertion::for_client(&setup, "bob").received_no_messages();
}

#[tokio::test]
async fn test_store_recovers_after_failure() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.join_quietly("alice", "r1").await;

    setup.store.set_behavior(StoreBehavior::Fail);
    setup.send_chat("alice", "r1", "lost").await;
    setup.store.set_behavior(StoreBehavior::Accept);
    setup.send_chat("alice", "r1", "kept").await;

    let messages = MessageAssertion::for_client(&setup, "alice")
        .received_message_sequence(vec![MessageType::Error, MessageType::NewMessage]);
    assert_eq!(messages[1].payload["content"], "kept");
    assert_eq!(setup.store.persisted().len(), 1);
}

#[tokio::test]
async fn test_non_member_cannot_send() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.connect("carol").await;
    setup.join_quietly("alice", "r1").await;

    setup.send_chat("carol", "r1", "let me in").await;

    MessageAssertion::for_client(&setup, "carol")
        .received_message_type(MessageType::Error)
        .with_error_code("NOT_A_MEMBER");
    MessageAssertion::for_client(&setup, "alice").received_no_messages();
    assert!(setup.store.persisted().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_connection_cannot_send() {
    let setup = TestSetupBuilder::new().build();
    setup.connect_anonymous("anon").await;

    setup.send_chat("anon", "r1", "hi").await;

    MessageAssertion::for_client(&setup, "anon")
        .received_message_type(MessageType::Error)
        .with_error_code("NOT_A_MEMBER");
    assert!(setup.store.persisted().is_empty());
}

#[tokio::test]
async fn test_messages_from_one_connection_keep_their_order() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.connect("bob").await;
    setup.join_quietly("alice", "r1").await;
    setup.join_quietly("bob", "r1").await;

    for content in ["one", "two", "three"] {
        setup.send_chat("alice", "r1", content).await;
    }

    let messages = MessageAssertion::for_client(&setup, "bob").received_message_sequence(vec![
        MessageType::NewMessage,
        MessageType::NewMessage,
        MessageType::NewMessage,
    ]);
    let ids: Vec<_> = messages.iter().map(|m| m.payload["id"].clone()).collect();
    let contents: Vec<_> = messages
        .iter()
        .map(|m| m.payload["content"].clone())
        .collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert_eq!(contents, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_messages_stay_in_their_room() {
    let setup = TestSetupBuilder::new().with_rooms(vec!["r1", "r2"]).build();
    setup.connect("alice").await;
    setup.connect("bob").await;
    setup.join_quietly("alice", "r1").await;
    setup.join_quietly("bob", "r2").await;

    setup.send_chat("alice", "r1", "only r1").await;

    MessageAssertion::for_client(&setup, "alice").received_message_type(MessageType::NewMessage);
    MessageAssertion::for_client(&setup, "bob").received_no_messages();
}

#[tokio::test]
async fn test_every_socket_of_a_user_receives_messages() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.connect_as("alice-phone", "alice").await;
    setup.connect("bob").await;
    for label in ["alice", "alice-phone", "bob"] {
        setup.join_quietly(label, "r1").await;
    }

    setup.send_chat("bob", "r1", "hi both").await;

    MessageAssertion::for_clients(&setup, vec!["alice", "alice-phone", "bob"])
        .received_message_type(MessageType::NewMessage)
        .with_user("bob");
}

#[tokio::test]
async fn test_content_limits_are_enforced_before_persisting() {
    let setup = TestSetupBuilder::new().with_max_message_length(10).build();
    setup.connect("alice").await;
    setup.join_quietly("alice", "r1").await;

    setup.send_chat("alice", "r1", "   ").await;
    setup.send_chat("alice", "r1", "this is far too long").await;

    let errors = MessageAssertion::for_client(&setup, "alice")
        .received_message_sequence(vec![MessageType::Error, MessageType::Error]);
    for error in errors {
        error.with_error_code("INVALID_PAYLOAD");
    }
    assert!(setup.store.persisted().is_empty());
}

#[tokio::test]
async fn test_sending_after_leave_is_rejected() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.join_quietly("alice", "r1").await;
    setup.leave("alice", "r1").await;
    setup.clear_messages();

    setup.send_chat("alice", "r1", "anyone?").await;

    MessageAssertion::for_client(&setup, "alice")
        .received_message_type(MessageType::Error)
        .with_error_code("NOT_A_MEMBER");
}

#[tokio::test]
async fn test_disconnected_member_no_longer_receives() {
    let setup = TestSetupBuilder::new().build();
    setup.connect("alice").await;
    setup.connect("bob").await;
    setup.join_quietly("alice", "r1").await;
    setup.join_quietly("bob", "r1").await;
    setup.disconnect("bob").await;
    setup.clear_messages();

    setup.send_chat("alice", "r1", "still there?").await;

    MessageAssertion::for_client(&setup, "alice").received_message_type(MessageType::NewMessage);
    MessageAssertion::for_client(&setup, "bob").received_no_messages();
}
