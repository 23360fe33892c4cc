//! Redis Presence Integration Tests
//!
//! These tests require:
//! - Running Redis instance
//! - Environment variable: REDIS_URL
//!
//! Run with: cargo test -p integration-tests --test presence_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{check_redis_env, unique_conversation};
use tour_cache::RedisPresenceTransport;
use tour_common::RedisConfig;
use tour_core::{ConversationId, PresenceTransport, TypingUser, UserId};
use tour_sync::{TypingCoordinator, TypingSettings};

fn transport(url: String) -> Arc<dyn PresenceTransport> {
    let config = RedisConfig {
        url,
        max_connections: 4,
    };
    Arc::new(RedisPresenceTransport::from_config(&config).expect("Failed to build transport"))
}

async fn wait_for_typing(
    coordinator: &TypingCoordinator,
    expected: Vec<TypingUser>,
) -> Vec<TypingUser> {
    let mut typing = coordinator.subscribe();
    let _ = tokio::time::timeout(
        Duration::from_secs(5),
        typing.wait_for(|users| *users == expected),
    )
    .await;
    coordinator.typing_users()
}

#[tokio::test]
async fn test_typing_over_redis() {
    let Some(url) = check_redis_env() else {
        return;
    };
    let transport = transport(url);
    let conversation = ConversationId::from(unique_conversation());
    let settings = TypingSettings {
        auto_stop: Duration::from_millis(500),
    };

    let user1 = TypingCoordinator::activate(
        transport.clone(),
        conversation.clone(),
        UserId::from("user1"),
        settings.clone(),
    )
    .await;
    let user2 = TypingCoordinator::activate(
        transport.clone(),
        conversation.clone(),
        UserId::from("user2"),
        settings,
    )
    .await;
    assert!(user1.is_connected());

    // Give the Pub/Sub subscription a moment to be established
    tokio::time::sleep(Duration::from_millis(200)).await;

    user2.start_typing("Ana").await;
    let seen = wait_for_typing(&user1, vec![TypingUser::new("user2", "Ana")]).await;
    assert_eq!(seen, vec![TypingUser::new("user2", "Ana")]);

    let seen = wait_for_typing(&user1, Vec::new()).await;
    assert!(seen.is_empty());

    user2.leave().await;
    user1.leave().await;
}

#[tokio::test]
async fn test_leave_removes_redis_record() {
    let Some(url) = check_redis_env() else {
        return;
    };
    let transport = transport(url);
    let conversation = ConversationId::from(unique_conversation());

    let user1 = TypingCoordinator::activate(
        transport.clone(),
        conversation.clone(),
        UserId::from("user1"),
        TypingSettings::default(),
    )
    .await;

    let channel = transport
        .join(&tour_sync::typing_topic(&conversation), "observer")
        .await
        .unwrap();
    assert!(channel.state().await.unwrap().contains_key("user1"));

    user1.leave().await;
    assert!(!channel.state().await.unwrap().contains_key("user1"));
    channel.unsubscribe().await.unwrap();
}
