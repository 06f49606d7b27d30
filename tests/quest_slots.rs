//! Integration tests for daily/weekly quest slots and expiry sweeps.

mod common;

use chrono::Duration;
use kwamirpg::rpg::{QuestKind, RpgError};

#[tokio::test]
async fn second_daily_is_refused_while_slot_is_full() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    engine.generate_daily("alice").await.expect("first daily");
    let second = engine.generate_daily("alice").await;
    assert!(matches!(second, Err(RpgError::SlotOccupied)));

    let player = engine.snapshot("alice").unwrap();
    let dailies = player
        .active_quests
        .iter()
        .filter(|q| q.kind == QuestKind::Daily)
        .count();
    assert_eq!(dailies, 1);
}

#[tokio::test]
async fn weekly_slot_is_independent_of_daily() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    engine.generate_daily("alice").await.expect("daily");
    engine.generate_weekly("alice").await.expect("weekly");
    let again = engine.generate_weekly("alice").await;
    assert!(matches!(again, Err(RpgError::SlotOccupied)));

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.active_quests.len(), 2);
}

#[tokio::test]
async fn expired_daily_frees_the_slot_without_completing() {
    let (_dir, clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    let first = engine.generate_daily("alice").await.expect("daily");
    clock.advance(Duration::hours(25));

    // Generation sweeps the expired instance before filling the slot.
    let second = engine.generate_daily("alice").await.expect("fresh daily");
    assert_ne!(first.id, second.id);

    let player = engine.snapshot("alice").unwrap();
    assert!(!player.completed_quests.contains(&first.name));
    assert_eq!(
        player
            .active_quests
            .iter()
            .filter(|q| q.kind == QuestKind::Daily)
            .count(),
        1
    );
}

#[tokio::test]
async fn weekly_outlives_the_daily_ttl() {
    let (_dir, clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    engine.generate_weekly("alice").await.expect("weekly");
    clock.advance(Duration::days(2));
    assert_eq!(engine.expire_quests().await.unwrap(), 0);

    clock.advance(Duration::days(6));
    assert_eq!(engine.expire_quests().await.unwrap(), 1);
    let player = engine.snapshot("alice").unwrap();
    assert!(player.active_quests.is_empty());
}

#[tokio::test]
async fn daily_ttl_is_twenty_four_hours() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    let quest = engine.generate_daily("alice").await.expect("daily");
    let expires = quest.expires_at.expect("dailies expire");
    assert_eq!(expires - quest.created_at, Duration::hours(24));
}
