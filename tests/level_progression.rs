//! Integration tests for xp gain, level ups and stat allocation through the
//! engine facade.

mod common;

use kwamirpg::rpg::{PlayerEvent, RpgError, StatKind};

#[tokio::test]
async fn xp_gain_crosses_one_level() {
    let (_dir, _clock, engine) = common::engine();
    let fresh = engine.ensure("alice").await.unwrap();
    assert_eq!(fresh.level, 1);
    assert_eq!(fresh.xp, 0);
    assert_eq!(fresh.xp_to_next, 100);
    let max_hp_before = fresh.resources.max_hp;

    let bundle = engine
        .apply_event("alice", PlayerEvent::XpGained { amount: 150 })
        .await
        .unwrap();
    assert_eq!(bundle.level_ups, 1);

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.level, 2);
    assert_eq!(player.xp, 50);
    assert_eq!(player.xp_to_next, 115);
    assert_eq!(player.unallocated_points, 2);
    // Max HP only moves once constitution is allocated.
    assert_eq!(player.resources.max_hp, max_hp_before);
}

#[tokio::test]
async fn allocating_constitution_grows_max_hp() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    engine
        .apply_event("alice", PlayerEvent::XpGained { amount: 150 })
        .await
        .unwrap();

    let before = engine.snapshot("alice").unwrap();
    let bundle = engine
        .allocate_stat("alice", StatKind::Constitution, 2)
        .await
        .unwrap();
    assert!(!bundle.messages.is_empty());

    let after = engine.snapshot("alice").unwrap();
    assert_eq!(after.primary.constitution, before.primary.constitution + 2);
    assert_eq!(after.resources.max_hp, before.resources.max_hp + 20);
    // Growth tops up current hp by the delta.
    assert_eq!(after.resources.hp, before.resources.hp + 20);
    assert_eq!(after.unallocated_points, 0);
}

#[tokio::test]
async fn allocation_without_points_is_refused() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    let result = engine.allocate_stat("alice", StatKind::Strength, 1).await;
    assert!(matches!(result, Err(RpgError::InvariantViolation(_))));
    // Nothing persisted.
    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.unallocated_points, 0);
}

#[tokio::test]
async fn multi_level_jump_walks_the_curve() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    // 100 + 115 + 132 = 347 crosses three levels exactly.
    let bundle = engine
        .apply_event("alice", PlayerEvent::XpGained { amount: 347 })
        .await
        .unwrap();
    assert_eq!(bundle.level_ups, 3);

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.level, 4);
    assert_eq!(player.xp, 0);
    assert_eq!(player.unallocated_points, 6);
    assert!(player.xp < player.xp_to_next);
}
