//! Integration tests for the gold ledger: buying, selling, counters and
//! profile resets.

mod common;

use kwamirpg::rpg::{CooldownKey, CounterKind, PlayerEvent, RpgError};

#[tokio::test]
async fn buy_debits_and_sell_credits() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    let bundle = engine.buy("alice", "herb", 10, 3).await.unwrap();
    assert_eq!(bundle.gold_delta, -30);
    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.gold, 70);
    assert_eq!(player.inventory["herb"], 10);
    assert_eq!(player.counters.get(CounterKind::UniqueItemsOwned), 1);

    let bundle = engine.sell("alice", "herb", 4, 2).await.unwrap();
    assert_eq!(bundle.gold_delta, 8);
    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.gold, 78);
    assert_eq!(player.inventory["herb"], 6);
    // Sales count toward lifetime earnings.
    assert_eq!(player.counters.get(CounterKind::GoldEarned), 8);
}

#[tokio::test]
async fn overdrafts_and_short_sales_leave_state_untouched() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    let broke = engine.buy("alice", "cataclysm_claw", 1, 850).await;
    assert!(matches!(broke, Err(RpgError::InsufficientGold)));

    let short = engine.sell("alice", "herb", 1, 5).await;
    assert!(matches!(short, Err(RpgError::InsufficientItems(_))));

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.gold, 100);
    assert!(player.inventory.is_empty());
}

#[tokio::test]
async fn unknown_items_cannot_be_traded() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    let result = engine.buy("alice", "philosopher_stone", 1, 1).await;
    assert!(matches!(result, Err(RpgError::UnknownEntry(_))));
}

#[tokio::test]
async fn reset_reinitializes_the_document() {
    let (_dir, _clock, engine) = common::engine();
    let original = engine.ensure("alice").await.unwrap();
    engine.buy("alice", "herb", 5, 2).await.unwrap();
    engine
        .apply_event("alice", PlayerEvent::XpGained { amount: 500 })
        .await
        .unwrap();

    let reset = engine.reset("alice").await.unwrap();
    assert_eq!(reset.level, 1);
    assert_eq!(reset.gold, 100);
    assert!(reset.inventory.is_empty());
    assert!(reset.created_at >= original.created_at);

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.level, 1);
}

#[tokio::test]
async fn cooldowns_gate_repeat_actions() {
    let (_dir, clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();

    assert_eq!(engine.check_cooldown("alice", CooldownKey::Work, 3600).unwrap(), 0);
    engine.stamp_cooldown("alice", CooldownKey::Work, 3600).await.unwrap();

    clock.advance(chrono::Duration::seconds(600));
    assert_eq!(engine.check_cooldown("alice", CooldownKey::Work, 3600).unwrap(), 3000);
    let gated = engine.stamp_cooldown("alice", CooldownKey::Work, 3600).await;
    assert!(matches!(gated, Err(RpgError::OnCooldown { remaining_seconds: 3000 })));

    clock.advance(chrono::Duration::seconds(3001));
    assert_eq!(engine.check_cooldown("alice", CooldownKey::Work, 3600).unwrap(), 0);
    engine.stamp_cooldown("alice", CooldownKey::Work, 3600).await.unwrap();
}

#[tokio::test]
async fn ensure_survives_restarts_on_the_same_store() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    engine.buy("alice", "herb", 3, 2).await.unwrap();

    // A second ensure must not reseed the document.
    let player = engine.ensure("alice").await.unwrap();
    assert_eq!(player.gold, 94);
    assert_eq!(player.inventory["herb"], 3);
}
