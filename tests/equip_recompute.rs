//! Integration tests for equipment changes driving derived-stat
//! recomputation through the engine.

mod common;

use kwamirpg::rpg::{EquipSlot, PlayerEvent, RpgError};

#[tokio::test]
async fn equipping_a_weapon_raises_attack_only() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    engine
        .apply_event("alice", PlayerEvent::ItemCollected { item_key: "iron_sword".into(), qty: 1 })
        .await
        .unwrap();

    let before = engine.snapshot("alice").unwrap();
    let bundle = engine
        .equip("alice", EquipSlot::Weapon, "iron_sword")
        .await
        .unwrap();
    assert!(bundle
        .derived_stat_changes
        .iter()
        .any(|c| c.stat == "attack" && c.after == c.before + 5.0));

    let after = engine.snapshot("alice").unwrap();
    assert_eq!(after.derived.attack, before.derived.attack + 5);
    assert_eq!(after.resources.max_hp, before.resources.max_hp);
    assert!(!after.inventory.contains_key("iron_sword"));
}

#[tokio::test]
async fn unequip_returns_item_and_restores_stats() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    engine
        .apply_event("alice", PlayerEvent::ItemCollected { item_key: "iron_sword".into(), qty: 1 })
        .await
        .unwrap();
    let base_attack = engine.snapshot("alice").unwrap().derived.attack;

    engine.equip("alice", EquipSlot::Weapon, "iron_sword").await.unwrap();
    engine.unequip("alice", EquipSlot::Weapon).await.unwrap();

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.derived.attack, base_attack);
    assert_eq!(player.inventory["iron_sword"], 1);
}

#[tokio::test]
async fn wrong_slot_is_refused_without_mutation() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    engine
        .apply_event("alice", PlayerEvent::ItemCollected { item_key: "camembert".into(), qty: 1 })
        .await
        .unwrap();

    let result = engine.equip("alice", EquipSlot::Weapon, "camembert").await;
    assert!(matches!(result, Err(RpgError::SlotMismatch(_))));

    let player = engine.snapshot("alice").unwrap();
    assert_eq!(player.inventory["camembert"], 1);
    assert!(player.equipment.weapon.is_none());
}

#[tokio::test]
async fn completing_an_artifact_set_applies_the_set_bonus() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("alice").await.unwrap();
    for key in ["chrono_dial", "chrono_gear", "chrono_spring", "chrono_hand"] {
        engine
            .apply_event("alice", PlayerEvent::ItemCollected { item_key: key.into(), qty: 1 })
            .await
            .unwrap();
    }

    for (pos, key) in ["chrono_dial", "chrono_gear", "chrono_spring"].iter().enumerate() {
        engine.equip_artifact("alice", pos as u8, key).await.unwrap();
    }
    let three_pieces = engine.snapshot("alice").unwrap();

    engine.equip_artifact("alice", 3, "chrono_hand").await.unwrap();
    let full_set = engine.snapshot("alice").unwrap();

    // The fourth piece carries +0.01 crit; the set bonus adds +10 attack on
    // top of it.
    assert_eq!(full_set.derived.attack, three_pieces.derived.attack + 10);
    assert_eq!(full_set.resources.max_hp, three_pieces.resources.max_hp + 50);
}
