//! Integration test for the achievement -> hidden-class unlock chain: a
//! thousand cheeses plus a defeated shadow of Plagg opens the Cheese Sage.

mod common;

use kwamirpg::rpg::{ClassKind, CounterKind, PlayerEvent};

#[tokio::test]
async fn cheese_connoisseur_unlocks_cheese_sage() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("marinette").await.unwrap();

    // Work up to the edge of the requirement.
    engine
        .apply_event("marinette", PlayerEvent::CheeseConsumed { qty: 999 })
        .await
        .unwrap();
    engine
        .apply_event(
            "marinette",
            PlayerEvent::MonsterKilled { monster: "plagg_shadow".into(), boss: true },
        )
        .await
        .unwrap();

    let player = engine.snapshot("marinette").unwrap();
    assert_eq!(player.counters.get(CounterKind::CheeseConsumed), 999);
    assert_eq!(player.counters.get(CounterKind::PlaggShadowsDefeated), 1);
    assert!(!player.completed_achievements.contains("cheese_connoisseur"));

    // The thousandth cheese tips it over.
    let bundle = engine
        .apply_event("marinette", PlayerEvent::CheeseConsumed { qty: 1 })
        .await
        .unwrap();
    assert!(bundle
        .achievements_unlocked
        .contains(&"cheese_connoisseur".to_string()));
    assert!(bundle.classes_unlocked.contains(&ClassKind::CheeseSage));

    let player = engine.snapshot("marinette").unwrap();
    assert!(player.completed_achievements.contains("cheese_connoisseur"));
    assert!(player.unlocked_hidden_classes.contains(&ClassKind::CheeseSage));
    assert!(player.titles.contains("Plagg's Chosen"));
}

#[tokio::test]
async fn hidden_achievement_surfaces_only_near_completion() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("adrien").await.unwrap();

    let keys: Vec<String> = engine
        .list_achievements("adrien")
        .unwrap()
        .into_iter()
        .map(|v| v.key)
        .collect();
    assert!(keys.contains(&"first_blood".to_string()));
    assert!(!keys.contains(&"cheese_connoisseur".to_string()));

    // 80% on every requirement counter makes it visible without unlocking.
    engine
        .apply_event("adrien", PlayerEvent::CheeseConsumed { qty: 800 })
        .await
        .unwrap();
    engine
        .apply_event(
            "adrien",
            PlayerEvent::MonsterKilled { monster: "plagg_shadow".into(), boss: true },
        )
        .await
        .unwrap();

    let views = engine.list_achievements("adrien").unwrap();
    let cheese = views
        .iter()
        .find(|v| v.key == "cheese_connoisseur")
        .expect("visible at 80%");
    assert!(!cheese.completed);

    let player = engine.snapshot("adrien").unwrap();
    assert!(!player.completed_achievements.contains("cheese_connoisseur"));
}

#[tokio::test]
async fn achievement_rewards_flow_through_the_bundle() {
    let (_dir, _clock, engine) = common::engine();
    engine.ensure("nino").await.unwrap();
    let before = engine.snapshot("nino").unwrap();

    // 20 pvp wins trip the duelist achievement in one event run.
    let mut last = None;
    for _ in 0..20 {
        last = Some(engine.apply_event("nino", PlayerEvent::PvpWon).await.unwrap());
    }
    let bundle = last.unwrap();
    assert!(bundle.achievements_unlocked.contains(&"duelist".to_string()));
    assert_eq!(bundle.gold_delta, 800);
    assert_eq!(bundle.xp_delta, 500);

    let after = engine.snapshot("nino").unwrap();
    assert_eq!(after.gold, before.gold + 800);
    assert!(after.titles.contains("Duelist"));
    assert!(after.level > before.level);
}
