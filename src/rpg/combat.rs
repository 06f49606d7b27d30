//! Turn-based combat between a player and a catalog encounter.
//!
//! A session walks Idle -> Active -> Victory | Defeat | Fled. Entering
//! combat raises the player's `in_combat` flag, which fences all non-combat
//! mutators off the player's resources and inventory until the session
//! resolves. Sessions live in an in-memory registry keyed by token; a
//! reconciliation sweep clears flags left behind by abandoned sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::rpg::achievements;
use crate::rpg::catalog::Catalog;
use crate::rpg::economy;
use crate::rpg::errors::RpgError;
use crate::rpg::luck::{self, LuckService};
use crate::rpg::quests;
use crate::rpg::stats;
use crate::rpg::types::{
    CombatAction, CombatOutcome, CombatToken, CounterKind, EncounterDef, PlayerEvent, PlayerRecord,
    ResultBundle, TurnResult,
};

/// Defense scaling constant in the damage formula.
const DEFENSE_K: f64 = 100.0;
/// Base probability that a flee attempt succeeds, before luck.
pub const FLEE_BASE_CHANCE: f64 = 0.66;
/// Enemies crit at a flat rate; they have no luck to scale it.
const ENEMY_CRIT_CHANCE: f64 = 0.05;

/// Operator-tunable combat knobs, sourced from the config file.
#[derive(Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Fraction of gold lost on defeat, as a percentage.
    pub defeat_penalty_percent: u32,
    /// Base flee probability before luck scaling.
    pub flee_chance: f64,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            defeat_penalty_percent: 10,
            flee_chance: FLEE_BASE_CHANCE,
        }
    }
}

/// One active combat, tracked outside the player document.
#[derive(Debug, Clone)]
pub struct CombatSession {
    pub token: CombatToken,
    pub user_id: String,
    pub encounter_key: String,
    pub enemy_hp: u32,
    /// Total damage the player has taken this session; zero at victory
    /// records a perfect battle.
    pub damage_taken: u32,
    pub started_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
}

/// In-memory registry of active sessions, keyed by token.
#[derive(Default)]
pub struct CombatRegistry {
    sessions: Mutex<HashMap<CombatToken, CombatSession>>,
}

impl CombatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: CombatSession) {
        let mut sessions = self.sessions.lock().expect("session registry");
        sessions.insert(session.token, session);
    }

    /// Remove and return a session; the caller reinserts it if the combat
    /// is still active after the turn resolves.
    pub fn take(&self, token: CombatToken) -> Result<CombatSession, RpgError> {
        let mut sessions = self.sessions.lock().expect("session registry");
        sessions.remove(&token).ok_or(RpgError::NotInCombat)
    }

    /// Drop sessions whose last action predates `cutoff`, returning the
    /// affected user ids so the sweep can clear their combat flags.
    pub fn evict_stale(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let mut sessions = self.sessions.lock().expect("session registry");
        let stale: Vec<CombatToken> = sessions
            .values()
            .filter(|s| s.last_action_at < cutoff)
            .map(|s| s.token)
            .collect();
        stale
            .into_iter()
            .filter_map(|token| sessions.remove(&token))
            .map(|s| s.user_id)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.lock().expect("session registry").len()
    }
}

/// Open a session against an encounter. The caller must already hold the
/// player inside a combat mutator; this checks and raises the flag.
pub fn start(
    player: &mut PlayerRecord,
    encounter: &EncounterDef,
    now: DateTime<Utc>,
) -> Result<CombatSession, RpgError> {
    if player.in_combat {
        return Err(RpgError::AlreadyInCombat);
    }
    player.in_combat = true;
    player.last_combat_event = Some(now);
    let session = CombatSession {
        token: CombatToken(Uuid::new_v4()),
        user_id: player.user_id.clone(),
        encounter_key: encounter.key.clone(),
        enemy_hp: encounter.hp,
        damage_taken: 0,
        started_at: now,
        last_action_at: now,
    };
    debug!("player {} engaged {}", player.user_id, encounter.key);
    Ok(session)
}

/// `attack * (1 - defense / (defense + k))`, floored at 1.
fn damage(attack: u32, defense: u32, crit_mult: f64) -> u32 {
    let mitigation = 1.0 - defense as f64 / (defense as f64 + DEFENSE_K);
    let raw = attack as f64 * mitigation * crit_mult;
    (raw.floor() as u32).max(1)
}

/// Resolve one turn of an active session. On victory or defeat the rewards
/// and penalties are applied to the player in place and the session ends;
/// the caller drops it from the registry based on `outcome`.
pub fn resolve_turn(
    player: &mut PlayerRecord,
    session: &mut CombatSession,
    encounter: &EncounterDef,
    action: CombatAction,
    catalog: &Catalog,
    rng: &LuckService,
    tuning: &CombatTuning,
    now: DateTime<Utc>,
) -> Result<TurnResult, RpgError> {
    if !player.in_combat {
        return Err(RpgError::NotInCombat);
    }
    player.last_combat_event = Some(now);
    session.last_action_at = now;

    let mut result = TurnResult {
        enemy_hp_remaining: session.enemy_hp,
        ..Default::default()
    };

    let mut guard_mult = 1.0;
    match action {
        CombatAction::Flee => {
            if rng.chance(player, tuning.flee_chance) {
                player.in_combat = false;
                result.outcome = Some(CombatOutcome::Fled);
                debug!("player {} fled from {}", player.user_id, encounter.key);
                return Ok(result);
            }
            // Failed escape costs the turn; the enemy still swings.
        }
        CombatAction::Defend => {
            guard_mult = 0.5;
        }
        CombatAction::Attack => {
            if rng.raw_chance(encounter.dodge_chance) {
                result.dodged_by_enemy = true;
            } else {
                result.crit = rng.critical(player, player.derived.crit_chance);
                let crit_mult = if result.crit { 2.0 } else { 1.0 };
                result.damage_dealt = damage(player.derived.attack, encounter.defense, crit_mult);
                session.enemy_hp = session.enemy_hp.saturating_sub(result.damage_dealt);
                result.enemy_hp_remaining = session.enemy_hp;
            }
            if session.enemy_hp == 0 {
                let mut bundle = ResultBundle::default();
                apply_victory(player, session, encounter, catalog, rng, now, &mut bundle);
                result.outcome = Some(CombatOutcome::Victory);
                result.bundle = Some(bundle);
                return Ok(result);
            }
        }
    }

    // Enemy turn.
    if rng.chance(player, player.derived.dodge_chance) {
        result.dodged_by_player = true;
    } else {
        let crit_mult = if rng.raw_chance(ENEMY_CRIT_CHANCE) { 2.0 } else { 1.0 };
        let hit = damage(encounter.attack, player.derived.defense, crit_mult * guard_mult);
        result.damage_taken = hit;
        session.damage_taken = session.damage_taken.saturating_add(hit);
        player.counters.bump(CounterKind::DamageTaken, hit as u64);
        player.resources.hp = player.resources.hp.saturating_sub(hit);
    }

    if player.resources.hp == 0 {
        let mut bundle = ResultBundle::default();
        apply_defeat(player, encounter, tuning, &mut bundle);
        result.outcome = Some(CombatOutcome::Defeat);
        result.bundle = Some(bundle);
    }

    Ok(result)
}

/// Victory bookkeeping: luck-scaled xp and gold, a weighted drop roll,
/// counters, flag clear, then quest and achievement evaluation.
fn apply_victory(
    player: &mut PlayerRecord,
    session: &CombatSession,
    encounter: &EncounterDef,
    catalog: &Catalog,
    rng: &LuckService,
    now: DateTime<Utc>,
    bundle: &mut ResultBundle,
) {
    let gold = luck::scale_amount(player, encounter.gold_reward);
    let xp = luck::scale_amount(player, encounter.xp_reward);
    economy::credit(player, gold);
    bundle.gold_delta += gold as i64;
    let level_ups = stats::apply_xp(player, xp);
    bundle.xp_delta += xp;
    if level_ups > 0 {
        bundle.level_ups += level_ups;
        stats::recompute_derived(player, catalog);
    }

    if let Some(drop) = rng.weighted(&encounter.drops, |d| d.weight) {
        let drop = drop.clone();
        crate::rpg::inventory::add_item(player, &drop.item_key, drop.qty);
        bundle.items_added.push((drop.item_key, drop.qty));
    }

    player.counters.bump(CounterKind::BattlesWon, 1);
    if encounter.boss {
        player.counters.bump(CounterKind::BossesDefeated, 1);
    }
    if encounter.key == "plagg_shadow" {
        player.counters.bump(CounterKind::PlaggShadowsDefeated, 1);
    }
    if session.damage_taken == 0 {
        player.counters.bump(CounterKind::PerfectBattles, 1);
    }

    player.in_combat = false;
    debug!(
        "player {} defeated {} (perfect: {})",
        player.user_id,
        encounter.key,
        session.damage_taken == 0
    );

    let event = PlayerEvent::MonsterKilled {
        monster: encounter.key.clone(),
        boss: encounter.boss,
    };
    player.counters.bump(CounterKind::MonstersKilled, 1);
    quests::apply_event(player, &event, catalog, now, bundle);
    achievements::evaluate(player, catalog, bundle);
}

/// Defeat: the death penalty claws back a fraction of gold, then the flag
/// clears. The player keeps their inventory.
fn apply_defeat(
    player: &mut PlayerRecord,
    encounter: &EncounterDef,
    tuning: &CombatTuning,
    bundle: &mut ResultBundle,
) {
    let penalty = player.gold * tuning.defeat_penalty_percent.min(100) as u64 / 100;
    player.gold -= penalty;
    bundle.gold_delta -= penalty as i64;
    player.in_combat = false;
    debug!("player {} was defeated by {}", player.user_id, encounter.key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::types::ClassKind;

    fn setup() -> (PlayerRecord, Catalog, LuckService) {
        let catalog = Catalog::with_defaults();
        let mut player = PlayerRecord::new("tester", ClassKind::Warrior, Utc::now());
        stats::recompute_derived(&mut player, &catalog);
        player.resources.hp = player.resources.max_hp;
        player.resources.mana = player.resources.max_mana;
        (player, catalog, LuckService::with_seed(5))
    }

    #[test]
    fn damage_formula_floors_at_one() {
        assert_eq!(damage(100, 100, 1.0), 50);
        assert_eq!(damage(100, 0, 2.0), 200);
        assert_eq!(damage(1, 10_000, 1.0), 1);
    }

    #[test]
    fn start_raises_flag_and_rejects_double_entry() {
        let (mut player, catalog, _) = setup();
        let encounter = catalog.encounter("street_akuma").expect("encounter").clone();
        let now = Utc::now();

        let session = start(&mut player, &encounter, now).expect("start");
        assert!(player.in_combat);
        assert_eq!(session.enemy_hp, encounter.hp);

        let again = start(&mut player, &encounter, now);
        assert!(matches!(again, Err(RpgError::AlreadyInCombat)));
    }

    #[test]
    fn attacking_to_victory_clears_flag_and_rewards() {
        let (mut player, catalog, rng) = setup();
        let encounter = catalog.encounter("street_akuma").expect("encounter").clone();
        let now = Utc::now();
        let mut session = start(&mut player, &encounter, now).expect("start");
        let gold_before = player.gold;

        let mut outcome = None;
        for _ in 0..100 {
            let result =
                resolve_turn(&mut player, &mut session, &encounter, CombatAction::Attack, &catalog, &rng, &CombatTuning::default(), now)
                    .expect("turn");
            if let Some(o) = result.outcome {
                outcome = Some((o, result.bundle));
                break;
            }
        }
        let (outcome, bundle) = outcome.expect("combat resolves");
        assert_eq!(outcome, CombatOutcome::Victory);
        assert!(!player.in_combat);
        assert_eq!(player.counters.get(CounterKind::BattlesWon), 1);
        assert_eq!(player.counters.get(CounterKind::MonstersKilled), 1);
        let bundle = bundle.expect("bundle");
        assert!(bundle.gold_delta > 0);
        assert!(player.gold > gold_before);
        // first_blood fires off the battles_won counter.
        assert!(bundle.achievements_unlocked.contains(&"first_blood".to_string()));
    }

    #[test]
    fn defeat_takes_a_tithe_and_clears_flag() {
        let (mut player, catalog, rng) = setup();
        let encounter = catalog.encounter("plagg_shadow").expect("encounter").clone();
        let now = Utc::now();
        let mut session = start(&mut player, &encounter, now).expect("start");
        player.gold = 1000;
        player.resources.hp = 1;

        // Keep defending until the boss lands a hit.
        let mut outcome = None;
        for _ in 0..200 {
            let result =
                resolve_turn(&mut player, &mut session, &encounter, CombatAction::Defend, &catalog, &rng, &CombatTuning::default(), now)
                    .expect("turn");
            if let Some(o) = result.outcome {
                outcome = Some(o);
                break;
            }
        }
        assert_eq!(outcome, Some(CombatOutcome::Defeat));
        assert!(!player.in_combat);
        assert_eq!(player.gold, 900);
        assert_eq!(player.resources.hp, 0);
    }

    #[test]
    fn fleeing_eventually_escapes() {
        let (mut player, catalog, rng) = setup();
        let encounter = catalog.encounter("sewer_golem").expect("encounter").clone();
        let now = Utc::now();
        let mut session = start(&mut player, &encounter, now).expect("start");

        let mut fled = false;
        for _ in 0..50 {
            let result =
                resolve_turn(&mut player, &mut session, &encounter, CombatAction::Flee, &catalog, &rng, &CombatTuning::default(), now)
                    .expect("turn");
            match result.outcome {
                Some(CombatOutcome::Fled) => {
                    fled = true;
                    break;
                }
                Some(_) => break,
                None => {}
            }
        }
        assert!(fled);
        assert!(!player.in_combat);
        assert_eq!(player.counters.get(CounterKind::BattlesWon), 0);
    }

    #[test]
    fn registry_take_and_stale_eviction() {
        let registry = CombatRegistry::new();
        let now = Utc::now();
        let session = CombatSession {
            token: CombatToken(Uuid::new_v4()),
            user_id: "tester".into(),
            encounter_key: "street_akuma".into(),
            enemy_hp: 40,
            damage_taken: 0,
            started_at: now,
            last_action_at: now,
        };
        let token = session.token;
        registry.insert(session.clone());
        assert_eq!(registry.active_count(), 1);

        let taken = registry.take(token).expect("take");
        assert_eq!(taken.user_id, "tester");
        assert!(matches!(registry.take(token), Err(RpgError::NotInCombat)));

        registry.insert(session);
        let evicted = registry.evict_stale(now + chrono::Duration::minutes(31));
        assert_eq!(evicted, vec!["tester".to_string()]);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn untouched_victory_counts_as_perfect() {
        let (mut player, catalog, rng) = setup();
        let encounter = catalog.encounter("street_akuma").expect("encounter").clone();
        let now = Utc::now();
        let mut session = start(&mut player, &encounter, now).expect("start");
        // Drop the enemy in one synthetic blow so it never swings back.
        session.enemy_hp = 1;
        player.derived.dodge_chance = 1.0;

        let mut outcome = None;
        for _ in 0..20 {
            let result =
                resolve_turn(&mut player, &mut session, &encounter, CombatAction::Attack, &catalog, &rng, &CombatTuning::default(), now)
                    .expect("turn");
            if let Some(o) = result.outcome {
                outcome = Some(o);
                break;
            }
        }
        assert_eq!(outcome, Some(CombatOutcome::Victory));
        assert_eq!(player.counters.get(CounterKind::PerfectBattles), 1);
    }
}
