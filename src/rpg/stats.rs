//! Derived-stat recomputation and progression math.
//!
//! Derived stats are a cache, not truth: [`recompute_derived`] is the only
//! writer and is a pure function of primary stats, class, equipment,
//! artifact sets and active buffs. It runs after every mutation that could
//! touch one of its inputs.

use crate::rpg::catalog::Catalog;
use crate::rpg::errors::RpgError;
use crate::rpg::types::{
    PlayerRecord, StatBonuses, StatKind, ARTIFACT_SET_SIZE, MAX_LEVEL,
};
use std::collections::BTreeMap;

/// Points granted per level up.
pub const POINTS_PER_LEVEL: u32 = 2;

/// XP needed to advance from `level` to the next one.
pub fn xp_to_next(level: u32) -> u64 {
    (100.0 * 1.15_f64.powi(level.saturating_sub(1) as i32)).round() as u64
}

/// Sum every additive bonus source: the four equipment slots, equipped
/// artifacts, complete artifact sets, and active buffs.
fn total_bonuses(player: &PlayerRecord, catalog: &Catalog) -> StatBonuses {
    let mut total = StatBonuses::default();

    for item_key in player.equipment.iter_equipped() {
        if let Some(item) = catalog.item(item_key) {
            total.accumulate(&item.bonuses);
        }
    }

    let mut set_counts: BTreeMap<String, u32> = BTreeMap::new();
    for item_key in player.equipped_artifacts.values() {
        if let Some(item) = catalog.item(item_key) {
            total.accumulate(&item.bonuses);
            if let Some(set) = item.artifact_set() {
                *set_counts.entry(set.to_string()).or_insert(0) += 1;
            }
        }
    }
    for (set_key, count) in set_counts {
        if count >= ARTIFACT_SET_SIZE {
            if let Some(set) = catalog.artifact_set(&set_key) {
                total.accumulate(&set.bonuses);
            }
        }
    }

    for buff in &player.active_buffs {
        total.accumulate(&buff.bonuses);
    }

    total
}

/// Recompute the derived-stat cache and re-anchor bounded resources.
///
/// When a maximum grows, the delta is added to the current value; when it
/// shrinks, the current value is clamped to the new maximum.
pub fn recompute_derived(player: &mut PlayerRecord, catalog: &Catalog) {
    let bonuses = total_bonuses(player, catalog);
    let primary = &player.primary;

    let old_max_hp = player.resources.max_hp;
    let old_max_mana = player.resources.max_mana;

    player.derived.attack = 10 + 2 * primary.strength as u32 + bonuses.attack;
    player.derived.magic_attack = 10 + 2 * primary.intelligence as u32 + bonuses.magic_attack;
    player.derived.defense = 5 + primary.constitution as u32 + bonuses.defense;
    player.derived.crit_chance =
        (0.05 + 0.01 * primary.dexterity as f64 + bonuses.crit).clamp(0.0, 1.0);
    player.derived.dodge_chance = (0.005 * primary.dexterity as f64 + bonuses.dodge).clamp(0.0, 1.0);
    player.derived.max_ultimate_energy = 100 + 2 * primary.wisdom as u32;

    let new_max_hp = 100 + 10 * primary.constitution as u32 + bonuses.hp;
    let new_max_mana = 50 + 5 * primary.intelligence as u32 + bonuses.mana;

    player.resources.max_hp = new_max_hp;
    if new_max_hp > old_max_hp {
        player.resources.hp += new_max_hp - old_max_hp;
    } else {
        player.resources.hp = player.resources.hp.min(new_max_hp);
    }

    player.resources.max_mana = new_max_mana;
    if new_max_mana > old_max_mana {
        player.resources.mana += new_max_mana - old_max_mana;
    } else {
        player.resources.mana = player.resources.mana.min(new_max_mana);
    }

    player
        .resources
        .clamp_to_maxima(player.derived.max_ultimate_energy);
}

/// Add xp and process level ups. Returns the number of levels gained.
/// Levels cap at [`MAX_LEVEL`]; xp past the cap is discarded.
pub fn apply_xp(player: &mut PlayerRecord, amount: u64) -> u32 {
    player.xp = player.xp.saturating_add(amount);
    let mut level_ups = 0;
    while player.level < MAX_LEVEL && player.xp >= player.xp_to_next {
        player.xp -= player.xp_to_next;
        player.level += 1;
        player.xp_to_next = xp_to_next(player.level);
        player.unallocated_points += POINTS_PER_LEVEL;
        level_ups += 1;
    }
    if player.level >= MAX_LEVEL {
        player.xp = 0;
    }
    level_ups
}

/// Drop expired buffs and recompute if any fell off. Returns true when the
/// buff list changed.
pub fn prune_expired_buffs(
    player: &mut PlayerRecord,
    catalog: &Catalog,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    let before = player.active_buffs.len();
    player.active_buffs.retain(|buff| !buff.is_expired(now));
    if player.active_buffs.len() != before {
        recompute_derived(player, catalog);
        return true;
    }
    false
}

/// Spend unallocated points on a primary stat, then recompute. Points that
/// would push the stat past its cap are refused, not burned.
pub fn allocate_stat(
    player: &mut PlayerRecord,
    stat: StatKind,
    amount: u32,
    catalog: &Catalog,
) -> Result<u32, RpgError> {
    if amount == 0 || player.unallocated_points < amount {
        return Err(RpgError::InvariantViolation(format!(
            "cannot allocate {amount} points with {} unallocated",
            player.unallocated_points
        )));
    }
    let consumed = player.primary.add(stat, amount.min(u8::MAX as u32) as u8) as u32;
    player.unallocated_points -= consumed;
    recompute_derived(player, catalog);
    Ok(consumed)
}
