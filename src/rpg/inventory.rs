//! Item ownership and equipment management.
//!
//! Inventory is a key -> count map; entries disappear when their count hits
//! zero. Every equipment change re-runs the derived-stat recomputation so
//! the cache never drifts from its inputs.

use crate::rpg::catalog::Catalog;
use crate::rpg::errors::RpgError;
use crate::rpg::stats;
use crate::rpg::types::{CounterKind, EquipSlot, PlayerRecord};

/// Highest artifact position; positions are 0..=MAX_ARTIFACT_POSITION.
pub const MAX_ARTIFACT_POSITION: u8 = 7;

/// Add items to the inventory. First-time ownership of a key bumps the
/// unique-items counter.
pub fn add_item(player: &mut PlayerRecord, item_key: &str, qty: u32) {
    if qty == 0 {
        return;
    }
    let entry = player.inventory.entry(item_key.to_string()).or_insert(0);
    if *entry == 0 {
        player.counters.bump(CounterKind::UniqueItemsOwned, 1);
    }
    *entry = entry.saturating_add(qty);
}

/// Remove items, failing without mutation when the count is short.
pub fn remove_item(player: &mut PlayerRecord, item_key: &str, qty: u32) -> Result<(), RpgError> {
    let owned = player.inventory.get(item_key).copied().unwrap_or(0);
    if owned < qty {
        return Err(RpgError::InsufficientItems(item_key.to_string()));
    }
    if owned == qty {
        player.inventory.remove(item_key);
    } else if let Some(entry) = player.inventory.get_mut(item_key) {
        *entry = owned - qty;
    }
    Ok(())
}

pub fn owned_count(player: &PlayerRecord, item_key: &str) -> u32 {
    player.inventory.get(item_key).copied().unwrap_or(0)
}

/// Equip an owned item into a slot. The item leaves the inventory; whatever
/// was in the slot returns to it. Triggers recomputation.
pub fn equip(
    player: &mut PlayerRecord,
    slot: EquipSlot,
    item_key: &str,
    catalog: &Catalog,
) -> Result<(), RpgError> {
    let item = catalog.require_item(item_key)?;
    if !item.kind.fits_slot(slot) {
        return Err(RpgError::SlotMismatch(format!(
            "{item_key} cannot go in the {slot:?} slot"
        )));
    }
    remove_item(player, item_key, 1)?;
    if let Some(previous) = player.equipment.set(slot, Some(item_key.to_string())) {
        add_item(player, &previous, 1);
    }
    stats::recompute_derived(player, catalog);
    Ok(())
}

/// Clear a slot, returning the item to the inventory. Triggers
/// recomputation. Unequipping an empty slot is a no-op.
pub fn unequip(player: &mut PlayerRecord, slot: EquipSlot, catalog: &Catalog) {
    if let Some(previous) = player.equipment.set(slot, None) {
        add_item(player, &previous, 1);
        stats::recompute_derived(player, catalog);
    }
}

/// Place an artifact in a numbered position (0..=[`MAX_ARTIFACT_POSITION`]).
/// Non-artifact items are refused with `SlotMismatch`.
pub fn equip_artifact(
    player: &mut PlayerRecord,
    position: u8,
    item_key: &str,
    catalog: &Catalog,
) -> Result<(), RpgError> {
    if position > MAX_ARTIFACT_POSITION {
        return Err(RpgError::SlotMismatch(format!(
            "artifact position {position} out of range"
        )));
    }
    let item = catalog.require_item(item_key)?;
    if item.artifact_set().is_none() {
        return Err(RpgError::SlotMismatch(format!("{item_key} is not an artifact")));
    }
    remove_item(player, item_key, 1)?;
    if let Some(previous) = player.equipped_artifacts.insert(position, item_key.to_string()) {
        add_item(player, &previous, 1);
    }
    stats::recompute_derived(player, catalog);
    Ok(())
}

pub fn unequip_artifact(player: &mut PlayerRecord, position: u8, catalog: &Catalog) {
    if let Some(previous) = player.equipped_artifacts.remove(&position) {
        add_item(player, &previous, 1);
        stats::recompute_derived(player, catalog);
    }
}

/// Number of complete artifact sets currently equipped.
pub fn complete_set_count(player: &PlayerRecord, catalog: &Catalog) -> u32 {
    player.complete_artifact_sets(|key| catalog.artifact_set_of(key))
}
