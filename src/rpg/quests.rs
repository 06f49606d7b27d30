//! Quest lifecycle: template instantiation, slots, expiry, progress events,
//! completion and reward application.
//!
//! Daily and weekly quests are stamped out of static templates with a rolled
//! difficulty and target. Story quests carry explicit objective lists and an
//! acceptance gate. All progress flows through [`apply_event`] inside a
//! profile mutator.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use uuid::Uuid;

use crate::rpg::catalog::Catalog;
use crate::rpg::economy;
use crate::rpg::errors::RpgError;
use crate::rpg::inventory;
use crate::rpg::luck::{self, LuckService};
use crate::rpg::stats;
use crate::rpg::types::{
    CounterKind, ObjectiveKind, PlayerEvent, PlayerRecord, QuestInstance, QuestKind, QuestRewards,
    QuestTemplate, ResultBundle, StoryQuestDef,
};

/// Lifetime of a daily quest instance.
pub const DAILY_TTL_HOURS: i64 = 24;
/// Lifetime of a weekly quest instance.
pub const WEEKLY_TTL_DAYS: i64 = 7;

/// Stamp a concrete instance out of a template. Difficulty and target are
/// rolled through the luck service so tests can seed them.
pub fn instantiate(
    template: &QuestTemplate,
    kind: QuestKind,
    rng: &LuckService,
    now: DateTime<Utc>,
) -> QuestInstance {
    let difficulty = rng
        .weighted(&template.difficulties, |_| 1)
        .copied()
        .unwrap_or(crate::rpg::types::Difficulty::Normal);
    let target = rng.roll_range(template.target_min, template.target_max).max(1);
    let rewards = template
        .base_rewards
        .scaled(difficulty.reward_multiplier() * kind.reward_multiplier());
    let expires_at = match kind {
        QuestKind::Daily => Some(now + Duration::hours(DAILY_TTL_HOURS)),
        QuestKind::Weekly => Some(now + Duration::days(WEEKLY_TTL_DAYS)),
        QuestKind::Story => None,
    };
    let target_text = target.to_string();
    QuestInstance {
        id: Uuid::new_v4(),
        kind,
        template: template.key.clone(),
        name: template.name_pattern.replace("{target}", &target_text),
        description: template.description_pattern.replace("{target}", &target_text),
        difficulty,
        target,
        progress: 0,
        rewards,
        objectives: Vec::new(),
        expires_at,
        created_at: now,
        completed: false,
        completed_at: None,
    }
}

/// Generate a daily or weekly quest into the matching slot. At most one
/// active quest per slot kind; a full slot returns `SlotOccupied` without
/// mutating anything.
pub fn generate(
    player: &mut PlayerRecord,
    kind: QuestKind,
    catalog: &Catalog,
    rng: &LuckService,
    now: DateTime<Utc>,
    active_cap: usize,
) -> Result<QuestInstance, RpgError> {
    debug_assert!(kind != QuestKind::Story, "story quests are accepted, not generated");
    if player.has_active_quest_of_kind(kind) {
        return Err(RpgError::SlotOccupied);
    }
    if player.active_quests.len() >= active_cap {
        return Err(RpgError::SlotOccupied);
    }
    let templates: Vec<&QuestTemplate> = catalog.quest_templates().collect();
    let template = rng
        .weighted(&templates, |_| 1)
        .ok_or_else(|| RpgError::UnknownEntry("no quest templates".into()))?;
    let quest = instantiate(template, kind, rng, now);
    player.active_quests.push(quest.clone());
    Ok(quest)
}

/// Story acceptance gate: minimum level, prerequisite quests by name, and a
/// declared number of complete artifact sets.
pub fn meets_requirements(
    player: &PlayerRecord,
    def: &StoryQuestDef,
    catalog: &Catalog,
) -> Result<(), RpgError> {
    if player.level < def.min_level {
        return Err(RpgError::InsufficientLevel {
            required: def.min_level,
        });
    }
    for prerequisite in &def.prerequisites {
        if !player.completed_quests.contains(prerequisite) {
            return Err(RpgError::NotFound(format!(
                "prerequisite quest not completed: {prerequisite}"
            )));
        }
    }
    if def.required_artifact_sets > 0
        && inventory::complete_set_count(player, catalog) < def.required_artifact_sets
    {
        return Err(RpgError::InvariantViolation(format!(
            "requires {} complete artifact sets",
            def.required_artifact_sets
        )));
    }
    Ok(())
}

/// Accept a story quest. Story quests have no slot cap, but the same quest
/// cannot be taken twice or retaken after completion.
pub fn accept_story(
    player: &mut PlayerRecord,
    def: &StoryQuestDef,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<QuestInstance, RpgError> {
    if player.completed_quests.contains(&def.name)
        || player.active_quests.iter().any(|q| q.template == def.key)
    {
        return Err(RpgError::SlotOccupied);
    }
    meets_requirements(player, def, catalog)?;
    let quest = QuestInstance {
        id: Uuid::new_v4(),
        kind: QuestKind::Story,
        template: def.key.clone(),
        name: def.name.clone(),
        description: def.description.clone(),
        difficulty: crate::rpg::types::Difficulty::Hard,
        target: def.objectives.len().max(1) as u64,
        progress: 0,
        rewards: def.rewards.scaled(QuestKind::Story.reward_multiplier()),
        objectives: def.objectives.clone(),
        expires_at: None,
        created_at: now,
        completed: false,
        completed_at: None,
    };
    player.active_quests.push(quest.clone());
    Ok(quest)
}

/// Drop expired, incomplete quests. They are removed, not completed.
/// Returns the removed quest names.
pub fn expire_stale(player: &mut PlayerRecord, now: DateTime<Utc>) -> Vec<String> {
    let mut removed = Vec::new();
    player.active_quests.retain(|quest| {
        if quest.is_expired(now) {
            debug!("expiring quest {} for {}", quest.name, player.user_id);
            removed.push(quest.name.clone());
            false
        } else {
            true
        }
    });
    removed
}

/// Which objective kind (and optional concrete target) an event advances.
fn event_objective(event: &PlayerEvent) -> Option<(ObjectiveKind, Option<&str>, u64)> {
    match event {
        PlayerEvent::MonsterKilled { monster, .. } => {
            Some((ObjectiveKind::KillMonsters, Some(monster.as_str()), 1))
        }
        PlayerEvent::ItemCollected { item_key, qty } => {
            Some((ObjectiveKind::CollectItems, Some(item_key.as_str()), *qty as u64))
        }
        PlayerEvent::DungeonCompleted { dungeon } => {
            Some((ObjectiveKind::CompleteDungeons, Some(dungeon.as_str()), 1))
        }
        PlayerEvent::PvpWon => Some((ObjectiveKind::WinPvp, None, 1)),
        PlayerEvent::CheeseConsumed { qty } => {
            Some((ObjectiveKind::ConsumeCheese, None, *qty as u64))
        }
        PlayerEvent::AdventureCompleted => Some((ObjectiveKind::CompleteAdventures, None, 1)),
        PlayerEvent::LocationVisited { location } => {
            Some((ObjectiveKind::VisitLocation, Some(location.as_str()), 1))
        }
        PlayerEvent::WorkCompleted
        | PlayerEvent::DamageTaken { .. }
        | PlayerEvent::XpGained { .. } => None,
    }
}

/// Advance quest progress for one event and complete whatever crosses the
/// line. Expired quests are swept first. Completed quests move to
/// `completed_quests` and their rewards land in the bundle.
pub fn apply_event(
    player: &mut PlayerRecord,
    event: &PlayerEvent,
    catalog: &Catalog,
    now: DateTime<Utc>,
    bundle: &mut ResultBundle,
) -> Vec<QuestInstance> {
    expire_stale(player, now);

    let Some((objective_kind, event_target, amount)) = event_objective(event) else {
        return Vec::new();
    };

    let mut completed_indices = Vec::new();
    for (index, quest) in player.active_quests.iter_mut().enumerate() {
        if quest.objectives.is_empty() {
            // Template quest: match on the template's objective kind.
            let template_matches = catalog
                .quest_template(&quest.template)
                .map(|t| t.objective == objective_kind)
                .unwrap_or(false);
            if template_matches {
                quest.progress = quest.progress.saturating_add(amount).min(quest.target);
            }
        } else {
            // Story quest: advance each matching objective, honoring
            // concrete targets where declared.
            for objective in &mut quest.objectives {
                if objective.objective != objective_kind {
                    continue;
                }
                let target_ok = match (&objective.target, event_target) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    (Some(_), None) => false,
                    (None, _) => true,
                };
                if target_ok {
                    objective.increment(amount);
                }
            }
            quest.progress = quest.objectives.iter().filter(|o| o.is_complete()).count() as u64;
        }
        if quest.objectives_met() {
            completed_indices.push(index);
        }
    }

    let mut completed = Vec::new();
    // Walk back to front so removal indexes stay valid.
    for index in completed_indices.into_iter().rev() {
        let mut quest = player.active_quests.remove(index);
        quest.completed = true;
        quest.completed_at = Some(now);
        quest.progress = quest.target;
        apply_rewards(player, &quest.rewards.clone(), catalog, bundle);
        player.completed_quests.insert(quest.name.clone());
        player.counters.bump(CounterKind::QuestsCompleted, 1);
        bundle.quests_completed.push(quest.name.clone());
        completed.push(quest);
    }
    completed.reverse();
    completed
}

/// Shared reward application for quests and achievements: gold, xp plus
/// level ups, items, titles, class unlocks, luck adjustments.
pub fn apply_rewards(
    player: &mut PlayerRecord,
    rewards: &QuestRewards,
    catalog: &Catalog,
    bundle: &mut ResultBundle,
) {
    if rewards.gold > 0 {
        economy::credit(player, rewards.gold);
        bundle.gold_delta += rewards.gold as i64;
    }
    if rewards.xp > 0 {
        let level_ups = stats::apply_xp(player, rewards.xp);
        bundle.xp_delta += rewards.xp;
        if level_ups > 0 {
            bundle.level_ups += level_ups;
            stats::recompute_derived(player, catalog);
        }
    }
    for (item_key, qty) in &rewards.items {
        inventory::add_item(player, item_key, *qty);
        bundle.items_added.push((item_key.clone(), *qty));
    }
    for title in &rewards.titles {
        if player.titles.insert(title.clone()) && player.title.is_none() {
            player.title = Some(title.clone());
        }
    }
    if let Some(class) = rewards.unlock_class {
        if player.unlocked_hidden_classes.insert(class) {
            bundle.classes_unlocked.push(class);
        }
    }
    if rewards.luck != 0 {
        luck::adjust_luck(player, rewards.luck);
    }
}
