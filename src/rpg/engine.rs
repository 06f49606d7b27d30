//! The engine facade: the async inward contract collaborators call.
//!
//! Every operation that changes player state runs as exactly one
//! transactional mutator and returns a [`ResultBundle`] describing what
//! changed. Read-only operations take lock-free snapshots and may observe
//! slightly stale state.

use std::sync::Arc;

use chrono::Duration;
use log::{debug, info};

use crate::config::Config;
use crate::logutil::escape_log;
use crate::rpg::achievements;
use crate::rpg::catalog::Catalog;
use crate::rpg::clock::{Clock, SystemClock};
use crate::rpg::combat::{self, CombatRegistry, CombatTuning};
use crate::rpg::economy;
use crate::rpg::errors::RpgError;
use crate::rpg::inventory;
use crate::rpg::luck::{self, LuckService};
use crate::rpg::profile::ProfileStore;
use crate::rpg::quests;
use crate::rpg::seed_loader;
use crate::rpg::stats;
use crate::rpg::storage::RpgStore;
use crate::rpg::types::{
    AchievementView, CombatAction, CombatToken, CooldownKey, CounterKind, EquipSlot, GuildRecord,
    LuckStatus, PlayerAlias, PlayerEvent, PlayerRecord, QuestInstance, QuestKind, ResultBundle,
    StatKind, TurnResult,
};

pub struct RpgEngine {
    config: Config,
    store: Arc<RpgStore>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    luck: Arc<LuckService>,
    profiles: ProfileStore,
    combat: CombatRegistry,
    tuning: CombatTuning,
}

impl RpgEngine {
    /// Open the engine against the configured data directory, loading seed
    /// catalogs when a seeds directory is configured.
    pub fn open(config: Config) -> Result<Self, RpgError> {
        let store = Arc::new(RpgStore::open(&config.storage.data_dir)?);
        let catalog = Arc::new(match &config.storage.seeds_dir {
            Some(dir) => seed_loader::load_catalog(dir)?,
            None => Catalog::with_defaults(),
        });
        Ok(Self::with_parts(
            config,
            store,
            catalog,
            Arc::new(SystemClock),
            LuckService::from_entropy(),
        ))
    }

    /// Assemble an engine from injected parts; tests pin the clock and seed
    /// the randomness here.
    pub fn with_parts(
        config: Config,
        store: Arc<RpgStore>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        luck: LuckService,
    ) -> Self {
        let profiles = ProfileStore::new(
            store.clone(),
            catalog.clone(),
            clock.clone(),
            config.mutator_budget(),
        );
        let tuning = CombatTuning {
            defeat_penalty_percent: config.combat.defeat_penalty_percent,
            flee_chance: config.combat.flee_chance,
        };
        Self {
            config,
            store,
            catalog,
            clock,
            luck: Arc::new(luck),
            profiles,
            combat: CombatRegistry::new(),
            tuning,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Idempotent create-if-absent.
    pub async fn ensure(&self, user_id: &str) -> Result<PlayerRecord, RpgError> {
        self.profiles.ensure(user_id).await
    }

    /// Lock-free read of the current document; may be slightly stale.
    pub fn snapshot(&self, user_id: &str) -> Result<PlayerRecord, RpgError> {
        self.profiles
            .load(user_id)?
            .ok_or_else(|| RpgError::NotFound(format!("player: {}", escape_log(user_id))))
    }

    /// Full reinitialization with a fresh `created_at`.
    pub async fn reset(&self, user_id: &str) -> Result<PlayerRecord, RpgError> {
        info!("resetting player {}", escape_log(user_id));
        self.profiles.reset(user_id).await
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Apply one player-action event atomically: counters, quest progress,
    /// achievement evaluation, derived-stat diff.
    pub async fn apply_event(
        &self,
        user_id: &str,
        event: PlayerEvent,
    ) -> Result<ResultBundle, RpgError> {
        let catalog = self.catalog.clone();
        let now = self.clock.now();
        let bundle = self
            .profiles
            .mutate(user_id, move |player| {
                let derived_before = player.derived;
                let mut bundle = ResultBundle::default();

                match &event {
                    PlayerEvent::MonsterKilled { monster, boss } => {
                        player.counters.bump(CounterKind::MonstersKilled, 1);
                        if *boss {
                            player.counters.bump(CounterKind::BossesDefeated, 1);
                        }
                        if monster == "plagg_shadow" {
                            player.counters.bump(CounterKind::PlaggShadowsDefeated, 1);
                        }
                    }
                    PlayerEvent::ItemCollected { item_key, qty } => {
                        inventory::add_item(player, item_key, *qty);
                        player.counters.bump(CounterKind::ItemsCollected, *qty as u64);
                        bundle.items_added.push((item_key.clone(), *qty));
                    }
                    PlayerEvent::DungeonCompleted { .. } => {
                        player.counters.bump(CounterKind::DungeonsCompleted, 1);
                    }
                    PlayerEvent::PvpWon => {
                        player.counters.bump(CounterKind::PvpWins, 1);
                    }
                    PlayerEvent::CheeseConsumed { qty } => {
                        player.counters.bump(CounterKind::CheeseConsumed, *qty as u64);
                    }
                    PlayerEvent::AdventureCompleted => {
                        player.counters.bump(CounterKind::AdventuresCompleted, 1);
                    }
                    PlayerEvent::WorkCompleted => {
                        player.counters.bump(CounterKind::WorkCompleted, 1);
                    }
                    PlayerEvent::DamageTaken { amount } => {
                        player.counters.bump(CounterKind::DamageTaken, *amount as u64);
                        player.resources.hp = player.resources.hp.saturating_sub(*amount);
                    }
                    PlayerEvent::LocationVisited { .. } => {
                        player.counters.bump(CounterKind::LocationsVisited, 1);
                    }
                    PlayerEvent::XpGained { amount } => {
                        let level_ups = stats::apply_xp(player, *amount);
                        bundle.xp_delta += amount;
                        if level_ups > 0 {
                            bundle.level_ups += level_ups;
                            stats::recompute_derived(player, &catalog);
                        }
                    }
                }

                stats::prune_expired_buffs(player, &catalog, now);
                quests::apply_event(player, &event, &catalog, now, &mut bundle);
                achievements::evaluate(player, &catalog, &mut bundle);
                bundle.record_derived_changes(&derived_before, &player.derived);
                Ok(bundle)
            })
            .await?;

        if bundle.level_ups > 0 {
            self.refresh_guild(user_id)?;
        }
        Ok(bundle)
    }

    // ------------------------------------------------------------------
    // Stats & equipment
    // ------------------------------------------------------------------

    pub async fn allocate_stat(
        &self,
        user_id: &str,
        stat: StatKind,
        amount: u32,
    ) -> Result<ResultBundle, RpgError> {
        let catalog = self.catalog.clone();
        self.profiles
            .mutate(user_id, move |player| {
                let derived_before = player.derived;
                let mut bundle = ResultBundle::default();
                let consumed = stats::allocate_stat(player, stat, amount, &catalog)?;
                bundle.note(format!("allocated {consumed} points to {stat:?}"));
                bundle.record_derived_changes(&derived_before, &player.derived);
                Ok(bundle)
            })
            .await
    }

    pub async fn equip(
        &self,
        user_id: &str,
        slot: EquipSlot,
        item_key: &str,
    ) -> Result<ResultBundle, RpgError> {
        let catalog = self.catalog.clone();
        let item_key = item_key.to_string();
        self.profiles
            .mutate(user_id, move |player| {
                let derived_before = player.derived;
                let mut bundle = ResultBundle::default();
                inventory::equip(player, slot, &item_key, &catalog)?;
                bundle.record_derived_changes(&derived_before, &player.derived);
                Ok(bundle)
            })
            .await
    }

    pub async fn unequip(&self, user_id: &str, slot: EquipSlot) -> Result<ResultBundle, RpgError> {
        let catalog = self.catalog.clone();
        self.profiles
            .mutate(user_id, move |player| {
                let derived_before = player.derived;
                let mut bundle = ResultBundle::default();
                inventory::unequip(player, slot, &catalog);
                bundle.record_derived_changes(&derived_before, &player.derived);
                Ok(bundle)
            })
            .await
    }

    pub async fn equip_artifact(
        &self,
        user_id: &str,
        position: u8,
        item_key: &str,
    ) -> Result<ResultBundle, RpgError> {
        let catalog = self.catalog.clone();
        let item_key = item_key.to_string();
        self.profiles
            .mutate(user_id, move |player| {
                let derived_before = player.derived;
                let mut bundle = ResultBundle::default();
                inventory::equip_artifact(player, position, &item_key, &catalog)?;
                bundle.record_derived_changes(&derived_before, &player.derived);
                Ok(bundle)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Economy
    // ------------------------------------------------------------------

    pub async fn buy(
        &self,
        user_id: &str,
        item_key: &str,
        qty: u32,
        unit_price: u64,
    ) -> Result<ResultBundle, RpgError> {
        self.catalog.require_item(item_key)?;
        let catalog = self.catalog.clone();
        let item_key = item_key.to_string();
        self.profiles
            .mutate(user_id, move |player| {
                let total = unit_price.saturating_mul(qty as u64);
                economy::debit(player, total)?;
                inventory::add_item(player, &item_key, qty);
                let mut bundle = ResultBundle::default();
                bundle.gold_delta -= total as i64;
                bundle.items_added.push((item_key.clone(), qty));
                achievements::evaluate(player, &catalog, &mut bundle);
                Ok(bundle)
            })
            .await
    }

    pub async fn sell(
        &self,
        user_id: &str,
        item_key: &str,
        qty: u32,
        unit_price: u64,
    ) -> Result<ResultBundle, RpgError> {
        self.catalog.require_item(item_key)?;
        let catalog = self.catalog.clone();
        let item_key = item_key.to_string();
        self.profiles
            .mutate(user_id, move |player| {
                inventory::remove_item(player, &item_key, qty)?;
                let total = unit_price.saturating_mul(qty as u64);
                economy::credit(player, total);
                let mut bundle = ResultBundle::default();
                bundle.gold_delta += total as i64;
                bundle.items_removed.push((item_key.clone(), qty));
                achievements::evaluate(player, &catalog, &mut bundle);
                Ok(bundle)
            })
            .await
    }

    /// Seconds left on an action cooldown; 0 when elapsed or never stamped.
    /// Collaborators gate hunt/work/adventure flows on this.
    pub fn check_cooldown(
        &self,
        user_id: &str,
        key: CooldownKey,
        cooldown_seconds: i64,
    ) -> Result<i64, RpgError> {
        let player = self.snapshot(user_id)?;
        Ok(economy::check_cooldown(&player, key, cooldown_seconds, self.clock.now()))
    }

    /// Record an action's use instant, failing with `OnCooldown` when the
    /// previous use has not elapsed yet.
    pub async fn stamp_cooldown(
        &self,
        user_id: &str,
        key: CooldownKey,
        cooldown_seconds: i64,
    ) -> Result<(), RpgError> {
        let now = self.clock.now();
        self.profiles
            .mutate(user_id, move |player| {
                economy::require_off_cooldown(player, key, cooldown_seconds, now)?;
                economy::stamp_cooldown(player, key, now);
                Ok(())
            })
            .await
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Open a combat session. Exactly one caller wins when two race; the
    /// loser sees `AlreadyInCombat`.
    pub async fn start_combat(
        &self,
        user_id: &str,
        encounter_id: &str,
    ) -> Result<CombatToken, RpgError> {
        let encounter = self.catalog.require_encounter(encounter_id)?.clone();
        let now = self.clock.now();
        let session = self
            .profiles
            .mutate_combat(user_id, move |player| combat::start(player, &encounter, now))
            .await?;
        let token = session.token;
        self.combat.insert(session);
        Ok(token)
    }

    /// Resolve one combat turn. Victory and defeat apply their rewards and
    /// penalties inside the same mutator that resolves the turn.
    pub async fn combat_turn(
        &self,
        token: CombatToken,
        action: CombatAction,
    ) -> Result<TurnResult, RpgError> {
        let mut session = self.combat.take(token)?;
        let encounter = match self.catalog.require_encounter(&session.encounter_key) {
            Ok(def) => def.clone(),
            Err(e) => {
                self.combat.insert(session);
                return Err(e);
            }
        };
        let now = self.clock.now();
        let catalog = self.catalog.clone();
        let rng = self.luck.clone();
        let tuning = self.tuning;
        let user_id = session.user_id.clone();

        let result = self
            .profiles
            .mutate_combat(&user_id, |player| {
                combat::resolve_turn(player, &mut session, &encounter, action, &catalog, &rng, &tuning, now)
            })
            .await;

        match &result {
            Ok(turn) if turn.outcome.is_none() => self.combat.insert(session),
            Ok(turn) => {
                debug!("combat for {} ended: {:?}", escape_log(&user_id), turn.outcome);
                if turn.bundle.as_ref().map(|b| b.level_ups > 0).unwrap_or(false) {
                    self.refresh_guild(&user_id)?;
                }
            }
            // A discarded mutator leaves the session live so the player is
            // not stranded with the flag raised and no session.
            Err(_) => self.combat.insert(session),
        }
        result
    }

    // ------------------------------------------------------------------
    // Quests
    // ------------------------------------------------------------------

    pub async fn generate_daily(&self, user_id: &str) -> Result<QuestInstance, RpgError> {
        self.generate_quest(user_id, QuestKind::Daily).await
    }

    pub async fn generate_weekly(&self, user_id: &str) -> Result<QuestInstance, RpgError> {
        self.generate_quest(user_id, QuestKind::Weekly).await
    }

    async fn generate_quest(
        &self,
        user_id: &str,
        kind: QuestKind,
    ) -> Result<QuestInstance, RpgError> {
        let catalog = self.catalog.clone();
        let rng = self.luck.clone();
        let now = self.clock.now();
        let cap = self.config.engine.active_quest_cap;
        self.profiles
            .mutate(user_id, move |player| {
                quests::expire_stale(player, now);
                quests::generate(player, kind, &catalog, &rng, now, cap)
            })
            .await
    }

    pub async fn accept_story(
        &self,
        user_id: &str,
        quest_key: &str,
    ) -> Result<QuestInstance, RpgError> {
        let def = self
            .catalog
            .story_quest(quest_key)
            .ok_or_else(|| RpgError::UnknownEntry(format!("story quest: {quest_key}")))?
            .clone();
        let catalog = self.catalog.clone();
        let now = self.clock.now();
        self.profiles
            .mutate(user_id, move |player| {
                quests::expire_stale(player, now);
                quests::accept_story(player, &def, &catalog, now)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn list_achievements(&self, user_id: &str) -> Result<Vec<AchievementView>, RpgError> {
        let player = self.snapshot(user_id)?;
        Ok(achievements::views(&player, &self.catalog))
    }

    pub fn luck_status(&self, user_id: &str) -> Result<LuckStatus, RpgError> {
        let player = self.snapshot(user_id)?;
        Ok(luck::luck_status(&player))
    }

    /// Guild leaderboard aliases, highest level first. Empty when no guild
    /// partition is configured.
    pub fn guild_leaderboard(&self) -> Result<Vec<PlayerAlias>, RpgError> {
        let Some(guild_id) = &self.config.engine.guild_id else {
            return Ok(Vec::new());
        };
        let mut aliases = self.store.guild_aliases(guild_id)?;
        aliases.sort_by(|a, b| b.level.cmp(&a.level).then(b.gold.cmp(&a.gold)));
        Ok(aliases)
    }

    // ------------------------------------------------------------------
    // Maintenance sweeps
    // ------------------------------------------------------------------

    /// Clear `in_combat` on players whose last combat event is older than
    /// the configured staleness threshold. Returns how many were cleared.
    pub async fn sweep_stale_combat(&self) -> Result<usize, RpgError> {
        let now = self.clock.now();
        let cutoff = now - Duration::minutes(self.config.combat.staleness_minutes);
        let evicted = self.combat.evict_stale(cutoff);
        if !evicted.is_empty() {
            debug!("evicted {} stale combat sessions", evicted.len());
        }

        let mut cleared = 0;
        for user_id in self.store.list_user_ids()? {
            let Some(player) = self.profiles.load(&user_id)? else {
                continue;
            };
            if !player.in_combat {
                continue;
            }
            let stale = player.last_combat_event.map(|at| at < cutoff).unwrap_or(true);
            if stale {
                self.profiles
                    .mutate_combat(&user_id, |player| {
                        player.in_combat = false;
                        Ok(())
                    })
                    .await?;
                info!("cleared orphaned combat flag for {}", escape_log(&user_id));
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Nightly luck decay across all players. Returns how many changed.
    pub async fn decay_luck_daily(&self) -> Result<usize, RpgError> {
        let mut changed = 0;
        for user_id in self.store.list_user_ids()? {
            let decayed = self
                .profiles
                .mutate(&user_id, |player| Ok(luck::decay_daily(player)))
                .await?;
            if decayed {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Sweep expired quests for all players. Returns how many quests were
    /// removed.
    pub async fn expire_quests(&self) -> Result<usize, RpgError> {
        let now = self.clock.now();
        let mut removed = 0;
        for user_id in self.store.list_user_ids()? {
            let names = self
                .profiles
                .mutate(&user_id, move |player| Ok(quests::expire_stale(player, now)))
                .await?;
            removed += names.len();
        }
        Ok(removed)
    }

    /// Player count in the store, for status reporting.
    pub fn player_count(&self) -> Result<usize, RpgError> {
        Ok(self.store.list_user_ids()?.len())
    }

    fn refresh_guild(&self, user_id: &str) -> Result<(), RpgError> {
        let Some(guild_id) = &self.config.engine.guild_id else {
            return Ok(());
        };
        let Some(player) = self.store.get_player(user_id)? else {
            return Ok(());
        };
        self.store.put_alias(guild_id, &player)?;
        let aliases = self.store.guild_aliases(guild_id)?;
        let now = self.clock.now();
        let mut guild = self
            .store
            .get_guild(guild_id)?
            .unwrap_or_else(|| GuildRecord::new(guild_id, now));
        guild.member_count = aliases.len() as u64;
        guild.total_levels = aliases.iter().map(|a| a.level as u64).sum();
        guild.updated_at = now;
        self.store.put_guild(&guild)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::clock::FixedClock;
    use chrono::Utc;
    use tempfile::TempDir;

    fn engine_with(config: Config, seed: u64) -> (TempDir, Arc<FixedClock>, RpgEngine) {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(RpgStore::open(dir.path()).expect("store"));
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let engine = RpgEngine::with_parts(
            config,
            store,
            Arc::new(Catalog::with_defaults()),
            clock.clone(),
            LuckService::with_seed(seed),
        );
        (dir, clock, engine)
    }

    fn engine() -> (TempDir, Arc<FixedClock>, RpgEngine) {
        engine_with(Config::default(), 11)
    }

    #[tokio::test]
    async fn xp_event_levels_up_without_touching_max_hp() {
        let (_dir, _clock, engine) = engine();
        let before = engine.ensure("alice").await.expect("ensure");
        assert_eq!(before.level, 1);
        let max_hp_before = before.resources.max_hp;

        let bundle = engine
            .apply_event("alice", PlayerEvent::XpGained { amount: 150 })
            .await
            .expect("event");
        assert_eq!(bundle.level_ups, 1);
        assert_eq!(bundle.xp_delta, 150);

        let after = engine.snapshot("alice").expect("snapshot");
        assert_eq!(after.level, 2);
        assert_eq!(after.xp, 50);
        assert_eq!(after.xp_to_next, 115);
        assert_eq!(after.unallocated_points, 2);
        assert_eq!(after.resources.max_hp, max_hp_before);
    }

    #[tokio::test]
    async fn buy_and_sell_move_gold_and_items() {
        let (_dir, _clock, engine) = engine();
        engine.ensure("alice").await.expect("ensure");

        let bundle = engine.buy("alice", "herb", 5, 3).await.expect("buy");
        assert_eq!(bundle.gold_delta, -15);
        let player = engine.snapshot("alice").expect("snapshot");
        assert_eq!(player.gold, 85);
        assert_eq!(player.inventory["herb"], 5);

        let broke = engine.buy("alice", "cataclysm_claw", 1, 850).await;
        assert!(matches!(broke, Err(RpgError::InsufficientGold)));

        let bundle = engine.sell("alice", "herb", 2, 2).await.expect("sell");
        assert_eq!(bundle.gold_delta, 4);
        let player = engine.snapshot("alice").expect("snapshot");
        assert_eq!(player.gold, 89);
        assert_eq!(player.inventory["herb"], 3);

        let short = engine.sell("alice", "herb", 10, 2).await;
        assert!(matches!(short, Err(RpgError::InsufficientItems(_))));
    }

    #[tokio::test]
    async fn stale_combat_sweep_clears_flags() {
        let mut config = Config::default();
        config.combat.staleness_minutes = 30;
        let (_dir, clock, engine) = engine_with(config, 3);
        engine.ensure("alice").await.expect("ensure");

        engine.start_combat("alice", "street_akuma").await.expect("start");
        assert!(engine.snapshot("alice").expect("snapshot").in_combat);

        // Too fresh: nothing to clear.
        assert_eq!(engine.sweep_stale_combat().await.expect("sweep"), 0);
        assert!(engine.snapshot("alice").expect("snapshot").in_combat);

        clock.advance(Duration::minutes(31));
        assert_eq!(engine.sweep_stale_combat().await.expect("sweep"), 1);
        assert!(!engine.snapshot("alice").expect("snapshot").in_combat);
    }

    #[tokio::test]
    async fn guild_alias_refreshes_on_level_up() {
        let mut config = Config::default();
        config.engine.guild_id = Some("guild1".to_string());
        let (_dir, _clock, engine) = engine_with(config, 7);
        engine.ensure("alice").await.expect("ensure");

        assert!(engine.guild_leaderboard().expect("leaderboard").is_empty());

        engine
            .apply_event("alice", PlayerEvent::XpGained { amount: 300 })
            .await
            .expect("event");
        let board = engine.guild_leaderboard().expect("leaderboard");
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, "alice");
        assert!(board[0].level >= 2);
    }

    #[tokio::test]
    async fn snapshot_of_unknown_player_is_not_found() {
        let (_dir, _clock, engine) = engine();
        assert!(matches!(engine.snapshot("nobody"), Err(RpgError::NotFound(_))));
    }
}
