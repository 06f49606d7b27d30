//! Player profile store: ensure/load/save plus the transactional mutator.
//!
//! All writes to one player serialize through a per-player async mutex; a
//! mutator is load-modify-validate-save, and nothing persists unless the
//! post-image satisfies every documented invariant. Cross-player work runs
//! in parallel; read-only snapshots may bypass the lock and tolerate
//! staleness.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::Mutex as AsyncMutex;

use crate::rpg::catalog::Catalog;
use crate::rpg::clock::Clock;
use crate::rpg::errors::RpgError;
use crate::rpg::stats;
use crate::rpg::storage::RpgStore;
use crate::rpg::types::{
    ClassKind, PlayerRecord, LUCK_MAX, LUCK_MIN, MAX_LEVEL,
};

/// Who is performing a mutation. While a player is `in_combat`, only
/// combat-resolver writes may touch resources or inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutatorKind {
    Standard,
    Combat,
}

pub struct ProfileStore {
    store: Arc<RpgStore>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    locks: std::sync::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    mutator_budget: Duration,
}

impl ProfileStore {
    pub fn new(
        store: Arc<RpgStore>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        mutator_budget: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            locks: std::sync::Mutex::new(HashMap::new()),
            mutator_budget,
        }
    }

    fn lock_for(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry");
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn seeded(&self, user_id: &str) -> PlayerRecord {
        let mut player = PlayerRecord::new(user_id, ClassKind::default(), self.clock.now());
        stats::recompute_derived(&mut player, &self.catalog);
        player.resources.hp = player.resources.max_hp;
        player.resources.mana = player.resources.max_mana;
        player
    }

    /// Idempotent create-if-absent, returning the stored document.
    pub async fn ensure(&self, user_id: &str) -> Result<PlayerRecord, RpgError> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;
        if let Some(existing) = self.store.get_player(user_id)? {
            return Ok(existing);
        }
        let player = self.seeded(user_id);
        self.store.put_player(&player)?;
        Ok(player)
    }

    /// Lock-free read; may observe a stale snapshot.
    pub fn load(&self, user_id: &str) -> Result<Option<PlayerRecord>, RpgError> {
        self.store.get_player(user_id)
    }

    /// Full reinitialization: same user id, fresh `created_at`, defaults.
    pub async fn reset(&self, user_id: &str) -> Result<PlayerRecord, RpgError> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;
        let player = self.seeded(user_id);
        self.store.put_player(&player)?;
        Ok(player)
    }

    /// The transactional mutator: load (ensuring existence), run `f` on a
    /// working copy, validate the transition, persist, return `f`'s output.
    /// On any error the persisted document is untouched.
    pub async fn mutate<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut PlayerRecord) -> Result<T, RpgError>,
    ) -> Result<T, RpgError> {
        self.mutate_as(user_id, MutatorKind::Standard, f).await
    }

    /// Combat-resolver entry point; exempt from the in-combat write fence.
    pub async fn mutate_combat<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut PlayerRecord) -> Result<T, RpgError>,
    ) -> Result<T, RpgError> {
        self.mutate_as(user_id, MutatorKind::Combat, f).await
    }

    async fn mutate_as<T>(
        &self,
        user_id: &str,
        kind: MutatorKind,
        f: impl FnOnce(&mut PlayerRecord) -> Result<T, RpgError>,
    ) -> Result<T, RpgError> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let pre = match self.store.get_player(user_id)? {
            Some(existing) => existing,
            None => self.seeded(user_id),
        };

        let mut post = pre.clone();
        let started = Instant::now();
        let output = f(&mut post)?;
        if started.elapsed() > self.mutator_budget {
            warn!("mutator for {user_id} exceeded its budget, discarding");
            return Err(RpgError::Timeout);
        }

        if let Err(violation) = validate_transition(&pre, &post, kind, &self.catalog) {
            warn!("mutator for {user_id} violated an invariant: {violation}");
            return Err(RpgError::InvariantViolation(violation));
        }

        post.touch(self.clock.now());
        self.store.put_player(&post)?;
        Ok(output)
    }
}

/// Check every documented invariant of the player document, plus the
/// transition rules that need the pre-image (counter monotonicity, the
/// in-combat write fence).
pub fn validate_transition(
    pre: &PlayerRecord,
    post: &PlayerRecord,
    kind: MutatorKind,
    catalog: &Catalog,
) -> Result<(), String> {
    // Progression bounds.
    if post.level < 1 || post.level > MAX_LEVEL {
        return Err(format!("level {} out of range", post.level));
    }
    if post.xp_to_next == 0 || post.xp >= post.xp_to_next {
        return Err(format!("xp {} not below xp_to_next {}", post.xp, post.xp_to_next));
    }
    if !post.primary.in_range() {
        return Err("primary stat out of range".into());
    }

    // Resource bounds.
    let r = &post.resources;
    let bounded = [
        ("hp", r.hp, r.max_hp),
        ("mana", r.mana, r.max_mana),
        ("stamina", r.stamina, r.max_stamina),
        ("sp", r.sp, r.max_sp),
        ("miraculous_energy", r.miraculous_energy, r.max_miraculous_energy),
        ("ultimate_energy", r.ultimate_energy, post.derived.max_ultimate_energy),
    ];
    for (name, value, max) in bounded {
        if value > max {
            return Err(format!("{name} {value} exceeds max {max}"));
        }
    }

    // Luck band (gold is unsigned by construction).
    if post.luck_points < LUCK_MIN || post.luck_points > LUCK_MAX {
        return Err(format!("luck_points {} out of band", post.luck_points));
    }

    // Counters never regress.
    for counter in crate::rpg::types::ALL_COUNTERS {
        if post.counters.get(counter) < pre.counters.get(counter) {
            return Err(format!("counter {counter:?} regressed"));
        }
    }

    // Inventory counts are at least 1 while present.
    if post.inventory.values().any(|&count| count == 0) {
        return Err("inventory holds a zero-count entry".into());
    }

    // Quest progress bounds and completion bookkeeping.
    for quest in &post.active_quests {
        if quest.target == 0 {
            return Err(format!("quest {} has zero target", quest.name));
        }
        if quest.progress > quest.target {
            return Err(format!("quest {} progress past target", quest.name));
        }
        if quest.completed {
            return Err(format!("completed quest {} still active", quest.name));
        }
    }

    // Completed achievements are actually satisfied.
    for key in &post.completed_achievements {
        if let Some(def) = catalog.achievement(key) {
            for (&counter, &threshold) in &def.requirement {
                if post.counters.get(counter) < threshold {
                    return Err(format!("achievement {key} requirement not met"));
                }
            }
        }
    }

    // Every unlocked hidden class traces back to a completed achievement.
    for def in catalog.hidden_classes() {
        if post.unlocked_hidden_classes.contains(&def.class)
            && !post.completed_achievements.contains(&def.unlock_requirement)
        {
            return Err(format!("class {:?} unlocked without its achievement", def.class));
        }
    }

    // In-combat write fence for non-combat mutators.
    if pre.in_combat && kind == MutatorKind::Standard {
        if pre.resources != post.resources {
            return Err("resources mutated outside combat resolver during combat".into());
        }
        if pre.inventory != post.inventory {
            return Err("inventory mutated outside combat resolver during combat".into());
        }
    }

    Ok(())
}
