//! Luck ladder and the centralized randomness service.
//!
//! Every gameplay draw goes through [`LuckService`] so a seeded source can be
//! injected for deterministic tests. Luck is non-negative biased: positive
//! luck amplifies rewards and rare-event odds, negative luck does the
//! inverse, and neutral operations are unaffected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::rpg::types::{LuckLevel, LuckStatus, PlayerRecord, LUCK_MAX, LUCK_MIN};

/// Fixed ladder mapping luck-point bands onto levels and bonus percents.
/// 500 points lands in Blessed (+25%).
const LUCK_LADDER: [(i32, LuckLevel, i32); 6] = [
    (LUCK_MIN, LuckLevel::Cursed, -25),
    (-499, LuckLevel::Unlucky, -10),
    (-99, LuckLevel::Normal, 0),
    (100, LuckLevel::Lucky, 10),
    (500, LuckLevel::Blessed, 25),
    (2000, LuckLevel::Divine, 50),
];

/// Resolve a player's luck level and bonus percent from their points.
pub fn luck_status(player: &PlayerRecord) -> LuckStatus {
    let points = player.luck_points.clamp(LUCK_MIN, LUCK_MAX);
    let mut level = LuckLevel::Cursed;
    let mut bonus_percent = -25;
    for (threshold, ladder_level, ladder_bonus) in LUCK_LADDER {
        if points >= threshold {
            level = ladder_level;
            bonus_percent = ladder_bonus;
        }
    }
    LuckStatus {
        level,
        points,
        bonus_percent,
    }
}

/// Nightly decay: positive luck bleeds off at 5% per day, negative luck is
/// kept (the player has to earn their way out). Returns true when points
/// changed.
pub fn decay_daily(player: &mut PlayerRecord) -> bool {
    if player.luck_points > 0 {
        let decayed = (player.luck_points as f64 * 0.95).floor() as i32;
        if decayed != player.luck_points {
            player.luck_points = decayed;
            return true;
        }
    }
    false
}

/// Adjust luck points, clamped into the allowed band.
pub fn adjust_luck(player: &mut PlayerRecord, delta: i32) {
    player.luck_points = player.luck_points.saturating_add(delta).clamp(LUCK_MIN, LUCK_MAX);
}

/// Centralized RNG. Holds a seedable generator behind a mutex so the engine
/// can share one service across mutators.
pub struct LuckService {
    rng: Mutex<StdRng>,
}

impl LuckService {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic service for tests and replayable sims.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// True with probability `p` scaled by the player's luck bonus and
    /// clamped into [0, 1].
    pub fn chance(&self, player: &PlayerRecord, p: f64) -> bool {
        let bonus = luck_status(player).bonus_percent as f64 / 100.0;
        let scaled = (p * (1.0 + bonus)).clamp(0.0, 1.0);
        self.raw_chance(scaled)
    }

    /// Luck-free probability roll for neutral operations.
    pub fn raw_chance(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        let mut rng = self.rng.lock().expect("rng lock");
        rng.gen_bool(p)
    }

    /// Uniform draw from an inclusive range.
    pub fn roll_range(&self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        let mut rng = self.rng.lock().expect("rng lock");
        rng.gen_range(min..=max)
    }

    /// Standard weighted pick. Luck is applied externally by reweighting
    /// where a draw should be biased.
    pub fn weighted<'a, T>(&self, items: &'a [T], weight_fn: impl Fn(&T) -> u32) -> Option<&'a T> {
        let total: u64 = items.iter().map(|i| weight_fn(i) as u64).sum();
        if total == 0 {
            return None;
        }
        let mut roll = {
            let mut rng = self.rng.lock().expect("rng lock");
            rng.gen_range(0..total)
        };
        for item in items {
            let w = weight_fn(item) as u64;
            if roll < w {
                return Some(item);
            }
            roll -= w;
        }
        items.last()
    }

    /// Critical-hit roll: the base probability scaled by luck.
    pub fn critical(&self, player: &PlayerRecord, base_p: f64) -> bool {
        self.chance(player, base_p)
    }
}

/// Multiply every value in a loot map by the player's luck bonus, flooring,
/// with a minimum of 1 per surviving entry.
pub fn loot_scale(player: &PlayerRecord, base: &BTreeMap<String, u64>) -> BTreeMap<String, u64> {
    let bonus = luck_status(player).bonus_percent as f64 / 100.0;
    base.iter()
        .map(|(key, &value)| {
            let scaled = ((value as f64) * (1.0 + bonus)).floor() as u64;
            (key.clone(), scaled.max(1))
        })
        .collect()
}

/// Scale a single reward amount by luck, flooring, minimum 1 when the base
/// was nonzero.
pub fn scale_amount(player: &PlayerRecord, base: u64) -> u64 {
    if base == 0 {
        return 0;
    }
    let bonus = luck_status(player).bonus_percent as f64 / 100.0;
    (((base as f64) * (1.0 + bonus)).floor() as u64).max(1)
}
