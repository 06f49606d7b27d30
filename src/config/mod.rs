//! Engine configuration.
//!
//! TOML-backed configuration with defaults, validation and async load/save.
//! The collaborators (gateway, command parser, renderers) carry their own
//! config; everything here tunes the engine core only.
//!
//! ```toml
//! [storage]
//! data_dir = "data/rpg"
//!
//! [engine]
//! mutator_budget_ms = 2000
//!
//! [combat]
//! staleness_minutes = 30
//! defeat_penalty_percent = 10
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the sled store.
    pub data_dir: String,
    /// Optional directory of JSON seed files overriding the built-in
    /// catalogs. Missing files fall back per table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/rpg".to_string(),
            seeds_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock budget for one mutator closure, in milliseconds. A
    /// mutator past the budget fails with `Timeout` and is discarded.
    #[serde(default = "default_mutator_budget_ms")]
    pub mutator_budget_ms: u64,
    /// Cap on a player's simultaneously active quests.
    #[serde(default = "default_active_quest_cap")]
    pub active_quest_cap: usize,
    /// Optional guild partition. When set, level ups refresh the
    /// guild-scoped leaderboard alias records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

fn default_mutator_budget_ms() -> u64 {
    2000
}

fn default_active_quest_cap() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mutator_budget_ms: default_mutator_budget_ms(),
            active_quest_cap: default_active_quest_cap(),
            guild_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Minutes after the last combat event before a session counts as
    /// orphaned and the reconciliation sweep clears `in_combat`.
    #[serde(default = "default_staleness_minutes")]
    pub staleness_minutes: i64,
    /// Fraction of gold lost on defeat, as a percentage.
    #[serde(default = "default_defeat_penalty_percent")]
    pub defeat_penalty_percent: u32,
    /// Base probability a flee attempt succeeds, before luck scaling.
    #[serde(default = "default_flee_chance")]
    pub flee_chance: f64,
}

fn default_staleness_minutes() -> i64 {
    30
}

fn default_defeat_penalty_percent() -> u32 {
    10
}

fn default_flee_chance() -> f64 {
    0.66
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            staleness_minutes: default_staleness_minutes(),
            defeat_penalty_percent: default_defeat_penalty_percent(),
            flee_chance: default_flee_chance(),
        }
    }
}

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub combat: CombatConfig,
}

impl Config {
    /// Load and validate a configuration file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("failed to read config file {path}: {e}"))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| anyhow!("failed to parse config file {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file.
    pub async fn create_default(path: &str) -> Result<Self> {
        let config = Config::default();
        config.save(path).await?;
        Ok(config)
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .await
            .map_err(|e| anyhow!("failed to write config file {path}: {e}"))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir cannot be empty"));
        }
        if self.engine.mutator_budget_ms == 0 {
            return Err(anyhow!("engine.mutator_budget_ms must be positive"));
        }
        if self.engine.active_quest_cap < 2 {
            // The daily and weekly slots alone need two entries.
            return Err(anyhow!("engine.active_quest_cap must be at least 2"));
        }
        if self.combat.staleness_minutes <= 0 {
            return Err(anyhow!("combat.staleness_minutes must be positive"));
        }
        if self.combat.defeat_penalty_percent > 100 {
            return Err(anyhow!("combat.defeat_penalty_percent must be at most 100"));
        }
        if !(0.0..=1.0).contains(&self.combat.flee_chance) {
            return Err(anyhow!("combat.flee_chance must be within [0, 1]"));
        }
        Ok(())
    }

    pub fn mutator_budget(&self) -> Duration {
        Duration::from_millis(self.engine.mutator_budget_ms)
    }
}
