//! Shared test harness: an engine over a throwaway store with a pinned
//! clock and seeded randomness.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use kwamirpg::config::Config;
use kwamirpg::rpg::{Catalog, FixedClock, LuckService, RpgEngine, RpgStore};
use tempfile::TempDir;

pub fn engine() -> (TempDir, Arc<FixedClock>, RpgEngine) {
    engine_with(Config::default(), 11)
}

pub fn engine_with(config: Config, seed: u64) -> (TempDir, Arc<FixedClock>, RpgEngine) {
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
