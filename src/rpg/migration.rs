//! Schema migration for persisted player documents.
//!
//! Records track their `schema_version`; loads upgrade old versions in place
//! and the storage layer persists the result, so a document is migrated at
//! most once. Missing fields are filled by serde defaults during decode;
//! this module handles the semantic fixups a default cannot express.

use anyhow::{anyhow, Result};
use log::info;

use crate::rpg::stats;
use crate::rpg::types::{PlayerRecord, LUCK_MAX, LUCK_MIN, MAX_LEVEL, PLAYER_SCHEMA_VERSION};

/// Trait for record types that support schema migration.
pub trait Migratable: Sized {
    fn current_schema_version() -> u8;
    fn schema_version(&self) -> u8;
    fn migrate(self) -> Result<Self>;

    fn needs_migration(&self) -> bool {
        self.schema_version() < Self::current_schema_version()
    }
}

impl Migratable for PlayerRecord {
    fn current_schema_version() -> u8 {
        PLAYER_SCHEMA_VERSION
    }

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn migrate(self) -> Result<Self> {
        let mut record = self;
        while record.schema_version < PLAYER_SCHEMA_VERSION {
            record = match record.schema_version {
                1 => migrate_player_v1_to_v2(record),
                other => {
                    return Err(anyhow!(
                        "player {} has unknown schema version {other}",
                        record.user_id
                    ))
                }
            };
        }
        Ok(record)
    }
}

pub fn player_needs_migration(record: &PlayerRecord) -> bool {
    record.needs_migration()
}

pub fn migrate_player(record: PlayerRecord) -> Result<PlayerRecord> {
    let from = record.schema_version;
    let user_id = record.user_id.clone();
    let migrated = record.migrate()?;
    info!(
        "migrated player {user_id} schema v{from} -> v{}",
        migrated.schema_version
    );
    Ok(migrated)
}

/// v1 documents used the flat `1000 * level` xp curve and predate the luck
/// band clamp. Re-anchor the curve (preserving the xp fraction already
/// earned toward the next level) and clamp out-of-band values.
fn migrate_player_v1_to_v2(mut record: PlayerRecord) -> PlayerRecord {
    record.level = record.level.clamp(1, MAX_LEVEL);

    let old_needed = record.xp_to_next.max(1);
    let fraction = record.xp.min(old_needed - 1) as f64 / old_needed as f64;
    record.xp_to_next = stats::xp_to_next(record.level);
    record.xp = (fraction * record.xp_to_next as f64).floor() as u64;

    record.luck_points = record.luck_points.clamp(LUCK_MIN, LUCK_MAX);
    record.schema_version = 2;
    record
}
