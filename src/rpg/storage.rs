use std::path::{Path, PathBuf};

use log::info;
use sled::IVec;

use crate::rpg::errors::RpgError;
use crate::rpg::migration;
use crate::rpg::types::{GuildRecord, PlayerAlias, PlayerRecord, ALIAS_SCHEMA_VERSION};

const TREE_PLAYERS: &str = "rpg_players";
const TREE_GUILDS: &str = "rpg_guilds";

/// Canonical player key. A legacy `rpg_player_<id>` layout is adopted into
/// this one on first read.
fn player_key(user_id: &str) -> Vec<u8> {
    format!("user_rpg_{user_id}").into_bytes()
}

fn legacy_player_key(user_id: &str) -> Vec<u8> {
    format!("rpg_player_{user_id}").into_bytes()
}

fn guild_key(guild_id: &str) -> Vec<u8> {
    format!("guild_rpg_{guild_id}").into_bytes()
}

fn alias_key(guild_id: &str, user_id: &str) -> Vec<u8> {
    format!("player_{guild_id}_{user_id}").into_bytes()
}

/// Helper builder so tests can easily create throwaway stores with custom
/// paths.
pub struct RpgStoreBuilder {
    path: PathBuf,
}

impl RpgStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<RpgStore, RpgError> {
        RpgStore::open(self.path)
    }
}

/// Sled-backed persistence for player documents and guild aggregates.
pub struct RpgStore {
    _db: sled::Db,
    players: sled::Tree,
    guilds: sled::Tree,
}

impl RpgStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RpgError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let guilds = db.open_tree(TREE_GUILDS)?;
        Ok(Self {
            _db: db,
            players,
            guilds,
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, RpgError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, RpgError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a player document.
    pub fn put_player(&self, player: &PlayerRecord) -> Result<(), RpgError> {
        let key = player_key(&player.user_id);
        let bytes = Self::serialize(player)?;
        self.players.insert(key, bytes)?;
        self.players.flush()?;
        Ok(())
    }

    /// Fetch a player document, migrating old schemas and adopting the
    /// legacy key layout on the way.
    pub fn get_player(&self, user_id: &str) -> Result<Option<PlayerRecord>, RpgError> {
        let key = player_key(user_id);
        if let Some(bytes) = self.players.get(&key)? {
            let record: PlayerRecord = Self::deserialize(bytes)?;
            return Ok(Some(self.upgraded(record)?));
        }

        // Legacy layout: re-key in place, then drop the old entry.
        let legacy = legacy_player_key(user_id);
        if let Some(bytes) = self.players.get(&legacy)? {
            let record: PlayerRecord = Self::deserialize(bytes)?;
            let record = self.upgraded(record)?;
            info!("adopting legacy key layout for player {user_id}");
            self.players.insert(key, Self::serialize(&record)?)?;
            self.players.remove(legacy)?;
            self.players.flush()?;
            return Ok(Some(record));
        }

        Ok(None)
    }

    fn upgraded(&self, record: PlayerRecord) -> Result<PlayerRecord, RpgError> {
        if migration::player_needs_migration(&record) {
            let upgraded = migration::migrate_player(record)
                .map_err(|e| RpgError::InvariantViolation(format!("migration failed: {e}")))?;
            self.put_player(&upgraded)?;
            return Ok(upgraded);
        }
        Ok(record)
    }

    pub fn delete_player(&self, user_id: &str) -> Result<(), RpgError> {
        self.players.remove(player_key(user_id))?;
        self.players.remove(legacy_player_key(user_id))?;
        self.players.flush()?;
        Ok(())
    }

    /// List all user ids with a canonical player document.
    pub fn list_user_ids(&self) -> Result<Vec<String>, RpgError> {
        let mut ids = Vec::new();
        for entry in self.players.scan_prefix(b"user_rpg_") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(user_id) = text.strip_prefix("user_rpg_") {
                ids.push(user_id.to_string());
            }
        }
        Ok(ids)
    }

    /// Insert or update a guild aggregate.
    pub fn put_guild(&self, guild: &GuildRecord) -> Result<(), RpgError> {
        let key = guild_key(&guild.guild_id);
        self.guilds.insert(key, Self::serialize(guild)?)?;
        self.guilds.flush()?;
        Ok(())
    }

    pub fn get_guild(&self, guild_id: &str) -> Result<Option<GuildRecord>, RpgError> {
        let Some(bytes) = self.guilds.get(guild_key(guild_id))? else {
            return Ok(None);
        };
        Ok(Some(Self::deserialize(bytes)?))
    }

    /// Refresh the guild-scoped leaderboard alias for a player.
    pub fn put_alias(&self, guild_id: &str, player: &PlayerRecord) -> Result<(), RpgError> {
        let alias = PlayerAlias {
            user_id: player.user_id.clone(),
            level: player.level,
            gold: player.gold,
            updated_at: player.updated_at,
            schema_version: ALIAS_SCHEMA_VERSION,
        };
        self.guilds
            .insert(alias_key(guild_id, &player.user_id), Self::serialize(&alias)?)?;
        self.guilds.flush()?;
        Ok(())
    }

    /// All leaderboard aliases for one guild, unsorted.
    pub fn guild_aliases(&self, guild_id: &str) -> Result<Vec<PlayerAlias>, RpgError> {
        let prefix = format!("player_{guild_id}_");
        let mut aliases = Vec::new();
        for entry in self.guilds.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            aliases.push(Self::deserialize(bytes)?);
        }
        Ok(aliases)
    }

    /// Raw prefix scan over player-tree keys, for maintenance tooling.
    pub fn keys_prefix(&self, prefix: &str) -> Result<Vec<String>, RpgError> {
        let mut keys = Vec::new();
        for entry in self.players.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::types::{ClassKind, PLAYER_SCHEMA_VERSION};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn player_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let store = RpgStoreBuilder::new(dir.path()).open().expect("store");
        let mut player = PlayerRecord::new("alice", ClassKind::Rogue, Utc::now());
        player.gold = 42;
        store.put_player(&player).expect("put");
        let fetched = store.get_player("alice").expect("get").expect("present");
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.gold, 42);
        assert_eq!(fetched.schema_version, PLAYER_SCHEMA_VERSION);
    }

    #[test]
    fn missing_player_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let store = RpgStoreBuilder::new(dir.path()).open().expect("store");
        assert!(store.get_player("nobody").expect("get").is_none());
    }

    #[test]
    fn legacy_key_is_adopted_on_read() {
        let dir = TempDir::new().expect("tempdir");
        let store = RpgStoreBuilder::new(dir.path()).open().expect("store");
        let player = PlayerRecord::new("bob", ClassKind::Warrior, Utc::now());

        // Simulate an old deployment writing the legacy layout directly.
        let bytes = bincode::serialize(&player).expect("encode");
        store.players.insert(b"rpg_player_bob".to_vec(), bytes).expect("insert");

        let fetched = store.get_player("bob").expect("get").expect("present");
        assert_eq!(fetched.user_id, "bob");
        // Old key gone, canonical key present.
        assert!(store.players.get(b"rpg_player_bob").expect("get").is_none());
        assert!(store.players.get(b"user_rpg_bob").expect("get").is_some());
    }

    #[test]
    fn guild_alias_scan() {
        let dir = TempDir::new().expect("tempdir");
        let store = RpgStoreBuilder::new(dir.path()).open().expect("store");
        for (user, level) in [("alice", 12), ("bob", 7)] {
            let mut player = PlayerRecord::new(user, ClassKind::Mage, Utc::now());
            player.level = level;
            store.put_alias("guild1", &player).expect("alias");
        }
        let mut aliases = store.guild_aliases("guild1").expect("scan");
        aliases.sort_by_key(|a| a.user_id.clone());
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[0].level, 12);

        assert!(store.guild_aliases("guild2").expect("scan").is_empty());
    }

    #[test]
    fn list_user_ids_skips_legacy_entries() {
        let dir = TempDir::new().expect("tempdir");
        let store = RpgStoreBuilder::new(dir.path()).open().expect("store");
        let player = PlayerRecord::new("carol", ClassKind::Healer, Utc::now());
        store.put_player(&player).expect("put");
        let ids = store.list_user_ids().expect("list");
        assert_eq!(ids, vec!["carol".to_string()]);
    }
}
