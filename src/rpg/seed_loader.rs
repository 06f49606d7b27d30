//! Seed loaders for data-driven catalog content.
//!
//! Catalogs ship with built-in defaults; operators can override any table by
//! dropping a JSON file into the seeds directory. Missing files fall back to
//! the compiled defaults, so a partial override set is fine.
//!
//! Expected files: `items.json`, `artifact_sets.json`, `achievements.json`,
//! `hidden_classes.json`, `quest_templates.json`, `story_quests.json`,
//! `encounters.json`.

use std::fs;
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;

use crate::rpg::catalog::{self, Catalog};
use crate::rpg::errors::RpgError;

fn load_table<T: DeserializeOwned, P: AsRef<Path>>(
    dir: P,
    file: &str,
    fallback: impl FnOnce() -> Vec<T>,
) -> Result<Vec<T>, RpgError> {
    let path = dir.as_ref().join(file);
    if !path.exists() {
        return Ok(fallback());
    }
    let contents = fs::read_to_string(&path)?;
    let entries: Vec<T> = serde_json::from_str(&contents).map_err(|e| {
        RpgError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("failed to parse {}: {e}", path.display()),
        ))
    })?;
    info!("loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Build a catalog from a seeds directory, falling back to the compiled
/// defaults table-by-table.
pub fn load_catalog<P: AsRef<Path>>(seeds_dir: P) -> Result<Catalog, RpgError> {
    let dir = seeds_dir.as_ref();
    Ok(Catalog::from_parts(
        load_table(dir, "items.json", catalog::default_items)?,
        load_table(dir, "artifact_sets.json", catalog::default_artifact_sets)?,
        load_table(dir, "achievements.json", catalog::default_achievements)?,
        load_table(dir, "hidden_classes.json", catalog::default_hidden_classes)?,
        load_table(dir, "quest_templates.json", catalog::default_quest_templates)?,
        load_table(dir, "story_quests.json", catalog::default_story_quests)?,
        load_table(dir, "encounters.json", catalog::default_encounters)?,
    ))
}

/// Write the compiled defaults out as editable seed files. Used by the
/// `init` maintenance command; refuses to clobber existing files.
pub fn export_defaults<P: AsRef<Path>>(seeds_dir: P) -> Result<(), RpgError> {
    let dir = seeds_dir.as_ref();
    fs::create_dir_all(dir)?;

    fn write_table<T: serde::Serialize>(dir: &Path, file: &str, entries: &[T]) -> Result<(), RpgError> {
        let path = dir.join(file);
        if path.exists() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(entries).map_err(|e| {
            RpgError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    write_table(dir, "items.json", &catalog::default_items())?;
    write_table(dir, "artifact_sets.json", &catalog::default_artifact_sets())?;
    write_table(dir, "achievements.json", &catalog::default_achievements())?;
    write_table(dir, "hidden_classes.json", &catalog::default_hidden_classes())?;
    write_table(dir, "quest_templates.json", &catalog::default_quest_templates())?;
    write_table(dir, "story_quests.json", &catalog::default_story_quests())?;
    write_table(dir, "encounters.json", &catalog::default_encounters())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_uses_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let catalog = load_catalog(dir.path().join("no_such")).expect("catalog");
        assert!(catalog.item("iron_sword").is_some());
        assert!(catalog.encounter("plagg_shadow").is_some());
    }

    #[test]
    fn exported_defaults_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        export_defaults(dir.path()).expect("export");
        let catalog = load_catalog(dir.path()).expect("catalog");
        assert!(catalog.item("camembert").is_some());
        assert!(catalog.achievement("cheese_connoisseur").is_some());
        assert!(catalog.story_quest("regalia_trial").is_some());
    }

    #[test]
    fn partial_override_replaces_one_table() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("items.json"),
            r#"[{
                "key": "test_blade",
                "name": "Test Blade",
                "description": "Sharp enough.",
                "kind": "weapon",
                "rarity": "common",
                "value": 1
            }]"#,
        )
        .expect("write");
        let catalog = load_catalog(dir.path()).expect("catalog");
        assert!(catalog.item("test_blade").is_some());
        assert!(catalog.item("iron_sword").is_none());
        // Untouched tables keep their defaults.
        assert!(catalog.encounter("street_akuma").is_some());
    }

    #[test]
    fn malformed_seed_file_errors() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("encounters.json"), "not json").expect("write");
        assert!(matches!(load_catalog(dir.path()), Err(RpgError::Io(_))));
    }
}
