//! Static game catalogs: items, artifact sets, achievements, hidden classes,
//! quest templates, story quests and encounters.
//!
//! Catalogs are built once at engine startup and read-only afterwards. The
//! built-in defaults below can be replaced wholesale by JSON seed files via
//! [`crate::rpg::seed_loader`].

use std::collections::BTreeMap;

use crate::rpg::errors::RpgError;
use crate::rpg::types::{
    AchievementDef, AchievementTier, ArtifactSetDef, ClassKind, CounterKind, Difficulty, DropEntry,
    EncounterDef, HiddenClassDef, ItemDef, ItemKind, ObjectiveKind, PrimaryStats, QuestRewards,
    QuestTemplate, Rarity, StatBonuses, StoryObjective, StoryQuestDef,
};

/// Read-only lookup tables shared by every engine component.
pub struct Catalog {
    items: BTreeMap<String, ItemDef>,
    artifact_sets: BTreeMap<String, ArtifactSetDef>,
    achievements: BTreeMap<String, AchievementDef>,
    hidden_classes: Vec<HiddenClassDef>,
    quest_templates: BTreeMap<String, QuestTemplate>,
    story_quests: BTreeMap<String, StoryQuestDef>,
    encounters: BTreeMap<String, EncounterDef>,
}

impl Catalog {
    pub fn with_defaults() -> Self {
        Self::from_parts(
            default_items(),
            default_artifact_sets(),
            default_achievements(),
            default_hidden_classes(),
            default_quest_templates(),
            default_story_quests(),
            default_encounters(),
        )
    }

    pub fn from_parts(
        items: Vec<ItemDef>,
        artifact_sets: Vec<ArtifactSetDef>,
        achievements: Vec<AchievementDef>,
        hidden_classes: Vec<HiddenClassDef>,
        quest_templates: Vec<QuestTemplate>,
        story_quests: Vec<StoryQuestDef>,
        encounters: Vec<EncounterDef>,
    ) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.key.clone(), i)).collect(),
            artifact_sets: artifact_sets.into_iter().map(|s| (s.key.clone(), s)).collect(),
            achievements: achievements.into_iter().map(|a| (a.key.clone(), a)).collect(),
            hidden_classes,
            quest_templates: quest_templates.into_iter().map(|t| (t.key.clone(), t)).collect(),
            story_quests: story_quests.into_iter().map(|q| (q.key.clone(), q)).collect(),
            encounters: encounters.into_iter().map(|e| (e.key.clone(), e)).collect(),
        }
    }

    pub fn item(&self, key: &str) -> Option<&ItemDef> {
        self.items.get(key)
    }

    pub fn require_item(&self, key: &str) -> Result<&ItemDef, RpgError> {
        self.items
            .get(key)
            .ok_or_else(|| RpgError::UnknownEntry(format!("item: {key}")))
    }

    pub fn artifact_set(&self, key: &str) -> Option<&ArtifactSetDef> {
        self.artifact_sets.get(key)
    }

    /// Set key an item belongs to, if it is an artifact.
    pub fn artifact_set_of(&self, item_key: &str) -> Option<String> {
        self.items
            .get(item_key)
            .and_then(|item| item.artifact_set().map(str::to_string))
    }

    /// Achievements in stable (key-sorted) order; evaluation relies on this
    /// so multi-unlock results are deterministic.
    pub fn achievements(&self) -> impl Iterator<Item = &AchievementDef> {
        self.achievements.values()
    }

    pub fn achievement(&self, key: &str) -> Option<&AchievementDef> {
        self.achievements.get(key)
    }

    pub fn hidden_classes(&self) -> &[HiddenClassDef] {
        &self.hidden_classes
    }

    /// Hidden classes unlocked by a given achievement.
    pub fn classes_unlocked_by(&self, achievement_key: &str) -> Vec<ClassKind> {
        self.hidden_classes
            .iter()
            .filter(|def| def.unlock_requirement == achievement_key)
            .map(|def| def.class)
            .collect()
    }

    pub fn quest_templates(&self) -> impl Iterator<Item = &QuestTemplate> {
        self.quest_templates.values()
    }

    pub fn quest_template(&self, key: &str) -> Option<&QuestTemplate> {
        self.quest_templates.get(key)
    }

    pub fn story_quest(&self, key: &str) -> Option<&StoryQuestDef> {
        self.story_quests.get(key)
    }

    pub fn story_quests(&self) -> impl Iterator<Item = &StoryQuestDef> {
        self.story_quests.values()
    }

    pub fn encounter(&self, key: &str) -> Option<&EncounterDef> {
        self.encounters.get(key)
    }

    pub fn require_encounter(&self, key: &str) -> Result<&EncounterDef, RpgError> {
        self.encounters
            .get(key)
            .ok_or_else(|| RpgError::UnknownEntry(format!("encounter: {key}")))
    }
}

// ============================================================================
// Default content
// ============================================================================

pub fn default_items() -> Vec<ItemDef> {
    vec![
        ItemDef::new(
            "iron_sword",
            "Iron Sword",
            "A dependable blade from the smithy on Rue Gotlib.",
            ItemKind::Weapon,
            Rarity::Common,
        )
        .with_bonuses(StatBonuses {
            attack: 5,
            ..Default::default()
        })
        .with_value(50),
        ItemDef::new(
            "cataclysm_claw",
            "Cataclysm Claw",
            "A jagged gauntlet humming with destructive energy.",
            ItemKind::Weapon,
            Rarity::Epic,
        )
        .with_bonuses(StatBonuses {
            attack: 18,
            crit: 0.05,
            ..Default::default()
        })
        .with_value(850),
        ItemDef::new(
            "leather_armor",
            "Leather Armor",
            "Supple armor favored by rooftop runners.",
            ItemKind::Armor,
            Rarity::Common,
        )
        .with_bonuses(StatBonuses {
            defense: 4,
            hp: 10,
            ..Default::default()
        })
        .with_value(40),
        ItemDef::new(
            "guardian_plate",
            "Guardian Plate",
            "Temple-forged plate worn by miraculous guardians.",
            ItemKind::Armor,
            Rarity::Rare,
        )
        .with_bonuses(StatBonuses {
            defense: 12,
            hp: 40,
            ..Default::default()
        })
        .with_value(400),
        ItemDef::new(
            "lucky_charm",
            "Lucky Charm",
            "A small trinket that always seems to land face up.",
            ItemKind::Accessory,
            Rarity::Uncommon,
        )
        .with_bonuses(StatBonuses {
            crit: 0.03,
            dodge: 0.02,
            ..Default::default()
        })
        .with_value(120),
        ItemDef::new(
            "camembert",
            "Camembert Wedge",
            "Pungent, runny, and apparently irresistible to kwamis.",
            ItemKind::Consumable,
            Rarity::Common,
        )
        .with_value(5),
        ItemDef::new(
            "aged_camembert",
            "Aged Camembert",
            "So ripe it should probably be registered as a weapon.",
            ItemKind::Consumable,
            Rarity::Rare,
        )
        .with_value(60),
        ItemDef::new(
            "herb",
            "Healing Herb",
            "A bitter leaf that knits small wounds.",
            ItemKind::Material,
            Rarity::Common,
        )
        .with_value(3),
        ItemDef::new(
            "akuma_remnant",
            "Akuma Remnant",
            "Purified residue left behind by a defeated akuma.",
            ItemKind::Material,
            Rarity::Uncommon,
        )
        .with_value(25),
        // Chrono artifact set
        ItemDef::new(
            "chrono_dial",
            "Chrono Dial",
            "First piece of the Chrono set.",
            ItemKind::Artifact { set: "chrono".into() },
            Rarity::Epic,
        )
        .with_bonuses(StatBonuses {
            attack: 3,
            ..Default::default()
        })
        .with_value(300),
        ItemDef::new(
            "chrono_gear",
            "Chrono Gear",
            "Second piece of the Chrono set.",
            ItemKind::Artifact { set: "chrono".into() },
            Rarity::Epic,
        )
        .with_bonuses(StatBonuses {
            defense: 3,
            ..Default::default()
        })
        .with_value(300),
        ItemDef::new(
            "chrono_spring",
            "Chrono Spring",
            "Third piece of the Chrono set.",
            ItemKind::Artifact { set: "chrono".into() },
            Rarity::Epic,
        )
        .with_bonuses(StatBonuses {
            dodge: 0.01,
            ..Default::default()
        })
        .with_value(300),
        ItemDef::new(
            "chrono_hand",
            "Chrono Hand",
            "Fourth piece of the Chrono set.",
            ItemKind::Artifact { set: "chrono".into() },
            Rarity::Epic,
        )
        .with_bonuses(StatBonuses {
            crit: 0.01,
            ..Default::default()
        })
        .with_value(300),
    ]
}

pub fn default_artifact_sets() -> Vec<ArtifactSetDef> {
    vec![ArtifactSetDef {
        key: "chrono".into(),
        name: "Chronologist's Regalia".into(),
        bonuses: StatBonuses {
            attack: 10,
            defense: 10,
            hp: 50,
            crit: 0.05,
            ..Default::default()
        },
    }]
}

pub fn default_achievements() -> Vec<AchievementDef> {
    vec![
        AchievementDef::new(
            "first_blood",
            "First Blood",
            "Win your first battle.",
            AchievementTier::Bronze,
        )
        .requires(CounterKind::BattlesWon, 1)
        .with_rewards(QuestRewards::new(50, 25)),
        AchievementDef::new(
            "akuma_hunter",
            "Akuma Hunter",
            "Defeat 100 monsters.",
            AchievementTier::Silver,
        )
        .requires(CounterKind::MonstersKilled, 100)
        .with_rewards(QuestRewards::new(500, 250).with_title("Akuma Hunter")),
        AchievementDef::new(
            "untouchable",
            "Untouchable",
            "Win 25 battles without taking a scratch.",
            AchievementTier::Gold,
        )
        .requires(CounterKind::PerfectBattles, 25)
        .with_rewards(QuestRewards::new(1500, 800).with_title("the Untouchable")),
        AchievementDef::new(
            "delver",
            "Delver",
            "Complete 10 dungeons.",
            AchievementTier::Silver,
        )
        .requires(CounterKind::DungeonsCompleted, 10)
        .with_rewards(QuestRewards::new(400, 300)),
        AchievementDef::new(
            "wanderlust",
            "Wanderlust",
            "Complete 50 adventures.",
            AchievementTier::Gold,
        )
        .requires(CounterKind::AdventuresCompleted, 50)
        .with_rewards(QuestRewards::new(1000, 600).with_luck(100)),
        AchievementDef::new(
            "collector",
            "Collector",
            "Own 25 distinct items.",
            AchievementTier::Silver,
        )
        .requires(CounterKind::UniqueItemsOwned, 25)
        .with_rewards(QuestRewards::new(300, 200)),
        AchievementDef::new(
            "duelist",
            "Duelist",
            "Win 20 player duels.",
            AchievementTier::Gold,
        )
        .requires(CounterKind::PvpWins, 20)
        .with_rewards(QuestRewards::new(800, 500).with_title("Duelist")),
        AchievementDef::new(
            "cheese_connoisseur",
            "Cheese Connoisseur",
            "Consume a thousand cheeses and best Plagg's shadow.",
            AchievementTier::Legendary,
        )
        .requires(CounterKind::CheeseConsumed, 1000)
        .requires(CounterKind::PlaggShadowsDefeated, 1)
        .with_rewards(
            QuestRewards::new(5000, 2500)
                .with_title("Plagg's Chosen")
                .with_class_unlock(ClassKind::CheeseSage),
        )
        .as_hidden(),
        AchievementDef::new(
            "out_of_time",
            "Out of Time",
            "Use chrono abilities 100 times.",
            AchievementTier::Platinum,
        )
        .requires(CounterKind::ChronoAbilitiesUsed, 100)
        .with_rewards(QuestRewards::new(2000, 1200).with_class_unlock(ClassKind::ChronoWeaver))
        .as_hidden(),
        AchievementDef::new(
            "night_prowler",
            "Night Prowler",
            "Visit 30 locations and win 200 battles.",
            AchievementTier::Platinum,
        )
        .requires(CounterKind::LocationsVisited, 30)
        .requires(CounterKind::BattlesWon, 200)
        .with_rewards(QuestRewards::new(2500, 1500).with_class_unlock(ClassKind::ShadowCat))
        .as_hidden(),
    ]
}

pub fn default_hidden_classes() -> Vec<HiddenClassDef> {
    vec![
        HiddenClassDef {
            class: ClassKind::CheeseSage,
            unlock_requirement: "cheese_connoisseur".into(),
            base_stats: PrimaryStats {
                strength: 12,
                dexterity: 10,
                constitution: 14,
                intelligence: 12,
                wisdom: 16,
                charisma: 10,
            },
            starting_skills: vec!["cheese_toss".into(), "pungent_aura".into()],
            ultimate: "wheel_of_destruction".into(),
            passive: "camembert_regeneration".into(),
        },
        HiddenClassDef {
            class: ClassKind::ChronoWeaver,
            unlock_requirement: "out_of_time".into(),
            base_stats: PrimaryStats {
                strength: 10,
                dexterity: 14,
                constitution: 10,
                intelligence: 16,
                wisdom: 12,
                charisma: 12,
            },
            starting_skills: vec!["second_chance".into(), "haste".into()],
            ultimate: "burrow_through_time".into(),
            passive: "borrowed_minutes".into(),
        },
        HiddenClassDef {
            class: ClassKind::ShadowCat,
            unlock_requirement: "night_prowler".into(),
            base_stats: PrimaryStats {
                strength: 12,
                dexterity: 16,
                constitution: 11,
                intelligence: 10,
                wisdom: 11,
                charisma: 14,
            },
            starting_skills: vec!["nine_lives".into(), "shadow_step".into()],
            ultimate: "cataclysm".into(),
            passive: "feline_grace".into(),
        },
    ]
}

pub fn default_quest_templates() -> Vec<QuestTemplate> {
    vec![
        QuestTemplate::new(
            "kill_monsters",
            ObjectiveKind::KillMonsters,
            "Cull {target} Akumas",
            "Defeat {target} monsters anywhere in the city.",
        )
        .with_rewards(QuestRewards::new(100, 80))
        .with_target_range(5, 15),
        QuestTemplate::new(
            "collect_items",
            ObjectiveKind::CollectItems,
            "Gather {target} Supplies",
            "Collect {target} items for the guild stores.",
        )
        .with_rewards(QuestRewards::new(80, 60))
        .with_target_range(8, 20),
        QuestTemplate::new(
            "complete_dungeons",
            ObjectiveKind::CompleteDungeons,
            "Clear {target} Dungeons",
            "Fully clear {target} dungeons below the catacombs.",
        )
        .with_rewards(QuestRewards::new(250, 200))
        .with_target_range(1, 3)
        .with_difficulties(vec![Difficulty::Normal, Difficulty::Hard, Difficulty::Epic]),
        QuestTemplate::new(
            "win_pvp",
            ObjectiveKind::WinPvp,
            "Win {target} Duels",
            "Defeat {target} rival guild members in duels.",
        )
        .with_rewards(QuestRewards::new(150, 120))
        .with_target_range(2, 6),
    ]
}

pub fn default_story_quests() -> Vec<StoryQuestDef> {
    vec![
        StoryQuestDef {
            key: "shadow_over_paris".into(),
            name: "Shadow Over the City".into(),
            description: "Strange akumas gather near the old tower. Thin their ranks and find out why.".into(),
            objectives: vec![
                StoryObjective::new(ObjectiveKind::KillMonsters, 10),
                StoryObjective::new(ObjectiveKind::VisitLocation, 1).with_target("old_tower"),
            ],
            rewards: QuestRewards::new(400, 350).with_item("akuma_remnant", 3),
            min_level: 3,
            prerequisites: vec![],
            required_artifact_sets: 0,
        },
        StoryQuestDef {
            key: "the_plagg_shadow".into(),
            name: "The Shadow of Plagg".into(),
            description: "Something ancient and very hungry stalks the cheese cellars.".into(),
            objectives: vec![
                StoryObjective::new(ObjectiveKind::ConsumeCheese, 5),
                StoryObjective::new(ObjectiveKind::KillMonsters, 1).with_target("plagg_shadow"),
            ],
            rewards: QuestRewards::new(1200, 900).with_item("aged_camembert", 1),
            min_level: 10,
            prerequisites: vec!["Shadow Over the City".into()],
            required_artifact_sets: 0,
        },
        StoryQuestDef {
            key: "regalia_trial".into(),
            name: "Trial of the Regalia".into(),
            description: "Prove mastery of a complete artifact set before the guardians.".into(),
            objectives: vec![
                StoryObjective::new(ObjectiveKind::CompleteDungeons, 3),
                StoryObjective::new(ObjectiveKind::WinPvp, 2),
            ],
            rewards: QuestRewards::new(2000, 1500).with_luck(250),
            min_level: 20,
            prerequisites: vec!["The Shadow of Plagg".into()],
            required_artifact_sets: 1,
        },
    ]
}

pub fn default_encounters() -> Vec<EncounterDef> {
    vec![
        EncounterDef {
            key: "street_akuma".into(),
            name: "Street Akuma".into(),
            level: 2,
            hp: 40,
            attack: 8,
            defense: 4,
            dodge_chance: 0.05,
            xp_reward: 30,
            gold_reward: 15,
            drops: vec![
                DropEntry { item_key: "herb".into(), weight: 60, qty: 2 },
                DropEntry { item_key: "akuma_remnant".into(), weight: 25, qty: 1 },
                DropEntry { item_key: "camembert".into(), weight: 15, qty: 1 },
            ],
            boss: false,
        },
        EncounterDef {
            key: "sewer_golem".into(),
            name: "Sewer Golem".into(),
            level: 8,
            hp: 160,
            attack: 22,
            defense: 18,
            dodge_chance: 0.02,
            xp_reward: 120,
            gold_reward: 70,
            drops: vec![
                DropEntry { item_key: "akuma_remnant".into(), weight: 50, qty: 2 },
                DropEntry { item_key: "leather_armor".into(), weight: 10, qty: 1 },
            ],
            boss: false,
        },
        EncounterDef {
            key: "plagg_shadow".into(),
            name: "Shadow of Plagg".into(),
            level: 15,
            hp: 420,
            attack: 45,
            defense: 25,
            dodge_chance: 0.1,
            xp_reward: 600,
            gold_reward: 400,
            drops: vec![
                DropEntry { item_key: "aged_camembert".into(), weight: 70, qty: 1 },
                DropEntry { item_key: "cataclysm_claw".into(), weight: 10, qty: 1 },
            ],
            boss: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let catalog = Catalog::with_defaults();

        // Every drop and quest-reward item resolves in the item table.
        for encounter in default_encounters() {
            for drop in &encounter.drops {
                assert!(catalog.item(&drop.item_key).is_some(), "missing {}", drop.item_key);
            }
        }
        for quest in catalog.story_quests() {
            for (item_key, _) in &quest.rewards.items {
                assert!(catalog.item(item_key).is_some(), "missing {item_key}");
            }
        }

        // Every hidden-class edge points at a real achievement.
        for def in catalog.hidden_classes() {
            assert!(
                catalog.achievement(&def.unlock_requirement).is_some(),
                "missing unlock achievement {}",
                def.unlock_requirement
            );
            assert!(def.class.is_hidden());
        }
    }

    #[test]
    fn cheese_connoisseur_unlocks_cheese_sage() {
        let catalog = Catalog::with_defaults();
        let unlocked = catalog.classes_unlocked_by("cheese_connoisseur");
        assert_eq!(unlocked, vec![ClassKind::CheeseSage]);
    }

    #[test]
    fn rarity_colors_are_distinct() {
        let mut colors: Vec<u32> = [
            Rarity::Common,
            Rarity::Uncommon,
            Rarity::Rare,
            Rarity::Epic,
            Rarity::Legendary,
            Rarity::Mythic,
        ]
        .iter()
        .map(Rarity::color)
        .collect();
        colors.dedup();
        assert_eq!(colors.len(), 6);
    }

    #[test]
    fn artifact_set_lookup_through_items() {
        let catalog = Catalog::with_defaults();
        assert_eq!(catalog.artifact_set_of("chrono_dial").as_deref(), Some("chrono"));
        assert_eq!(catalog.artifact_set_of("iron_sword"), None);
        assert!(catalog.artifact_set("chrono").is_some());
    }
}
