use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub const PLAYER_SCHEMA_VERSION: u8 = 2;
pub const GUILD_SCHEMA_VERSION: u8 = 1;
pub const ALIAS_SCHEMA_VERSION: u8 = 1;

/// Hard cap on player level; excess xp past the cap is discarded.
pub const MAX_LEVEL: u32 = 100;
/// Primary stats are clamped into this closed range.
pub const STAT_MIN: u8 = 1;
pub const STAT_MAX: u8 = 99;
/// Allowed luck band.
pub const LUCK_MIN: i32 = -1000;
pub const LUCK_MAX: i32 = 9999;
/// Artifact pieces of one set needed before the set counts as complete.
pub const ARTIFACT_SET_SIZE: u32 = 4;

// ============================================================================
// Classes
// ============================================================================

/// Closed set of playable classes. Hidden classes are only selectable after
/// the achievement that unlocks them is completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Warrior,
    Mage,
    Rogue,
    Healer,
    // Hidden classes
    CheeseSage,
    ChronoWeaver,
    ShadowCat,
    MiraculousGuardian,
}

impl ClassKind {
    pub fn is_hidden(&self) -> bool {
        matches!(
            self,
            ClassKind::CheeseSage
                | ClassKind::ChronoWeaver
                | ClassKind::ShadowCat
                | ClassKind::MiraculousGuardian
        )
    }

    /// Seeding baseline for primary stats. Base classes shift two points from
    /// the all-tens default into their signature stat.
    pub fn primary_baseline(&self) -> PrimaryStats {
        let mut stats = PrimaryStats::default();
        match self {
            ClassKind::Warrior => stats.strength = 12,
            ClassKind::Mage => stats.intelligence = 12,
            ClassKind::Rogue => stats.dexterity = 12,
            ClassKind::Healer => stats.wisdom = 12,
            // Hidden classes carry their baseline in the catalog definition.
            _ => {}
        }
        stats
    }

    pub fn key(&self) -> &'static str {
        match self {
            ClassKind::Warrior => "warrior",
            ClassKind::Mage => "mage",
            ClassKind::Rogue => "rogue",
            ClassKind::Healer => "healer",
            ClassKind::CheeseSage => "cheese_sage",
            ClassKind::ChronoWeaver => "chrono_weaver",
            ClassKind::ShadowCat => "shadow_cat",
            ClassKind::MiraculousGuardian => "miraculous_guardian",
        }
    }
}

impl Default for ClassKind {
    fn default() -> Self {
        ClassKind::Warrior
    }
}

// ============================================================================
// Stats & resources
// ============================================================================

/// The six allocatable primary stats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryStats {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl Default for PrimaryStats {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl PrimaryStats {
    pub fn get(&self, stat: StatKind) -> u8 {
        match stat {
            StatKind::Strength => self.strength,
            StatKind::Dexterity => self.dexterity,
            StatKind::Constitution => self.constitution,
            StatKind::Intelligence => self.intelligence,
            StatKind::Wisdom => self.wisdom,
            StatKind::Charisma => self.charisma,
        }
    }

    /// Add points to a stat, clamping into [STAT_MIN, STAT_MAX]. Returns the
    /// number of points actually consumed.
    pub fn add(&mut self, stat: StatKind, amount: u8) -> u8 {
        let slot = match stat {
            StatKind::Strength => &mut self.strength,
            StatKind::Dexterity => &mut self.dexterity,
            StatKind::Constitution => &mut self.constitution,
            StatKind::Intelligence => &mut self.intelligence,
            StatKind::Wisdom => &mut self.wisdom,
            StatKind::Charisma => &mut self.charisma,
        };
        let before = *slot;
        *slot = slot.saturating_add(amount).clamp(STAT_MIN, STAT_MAX);
        *slot - before
    }

    pub fn in_range(&self) -> bool {
        [
            self.strength,
            self.dexterity,
            self.constitution,
            self.intelligence,
            self.wisdom,
            self.charisma,
        ]
        .iter()
        .all(|s| (STAT_MIN..=STAT_MAX).contains(s))
    }
}

/// Cache of stats computed from primary stats, class, equipment, artifact
/// sets and active buffs. Never mutated directly; `stats::recompute_derived`
/// is the only writer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct DerivedStats {
    pub attack: u32,
    pub magic_attack: u32,
    pub defense: u32,
    pub crit_chance: f64,
    pub dodge_chance: f64,
    pub max_ultimate_energy: u32,
}

/// Spendable and regenerating pools. Each `x`/`max_x` pair obeys
/// `0 <= x <= max_x` after every mutator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub stamina: u32,
    pub max_stamina: u32,
    pub sp: u32,
    pub max_sp: u32,
    pub miraculous_energy: u32,
    pub max_miraculous_energy: u32,
    pub ultimate_energy: u32,
    pub technique_points: u32,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            hp: 100,
            max_hp: 100,
            mana: 50,
            max_mana: 50,
            stamina: 100,
            max_stamina: 100,
            sp: 50,
            max_sp: 50,
            miraculous_energy: 100,
            max_miraculous_energy: 100,
            ultimate_energy: 0,
            technique_points: 0,
        }
    }
}

impl Resources {
    /// Clamp every bounded pool to its maximum.
    pub fn clamp_to_maxima(&mut self, max_ultimate: u32) {
        self.hp = self.hp.min(self.max_hp);
        self.mana = self.mana.min(self.max_mana);
        self.stamina = self.stamina.min(self.max_stamina);
        self.sp = self.sp.min(self.max_sp);
        self.miraculous_energy = self.miraculous_energy.min(self.max_miraculous_energy);
        self.ultimate_energy = self.ultimate_energy.min(max_ultimate);
    }
}

// ============================================================================
// Counters & cooldowns
// ============================================================================

/// Monotonic lifetime counters. Quests and achievements are driven from
/// these; every increment routes through [`Counters::bump`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    MonstersKilled,
    BattlesWon,
    PerfectBattles,
    BossesDefeated,
    AdventuresCompleted,
    DungeonsCompleted,
    ItemsCollected,
    UniqueItemsOwned,
    CheeseConsumed,
    ChronoAbilitiesUsed,
    PvpWins,
    QuestsCompleted,
    LocationsVisited,
    WorkCompleted,
    DamageTaken,
    GoldEarned,
    PlaggShadowsDefeated,
}

pub const ALL_COUNTERS: [CounterKind; 17] = [
    CounterKind::MonstersKilled,
    CounterKind::BattlesWon,
    CounterKind::PerfectBattles,
    CounterKind::BossesDefeated,
    CounterKind::AdventuresCompleted,
    CounterKind::DungeonsCompleted,
    CounterKind::ItemsCollected,
    CounterKind::UniqueItemsOwned,
    CounterKind::CheeseConsumed,
    CounterKind::ChronoAbilitiesUsed,
    CounterKind::PvpWins,
    CounterKind::QuestsCompleted,
    CounterKind::LocationsVisited,
    CounterKind::WorkCompleted,
    CounterKind::DamageTaken,
    CounterKind::GoldEarned,
    CounterKind::PlaggShadowsDefeated,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Counters {
    #[serde(default)]
    pub monsters_killed: u64,
    #[serde(default)]
    pub battles_won: u64,
    #[serde(default)]
    pub perfect_battles: u64,
    #[serde(default)]
    pub bosses_defeated: u64,
    #[serde(default)]
    pub adventures_completed: u64,
    #[serde(default)]
    pub dungeons_completed: u64,
    #[serde(default)]
    pub items_collected: u64,
    #[serde(default)]
    pub unique_items_owned: u64,
    #[serde(default)]
    pub cheese_consumed: u64,
    #[serde(default)]
    pub chrono_abilities_used: u64,
    #[serde(default)]
    pub pvp_wins: u64,
    #[serde(default)]
    pub quests_completed: u64,
    #[serde(default)]
    pub locations_visited: u64,
    #[serde(default)]
    pub work_completed: u64,
    #[serde(default)]
    pub damage_taken: u64,
    #[serde(default)]
    pub gold_earned: u64,
    #[serde(default)]
    pub plagg_shadows_defeated: u64,
}

impl Counters {
    fn slot(&mut self, kind: CounterKind) -> &mut u64 {
        match kind {
            CounterKind::MonstersKilled => &mut self.monsters_killed,
            CounterKind::BattlesWon => &mut self.battles_won,
            CounterKind::PerfectBattles => &mut self.perfect_battles,
            CounterKind::BossesDefeated => &mut self.bosses_defeated,
            CounterKind::AdventuresCompleted => &mut self.adventures_completed,
            CounterKind::DungeonsCompleted => &mut self.dungeons_completed,
            CounterKind::ItemsCollected => &mut self.items_collected,
            CounterKind::UniqueItemsOwned => &mut self.unique_items_owned,
            CounterKind::CheeseConsumed => &mut self.cheese_consumed,
            CounterKind::ChronoAbilitiesUsed => &mut self.chrono_abilities_used,
            CounterKind::PvpWins => &mut self.pvp_wins,
            CounterKind::QuestsCompleted => &mut self.quests_completed,
            CounterKind::LocationsVisited => &mut self.locations_visited,
            CounterKind::WorkCompleted => &mut self.work_completed,
            CounterKind::DamageTaken => &mut self.damage_taken,
            CounterKind::GoldEarned => &mut self.gold_earned,
            CounterKind::PlaggShadowsDefeated => &mut self.plagg_shadows_defeated,
        }
    }

    pub fn get(&self, kind: CounterKind) -> u64 {
        match kind {
            CounterKind::MonstersKilled => self.monsters_killed,
            CounterKind::BattlesWon => self.battles_won,
            CounterKind::PerfectBattles => self.perfect_battles,
            CounterKind::BossesDefeated => self.bosses_defeated,
            CounterKind::AdventuresCompleted => self.adventures_completed,
            CounterKind::DungeonsCompleted => self.dungeons_completed,
            CounterKind::ItemsCollected => self.items_collected,
            CounterKind::UniqueItemsOwned => self.unique_items_owned,
            CounterKind::CheeseConsumed => self.cheese_consumed,
            CounterKind::ChronoAbilitiesUsed => self.chrono_abilities_used,
            CounterKind::PvpWins => self.pvp_wins,
            CounterKind::QuestsCompleted => self.quests_completed,
            CounterKind::LocationsVisited => self.locations_visited,
            CounterKind::WorkCompleted => self.work_completed,
            CounterKind::DamageTaken => self.damage_taken,
            CounterKind::GoldEarned => self.gold_earned,
            CounterKind::PlaggShadowsDefeated => self.plagg_shadows_defeated,
        }
    }

    /// Sole increment path; counters never decrease.
    pub fn bump(&mut self, kind: CounterKind, n: u64) {
        let slot = self.slot(kind);
        *slot = slot.saturating_add(n);
    }
}

/// Action cooldowns represented as last-use instants. Elapsed time is always
/// computed against the engine's injected clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CooldownKey {
    Hunt,
    Adventure,
    Work,
    Explore,
    Craft,
    Gather,
    Quest,
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Cooldowns {
    #[serde(default)]
    pub last_hunt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_adventure: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_work: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_explore: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_craft: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_gather: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_quest: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_daily: Option<DateTime<Utc>>,
}

impl Cooldowns {
    pub fn get(&self, key: CooldownKey) -> Option<DateTime<Utc>> {
        match key {
            CooldownKey::Hunt => self.last_hunt,
            CooldownKey::Adventure => self.last_adventure,
            CooldownKey::Work => self.last_work,
            CooldownKey::Explore => self.last_explore,
            CooldownKey::Craft => self.last_craft,
            CooldownKey::Gather => self.last_gather,
            CooldownKey::Quest => self.last_quest,
            CooldownKey::Daily => self.last_daily,
        }
    }

    pub fn set(&mut self, key: CooldownKey, instant: DateTime<Utc>) {
        let slot = match key {
            CooldownKey::Hunt => &mut self.last_hunt,
            CooldownKey::Adventure => &mut self.last_adventure,
            CooldownKey::Work => &mut self.last_work,
            CooldownKey::Explore => &mut self.last_explore,
            CooldownKey::Craft => &mut self.last_craft,
            CooldownKey::Gather => &mut self.last_gather,
            CooldownKey::Quest => &mut self.last_quest,
            CooldownKey::Daily => &mut self.last_daily,
        };
        *slot = Some(instant);
    }
}

// ============================================================================
// Items & equipment
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Accessory,
    Artifact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Accessory,
    /// Artifacts belong to a named set; four equipped pieces of one set
    /// complete it.
    Artifact {
        set: String,
    },
    Consumable,
    Material,
}

impl ItemKind {
    /// Slot compatibility used by equip validation.
    pub fn fits_slot(&self, slot: EquipSlot) -> bool {
        matches!(
            (self, slot),
            (ItemKind::Weapon, EquipSlot::Weapon)
                | (ItemKind::Armor, EquipSlot::Armor)
                | (ItemKind::Accessory, EquipSlot::Accessory)
                | (ItemKind::Artifact { .. }, EquipSlot::Artifact)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    /// Display color for collaborator embeds.
    pub fn color(&self) -> u32 {
        match self {
            Rarity::Common => 0x95a5a6,
            Rarity::Uncommon => 0x2ecc71,
            Rarity::Rare => 0x3498db,
            Rarity::Epic => 0x9b59b6,
            Rarity::Legendary => 0xf1c40f,
            Rarity::Mythic => 0xe74c3c,
        }
    }
}

/// Additive stat contributions carried by equipment, artifact set bonuses
/// and active buffs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct StatBonuses {
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub magic_attack: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub mana: u32,
    #[serde(default)]
    pub crit: f64,
    #[serde(default)]
    pub dodge: f64,
}

impl StatBonuses {
    pub fn accumulate(&mut self, other: &StatBonuses) {
        self.attack += other.attack;
        self.magic_attack += other.magic_attack;
        self.defense += other.defense;
        self.hp += other.hp;
        self.mana += other.mana;
        self.crit += other.crit;
        self.dodge += other.dodge;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDef {
    pub key: String,
    pub name: String,
    pub description: String,
    pub kind: ItemKind,
    pub rarity: Rarity,
    #[serde(default)]
    pub bonuses: StatBonuses,
    /// Base shop value in gold.
    pub value: u64,
}

impl ItemDef {
    pub fn new(key: &str, name: &str, description: &str, kind: ItemKind, rarity: Rarity) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind,
            rarity,
            bonuses: StatBonuses::default(),
            value: 0,
        }
    }

    pub fn with_bonuses(mut self, bonuses: StatBonuses) -> Self {
        self.bonuses = bonuses;
        self
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn artifact_set(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Artifact { set } => Some(set),
            _ => None,
        }
    }
}

/// Set bonus applied once at least [`ARTIFACT_SET_SIZE`] pieces of the set
/// are equipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactSetDef {
    pub key: String,
    pub name: String,
    pub bonuses: StatBonuses,
}

/// Equipped gear, one item key per slot. Artifacts additionally occupy
/// positions in [`PlayerRecord::equipped_artifacts`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Equipment {
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub armor: Option<String>,
    #[serde(default)]
    pub accessory: Option<String>,
    #[serde(default)]
    pub artifact: Option<String>,
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<&String> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
            EquipSlot::Accessory => self.accessory.as_ref(),
            EquipSlot::Artifact => self.artifact.as_ref(),
        }
    }

    pub fn set(&mut self, slot: EquipSlot, item_key: Option<String>) -> Option<String> {
        let slot = match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Accessory => &mut self.accessory,
            EquipSlot::Artifact => &mut self.artifact,
        };
        std::mem::replace(slot, item_key)
    }

    pub fn iter_equipped(&self) -> impl Iterator<Item = &String> {
        [
            self.weapon.as_ref(),
            self.armor.as_ref(),
            self.accessory.as_ref(),
            self.artifact.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Temporary stat modifier (potions, kwami blessings). Pruned once expired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveBuff {
    pub id: String,
    pub bonuses: StatBonuses,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ActiveBuff {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

// ============================================================================
// Quests
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Daily,
    Weekly,
    Story,
}

impl QuestKind {
    /// Reward multiplier applied on top of the difficulty multiplier.
    pub fn reward_multiplier(&self) -> f64 {
        match self {
            QuestKind::Daily => 1.0,
            QuestKind::Weekly => 3.0,
            QuestKind::Story => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Epic,
}

impl Difficulty {
    pub fn reward_multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
            Difficulty::Epic => 2.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::Epic => "Epic",
        }
    }
}

/// Objective categories that template quests and story objectives track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    KillMonsters,
    CollectItems,
    CompleteDungeons,
    WinPvp,
    ConsumeCheese,
    VisitLocation,
    CompleteAdventures,
}

/// One story-quest objective with its own progress track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryObjective {
    pub objective: ObjectiveKind,
    /// Optional concrete target (a monster key, a location name).
    #[serde(default)]
    pub target: Option<String>,
    pub required: u64,
    #[serde(default)]
    pub progress: u64,
}

impl StoryObjective {
    pub fn new(objective: ObjectiveKind, required: u64) -> Self {
        Self {
            objective,
            target: None,
            required,
            progress: 0,
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.required
    }

    pub fn increment(&mut self, amount: u64) {
        self.progress = self.progress.saturating_add(amount).min(self.required);
    }
}

/// Rewards granted by quests and achievements (applied through one shared
/// path, see `quests::apply_rewards`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QuestRewards {
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub items: Vec<(String, u32)>,
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub unlock_class: Option<ClassKind>,
    #[serde(default)]
    pub luck: i32,
}

impl QuestRewards {
    pub fn new(gold: u64, xp: u64) -> Self {
        Self {
            gold,
            xp,
            ..Default::default()
        }
    }

    pub fn with_item(mut self, item_key: &str, qty: u32) -> Self {
        self.items.push((item_key.to_string(), qty));
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.titles.push(title.to_string());
        self
    }

    pub fn with_class_unlock(mut self, class: ClassKind) -> Self {
        self.unlock_class = Some(class);
        self
    }

    pub fn with_luck(mut self, luck: i32) -> Self {
        self.luck = luck;
        self
    }

    /// Scale gold and xp by a multiplier, rounding down. Item, title and
    /// class rewards are not scaled.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        scaled.gold = (self.gold as f64 * factor).floor() as u64;
        scaled.xp = (self.xp as f64 * factor).floor() as u64;
        scaled
    }
}

/// Static template a daily/weekly quest instance is drawn from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestTemplate {
    pub key: String,
    pub objective: ObjectiveKind,
    /// `{target}` is substituted with the rolled target count.
    pub name_pattern: String,
    pub description_pattern: String,
    pub base_rewards: QuestRewards,
    pub target_min: u64,
    pub target_max: u64,
    /// Difficulties this template can roll.
    pub difficulties: Vec<Difficulty>,
}

impl QuestTemplate {
    pub fn new(key: &str, objective: ObjectiveKind, name_pattern: &str, description_pattern: &str) -> Self {
        Self {
            key: key.to_string(),
            objective,
            name_pattern: name_pattern.to_string(),
            description_pattern: description_pattern.to_string(),
            base_rewards: QuestRewards::default(),
            target_min: 1,
            target_max: 1,
            difficulties: vec![Difficulty::Easy, Difficulty::Normal, Difficulty::Hard],
        }
    }

    pub fn with_rewards(mut self, rewards: QuestRewards) -> Self {
        self.base_rewards = rewards;
        self
    }

    pub fn with_target_range(mut self, min: u64, max: u64) -> Self {
        self.target_min = min;
        self.target_max = max;
        self
    }

    pub fn with_difficulties(mut self, difficulties: Vec<Difficulty>) -> Self {
        self.difficulties = difficulties;
        self
    }
}

/// Static story-quest definition; acceptance is gated by
/// `quests::meets_requirements`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryQuestDef {
    pub key: String,
    pub name: String,
    pub description: String,
    pub objectives: Vec<StoryObjective>,
    pub rewards: QuestRewards,
    #[serde(default)]
    pub min_level: u32,
    /// Story quests that must be completed first, by quest name.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Minimum number of complete artifact sets equipped.
    #[serde(default)]
    pub required_artifact_sets: u32,
}

/// A quest as held on a player document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestInstance {
    pub id: Uuid,
    pub kind: QuestKind,
    pub template: String,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub target: u64,
    pub progress: u64,
    pub rewards: QuestRewards,
    /// Story quests track per-objective progress; template quests leave this
    /// empty and use the flat `progress`/`target` pair.
    #[serde(default)]
    pub objectives: Vec<StoryObjective>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuestInstance {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Completion predicate: flat progress for template quests, every
    /// objective for story quests.
    pub fn objectives_met(&self) -> bool {
        if self.objectives.is_empty() {
            self.progress >= self.target
        } else {
            self.objectives.iter().all(|o| o.is_complete())
        }
    }
}

// ============================================================================
// Achievements & hidden classes
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Legendary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementDef {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Every listed counter must reach its threshold.
    pub requirement: BTreeMap<CounterKind, u64>,
    #[serde(default)]
    pub rewards: QuestRewards,
    /// Hidden achievements only surface in listings near completion.
    #[serde(default)]
    pub hidden: bool,
    pub tier: AchievementTier,
}

impl AchievementDef {
    pub fn new(key: &str, name: &str, description: &str, tier: AchievementTier) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            requirement: BTreeMap::new(),
            rewards: QuestRewards::default(),
            hidden: false,
            tier,
        }
    }

    pub fn requires(mut self, counter: CounterKind, threshold: u64) -> Self {
        self.requirement.insert(counter, threshold);
        self
    }

    pub fn with_rewards(mut self, rewards: QuestRewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn as_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Collaborator-facing view of one achievement for a given player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementView {
    pub key: String,
    pub name: String,
    pub description: String,
    pub tier: AchievementTier,
    pub hidden: bool,
    pub completed: bool,
    /// Fraction of requirement counters already at >= 100%.
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HiddenClassDef {
    pub class: ClassKind,
    /// Achievement key whose completion unlocks this class.
    pub unlock_requirement: String,
    pub base_stats: PrimaryStats,
    pub starting_skills: Vec<String>,
    pub ultimate: String,
    pub passive: String,
}

// ============================================================================
// Combat
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropEntry {
    pub item_key: String,
    pub weight: u32,
    pub qty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncounterDef {
    pub key: String,
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub dodge_chance: f64,
    pub xp_reward: u64,
    pub gold_reward: u64,
    #[serde(default)]
    pub drops: Vec<DropEntry>,
    #[serde(default)]
    pub boss: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombatAction {
    Attack,
    Defend,
    Flee,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Fled,
}

/// Opaque handle identifying one active combat session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CombatToken(pub Uuid);

/// What a single resolved turn did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TurnResult {
    pub damage_dealt: u32,
    pub damage_taken: u32,
    pub crit: bool,
    pub dodged_by_enemy: bool,
    pub dodged_by_player: bool,
    pub enemy_hp_remaining: u32,
    pub outcome: Option<CombatOutcome>,
    /// Populated on victory/defeat with the rewards mutator's bundle.
    pub bundle: Option<ResultBundle>,
}

// ============================================================================
// Luck
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LuckLevel {
    Cursed,
    Unlucky,
    Normal,
    Lucky,
    Blessed,
    Divine,
}

impl LuckLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LuckLevel::Cursed => "Cursed",
            LuckLevel::Unlucky => "Unlucky",
            LuckLevel::Normal => "Normal",
            LuckLevel::Lucky => "Lucky",
            LuckLevel::Blessed => "Blessed",
            LuckLevel::Divine => "Divine",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LuckStatus {
    pub level: LuckLevel,
    pub points: i32,
    pub bonus_percent: i32,
}

// ============================================================================
// Events & result bundles
// ============================================================================

/// Player-action events emitted by collaborators; each one is applied
/// atomically inside a single mutator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PlayerEvent {
    MonsterKilled { monster: String, boss: bool },
    ItemCollected { item_key: String, qty: u32 },
    DungeonCompleted { dungeon: String },
    PvpWon,
    CheeseConsumed { qty: u32 },
    AdventureCompleted,
    WorkCompleted,
    DamageTaken { amount: u32 },
    LocationVisited { location: String },
    XpGained { amount: u64 },
}

/// One derived stat before/after a mutator, for collaborator display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedStatChange {
    pub stat: String,
    pub before: f64,
    pub after: f64,
}

/// Uniform description of everything a mutator changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResultBundle {
    pub gold_delta: i64,
    pub xp_delta: u64,
    pub level_ups: u32,
    pub items_added: Vec<(String, u32)>,
    pub items_removed: Vec<(String, u32)>,
    pub quests_completed: Vec<String>,
    pub achievements_unlocked: Vec<String>,
    pub classes_unlocked: Vec<ClassKind>,
    pub derived_stat_changes: Vec<DerivedStatChange>,
    pub messages: Vec<String>,
}

impl ResultBundle {
    pub fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Record the derived-stat diff between two snapshots, skipping
    /// unchanged values.
    pub fn record_derived_changes(&mut self, before: &DerivedStats, after: &DerivedStats) {
        let pairs: [(&str, f64, f64); 6] = [
            ("attack", before.attack as f64, after.attack as f64),
            ("magic_attack", before.magic_attack as f64, after.magic_attack as f64),
            ("defense", before.defense as f64, after.defense as f64),
            ("crit_chance", before.crit_chance, after.crit_chance),
            ("dodge_chance", before.dodge_chance, after.dodge_chance),
            (
                "max_ultimate_energy",
                before.max_ultimate_energy as f64,
                after.max_ultimate_energy as f64,
            ),
        ];
        for (stat, b, a) in pairs {
            if (b - a).abs() > f64::EPSILON {
                self.derived_stat_changes.push(DerivedStatChange {
                    stat: stat.to_string(),
                    before: b,
                    after: a,
                });
            }
        }
    }
}

// ============================================================================
// Player document
// ============================================================================

/// The single persisted record of all per-player state, keyed by
/// `user_rpg_<user_id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub level: u32,
    pub xp: u64,
    pub xp_to_next: u64,

    pub primary: PrimaryStats,
    /// Cached output of `stats::recompute_derived`; never hand-edited.
    pub derived: DerivedStats,
    pub resources: Resources,

    pub gold: u64,
    pub unallocated_points: u32,

    pub class: ClassKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub unlocked_hidden_classes: BTreeSet<ClassKind>,

    /// Item key -> owned count; entries are removed when the count hits 0.
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    #[serde(default)]
    pub equipment: Equipment,
    /// Artifact position (0..=7) -> item key.
    #[serde(default)]
    pub equipped_artifacts: BTreeMap<u8, String>,
    #[serde(default)]
    pub active_buffs: Vec<ActiveBuff>,

    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub titles: BTreeSet<String>,
    #[serde(default)]
    pub completed_achievements: BTreeSet<String>,

    #[serde(default)]
    pub active_quests: Vec<QuestInstance>,
    #[serde(default)]
    pub completed_quests: BTreeSet<String>,

    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub cooldowns: Cooldowns,

    #[serde(default)]
    pub in_combat: bool,
    #[serde(default)]
    pub last_combat_event: Option<DateTime<Utc>>,

    #[serde(default)]
    pub luck_points: i32,

    pub schema_version: u8,
}

impl PlayerRecord {
    /// Fresh document with class-baseline defaults. Derived stats and
    /// resource maxima are recomputed by the profile store right after.
    pub fn new(user_id: &str, class: ClassKind, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
            level: 1,
            xp: 0,
            xp_to_next: 100,
            primary: class.primary_baseline(),
            derived: DerivedStats::default(),
            resources: Resources::default(),
            gold: 100,
            unallocated_points: 0,
            class,
            path: None,
            unlocked_hidden_classes: BTreeSet::new(),
            inventory: BTreeMap::new(),
            equipment: Equipment::default(),
            equipped_artifacts: BTreeMap::new(),
            active_buffs: Vec::new(),
            faction: None,
            title: None,
            titles: BTreeSet::new(),
            completed_achievements: BTreeSet::new(),
            active_quests: Vec::new(),
            completed_quests: BTreeSet::new(),
            counters: Counters::default(),
            cooldowns: Cooldowns::default(),
            in_combat: false,
            last_combat_event: None,
            luck_points: 0,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Count complete artifact sets among equipped artifacts: one per set
    /// with at least [`ARTIFACT_SET_SIZE`] equipped pieces.
    pub fn complete_artifact_sets(&self, set_of: impl Fn(&str) -> Option<String>) -> u32 {
        let mut per_set: BTreeMap<String, u32> = BTreeMap::new();
        for item_key in self.equipped_artifacts.values() {
            if let Some(set) = set_of(item_key) {
                *per_set.entry(set).or_insert(0) += 1;
            }
        }
        per_set.values().filter(|&&n| n >= ARTIFACT_SET_SIZE).count() as u32
    }

    pub fn has_active_quest_of_kind(&self, kind: QuestKind) -> bool {
        self.active_quests.iter().any(|q| q.kind == kind && !q.completed)
    }
}

// ============================================================================
// Guild aggregates & leaderboard aliases
// ============================================================================

/// Per-guild aggregate record (`guild_rpg_<guild_id>`), refreshed on level
/// ups for leaderboard rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildRecord {
    pub guild_id: String,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub total_levels: u64,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl GuildRecord {
    pub fn new(guild_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            member_count: 0,
            total_levels: 0,
            updated_at: now,
            schema_version: GUILD_SCHEMA_VERSION,
        }
    }
}

/// Guild-scoped leaderboard alias (`player_<guild_id>_<user_id>`), a small
/// snapshot so leaderboards can scan one prefix without loading full
/// documents. Never the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerAlias {
    pub user_id: String,
    pub level: u32,
    pub gold: u64,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}
