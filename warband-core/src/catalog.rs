//! Read-only catalog collaborators.
//!
//! The session aid keeps its reference data (bestiary, item shop, character
//! sheets) outside this crate; the engine consumes it through the narrow
//! traits here. Rows carry only the fields the combat core reads: hit
//! points, armor class, dexterity modifier, challenge rating, XP value, and
//! loot/drop data.

use crate::dice::DiceExpr;
use crate::participant::Participant;
use serde::{Deserialize, Serialize};

/// Item rarity ladder, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    VeryRare,
    Legendary,
}

/// Combat-relevant effect an item can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemEffect {
    Healing(DiceExpr),
}

/// One row of the item catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub rarity: Rarity,
    pub price_gp: f32,
    pub magical: bool,
    pub effect: Option<ItemEffect>,
}

impl CatalogItem {
    pub fn new(name: impl Into<String>, rarity: Rarity, price_gp: f32) -> Self {
        Self {
            name: name.into(),
            rarity,
            price_gp,
            magical: false,
            effect: None,
        }
    }

    pub fn magical(mut self) -> Self {
        self.magical = true;
        self
    }

    pub fn with_effect(mut self, effect: ItemEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// One entry of a creature's drop table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item name, resolvable against the item catalog.
    pub item: String,
    /// Independent drop chance in `[0, 1]`.
    pub chance: f64,
}

impl LootEntry {
    pub fn new(item: impl Into<String>, chance: f64) -> Self {
        Self {
            item: item.into(),
            chance,
        }
    }
}

/// One row of the creature catalog (bestiary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureSheet {
    pub name: String,
    pub max_hp: i32,
    pub armor_class: i32,
    pub dexterity_modifier: i32,
    pub challenge_rating: f32,
    pub xp_value: u32,
    pub loot: Vec<LootEntry>,
}

impl CreatureSheet {
    pub fn new(
        name: impl Into<String>,
        max_hp: i32,
        armor_class: i32,
        dexterity_modifier: i32,
        challenge_rating: f32,
        xp_value: u32,
    ) -> Self {
        Self {
            name: name.into(),
            max_hp,
            armor_class,
            dexterity_modifier,
            challenge_rating,
            xp_value,
            loot: Vec::new(),
        }
    }

    pub fn with_loot(mut self, entry: LootEntry) -> Self {
        self.loot.push(entry);
        self
    }

    /// Instantiate an adversary participant from this sheet.
    pub fn to_participant(&self) -> Participant {
        Participant::creature(
            self.name.clone(),
            self.max_hp,
            self.armor_class,
            self.dexterity_modifier,
            self.challenge_rating,
            self.xp_value,
        )
    }
}

/// Standard challenge-rating → XP mapping.
///
/// Catalogs usually carry an explicit XP value per creature; this mapping
/// backfills it for entries that only record a rating.
pub fn xp_for_challenge_rating(cr: f32) -> u32 {
    const TABLE: &[(f32, u32)] = &[
        (0.0, 10),
        (0.125, 25),
        (0.25, 50),
        (0.5, 100),
        (1.0, 200),
        (2.0, 450),
        (3.0, 700),
        (4.0, 1_100),
        (5.0, 1_800),
        (6.0, 2_300),
        (7.0, 2_900),
        (8.0, 3_900),
        (9.0, 5_000),
        (10.0, 5_900),
        (11.0, 7_200),
        (12.0, 8_400),
        (13.0, 10_000),
        (14.0, 11_500),
        (15.0, 13_000),
        (16.0, 15_000),
        (17.0, 18_000),
        (18.0, 20_000),
        (19.0, 22_000),
        (20.0, 25_000),
    ];

    // Highest tabled rating not above the requested one.
    TABLE
        .iter()
        .take_while(|(rating, _)| *rating <= cr + f32::EPSILON)
        .last()
        .map(|(_, xp)| *xp)
        .unwrap_or(10)
}

/// Read-only bestiary surface.
pub trait CreatureCatalog {
    fn creatures(&self) -> &[CreatureSheet];

    fn creature_by_name(&self, name: &str) -> Option<&CreatureSheet> {
        self.creatures()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Read-only item-shop surface.
pub trait ItemCatalog {
    fn items(&self) -> &[CatalogItem];

    fn item_by_name(&self, name: &str) -> Option<&CatalogItem> {
        self.items()
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }
}

/// Vec-backed bestiary, enough for tests and for hosts that load their
/// catalog into memory.
#[derive(Debug, Clone, Default)]
pub struct CreatureLibrary(pub Vec<CreatureSheet>);

impl CreatureCatalog for CreatureLibrary {
    fn creatures(&self) -> &[CreatureSheet] {
        &self.0
    }
}

/// Vec-backed item catalog.
#[derive(Debug, Clone, Default)]
pub struct ItemLibrary(pub Vec<CatalogItem>);

impl ItemCatalog for ItemLibrary {
    fn items(&self) -> &[CatalogItem] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cr_to_xp_known_values() {
        assert_eq!(xp_for_challenge_rating(0.0), 10);
        assert_eq!(xp_for_challenge_rating(0.25), 50);
        assert_eq!(xp_for_challenge_rating(1.0), 200);
        assert_eq!(xp_for_challenge_rating(5.0), 1_800);
        assert_eq!(xp_for_challenge_rating(20.0), 25_000);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let library = CreatureLibrary(vec![CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50)]);
        assert!(library.creature_by_name("goblin").is_some());
        assert!(library.creature_by_name("GOBLIN").is_some());
        assert!(library.creature_by_name("ogre").is_none());
    }

    #[test]
    fn rarity_orders_low_to_high() {
        assert!(Rarity::Common < Rarity::Uncommon);
        assert!(Rarity::VeryRare < Rarity::Legendary);
    }
}
