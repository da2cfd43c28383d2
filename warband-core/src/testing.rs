//! Test support: sample rosters, catalogs, and deterministic dice.
//!
//! Shipped in the library so integration tests and downstream consumers
//! can stand up a plausible table without hand-rolling fixtures.

use crate::catalog::{CatalogItem, CreatureLibrary, CreatureSheet, ItemEffect, ItemLibrary, LootEntry, Rarity};
use crate::dice::DiceExpr;
use crate::participant::{Consumable, Participant};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A seeded RNG for reproducible rolls.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A healing-potion consumable.
pub fn healing_potion(quantity: u32) -> Consumable {
    Consumable::new("Healing Potion", DiceExpr::parse("2d4+2").expect("valid notation"), quantity)
}

/// A small adventuring party: a duelist and a shieldbearer with potions.
pub fn sample_party() -> Vec<Participant> {
    vec![
        Participant::character("Mira", 12, 14, 2).with_consumable(healing_potion(2)),
        Participant::character("Dorn", 18, 17, 0).with_consumable(healing_potion(1)),
    ]
}

/// A small bestiary spanning the low challenge ratings.
pub fn sample_bestiary() -> CreatureLibrary {
    CreatureLibrary(vec![
        CreatureSheet::new("Rat", 1, 10, 1, 0.0, 10),
        CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50)
            .with_loot(LootEntry::new("Rusty Shiv", 0.5))
            .with_loot(LootEntry::new("Copper Coins", 0.8)),
        CreatureSheet::new("Wolf", 11, 13, 2, 0.25, 50),
        CreatureSheet::new("Orc", 15, 13, 1, 0.5, 100).with_loot(LootEntry::new("Greataxe", 0.3)),
        CreatureSheet::new("Ogre", 59, 11, -1, 2.0, 450).with_loot(LootEntry::new("Club", 0.6)),
    ])
}

/// A small item catalog with mundane and magical entries at several
/// rarities.
pub fn sample_armory() -> ItemLibrary {
    ItemLibrary(vec![
        CatalogItem::new("Torch", Rarity::Common, 0.1),
        CatalogItem::new("Rope", Rarity::Common, 1.0),
        CatalogItem::new("Healing Potion", Rarity::Common, 50.0)
            .magical()
            .with_effect(ItemEffect::Healing(
                DiceExpr::parse("2d4+2").expect("valid notation"),
            )),
        CatalogItem::new("Silvered Sword", Rarity::Uncommon, 250.0),
        CatalogItem::new("Bag of Holding", Rarity::Uncommon, 500.0).magical(),
        CatalogItem::new("Flame Tongue", Rarity::Rare, 5_000.0).magical(),
        CatalogItem::new("Staff of Power", Rarity::VeryRare, 20_000.0).magical(),
        CatalogItem::new("Holy Avenger", Rarity::Legendary, 50_000.0).magical(),
    ])
}

/// The sample party plus a pair of goblins, ready for initiative.
pub fn sample_roster() -> Vec<Participant> {
    let mut roster = sample_party();
    let bestiary = sample_bestiary();
    let goblin = bestiary
        .0
        .iter()
        .find(|c| c.name == "Goblin")
        .expect("sample bestiary has goblins");
    let mut first = goblin.to_participant();
    first.name = "Goblin 1".to_string();
    let mut second = goblin.to_participant();
    second.name = "Goblin 2".to_string();
    roster.push(first);
    roster.push(second);
    roster
}
