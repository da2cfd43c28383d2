//! Post-combat reward allocation.
//!
//! Rewards reflect actual kills, so total XP is the plain sum of the
//! defeated creatures' catalog values, deliberately not the crowd-adjusted
//! number the encounter budgeter works with. The average challenge rating
//! buckets the encounter into a treasure tier, which drives gold, the hoard
//! size, and the rarity ceiling. Creature-specific drops roll independently
//! against each creature's own drop table.

use crate::catalog::{CreatureSheet, ItemCatalog, Rarity};
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Treasure parameters for one challenge-rating bracket.
#[derive(Debug, Clone)]
pub struct TreasureTier {
    pub name: &'static str,
    pub gold_base: u32,
    pub item_count: u32,
    pub magic_item_chance: f64,
    pub max_rarity: Rarity,
}

lazy_static! {
    /// The four treasure tiers, bucketed by average challenge rating:
    /// up to 4, 5–10, 11–16, 17 and above.
    pub static ref TREASURE_TIERS: [TreasureTier; 4] = [
        TreasureTier {
            name: "fledgling",
            gold_base: 100,
            item_count: 2,
            magic_item_chance: 0.3,
            max_rarity: Rarity::Uncommon,
        },
        TreasureTier {
            name: "seasoned",
            gold_base: 500,
            item_count: 3,
            magic_item_chance: 0.4,
            max_rarity: Rarity::Rare,
        },
        TreasureTier {
            name: "veteran",
            gold_base: 2_500,
            item_count: 4,
            magic_item_chance: 0.5,
            max_rarity: Rarity::VeryRare,
        },
        TreasureTier {
            name: "legendary",
            gold_base: 10_000,
            item_count: 5,
            magic_item_chance: 0.6,
            max_rarity: Rarity::Legendary,
        },
    ];
}

/// Pick the treasure tier for an average challenge rating.
pub fn treasure_tier_for(average_cr: f32) -> &'static TreasureTier {
    if average_cr < 5.0 {
        &TREASURE_TIERS[0]
    } else if average_cr < 11.0 {
        &TREASURE_TIERS[1]
    } else if average_cr < 17.0 {
        &TREASURE_TIERS[2]
    } else {
        &TREASURE_TIERS[3]
    }
}

/// Items dropped by one specific creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureDrop {
    pub creature: String,
    pub items: Vec<String>,
}

/// Everything a resolved encounter pays out. Ephemeral, computed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardBundle {
    pub total_xp: u32,
    pub xp_per_player: u32,
    pub gold: u32,
    pub drops: Vec<CreatureDrop>,
    pub hoard: Vec<String>,
}

impl RewardBundle {
    fn empty() -> Self {
        Self {
            total_xp: 0,
            xp_per_player: 0,
            gold: 0,
            drops: Vec::new(),
            hoard: Vec::new(),
        }
    }
}

/// Allocate rewards with the thread-local RNG.
pub fn allocate_rewards(
    defeated: &[CreatureSheet],
    party_size: u32,
    items: &impl ItemCatalog,
) -> RewardBundle {
    allocate_rewards_with_rng(defeated, party_size, items, &mut rand::thread_rng())
}

pub fn allocate_rewards_with_rng<R: Rng>(
    defeated: &[CreatureSheet],
    party_size: u32,
    items: &impl ItemCatalog,
    rng: &mut R,
) -> RewardBundle {
    if defeated.is_empty() {
        return RewardBundle::empty();
    }

    let total_xp: u32 = defeated.iter().map(|c| c.xp_value).sum();
    let xp_per_player = total_xp / party_size.max(1);

    let average_cr =
        defeated.iter().map(|c| c.challenge_rating).sum::<f32>() / defeated.len() as f32;
    let tier = treasure_tier_for(average_cr);

    let gold = (tier.gold_base as f64 * rng.gen_range(0.75..=1.25)).round() as u32;

    let mut drops = Vec::new();
    for creature in defeated {
        let dropped: Vec<String> = creature
            .loot
            .iter()
            .filter(|entry| rng.gen_bool(entry.chance.clamp(0.0, 1.0)))
            .map(|entry| entry.item.clone())
            .collect();
        if !dropped.is_empty() {
            drops.push(CreatureDrop {
                creature: creature.name.clone(),
                items: dropped,
            });
        }
    }

    let mut hoard = Vec::new();
    for _ in 0..tier.item_count {
        let want_magical = rng.gen_bool(tier.magic_item_chance);
        let eligible: Vec<&str> = items
            .items()
            .iter()
            .filter(|i| i.rarity <= tier.max_rarity && i.magical == want_magical)
            .map(|i| i.name.as_str())
            .collect();
        // A catalog without items of the drawn kind falls back to anything
        // under the rarity ceiling.
        let fallback: Vec<&str>;
        let pool = if eligible.is_empty() {
            fallback = items
                .items()
                .iter()
                .filter(|i| i.rarity <= tier.max_rarity)
                .map(|i| i.name.as_str())
                .collect();
            &fallback
        } else {
            &eligible
        };
        if let Some(name) = pool.choose(rng) {
            hoard.push((*name).to_string());
        }
    }

    RewardBundle {
        total_xp,
        xp_per_player,
        gold,
        drops,
        hoard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogItem, CreatureSheet, ItemLibrary, LootEntry};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn armory() -> ItemLibrary {
        ItemLibrary(vec![
            CatalogItem::new("Torch", Rarity::Common, 0.1),
            CatalogItem::new("Healing Potion", Rarity::Common, 50.0).magical(),
            CatalogItem::new("Silvered Sword", Rarity::Uncommon, 250.0),
            CatalogItem::new("Flame Tongue", Rarity::Rare, 5_000.0).magical(),
            CatalogItem::new("Holy Avenger", Rarity::Legendary, 50_000.0).magical(),
        ])
    }

    #[test]
    fn no_kills_no_rewards() {
        let bundle = allocate_rewards_with_rng(
            &[],
            4,
            &armory(),
            &mut StdRng::seed_from_u64(3),
        );
        assert_eq!(bundle, RewardBundle::empty());
    }

    #[test]
    fn total_xp_is_the_plain_sum() {
        let defeated = vec![
            CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50),
            CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50),
            CreatureSheet::new("Ogre", 59, 11, -1, 2.0, 450),
        ];
        let bundle =
            allocate_rewards_with_rng(&defeated, 4, &armory(), &mut StdRng::seed_from_u64(7));
        assert_eq!(bundle.total_xp, 550);
        assert_eq!(bundle.xp_per_player, 137);
    }

    #[test]
    fn gold_stays_within_the_tier_band() {
        let defeated = vec![CreatureSheet::new("Ogre", 59, 11, -1, 2.0, 450)];
        let tier = treasure_tier_for(2.0);
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..500 {
            let bundle = allocate_rewards_with_rng(&defeated, 4, &armory(), &mut rng);
            let gold = bundle.gold as f64;
            assert!(gold >= (tier.gold_base as f64 * 0.75).floor());
            assert!(gold <= (tier.gold_base as f64 * 1.25).ceil());
        }
    }

    #[test]
    fn tier_buckets_by_average_cr() {
        assert_eq!(treasure_tier_for(0.5).name, "fledgling");
        assert_eq!(treasure_tier_for(4.9).name, "fledgling");
        assert_eq!(treasure_tier_for(5.0).name, "seasoned");
        assert_eq!(treasure_tier_for(12.0).name, "veteran");
        assert_eq!(treasure_tier_for(20.0).name, "legendary");
    }

    #[test]
    fn hoard_respects_the_rarity_ceiling() {
        let defeated = vec![CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50)];
        let armory = armory();
        let tier = treasure_tier_for(0.25);
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..100 {
            let bundle = allocate_rewards_with_rng(&defeated, 4, &armory, &mut rng);
            assert_eq!(bundle.hoard.len(), tier.item_count as usize);
            for name in &bundle.hoard {
                let item = armory.0.iter().find(|i| &i.name == name).unwrap();
                assert!(item.rarity <= tier.max_rarity);
            }
        }
    }

    #[test]
    fn certain_drops_always_land() {
        let defeated = vec![CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50)
            .with_loot(LootEntry::new("Rusty Shiv", 1.0))
            .with_loot(LootEntry::new("Moldy Cheese", 0.0))];
        let bundle =
            allocate_rewards_with_rng(&defeated, 4, &armory(), &mut StdRng::seed_from_u64(5));
        assert_eq!(bundle.drops.len(), 1);
        assert_eq!(bundle.drops[0].items, vec!["Rusty Shiv".to_string()]);
    }
}
