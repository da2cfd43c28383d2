//! Encounter-difficulty budgeting.
//!
//! Turns party level, party size, and a difficulty tier into an XP budget,
//! then greedily fills the budget from the bestiary. Crowds count for more
//! than the sum of their members, so every candidate is weighed with the
//! group-size multiplier, and a pick that pushes the adjusted total past
//! the overshoot tolerance is rolled back.

use crate::catalog::{CreatureCatalog, CreatureSheet};
use crate::participant::Participant;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from budget computation and encounter generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncounterError {
    #[error("party level must be between 1 and 20, got {0}")]
    InvalidPartyLevel(u8),

    #[error("party size must be at least 1")]
    InvalidPartySize,

    #[error("no creature in the catalog fits the budget")]
    NoSuitableCreatures,
}

/// The four difficulty tiers, easiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Deadly,
}

impl Difficulty {
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Deadly => "deadly",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// XP thresholds per character level, one column per difficulty tier
/// (easy, medium, hard, deadly), indexed by level − 1.
const XP_THRESHOLDS: [[u32; 4]; 20] = [
    [25, 50, 75, 100],
    [50, 100, 150, 200],
    [75, 150, 225, 400],
    [125, 250, 375, 500],
    [250, 500, 750, 1_100],
    [300, 600, 900, 1_400],
    [350, 750, 1_100, 1_700],
    [450, 900, 1_400, 2_100],
    [550, 1_100, 1_600, 2_400],
    [600, 1_200, 1_900, 2_800],
    [800, 1_600, 2_400, 3_600],
    [1_000, 2_000, 3_000, 4_500],
    [1_100, 2_200, 3_400, 5_100],
    [1_250, 2_500, 3_800, 5_700],
    [1_400, 2_800, 4_300, 6_400],
    [1_600, 3_200, 4_800, 7_200],
    [2_000, 3_900, 5_900, 8_800],
    [2_100, 4_200, 6_300, 9_500],
    [2_400, 4_900, 7_300, 10_900],
    [2_800, 5_700, 8_500, 12_700],
];

/// Per-character XP threshold for one level and tier.
pub fn xp_threshold(party_level: u8, difficulty: Difficulty) -> Result<u32, EncounterError> {
    if !(1..=20).contains(&party_level) {
        return Err(EncounterError::InvalidPartyLevel(party_level));
    }
    Ok(XP_THRESHOLDS[(party_level - 1) as usize][difficulty.index()])
}

/// Full-party XP budget: threshold × party size.
pub fn xp_budget(
    party_level: u8,
    party_size: u32,
    difficulty: Difficulty,
) -> Result<u32, EncounterError> {
    if party_size == 0 {
        return Err(EncounterError::InvalidPartySize);
    }
    Ok(xp_threshold(party_level, difficulty)? * party_size)
}

/// A validated encounter request with its derived XP ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterBudget {
    pub party_level: u8,
    pub party_size: u32,
    pub difficulty: Difficulty,
    pub xp_ceiling: u32,
}

impl EncounterBudget {
    pub fn new(
        party_level: u8,
        party_size: u32,
        difficulty: Difficulty,
    ) -> Result<Self, EncounterError> {
        Ok(Self {
            party_level,
            party_size,
            difficulty,
            xp_ceiling: xp_budget(party_level, party_size, difficulty)?,
        })
    }
}

/// Group-size multiplier: several simultaneous opponents are harder than
/// their raw XP sum suggests.
pub fn group_multiplier(count: usize) -> f64 {
    match count {
        0 | 1 => 1.0,
        2 => 1.5,
        3..=6 => 2.0,
        7..=10 => 2.5,
        11..=14 => 3.0,
        _ => 4.0,
    }
}

/// Tunable generation constants. The source app hardcoded both of these;
/// they are configuration here.
#[derive(Debug, Clone)]
pub struct EncounterConfig {
    /// Maximum selection iterations before the generator settles.
    pub attempt_cap: usize,
    /// The adjusted total may reach at most this multiple of the budget.
    pub overshoot_tolerance: f64,
}

impl EncounterConfig {
    pub fn new() -> Self {
        Self {
            attempt_cap: 200,
            overshoot_tolerance: 1.3,
        }
    }

    pub fn with_attempt_cap(mut self, cap: usize) -> Self {
        self.attempt_cap = cap;
        self
    }

    pub fn with_overshoot_tolerance(mut self, tolerance: f64) -> Self {
        self.overshoot_tolerance = tolerance;
        self
    }
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A creature and how many of it the encounter fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterGroup {
    pub creature: CreatureSheet,
    pub count: u32,
}

/// A generated opposition. Ephemeral: recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEncounter {
    pub groups: Vec<EncounterGroup>,
    pub raw_xp: u32,
    pub adjusted_xp: u32,
    pub budget: u32,
}

impl GeneratedEncounter {
    pub fn total_count(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Instantiate the adversary roster this encounter seeds combat with.
    pub fn to_roster(&self) -> Vec<Participant> {
        let mut roster = Vec::new();
        for group in &self.groups {
            for n in 1..=group.count {
                let mut participant = group.creature.to_participant();
                if group.count > 1 {
                    participant.name = format!("{} {n}", group.creature.name);
                }
                roster.push(participant);
            }
        }
        roster
    }
}

/// Generate an encounter with the thread-local RNG.
pub fn generate_encounter(
    catalog: &impl CreatureCatalog,
    party_level: u8,
    party_size: u32,
    difficulty: Difficulty,
    config: &EncounterConfig,
) -> Result<GeneratedEncounter, EncounterError> {
    generate_encounter_with_rng(
        catalog,
        party_level,
        party_size,
        difficulty,
        config,
        &mut rand::thread_rng(),
    )
}

/// Greedy, bounded selection with rollback.
///
/// Never exceeds `overshoot_tolerance × budget` and never returns an empty
/// selection while at least one catalog creature is individually affordable.
pub fn generate_encounter_with_rng<R: Rng>(
    catalog: &impl CreatureCatalog,
    party_level: u8,
    party_size: u32,
    difficulty: Difficulty,
    config: &EncounterConfig,
    rng: &mut R,
) -> Result<GeneratedEncounter, EncounterError> {
    let budget = EncounterBudget::new(party_level, party_size, difficulty)?.xp_ceiling;

    let pool: Vec<&CreatureSheet> = catalog
        .creatures()
        .iter()
        .filter(|c| c.xp_value <= budget)
        .collect();
    if pool.is_empty() {
        return Err(EncounterError::NoSuitableCreatures);
    }

    let mut chosen: Vec<&CreatureSheet> = Vec::new();
    let mut raw_xp: u32 = 0;

    for _ in 0..config.attempt_cap {
        let multiplier = group_multiplier(chosen.len() + 1);
        let remaining = budget as f64 - raw_xp as f64 * multiplier;
        if remaining <= 0.0 && !chosen.is_empty() {
            break;
        }

        let affordable: Vec<&CreatureSheet> = pool
            .iter()
            .copied()
            .filter(|c| c.xp_value as f64 * multiplier <= remaining)
            .collect();

        let pick = match affordable.choose(rng) {
            Some(pick) => *pick,
            None => {
                if chosen.is_empty() {
                    // Nothing fits once the crowd multiplier is applied:
                    // fall back to a single individually-affordable pick.
                    if let Some(single) = pool.choose(rng) {
                        chosen.push(*single);
                        raw_xp += single.xp_value;
                    }
                }
                break;
            }
        };

        chosen.push(pick);
        raw_xp += pick.xp_value;

        let adjusted = raw_xp as f64 * group_multiplier(chosen.len());
        if adjusted > config.overshoot_tolerance * budget as f64 {
            chosen.pop();
            raw_xp -= pick.xp_value;
            break;
        }
    }

    let mut groups: Vec<EncounterGroup> = Vec::new();
    for creature in chosen {
        match groups.iter_mut().find(|g| g.creature.name == creature.name) {
            Some(group) => group.count += 1,
            None => groups.push(EncounterGroup {
                creature: creature.clone(),
                count: 1,
            }),
        }
    }

    let total: u32 = groups.iter().map(|g| g.count).sum();
    let adjusted_xp = (raw_xp as f64 * group_multiplier(total as usize)).round() as u32;

    tracing::debug!(
        budget,
        raw_xp,
        adjusted_xp,
        creatures = total,
        %difficulty,
        "generated encounter"
    );

    Ok(GeneratedEncounter {
        groups,
        raw_xp,
        adjusted_xp,
        budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CreatureLibrary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bestiary() -> CreatureLibrary {
        CreatureLibrary(vec![
            CreatureSheet::new("Rat", 1, 10, 1, 0.0, 10),
            CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50),
            CreatureSheet::new("Orc", 15, 13, 1, 0.5, 100),
            CreatureSheet::new("Ogre", 59, 11, -1, 2.0, 450),
            CreatureSheet::new("Troll", 84, 15, 1, 5.0, 1_800),
        ])
    }

    #[test]
    fn multiplier_steps_match_the_table() {
        assert_eq!(group_multiplier(1), 1.0);
        assert_eq!(group_multiplier(2), 1.5);
        assert_eq!(group_multiplier(3), 2.0);
        assert_eq!(group_multiplier(6), 2.0);
        assert_eq!(group_multiplier(7), 2.5);
        assert_eq!(group_multiplier(10), 2.5);
        assert_eq!(group_multiplier(11), 3.0);
        assert_eq!(group_multiplier(14), 3.0);
        assert_eq!(group_multiplier(15), 4.0);
        assert_eq!(group_multiplier(40), 4.0);
    }

    #[test]
    fn budget_for_level_3_medium_party_of_4() {
        assert_eq!(xp_budget(3, 4, Difficulty::Medium).unwrap(), 600);
        let budget = EncounterBudget::new(3, 4, Difficulty::Medium).unwrap();
        assert_eq!(budget.xp_ceiling, 600);
    }

    #[test]
    fn level_bounds_are_enforced() {
        assert_eq!(
            xp_threshold(0, Difficulty::Easy),
            Err(EncounterError::InvalidPartyLevel(0))
        );
        assert_eq!(
            xp_threshold(21, Difficulty::Easy),
            Err(EncounterError::InvalidPartyLevel(21))
        );
        assert_eq!(
            xp_budget(3, 0, Difficulty::Easy),
            Err(EncounterError::InvalidPartySize)
        );
    }

    #[test]
    fn generation_stays_under_the_overshoot_ceiling() {
        let bestiary = bestiary();
        let config = EncounterConfig::default();
        let mut rng = StdRng::seed_from_u64(99);

        for level in 1..=20u8 {
            for difficulty in [
                Difficulty::Easy,
                Difficulty::Medium,
                Difficulty::Hard,
                Difficulty::Deadly,
            ] {
                for party_size in [1u32, 4, 6] {
                    let encounter = generate_encounter_with_rng(
                        &bestiary, level, party_size, difficulty, &config, &mut rng,
                    )
                    .unwrap();
                    let ceiling = config.overshoot_tolerance
                        * (encounter.budget as f64);
                    assert!(
                        encounter.adjusted_xp as f64 <= ceiling + 0.5,
                        "level {level} {difficulty} x{party_size}: {} > {ceiling}",
                        encounter.adjusted_xp
                    );
                    assert!(encounter.total_count() >= 1);
                }
            }
        }
    }

    #[test]
    fn unsatisfiable_catalog_is_an_explicit_outcome() {
        let bestiary = CreatureLibrary(vec![CreatureSheet::new(
            "Ancient Dragon",
            350,
            22,
            0,
            20.0,
            25_000,
        )]);
        let result = generate_encounter_with_rng(
            &bestiary,
            1,
            1,
            Difficulty::Easy,
            &EncounterConfig::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(result, Err(EncounterError::NoSuitableCreatures));
    }

    #[test]
    fn roster_instantiates_numbered_participants() {
        let encounter = GeneratedEncounter {
            groups: vec![EncounterGroup {
                creature: CreatureSheet::new("Goblin", 7, 15, 2, 0.25, 50),
                count: 3,
            }],
            raw_xp: 150,
            adjusted_xp: 300,
            budget: 600,
        };
        let roster = encounter.to_roster();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].name, "Goblin 1");
        assert_eq!(roster[2].name, "Goblin 3");
    }
}
