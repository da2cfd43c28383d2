//! Combat engine for a tabletop-RPG session aid.
//!
//! This crate provides:
//! - A turn-based combat state machine with initiative, conditions, an
//!   append-only action log, and explicit victory/defeat resolution
//! - One-way host→follower snapshot replication over a short-range link
//! - Encounter generation under an XP budget with crowd-size multipliers
//! - Post-combat reward rolling (XP, gold, drops, hoard)
//!
//! # Quick start
//!
//! ```
//! use warband_core::testing;
//! use warband_core::tracker::CombatTracker;
//!
//! let mut tracker = CombatTracker::default();
//! let mut rng = testing::seeded_rng(7);
//! let outcome = tracker
//!     .start_combat_with_rng(&testing::sample_roster(), &mut rng)
//!     .expect("fresh tracker accepts a roster");
//! assert!(!outcome.events.is_empty());
//! ```

pub mod catalog;
pub mod dice;
pub mod encounter;
pub mod initiative;
pub mod participant;
pub mod rewards;
pub mod sync;
pub mod testing;
pub mod tracker;
pub mod wire;

// Primary public API
pub use catalog::{CreatureCatalog, CreatureSheet, ItemCatalog, Rarity};
pub use encounter::{
    generate_encounter, xp_budget, Difficulty, EncounterBudget, EncounterConfig, EncounterError,
    GeneratedEncounter,
};
pub use participant::{Condition, Participant, ParticipantId, Side};
pub use rewards::{allocate_rewards, RewardBundle};
pub use sync::{Follower, HostSession, SyncConfig, SyncError};
pub use tracker::{
    ActionOutcome, CombatError, CombatEvent, CombatOutcome, CombatSnapshot, CombatTracker,
    EngineConfig, Phase,
};
