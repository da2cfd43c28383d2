//! Combat participant types.
//!
//! A participant is one seat at the table during an encounter: a
//! player-controlled character or an adversary creature, reduced to the
//! fields the engine needs. The full character/creature sheets live with
//! the catalog collaborators; a [`SheetRef`] tags which kind of sheet a
//! participant came from.

use crate::dice::DiceExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for combat participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the encounter a participant fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Players,
    Adversaries,
}

/// Named conditions a participant can hold.
///
/// Order is irrelevant; a participant either holds a condition or does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Raised to-hit threshold until the holder's next turn ends.
    Defending,
    /// Left the fight permanently; skipped in turn order and excluded from
    /// the holder's side when evaluating victory or defeat.
    Fled,
    /// Out of the fight for good.
    Dead,
    /// Carried by characters brought back from the brink.
    Weakened,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Defending => "defending",
            Condition::Fled => "fled",
            Condition::Dead => "dead",
            Condition::Weakened => "weakened",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Hit point tracking. Current is clamped to `[0, maximum]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Apply damage, clamping at 0. Returns the hit points actually lost.
    pub fn damage(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current - amount.max(0)).max(0);
        before - self.current
    }

    /// Apply healing, clamping at the maximum. Returns the hit points
    /// actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.maximum);
        self.current - before
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }
}

/// A consumable the participant carries into combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub name: String,
    /// Healing granted per use.
    pub healing: DiceExpr,
    pub quantity: u32,
}

impl Consumable {
    pub fn new(name: impl Into<String>, healing: DiceExpr, quantity: u32) -> Self {
        Self {
            name: name.into(),
            healing,
            quantity,
        }
    }
}

/// Tagged reference to the sheet a participant was built from, carrying only
/// the fields the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SheetRef {
    Character { dexterity_modifier: i32 },
    Creature {
        dexterity_modifier: i32,
        challenge_rating: f32,
        xp_value: u32,
    },
}

impl SheetRef {
    pub fn dexterity_modifier(&self) -> i32 {
        match self {
            SheetRef::Character { dexterity_modifier }
            | SheetRef::Creature {
                dexterity_modifier, ..
            } => *dexterity_modifier,
        }
    }
}

/// One participant in a combat encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub side: Side,
    pub hit_points: HitPoints,
    pub armor_class: i32,
    pub initiative: i32,
    pub conditions: BTreeSet<Condition>,
    pub is_acting: bool,
    /// Set when a player-controlled participant drops to exactly 0 HP and
    /// awaits an explicit revive/destroy resolution.
    pub pending_fate: bool,
    pub sheet: SheetRef,
    pub consumables: Vec<Consumable>,
}

impl Participant {
    /// Build a player-controlled participant from character-sheet fields.
    pub fn character(
        name: impl Into<String>,
        max_hp: i32,
        armor_class: i32,
        dexterity_modifier: i32,
    ) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            side: Side::Players,
            hit_points: HitPoints::new(max_hp),
            armor_class,
            initiative: 0,
            conditions: BTreeSet::new(),
            is_acting: false,
            pending_fate: false,
            sheet: SheetRef::Character { dexterity_modifier },
            consumables: Vec::new(),
        }
    }

    /// Build an adversary participant from creature-sheet fields.
    pub fn creature(
        name: impl Into<String>,
        max_hp: i32,
        armor_class: i32,
        dexterity_modifier: i32,
        challenge_rating: f32,
        xp_value: u32,
    ) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            side: Side::Adversaries,
            hit_points: HitPoints::new(max_hp),
            armor_class,
            initiative: 0,
            conditions: BTreeSet::new(),
            is_acting: false,
            pending_fate: false,
            sheet: SheetRef::Creature {
                dexterity_modifier,
                challenge_rating,
                xp_value,
            },
            consumables: Vec::new(),
        }
    }

    pub fn with_consumable(mut self, consumable: Consumable) -> Self {
        self.consumables.push(consumable);
        self
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.contains(&condition)
    }

    pub fn initiative_modifier(&self) -> i32 {
        self.sheet.dexterity_modifier()
    }

    /// Still fighting for their side: positive hit points and not fled.
    pub fn is_standing(&self) -> bool {
        self.hit_points.current > 0 && !self.has_condition(Condition::Fled)
    }

    /// May be selected by turn advancement.
    pub fn is_eligible(&self) -> bool {
        self.is_standing()
    }

    /// Cannot meaningfully be attacked or take actions.
    pub fn is_incapacitated(&self) -> bool {
        self.hit_points.is_depleted()
            || self.has_condition(Condition::Dead)
            || self.has_condition(Condition::Fled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_and_heal_clamp() {
        let mut hp = HitPoints::new(10);
        assert_eq!(hp.damage(4), 4);
        assert_eq!(hp.current, 6);
        assert_eq!(hp.damage(100), 6);
        assert_eq!(hp.current, 0);
        assert_eq!(hp.heal(3), 3);
        assert_eq!(hp.heal(100), 7);
        assert_eq!(hp.current, 10);
    }

    #[test]
    fn negative_amounts_are_ignored() {
        let mut hp = HitPoints::new(10);
        assert_eq!(hp.damage(-5), 0);
        assert_eq!(hp.current, 10);
        hp.damage(3);
        assert_eq!(hp.heal(-5), 0);
        assert_eq!(hp.current, 7);
    }

    #[test]
    fn fled_participants_are_not_standing() {
        let mut p = Participant::character("Mira", 12, 14, 2);
        assert!(p.is_standing());
        p.conditions.insert(Condition::Fled);
        assert!(!p.is_standing());
        assert!(p.is_incapacitated());
    }
}
