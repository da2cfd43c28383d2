//! The combat state machine.
//!
//! [`CombatTracker`] owns the canonical combat state on the host device:
//! the turn order, round counter, action log, and phase. Every public
//! operation validates its inputs, applies the mutation, re-evaluates
//! victory/defeat, and (unless noted) advances the turn, returning the
//! typed [`CombatEvent`]s the mutation produced so a UI can subscribe
//! without the engine knowing anything about rendering.
//!
//! Follower devices hold a read-only copy of [`CombatSnapshot`] replaced
//! wholesale by the sync layer; only the host ever calls the mutating
//! operations here.

use crate::dice::{d20, DiceExpr, Die};
use crate::initiative;
use crate::participant::{Condition, Participant, ParticipantId, Side};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors from combat operations.
///
/// All of these are recoverable: the operation aborts without mutating
/// state, the caller notifies the user, and no turn is consumed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("combat is not active")]
    NotActive,

    #[error("combat is already in progress")]
    AlreadyStarted,

    #[error("cannot start combat with an empty roster")]
    EmptyRoster,

    #[error("no participant with id {0}")]
    UnknownParticipant(ParticipantId),

    #[error("a participant cannot target itself")]
    SelfTarget,

    #[error("target {0} is already out of the fight")]
    TargetIncapacitated(ParticipantId),

    #[error("actor {0} is unable to act")]
    ActorIncapacitated(ParticipantId),

    #[error("participant {0} awaits a revive/destroy resolution")]
    PendingFate(ParticipantId),

    #[error("participant {0} is not awaiting a fate resolution")]
    NotPendingFate(ParticipantId),

    #[error("no usable item named '{0}'")]
    ItemUnavailable(String),
}

/// How a resolved combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatOutcome {
    Victory,
    Defeat,
}

/// Lifecycle phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NotStarted,
    Active,
    Resolved(CombatOutcome),
}

/// One entry of the append-only action log. Immutable once appended;
/// display-only, never re-interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub actor: ParticipantId,
    pub description: String,
    /// Hit points lost (negative) or restored (positive), when applicable.
    pub delta: Option<i32>,
    pub round: u32,
    pub timestamp_ms: u64,
}

/// The canonical combat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSnapshot {
    pub round: u32,
    pub participants: Vec<Participant>,
    pub log: Vec<ActionLogEntry>,
    pub acting: usize,
    pub phase: Phase,
}

impl CombatSnapshot {
    pub fn empty() -> Self {
        Self {
            round: 1,
            participants: Vec::new(),
            log: Vec::new(),
            acting: 0,
            phase: Phase::NotStarted,
        }
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn current_actor(&self) -> Option<&Participant> {
        self.participants.get(self.acting)
    }
}

impl Default for CombatSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Typed events produced by combat operations, in occurrence order.
///
/// A UI subscribes to these instead of reaching into engine internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    CombatStarted { order: Vec<ParticipantId> },
    DamageApplied {
        target: ParticipantId,
        amount: i32,
        new_hp: i32,
    },
    HealingApplied {
        target: ParticipantId,
        amount: i32,
        new_hp: i32,
    },
    HealingIgnored { target: ParticipantId },
    AttackHit {
        attacker: ParticipantId,
        target: ParticipantId,
        roll: i32,
        threshold: i32,
        critical: bool,
    },
    AttackMissed {
        attacker: ParticipantId,
        target: ParticipantId,
        roll: i32,
        threshold: i32,
    },
    ConditionAdded {
        target: ParticipantId,
        condition: Condition,
    },
    ConditionRemoved {
        target: ParticipantId,
        condition: Condition,
    },
    ItemConsumed {
        actor: ParticipantId,
        item: String,
        remaining: u32,
    },
    PendingFateEntered { target: ParticipantId },
    Revived { target: ParticipantId },
    Destroyed { target: ParticipantId },
    TurnAdvanced {
        actor: ParticipantId,
        round: u32,
    },
    RoundStarted { round: u32 },
    CombatResolved { outcome: CombatOutcome },
    CombatReset,
}

/// What one operation did, for the caller to render or broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub events: Vec<CombatEvent>,
}

/// Tunable engine constants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Added to the target's armor class while Defending.
    pub defend_bonus: i32,
    /// Damage rolled on a successful attack.
    pub damage_die: DiceExpr,
    /// Fixed healing granted by the self-heal action.
    pub self_heal_amount: i32,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            defend_bonus: 2,
            damage_die: DiceExpr::new(1, Die::D6, 0),
            self_heal_amount: 5,
        }
    }

    pub fn with_defend_bonus(mut self, bonus: i32) -> Self {
        self.defend_bonus = bonus;
        self
    }

    pub fn with_damage_die(mut self, die: DiceExpr) -> Self {
        self.damage_die = die;
        self
    }

    pub fn with_self_heal_amount(mut self, amount: i32) -> Self {
        self.self_heal_amount = amount;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The host-side combat engine.
pub struct CombatTracker {
    snapshot: CombatSnapshot,
    config: EngineConfig,
}

impl CombatTracker {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            snapshot: CombatSnapshot::empty(),
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.snapshot.phase
    }

    pub fn snapshot(&self) -> &CombatSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Roll initiative over the roster and enter active combat.
    pub fn start_combat(&mut self, roster: &[Participant]) -> Result<ActionOutcome, CombatError> {
        self.start_combat_with_rng(roster, &mut rand::thread_rng())
    }

    pub fn start_combat_with_rng<R: Rng>(
        &mut self,
        roster: &[Participant],
        rng: &mut R,
    ) -> Result<ActionOutcome, CombatError> {
        if self.snapshot.phase != Phase::NotStarted {
            return Err(CombatError::AlreadyStarted);
        }
        if roster.is_empty() {
            return Err(CombatError::EmptyRoster);
        }

        let order = initiative::roll_initiative(roster, rng);
        let ids: Vec<ParticipantId> = order.iter().map(|p| p.id).collect();
        self.snapshot = CombatSnapshot {
            round: 1,
            participants: order,
            log: Vec::new(),
            acting: 0,
            phase: Phase::Active,
        };
        let first = self.snapshot.participants[0].id;
        self.log(first, "combat begins", None);

        Ok(ActionOutcome {
            events: vec![
                CombatEvent::CombatStarted { order: ids },
                CombatEvent::RoundStarted { round: 1 },
            ],
        })
    }

    /// Clear roster, round, log, and acting index; return to not-started.
    pub fn reset(&mut self) -> ActionOutcome {
        self.snapshot = CombatSnapshot::empty();
        ActionOutcome {
            events: vec![CombatEvent::CombatReset],
        }
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Apply flat damage to a target, clamping at 0.
    ///
    /// A player-controlled participant reaching exactly 0 enters the
    /// pending-fate sub-state and must be resolved with [`Self::revive`]
    /// or [`Self::destroy`]. Adversaries at 0 are out of the fight with no
    /// pending step.
    pub fn apply_damage(
        &mut self,
        target: ParticipantId,
        amount: i32,
    ) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(target)?;
        if self.snapshot.participants[idx].is_incapacitated() {
            return Err(CombatError::TargetIncapacitated(target));
        }

        let mut events = Vec::new();
        self.deal_damage(idx, amount, &mut events);
        self.finish_turn(&mut events);
        Ok(ActionOutcome { events })
    }

    /// Apply healing to a target, clamping at its maximum.
    ///
    /// A dead target is unaffected (the operation still succeeds and the
    /// turn advances); a pending-fate target must be resolved first.
    pub fn apply_healing(
        &mut self,
        target: ParticipantId,
        amount: i32,
    ) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(target)?;
        if self.snapshot.participants[idx].pending_fate {
            return Err(CombatError::PendingFate(target));
        }

        let mut events = Vec::new();
        if self.snapshot.participants[idx].has_condition(Condition::Dead) {
            let name = self.snapshot.participants[idx].name.clone();
            self.log(target, format!("{name} is beyond healing"), None);
            events.push(CombatEvent::HealingIgnored { target });
        } else {
            let healed = self.snapshot.participants[idx].hit_points.heal(amount);
            let new_hp = self.snapshot.participants[idx].hit_points.current;
            let name = self.snapshot.participants[idx].name.clone();
            self.log(target, format!("{name} regains {healed} hit points"), Some(healed));
            events.push(CombatEvent::HealingApplied {
                target,
                amount: healed,
                new_hp,
            });
        }
        self.finish_turn(&mut events);
        Ok(ActionOutcome { events })
    }

    /// Resolve an attack: one d20 against the target's armor class (raised
    /// while the target is Defending), damage on a hit. A natural 20 always
    /// hits and doubles the damage dice; a natural 1 always misses. Hit or
    /// miss, the attacker's turn ends.
    pub fn resolve_attack(
        &mut self,
        attacker: ParticipantId,
        target: ParticipantId,
    ) -> Result<ActionOutcome, CombatError> {
        self.resolve_attack_with_rng(attacker, target, &mut rand::thread_rng())
    }

    pub fn resolve_attack_with_rng<R: Rng>(
        &mut self,
        attacker: ParticipantId,
        target: ParticipantId,
        rng: &mut R,
    ) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        if attacker == target {
            return Err(CombatError::SelfTarget);
        }
        let attacker_idx = self.find(attacker)?;
        let target_idx = self.find(target)?;
        if self.snapshot.participants[attacker_idx].is_incapacitated() {
            return Err(CombatError::ActorIncapacitated(attacker));
        }
        if self.snapshot.participants[target_idx].is_incapacitated() {
            return Err(CombatError::TargetIncapacitated(target));
        }

        let defender = &self.snapshot.participants[target_idx];
        let threshold = defender.armor_class
            + if defender.has_condition(Condition::Defending) {
                self.config.defend_bonus
            } else {
                0
            };

        let to_hit = d20(0, rng);
        let hits = !to_hit.natural_1 && (to_hit.total >= threshold || to_hit.natural_20);

        let attacker_name = self.snapshot.participants[attacker_idx].name.clone();
        let target_name = self.snapshot.participants[target_idx].name.clone();

        let mut events = Vec::new();
        if hits {
            events.push(CombatEvent::AttackHit {
                attacker,
                target,
                roll: to_hit.total,
                threshold,
                critical: to_hit.natural_20,
            });

            let mut damage_die = self.config.damage_die.clone();
            if to_hit.natural_20 {
                damage_die.count *= 2;
            }
            let damage = damage_die.roll_with_rng(rng).total.max(1);
            self.log(
                attacker,
                format!("{attacker_name} hits {target_name} for {damage}"),
                Some(-damage),
            );
            self.deal_damage(target_idx, damage, &mut events);
        } else {
            events.push(CombatEvent::AttackMissed {
                attacker,
                target,
                roll: to_hit.total,
                threshold,
            });
            self.log(
                attacker,
                format!("{attacker_name} misses {target_name}"),
                None,
            );
        }

        self.finish_turn(&mut events);
        Ok(ActionOutcome { events })
    }

    /// Take the defend action: raised to-hit threshold until the actor's
    /// next turn ends (the scheduler clears the condition on advance).
    pub fn resolve_defend(&mut self, actor: ParticipantId) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(actor)?;
        if self.snapshot.participants[idx].is_incapacitated() {
            return Err(CombatError::ActorIncapacitated(actor));
        }

        let name = self.snapshot.participants[idx].name.clone();
        self.log(actor, format!("{name} takes a defensive stance"), None);

        let mut events = vec![CombatEvent::ConditionAdded {
            target: actor,
            condition: Condition::Defending,
        }];
        self.finish_turn(&mut events);
        // Inserted after the advance: the outgoing-actor sweep would
        // otherwise end the stance the moment it was taken. It now holds
        // until the defender's next turn ends.
        self.snapshot.participants[idx]
            .conditions
            .insert(Condition::Defending);
        Ok(ActionOutcome { events })
    }

    /// Flee the encounter. The participant keeps their seat in the roster
    /// but is skipped by the scheduler and excluded from their side's
    /// victory/defeat evaluation, permanently.
    pub fn resolve_flee(&mut self, actor: ParticipantId) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(actor)?;
        if self.snapshot.participants[idx].is_incapacitated() {
            return Err(CombatError::ActorIncapacitated(actor));
        }

        self.snapshot.participants[idx]
            .conditions
            .insert(Condition::Fled);
        let name = self.snapshot.participants[idx].name.clone();
        self.log(actor, format!("{name} flees the battle"), None);

        let mut events = vec![CombatEvent::ConditionAdded {
            target: actor,
            condition: Condition::Fled,
        }];
        self.finish_turn(&mut events);
        Ok(ActionOutcome { events })
    }

    /// Spend the turn recovering a fixed amount of hit points.
    pub fn resolve_self_heal(
        &mut self,
        actor: ParticipantId,
    ) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(actor)?;
        if self.snapshot.participants[idx].is_incapacitated() {
            return Err(CombatError::ActorIncapacitated(actor));
        }

        let healed = self.snapshot.participants[idx]
            .hit_points
            .heal(self.config.self_heal_amount);
        let new_hp = self.snapshot.participants[idx].hit_points.current;
        let name = self.snapshot.participants[idx].name.clone();
        self.log(
            actor,
            format!("{name} catches their breath and recovers {healed}"),
            Some(healed),
        );

        let mut events = vec![CombatEvent::HealingApplied {
            target: actor,
            amount: healed,
            new_hp,
        }];
        self.finish_turn(&mut events);
        Ok(ActionOutcome { events })
    }

    /// Use a named consumable from the actor's inventory snapshot: rolls
    /// the item's healing and removes one unit.
    pub fn resolve_use_item(
        &mut self,
        actor: ParticipantId,
        item_name: &str,
    ) -> Result<ActionOutcome, CombatError> {
        self.resolve_use_item_with_rng(actor, item_name, &mut rand::thread_rng())
    }

    pub fn resolve_use_item_with_rng<R: Rng>(
        &mut self,
        actor: ParticipantId,
        item_name: &str,
        rng: &mut R,
    ) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(actor)?;
        if self.snapshot.participants[idx].is_incapacitated() {
            return Err(CombatError::ActorIncapacitated(actor));
        }

        let slot = self.snapshot.participants[idx]
            .consumables
            .iter()
            .position(|c| c.quantity > 0 && c.name.eq_ignore_ascii_case(item_name))
            .ok_or_else(|| CombatError::ItemUnavailable(item_name.to_string()))?;

        let healing = self.snapshot.participants[idx].consumables[slot]
            .healing
            .roll_with_rng(rng)
            .total
            .max(0);
        self.snapshot.participants[idx].consumables[slot].quantity -= 1;
        let remaining = self.snapshot.participants[idx].consumables[slot].quantity;
        let item = self.snapshot.participants[idx].consumables[slot].name.clone();

        let healed = self.snapshot.participants[idx].hit_points.heal(healing);
        let new_hp = self.snapshot.participants[idx].hit_points.current;
        let name = self.snapshot.participants[idx].name.clone();
        self.log(
            actor,
            format!("{name} uses {item} and recovers {healed}"),
            Some(healed),
        );

        let mut events = vec![
            CombatEvent::ItemConsumed {
                actor,
                item,
                remaining,
            },
            CombatEvent::HealingApplied {
                target: actor,
                amount: healed,
                new_hp,
            },
        ];
        self.finish_turn(&mut events);
        Ok(ActionOutcome { events })
    }

    // ========================================================================
    // Pending-fate resolution (no implicit advance)
    // ========================================================================

    /// Resolve a pending fate in the participant's favor: back to 1 hit
    /// point, Weakened, no longer Dead.
    pub fn revive(&mut self, target: ParticipantId) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(target)?;
        if !self.snapshot.participants[idx].pending_fate {
            return Err(CombatError::NotPendingFate(target));
        }

        let participant = &mut self.snapshot.participants[idx];
        participant.pending_fate = false;
        participant.hit_points.current = 1;
        participant.conditions.remove(&Condition::Dead);
        participant.conditions.insert(Condition::Weakened);
        let name = participant.name.clone();
        self.log(target, format!("{name} clings to life"), Some(1));

        Ok(ActionOutcome {
            events: vec![
                CombatEvent::Revived { target },
                CombatEvent::ConditionAdded {
                    target,
                    condition: Condition::Weakened,
                },
            ],
        })
    }

    /// Resolve a pending fate against the participant: Dead, permanently,
    /// at 0 hit points. May resolve the combat as a defeat.
    pub fn destroy(&mut self, target: ParticipantId) -> Result<ActionOutcome, CombatError> {
        self.ensure_active()?;
        let idx = self.find(target)?;
        if !self.snapshot.participants[idx].pending_fate {
            return Err(CombatError::NotPendingFate(target));
        }

        let participant = &mut self.snapshot.participants[idx];
        participant.pending_fate = false;
        participant.conditions.insert(Condition::Dead);
        let name = participant.name.clone();
        self.log(target, format!("{name} succumbs"), None);

        let mut events = vec![
            CombatEvent::Destroyed { target },
            CombatEvent::ConditionAdded {
                target,
                condition: Condition::Dead,
            },
        ];
        self.check_resolution(&mut events);
        Ok(ActionOutcome { events })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_active(&self) -> Result<(), CombatError> {
        if self.snapshot.phase == Phase::Active {
            Ok(())
        } else {
            Err(CombatError::NotActive)
        }
    }

    fn find(&self, id: ParticipantId) -> Result<usize, CombatError> {
        self.snapshot
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or(CombatError::UnknownParticipant(id))
    }

    fn log(&mut self, actor: ParticipantId, description: impl Into<String>, delta: Option<i32>) {
        let entry = ActionLogEntry {
            actor,
            description: description.into(),
            delta,
            round: self.snapshot.round,
            timestamp_ms: now_ms(),
        };
        self.snapshot.log.push(entry);
    }

    /// Shared damage path: clamp, then route 0-HP handling by side.
    fn deal_damage(&mut self, idx: usize, amount: i32, events: &mut Vec<CombatEvent>) {
        let participant = &mut self.snapshot.participants[idx];
        let lost = participant.hit_points.damage(amount);
        let new_hp = participant.hit_points.current;
        let id = participant.id;
        let side = participant.side;
        let name = participant.name.clone();

        events.push(CombatEvent::DamageApplied {
            target: id,
            amount: lost,
            new_hp,
        });
        self.log(id, format!("{name} takes {lost} damage"), Some(-lost));

        if new_hp == 0 && side == Side::Players {
            self.snapshot.participants[idx].pending_fate = true;
            events.push(CombatEvent::PendingFateEntered { target: id });
            self.log(id, format!("{name} falls, fate undecided"), None);
        }
        // Adversaries at 0 are silently out of the fight.
    }

    /// Post-mutation bookkeeping: victory/defeat check, then the implicit
    /// turn advance when combat is still running.
    fn finish_turn(&mut self, events: &mut Vec<CombatEvent>) {
        self.check_resolution(events);
        if self.snapshot.phase != Phase::Active {
            return;
        }

        // The None arm is unreachable through public operations: the
        // victory/defeat check above resolves combat before the order can
        // empty out.
        if let Some(advanced) =
            initiative::advance(&mut self.snapshot.participants, self.snapshot.acting)
        {
            if advanced.wrapped {
                self.snapshot.round += 1;
                events.push(CombatEvent::RoundStarted {
                    round: self.snapshot.round,
                });
            }
            self.snapshot.acting = advanced.next_index;
            events.push(CombatEvent::TurnAdvanced {
                actor: self.snapshot.participants[advanced.next_index].id,
                round: self.snapshot.round,
            });
        }
    }

    /// Victory: no adversary standing. Defeat: no player standing and no
    /// player fate pending. Transition fires at most once per combat.
    fn check_resolution(&mut self, events: &mut Vec<CombatEvent>) {
        if self.snapshot.phase != Phase::Active {
            return;
        }

        let adversaries_standing = self
            .snapshot
            .participants
            .iter()
            .any(|p| p.side == Side::Adversaries && p.is_standing());
        let players_standing = self
            .snapshot
            .participants
            .iter()
            .any(|p| p.side == Side::Players && p.is_standing());
        let players_pending = self
            .snapshot
            .participants
            .iter()
            .any(|p| p.side == Side::Players && p.pending_fate);

        let outcome = if !adversaries_standing {
            CombatOutcome::Victory
        } else if !players_standing && !players_pending {
            CombatOutcome::Defeat
        } else {
            return;
        };

        self.snapshot.phase = Phase::Resolved(outcome);
        events.push(CombatEvent::CombatResolved { outcome });
    }
}

impl Default for CombatTracker {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn started_tracker() -> (CombatTracker, Vec<ParticipantId>) {
        let roster = vec![
            Participant::character("Mira", 12, 14, 2),
            Participant::creature("Goblin", 7, 15, 2, 0.25, 50),
        ];
        let ids: Vec<_> = roster.iter().map(|p| p.id).collect();
        let mut tracker = CombatTracker::default();
        let mut rng = StdRng::seed_from_u64(42);
        tracker.start_combat_with_rng(&roster, &mut rng).unwrap();
        (tracker, ids)
    }

    #[test]
    fn operations_require_active_combat() {
        let mut tracker = CombatTracker::default();
        let id = ParticipantId::new();
        assert_eq!(tracker.apply_damage(id, 3), Err(CombatError::NotActive));
    }

    #[test]
    fn unknown_target_is_rejected_without_mutation() {
        let (mut tracker, _) = started_tracker();
        let before = tracker.snapshot().clone();
        let err = tracker.apply_damage(ParticipantId::new(), 3).unwrap_err();
        assert!(matches!(err, CombatError::UnknownParticipant(_)));
        assert_eq!(tracker.snapshot(), &before);
    }

    #[test]
    fn self_target_is_rejected() {
        let (mut tracker, ids) = started_tracker();
        assert_eq!(
            tracker.resolve_attack(ids[0], ids[0]),
            Err(CombatError::SelfTarget)
        );
    }

    #[test]
    fn player_at_zero_enters_pending_fate() {
        let (mut tracker, ids) = started_tracker();
        let outcome = tracker.apply_damage(ids[0], 50).unwrap();
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::PendingFateEntered { .. })));
        let mira = tracker.snapshot().participant(ids[0]).unwrap();
        assert!(mira.pending_fate);
        assert_eq!(mira.hit_points.current, 0);
        // Not auto-resolved either way.
        assert!(!mira.has_condition(Condition::Dead));
        assert_eq!(tracker.phase(), Phase::Active);
    }

    #[test]
    fn adversary_at_zero_resolves_victory_once() {
        let (mut tracker, ids) = started_tracker();
        let outcome = tracker.apply_damage(ids[1], 50).unwrap();
        assert_eq!(tracker.phase(), Phase::Resolved(CombatOutcome::Victory));
        assert_eq!(
            outcome
                .events
                .iter()
                .filter(|e| matches!(e, CombatEvent::CombatResolved { .. }))
                .count(),
            1
        );
        // Further mutation is rejected, so no second transition can fire.
        assert_eq!(tracker.apply_damage(ids[1], 1), Err(CombatError::NotActive));
    }

    #[test]
    fn revive_restores_one_hp_and_weakened() {
        let (mut tracker, ids) = started_tracker();
        tracker.apply_damage(ids[0], 50).unwrap();
        tracker.revive(ids[0]).unwrap();

        let mira = tracker.snapshot().participant(ids[0]).unwrap();
        assert_eq!(mira.hit_points.current, 1);
        assert!(mira.has_condition(Condition::Weakened));
        assert!(!mira.has_condition(Condition::Dead));
        assert!(!mira.pending_fate);
    }

    #[test]
    fn destroy_marks_dead_and_may_resolve_defeat() {
        let (mut tracker, ids) = started_tracker();
        tracker.apply_damage(ids[0], 50).unwrap();
        // Pending fate defers the defeat check.
        assert_eq!(tracker.phase(), Phase::Active);

        tracker.destroy(ids[0]).unwrap();
        let mira = tracker.snapshot().participant(ids[0]).unwrap();
        assert_eq!(mira.hit_points.current, 0);
        assert!(mira.has_condition(Condition::Dead));
        assert!(!mira.pending_fate);
        // Sole player destroyed: combat resolves to defeat.
        assert_eq!(tracker.phase(), Phase::Resolved(CombatOutcome::Defeat));
    }

    #[test]
    fn fate_operations_reject_participants_not_pending() {
        let (mut tracker, ids) = started_tracker();
        assert_eq!(
            tracker.revive(ids[0]),
            Err(CombatError::NotPendingFate(ids[0]))
        );
        assert_eq!(
            tracker.destroy(ids[1]),
            Err(CombatError::NotPendingFate(ids[1]))
        );
    }

    #[test]
    fn reset_returns_to_not_started() {
        let (mut tracker, _) = started_tracker();
        tracker.reset();
        assert_eq!(tracker.phase(), Phase::NotStarted);
        assert!(tracker.snapshot().participants.is_empty());
        assert!(tracker.snapshot().log.is_empty());
    }
}
