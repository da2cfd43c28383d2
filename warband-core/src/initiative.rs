//! Turn-order scheduling.
//!
//! Initiative is one d20 per participant plus their dexterity-derived
//! modifier, sorted descending. Ties keep roster insertion order (stable
//! sort) so the ordering is deterministic for a given set of rolls.

use crate::dice::d20;
use crate::participant::{Condition, Participant};
use rand::Rng;

/// Result of advancing the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advanced {
    pub next_index: usize,
    /// True when the new index is numerically before the old one, i.e. the
    /// order wrapped around the table and a new round begins.
    pub wrapped: bool,
}

/// Roll initiative for a roster and return the turn order.
///
/// The input is untouched; the returned sequence is a permutation of it with
/// initiative scores assigned and exactly the first entry marked acting.
pub fn roll_initiative<R: Rng>(roster: &[Participant], rng: &mut R) -> Vec<Participant> {
    let mut order: Vec<Participant> = roster.to_vec();
    for participant in &mut order {
        participant.initiative = d20(participant.initiative_modifier(), rng).total;
        participant.is_acting = false;
    }
    order.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    if let Some(first) = order.first_mut() {
        first.is_acting = true;
    }
    order
}

/// Advance to the next eligible participant, walking the order circularly
/// and skipping anyone at 0 hit points or fled.
///
/// Returns `None` when the walk comes back to the start without finding an
/// eligible actor: combat should already have been resolved by the
/// victory/defeat checks before that point; this function never loops.
///
/// The outgoing actor's `Defending` condition is cleared: defending
/// protection lasts exactly one round.
pub fn advance(participants: &mut [Participant], current: usize) -> Option<Advanced> {
    if participants.is_empty() {
        return None;
    }
    let current = current.min(participants.len() - 1);

    let mut idx = current;
    let next = loop {
        idx = (idx + 1) % participants.len();
        if participants[idx].is_eligible() {
            break idx;
        }
        if idx == current {
            return None;
        }
    };

    participants[current].conditions.remove(&Condition::Defending);
    participants[current].is_acting = false;
    participants[next].is_acting = true;

    Some(Advanced {
        next_index: next,
        wrapped: next < current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn roster() -> Vec<Participant> {
        vec![
            Participant::character("Mira", 12, 14, 2),
            Participant::character("Dorn", 15, 16, 0),
            Participant::creature("Goblin", 7, 15, 2, 0.25, 50),
            Participant::creature("Wolf", 11, 13, 2, 0.25, 50),
        ]
    }

    #[test]
    fn initiative_is_a_permutation_with_one_acting() {
        let roster = roster();
        let mut rng = StdRng::seed_from_u64(11);
        let order = roll_initiative(&roster, &mut rng);

        assert_eq!(order.len(), roster.len());
        let mut expected: BTreeSet<_> = roster.iter().map(|p| p.id).collect();
        for p in &order {
            assert!(expected.remove(&p.id));
        }
        assert_eq!(order.iter().filter(|p| p.is_acting).count(), 1);
        assert!(order[0].is_acting);
    }

    #[test]
    fn initiative_sorts_descending() {
        let mut rng = StdRng::seed_from_u64(5);
        let order = roll_initiative(&roster(), &mut rng);
        for pair in order.windows(2) {
            assert!(pair[0].initiative >= pair[1].initiative);
        }
    }

    #[test]
    fn ties_keep_insertion_order() {
        let roster = roster();
        let first_id = roster[0].id;
        let second_id = roster[1].id;

        // Force identical scores and verify the stable-sort tie-break.
        let mut order = roster;
        for p in &mut order {
            p.initiative = 10;
        }
        order.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        assert_eq!(order[0].id, first_id);
        assert_eq!(order[1].id, second_id);
    }

    #[test]
    fn advance_skips_downed_and_fled() {
        let mut order = roster();
        order[1].hit_points.current = 0;
        order[2].conditions.insert(Condition::Fled);
        order[0].is_acting = true;

        let advanced = advance(&mut order, 0).unwrap();
        assert_eq!(advanced.next_index, 3);
        assert!(order[3].is_acting);
        assert!(!order[0].is_acting);
    }

    #[test]
    fn advance_wraps_and_reports_it() {
        let mut order = roster();
        order[3].is_acting = true;
        let advanced = advance(&mut order, 3).unwrap();
        assert_eq!(advanced.next_index, 0);
        assert!(advanced.wrapped);
    }

    #[test]
    fn advance_returns_none_when_nobody_is_eligible() {
        let mut order = roster();
        for p in &mut order {
            p.hit_points.current = 0;
        }
        assert_eq!(advance(&mut order, 0), None);
    }

    #[test]
    fn sole_eligible_actor_keeps_the_turn_without_wrapping() {
        let mut order = roster();
        order[0].hit_points.current = 0;
        order[2].hit_points.current = 0;
        order[3].hit_points.current = 0;
        order[1].is_acting = true;

        let advanced = advance(&mut order, 1).unwrap();
        assert_eq!(advanced.next_index, 1);
        assert!(!advanced.wrapped);
        assert!(order[1].is_acting);
    }

    #[test]
    fn advance_clears_outgoing_defending() {
        let mut order = roster();
        order[0].conditions.insert(Condition::Defending);
        order[0].is_acting = true;

        advance(&mut order, 0).unwrap();
        assert!(!order[0].has_condition(Condition::Defending));
    }
}
