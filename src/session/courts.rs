// Court assignment table: who stands where.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::slot::{court_slots, team_slots, GameType, SlotId, Team};
use super::PlayerId;

/// Result of an auto-assign pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoAssignOutcome {
    /// The unassigned pool was empty at call time; nothing was touched.
    NothingToAssign,
    /// `count` players were placed into previously empty slots.
    Assigned { count: usize },
}

/// The assignment table for all courts.
///
/// Keeps a forward map (slot -> player) and an inverse map (player -> slot)
/// consistent on every mutation, so moving a player is O(1) rather than a
/// scan over every slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtBoard {
    num_courts: usize,
    game_types: Vec<GameType>,
    slots: HashMap<SlotId, PlayerId>,
    occupied_by: HashMap<PlayerId, SlotId>,
}

impl CourtBoard {
    pub fn new(num_courts: usize) -> Self {
        CourtBoard {
            num_courts,
            game_types: vec![GameType::default(); num_courts],
            slots: HashMap::new(),
            occupied_by: HashMap::new(),
        }
    }

    pub fn num_courts(&self) -> usize {
        self.num_courts
    }

    /// A court's current game type. Out-of-range courts read as doubles.
    pub fn game_type(&self, court: usize) -> GameType {
        self.game_types.get(court).copied().unwrap_or_default()
    }

    /// Whether a slot exists under its court's current game type.
    fn slot_exists(&self, slot: SlotId) -> bool {
        slot.court < self.num_courts
            && slot.position < self.game_type(slot.court).positions_per_team()
    }

    /// Place `player_id` into `slot`, moving them out of any slot they
    /// currently occupy. Assigning to an occupied slot overwrites it: the
    /// previous occupant is dropped back to unassigned and returned so the
    /// caller can keep track of them.
    ///
    /// Assigning to a slot that does not exist under the court's current
    /// game type is a no-op; this keeps singles courts from ever holding a
    /// position-1 occupant.
    pub fn assign(&mut self, player_id: &PlayerId, slot: SlotId) -> Option<PlayerId> {
        if !self.slot_exists(slot) {
            return None;
        }

        if let Some(old_slot) = self.occupied_by.remove(player_id) {
            self.slots.remove(&old_slot);
        }

        let displaced = self.slots.insert(slot, player_id.clone());
        if let Some(prev) = &displaced {
            self.occupied_by.remove(prev);
        }
        self.occupied_by.insert(player_id.clone(), slot);
        displaced
    }

    /// Empty a slot. No error if it already is.
    pub fn unassign(&mut self, slot: SlotId) -> Option<PlayerId> {
        let removed = self.slots.remove(&slot);
        if let Some(id) = &removed {
            self.occupied_by.remove(id);
        }
        removed
    }

    /// Update a court's game type. Switching to singles force-vacates both
    /// position-1 slots on that court, silently unassigning whoever was
    /// standing there.
    pub fn set_game_type(&mut self, court: usize, game_type: GameType) {
        if court >= self.num_courts {
            return;
        }
        self.game_types[court] = game_type;
        if game_type == GameType::Singles {
            self.unassign(SlotId::new(court, Team::A, 1));
            self.unassign(SlotId::new(court, Team::B, 1));
        }
    }

    pub fn occupant(&self, slot: SlotId) -> Option<&PlayerId> {
        self.slots.get(&slot)
    }

    /// The slot a player currently occupies, if any.
    pub fn slot_of(&self, player_id: &PlayerId) -> Option<SlotId> {
        self.occupied_by.get(player_id).copied()
    }

    pub fn is_assigned(&self, player_id: &PlayerId) -> bool {
        self.occupied_by.contains_key(player_id)
    }

    /// Occupants of one team's slots on a court, position order, empties
    /// filtered out.
    pub fn team_occupants(&self, court: usize, team: Team) -> Vec<PlayerId> {
        team_slots(court, team, self.game_type(court))
            .into_iter()
            .filter_map(|slot| self.slots.get(&slot).cloned())
            .collect()
    }

    /// Empty every slot on a court, both teams.
    pub fn clear_court(&mut self, court: usize) {
        for team in [Team::A, Team::B] {
            for position in 0..2 {
                self.unassign(SlotId::new(court, team, position));
            }
        }
    }

    /// Empty every slot on every court and reset all game types to doubles.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.occupied_by.clear();
        self.game_types = vec![GameType::default(); self.num_courts];
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.len()
    }

    /// Greedy first-fit: walk courts in index order and each court's slots in
    /// fill order (A0, A1, B0, B1 — A0, B0 for singles), placing players from
    /// the front of `pool` into slots that are currently empty. Occupied
    /// slots are never overwritten. Stops as soon as the pool is exhausted.
    pub fn auto_assign(&mut self, pool: &[PlayerId]) -> AutoAssignOutcome {
        if pool.is_empty() {
            return AutoAssignOutcome::NothingToAssign;
        }

        let mut remaining = pool.iter();
        let mut next = remaining.next();
        let mut count = 0;

        'courts: for court in 0..self.num_courts {
            for slot in court_slots(court, self.game_type(court)) {
                let Some(player_id) = next else {
                    break 'courts;
                };
                if self.slots.contains_key(&slot) {
                    continue;
                }
                self.assign(player_id, slot);
                count += 1;
                next = remaining.next();
            }
        }

        AutoAssignOutcome::Assigned { count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: usize) -> PlayerId {
        format!("player-{n}")
    }

    #[test]
    fn assign_and_occupant() {
        let mut board = CourtBoard::new(7);
        let slot = SlotId::new(0, Team::A, 0);
        assert!(board.assign(&pid(1), slot).is_none());
        assert_eq!(board.occupant(slot), Some(&pid(1)));
        assert_eq!(board.slot_of(&pid(1)), Some(slot));
    }

    #[test]
    fn assign_moves_player_between_slots() {
        let mut board = CourtBoard::new(7);
        let first = SlotId::new(0, Team::A, 0);
        let second = SlotId::new(3, Team::B, 1);
        board.assign(&pid(1), first);
        board.assign(&pid(1), second);

        assert_eq!(board.occupant(first), None);
        assert_eq!(board.occupant(second), Some(&pid(1)));
        assert_eq!(board.occupied_count(), 1);
    }

    #[test]
    fn assign_overwrites_and_returns_displaced() {
        let mut board = CourtBoard::new(7);
        let slot = SlotId::new(1, Team::B, 0);
        board.assign(&pid(1), slot);
        let displaced = board.assign(&pid(2), slot);

        assert_eq!(displaced, Some(pid(1)));
        assert_eq!(board.occupant(slot), Some(&pid(2)));
        assert!(!board.is_assigned(&pid(1)));
    }

    #[test]
    fn no_double_occupancy_under_any_sequence() {
        let mut board = CourtBoard::new(7);
        let slots = [
            SlotId::new(0, Team::A, 0),
            SlotId::new(0, Team::A, 1),
            SlotId::new(4, Team::B, 0),
            SlotId::new(0, Team::A, 0),
            SlotId::new(6, Team::B, 1),
        ];
        for slot in slots {
            board.assign(&pid(1), slot);
            let occurrences = (0..board.num_courts())
                .flat_map(|c| court_slots(c, GameType::Doubles))
                .filter(|s| board.occupant(*s) == Some(&pid(1)))
                .count();
            assert_eq!(occurrences, 1);
        }
    }

    #[test]
    fn unassign_is_idempotent() {
        let mut board = CourtBoard::new(7);
        let slot = SlotId::new(2, Team::A, 0);
        board.assign(&pid(1), slot);
        assert_eq!(board.unassign(slot), Some(pid(1)));
        assert_eq!(board.unassign(slot), None);
    }

    #[test]
    fn singles_vacates_position_one_both_teams() {
        let mut board = CourtBoard::new(7);
        board.assign(&pid(1), SlotId::new(0, Team::A, 0));
        board.assign(&pid(2), SlotId::new(0, Team::A, 1));
        board.assign(&pid(3), SlotId::new(0, Team::B, 1));

        board.set_game_type(0, GameType::Singles);

        assert_eq!(board.occupant(SlotId::new(0, Team::A, 1)), None);
        assert_eq!(board.occupant(SlotId::new(0, Team::B, 1)), None);
        assert_eq!(board.occupant(SlotId::new(0, Team::A, 0)), Some(&pid(1)));
        assert!(!board.is_assigned(&pid(2)));
        assert!(!board.is_assigned(&pid(3)));
    }

    #[test]
    fn singles_court_rejects_position_one_assign() {
        let mut board = CourtBoard::new(7);
        board.set_game_type(5, GameType::Singles);
        board.assign(&pid(1), SlotId::new(5, Team::A, 1));
        assert_eq!(board.occupant(SlotId::new(5, Team::A, 1)), None);
        assert!(!board.is_assigned(&pid(1)));
    }

    #[test]
    fn out_of_range_court_is_noop() {
        let mut board = CourtBoard::new(7);
        board.assign(&pid(1), SlotId::new(7, Team::A, 0));
        assert_eq!(board.occupied_count(), 0);
        board.set_game_type(9, GameType::Singles); // no panic
    }

    #[test]
    fn team_occupants_filters_empties() {
        let mut board = CourtBoard::new(7);
        board.assign(&pid(1), SlotId::new(0, Team::B, 1));
        assert_eq!(board.team_occupants(0, Team::B), vec![pid(1)]);
        assert!(board.team_occupants(0, Team::A).is_empty());
    }

    #[test]
    fn team_occupants_respects_singles() {
        let mut board = CourtBoard::new(7);
        board.assign(&pid(1), SlotId::new(0, Team::A, 0));
        board.assign(&pid(2), SlotId::new(0, Team::A, 1));
        // Switching to singles drops position 1; only position 0 remains.
        board.set_game_type(0, GameType::Singles);
        assert_eq!(board.team_occupants(0, Team::A), vec![pid(1)]);
    }

    #[test]
    fn clear_court_empties_both_teams() {
        let mut board = CourtBoard::new(7);
        for (i, slot) in court_slots(3, GameType::Doubles).into_iter().enumerate() {
            board.assign(&pid(i), slot);
        }
        board.clear_court(3);
        assert_eq!(board.occupied_count(), 0);
    }

    #[test]
    fn auto_assign_empty_pool_signals_nothing() {
        let mut board = CourtBoard::new(7);
        assert_eq!(board.auto_assign(&[]), AutoAssignOutcome::NothingToAssign);
    }

    #[test]
    fn auto_assign_fills_in_order() {
        let mut board = CourtBoard::new(7);
        let pool: Vec<PlayerId> = (0..5).map(pid).collect();
        assert_eq!(
            board.auto_assign(&pool),
            AutoAssignOutcome::Assigned { count: 5 }
        );

        // Court 0 fills A0, A1, B0, B1; the fifth player starts court 1.
        assert_eq!(board.occupant(SlotId::new(0, Team::A, 0)), Some(&pid(0)));
        assert_eq!(board.occupant(SlotId::new(0, Team::A, 1)), Some(&pid(1)));
        assert_eq!(board.occupant(SlotId::new(0, Team::B, 0)), Some(&pid(2)));
        assert_eq!(board.occupant(SlotId::new(0, Team::B, 1)), Some(&pid(3)));
        assert_eq!(board.occupant(SlotId::new(1, Team::A, 0)), Some(&pid(4)));
    }

    #[test]
    fn auto_assign_never_overwrites() {
        let mut board = CourtBoard::new(7);
        let occupied = SlotId::new(0, Team::A, 1);
        board.assign(&pid(99), occupied);

        let pool: Vec<PlayerId> = (0..3).map(pid).collect();
        board.auto_assign(&pool);

        assert_eq!(board.occupant(occupied), Some(&pid(99)));
        assert_eq!(board.occupant(SlotId::new(0, Team::A, 0)), Some(&pid(0)));
        assert_eq!(board.occupant(SlotId::new(0, Team::B, 0)), Some(&pid(1)));
        assert_eq!(board.occupant(SlotId::new(0, Team::B, 1)), Some(&pid(2)));
    }

    #[test]
    fn auto_assign_skips_singles_position_one() {
        let mut board = CourtBoard::new(2);
        board.set_game_type(0, GameType::Singles);
        let pool: Vec<PlayerId> = (0..3).map(pid).collect();
        board.auto_assign(&pool);

        assert_eq!(board.occupant(SlotId::new(0, Team::A, 0)), Some(&pid(0)));
        assert_eq!(board.occupant(SlotId::new(0, Team::B, 0)), Some(&pid(1)));
        assert_eq!(board.occupant(SlotId::new(1, Team::A, 0)), Some(&pid(2)));
        assert_eq!(board.occupied_count(), 3);
    }

    #[test]
    fn auto_assign_stops_when_courts_full() {
        let mut board = CourtBoard::new(1);
        let pool: Vec<PlayerId> = (0..10).map(pid).collect();
        assert_eq!(
            board.auto_assign(&pool),
            AutoAssignOutcome::Assigned { count: 4 }
        );
        assert_eq!(board.occupied_count(), 4);
    }

    #[test]
    fn reset_clears_slots_and_game_types() {
        let mut board = CourtBoard::new(7);
        board.assign(&pid(1), SlotId::new(0, Team::A, 0));
        board.set_game_type(2, GameType::Singles);
        board.reset();
        assert_eq!(board.occupied_count(), 0);
        assert_eq!(board.game_type(2), GameType::Doubles);
    }
}
