// Session state: the roster present today plus everything a single session
// accumulates (assignments, losses, fees, drinks, adjustments).
//
// Every user action is a plain method on `SessionState` (old state + action
// -> new state), so the whole flow is unit testable without a UI harness.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{Config, Drink};

use super::billing::{self, PlayerDetails, SessionSummary};
use super::courts::{AutoAssignOutcome, CourtBoard};
use super::history::SessionRecord;
use super::settlement::{self, Ledgers};
use super::slot::{GameType, SlotId, Team};
use super::PlayerId;

/// Reserved id for the permanent guest pseudo-player.
pub const GUEST_PLAYER_ID: &str = "guest-player-id";
/// Display name for walk-in guests.
pub const GUEST_PLAYER_NAME: &str = "Khách vãng lai";

const DEFAULT_PLAYER_NAMES: [&str; 2] = ["Người chơi 1", "Người chơi 2"];

/// A signed manual correction to a player's bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub amount: f64,
    pub reason: String,
}

/// A player present at the venue today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    /// Drink id -> quantity consumed. Zero-quantity entries are removed.
    #[serde(default)]
    pub consumed_drinks: HashMap<String, u32>,
    #[serde(default)]
    pub is_guest: bool,
    /// Headcount multiplier, meaningful for the guest only. Never below 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub adjustment: Adjustment,
    #[serde(default)]
    pub is_paid: bool,
}

fn default_quantity() -> u32 {
    1
}

impl Player {
    pub fn new_regular(name: &str, phone: &str) -> Self {
        Player {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            consumed_drinks: HashMap::new(),
            is_guest: false,
            quantity: 1,
            adjustment: Adjustment::default(),
            is_paid: false,
        }
    }

    /// The permanent guest: billed by quantity, never assigned to a slot,
    /// never removed.
    pub fn guest() -> Self {
        Player {
            id: GUEST_PLAYER_ID.to_string(),
            name: GUEST_PLAYER_NAME.to_string(),
            phone: String::new(),
            consumed_drinks: HashMap::new(),
            is_guest: true,
            quantity: 1,
            adjustment: Adjustment::default(),
            is_paid: false,
        }
    }

    /// Reset the per-session fields, keeping identity (id, name, phone).
    fn reset_session_fields(&mut self) {
        self.consumed_drinks.clear();
        self.quantity = 1;
        self.adjustment = Adjustment::default();
        self.is_paid = false;
    }
}

/// A persisted roster row: identity only, no per-session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

/// Settlement data with names resolved, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub match_number: u32,
    pub loser_names: Vec<String>,
    pub fee_per_loser: f64,
}

/// The complete in-memory state of one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub players: Vec<Player>,
    pub board: CourtBoard,
    pub ledgers: Ledgers,
    court_fee: f64,
    shuttlecock_fee_per_match: f64,
    menu: Vec<Drink>,
}

impl SessionState {
    /// Build a fresh session from config and the persisted roster. An empty
    /// roster seeds two default players; the guest always comes first.
    pub fn new(config: &Config, roster: Vec<RosterEntry>) -> Self {
        let mut players = vec![Player::guest()];
        if roster.is_empty() {
            for name in DEFAULT_PLAYER_NAMES {
                players.push(Player::new_regular(name, ""));
            }
        } else {
            players.extend(roster.into_iter().filter(|e| e.id != GUEST_PLAYER_ID).map(
                |e| Player {
                    id: e.id,
                    name: e.name,
                    phone: e.phone,
                    consumed_drinks: HashMap::new(),
                    is_guest: false,
                    quantity: 1,
                    adjustment: Adjustment::default(),
                    is_paid: false,
                },
            ));
        }

        SessionState {
            players,
            board: CourtBoard::new(config.venue.num_courts),
            ledgers: Ledgers::default(),
            court_fee: config.venue.court_fee,
            shuttlecock_fee_per_match: config.venue.shuttlecock_fee_per_match,
            menu: config.drinks.clone(),
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Non-guest players not currently standing in any slot, roster order.
    pub fn unassigned_players(&self) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|p| !p.is_guest && !self.board.is_assigned(&p.id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Court actions
    // ------------------------------------------------------------------

    /// Assign a player to a slot. The guest is never assignable. Returns the
    /// displaced occupant, if the slot was taken.
    pub fn assign(&mut self, player_id: &str, slot: SlotId) -> Option<PlayerId> {
        let player = self.player(player_id)?;
        if player.is_guest {
            return None;
        }
        let id = player.id.clone();
        self.board.assign(&id, slot)
    }

    pub fn unassign(&mut self, slot: SlotId) -> Option<PlayerId> {
        self.board.unassign(slot)
    }

    pub fn set_game_type(&mut self, court: usize, game_type: GameType) {
        self.board.set_game_type(court, game_type);
    }

    /// Fill empty slots from the unassigned pool, greedy first-fit.
    pub fn auto_assign(&mut self) -> AutoAssignOutcome {
        let pool: Vec<PlayerId> = self
            .unassigned_players()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        self.board.auto_assign(&pool)
    }

    /// Settle a finished match. Returns `None` when the losing team's slots
    /// were all empty (nothing changes in that case).
    pub fn end_match(&mut self, court: usize, losing_team: Team) -> Option<MatchResult> {
        let settlement = settlement::settle_match(
            &mut self.board,
            &mut self.ledgers,
            court,
            losing_team,
            self.shuttlecock_fee_per_match,
        )?;

        let loser_names = settlement
            .losers
            .iter()
            .filter_map(|id| self.player(id).map(|p| p.name.clone()))
            .collect();

        Some(MatchResult {
            match_number: settlement.match_number,
            loser_names,
            fee_per_loser: settlement.fee_per_loser,
        })
    }

    // ------------------------------------------------------------------
    // Roster actions
    // ------------------------------------------------------------------

    /// Add a player by name. Blank names are rejected.
    pub fn add_player(&mut self, name: &str) -> Option<&Player> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.players.push(Player::new_regular(name, ""));
        self.players.last()
    }

    /// Remove a player: frees their slot and drops their session counters.
    /// The guest cannot be removed.
    pub fn remove_player(&mut self, id: &str) -> bool {
        let Some(player) = self.player(id) else {
            return false;
        };
        if player.is_guest {
            return false;
        }
        let id = player.id.clone();
        if let Some(slot) = self.board.slot_of(&id) {
            self.board.unassign(slot);
        }
        self.ledgers.forget_player(&id);
        self.players.retain(|p| p.id != id);
        true
    }

    pub fn update_player_info(&mut self, id: &str, name: &str, phone: &str) -> bool {
        match self.player_mut(id) {
            Some(p) if !p.is_guest => {
                p.name = name.trim().to_string();
                p.phone = phone.trim().to_string();
                true
            }
            _ => false,
        }
    }

    /// Replace the non-guest roster with imported (name, phone) entries.
    /// Assignments and session counters start over; the guest stays.
    pub fn import_players(&mut self, entries: &[(String, String)]) -> usize {
        self.players.retain(|p| p.is_guest);
        for (name, phone) in entries {
            self.players.push(Player::new_regular(name, phone));
        }
        self.board.reset();
        self.ledgers.reset();
        entries.len()
    }

    /// Persistable roster rows (guest excluded).
    pub fn roster_stubs(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .filter(|p| !p.is_guest)
            .map(|p| RosterEntry {
                id: p.id.clone(),
                name: p.name.clone(),
                phone: p.phone.clone(),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Billing actions
    // ------------------------------------------------------------------

    /// Bump a drink tally by `delta` (may be negative). Clamped at zero;
    /// zero-quantity entries are dropped.
    pub fn update_drink(&mut self, id: &str, drink_id: &str, delta: i32) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        let current = player.consumed_drinks.get(drink_id).copied().unwrap_or(0);
        let updated = (i64::from(current) + i64::from(delta)).max(0) as u32;
        if updated == 0 {
            player.consumed_drinks.remove(drink_id);
        } else {
            player.consumed_drinks.insert(drink_id.to_string(), updated);
        }
        true
    }

    /// Bump the guest headcount by `delta`, floored at 1. Regular players
    /// always count as exactly one head.
    pub fn update_quantity(&mut self, id: &str, delta: i32) -> bool {
        match self.player_mut(id) {
            Some(p) if p.is_guest => {
                p.quantity = (i64::from(p.quantity) + i64::from(delta)).max(1) as u32;
                true
            }
            _ => false,
        }
    }

    pub fn set_adjustment(&mut self, id: &str, amount: f64, reason: &str) -> bool {
        match self.player_mut(id) {
            Some(p) => {
                // Coerce rather than reject: a non-finite amount becomes 0 so
                // it cannot poison downstream sums.
                p.adjustment = Adjustment {
                    amount: if amount.is_finite() { amount } else { 0.0 },
                    reason: reason.trim().to_string(),
                };
                true
            }
            None => false,
        }
    }

    pub fn toggle_paid(&mut self, id: &str) -> bool {
        match self.player_mut(id) {
            Some(p) => {
                p.is_paid = !p.is_paid;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_paid(&mut self) {
        for p in &mut self.players {
            p.is_paid = true;
        }
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    pub fn details(&self) -> Vec<PlayerDetails> {
        billing::derive_details(&self.players, &self.ledgers, &self.menu, self.court_fee)
    }

    pub fn summary(&self) -> SessionSummary {
        billing::summarize(&self.details(), self.court_fee)
    }

    pub fn total_paid(&self) -> f64 {
        billing::total_paid(&self.details())
    }

    pub fn head_count(&self) -> u32 {
        billing::head_count(&self.players)
    }

    pub fn menu(&self) -> &[Drink] {
        &self.menu
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Freeze the current session into a history record and start a new one.
    /// The roster carries over; assignments, counters, drinks, adjustments
    /// and paid flags do not.
    pub fn save_session(&mut self, now: chrono::DateTime<chrono::Utc>) -> SessionRecord {
        let details = self.details();
        let summary = billing::summarize(&details, self.court_fee);
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            date: now,
            // Recorded as doubles regardless of per-court settings; the
            // per-court game types are session-local knobs, not a property
            // of the saved record.
            game_type: GameType::Doubles,
            players: details,
            summary,
        };
        self.reset_session();
        record
    }

    /// Back to a blank session: roster identity survives, everything else
    /// resets.
    pub fn reset_session(&mut self) {
        for p in &mut self.players {
            p.reset_session_fields();
        }
        self.board.reset();
        self.ledgers.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::slot::{GameType, SlotId, Team};

    fn state() -> SessionState {
        SessionState::new(&Config::default(), vec![])
    }

    fn state_with(names: &[&str]) -> SessionState {
        let roster = names
            .iter()
            .enumerate()
            .map(|(i, name)| RosterEntry {
                id: format!("p{i}"),
                name: name.to_string(),
                phone: String::new(),
            })
            .collect();
        SessionState::new(&Config::default(), roster)
    }

    #[test]
    fn empty_roster_seeds_guest_and_defaults() {
        let state = state();
        assert_eq!(state.players.len(), 3);
        assert!(state.players[0].is_guest);
        assert_eq!(state.players[0].id, GUEST_PLAYER_ID);
        assert_eq!(state.players[1].name, "Người chơi 1");
        assert_eq!(state.players[2].name, "Người chơi 2");
    }

    #[test]
    fn stored_roster_skips_stray_guest_row() {
        let roster = vec![
            RosterEntry {
                id: GUEST_PLAYER_ID.to_string(),
                name: "bogus".to_string(),
                phone: String::new(),
            },
            RosterEntry {
                id: "p1".to_string(),
                name: "An".to_string(),
                phone: "0123".to_string(),
            },
        ];
        let state = SessionState::new(&Config::default(), roster);
        assert_eq!(state.players.len(), 2);
        assert!(state.players[0].is_guest);
        assert_eq!(state.players[1].name, "An");
        assert_eq!(state.players[1].phone, "0123");
    }

    #[test]
    fn guest_is_never_assignable() {
        let mut state = state();
        let slot = SlotId::new(0, Team::A, 0);
        assert!(state.assign(GUEST_PLAYER_ID, slot).is_none());
        assert_eq!(state.board.occupant(slot), None);
    }

    #[test]
    fn guest_excluded_from_unassigned_pool() {
        let state = state();
        let pool = state.unassigned_players();
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|p| !p.is_guest));
    }

    #[test]
    fn auto_assign_uses_roster_order() {
        let mut state = state_with(&["An", "Bình", "Chi"]);
        assert_eq!(state.auto_assign(), AutoAssignOutcome::Assigned { count: 3 });
        assert_eq!(
            state.board.occupant(SlotId::new(0, Team::A, 0)),
            Some(&"p0".to_string())
        );
        assert_eq!(
            state.board.occupant(SlotId::new(0, Team::A, 1)),
            Some(&"p1".to_string())
        );
        assert_eq!(
            state.board.occupant(SlotId::new(0, Team::B, 0)),
            Some(&"p2".to_string())
        );
    }

    #[test]
    fn auto_assign_with_everyone_seated_signals_nothing() {
        let mut state = state_with(&["An"]);
        state.auto_assign();
        assert_eq!(state.auto_assign(), AutoAssignOutcome::NothingToAssign);
    }

    #[test]
    fn end_match_resolves_names() {
        let mut state = state_with(&["An", "Bình", "Chi", "Dũng"]);
        state.auto_assign();

        let result = state.end_match(0, Team::B).unwrap();
        assert_eq!(result.match_number, 1);
        assert_eq!(result.loser_names, vec!["Chi", "Dũng"]);
        assert_eq!(result.fee_per_loser, 14000.0);
        assert_eq!(state.board.occupied_count(), 0);
    }

    #[test]
    fn end_match_on_empty_team_is_noop() {
        let mut state = state_with(&["An"]);
        state.assign("p0", SlotId::new(0, Team::A, 0));
        assert!(state.end_match(0, Team::B).is_none());
        assert_eq!(state.ledgers.matches_played, 0);
    }

    #[test]
    fn add_player_rejects_blank_name() {
        let mut state = state();
        assert!(state.add_player("   ").is_none());
        let added = state.add_player("  Em ").unwrap().id.clone();
        assert_eq!(state.player(&added).unwrap().name, "Em");
    }

    #[test]
    fn remove_player_clears_slot_and_counters() {
        let mut state = state_with(&["An", "Bình"]);
        state.assign("p0", SlotId::new(0, Team::A, 0));
        state.assign("p1", SlotId::new(0, Team::B, 0));
        state.end_match(0, Team::A);

        assert!(state.remove_player("p0"));
        assert!(state.player("p0").is_none());
        assert_eq!(state.ledgers.losses_for(&"p0".to_string()), 0);
        assert!(state.ledgers.shuttle_fees.is_empty());
    }

    #[test]
    fn guest_cannot_be_removed() {
        let mut state = state();
        assert!(!state.remove_player(GUEST_PLAYER_ID));
        assert!(state.player(GUEST_PLAYER_ID).is_some());
    }

    #[test]
    fn import_replaces_roster_and_resets_session() {
        let mut state = state_with(&["An", "Bình"]);
        state.auto_assign();
        state.assign("p0", SlotId::new(0, Team::A, 0));
        state.end_match(0, Team::A);

        let imported = vec![
            ("Hà".to_string(), "0901".to_string()),
            ("Long".to_string(), String::new()),
        ];
        assert_eq!(state.import_players(&imported), 2);

        assert_eq!(state.players.len(), 3); // guest + 2 imported
        assert!(state.players[0].is_guest);
        assert_eq!(state.players[1].name, "Hà");
        assert_eq!(state.players[1].phone, "0901");
        assert_eq!(state.board.occupied_count(), 0);
        assert_eq!(state.ledgers.matches_played, 0);
    }

    #[test]
    fn drink_updates_clamp_at_zero_and_drop_entries() {
        let mut state = state_with(&["An"]);
        state.update_drink("p0", "tra-duong", 2);
        state.update_drink("p0", "tra-duong", -1);
        assert_eq!(
            state.player("p0").unwrap().consumed_drinks.get("tra-duong"),
            Some(&1)
        );
        state.update_drink("p0", "tra-duong", -5);
        assert!(state
            .player("p0")
            .unwrap()
            .consumed_drinks
            .is_empty());
    }

    #[test]
    fn quantity_floors_at_one_and_guards_guests() {
        let mut state = state_with(&["An"]);
        assert!(state.update_quantity(GUEST_PLAYER_ID, 2));
        assert_eq!(state.player(GUEST_PLAYER_ID).unwrap().quantity, 3);
        assert!(state.update_quantity(GUEST_PLAYER_ID, -10));
        assert_eq!(state.player(GUEST_PLAYER_ID).unwrap().quantity, 1);
        // Regular players have no quantity knob.
        assert!(!state.update_quantity("p0", 1));
    }

    #[test]
    fn adjustment_coerces_non_finite_to_zero() {
        let mut state = state_with(&["An"]);
        state.set_adjustment("p0", f64::NAN, "??");
        assert_eq!(state.player("p0").unwrap().adjustment.amount, 0.0);
        state.set_adjustment("p0", -5000.0, " về sớm ");
        let adj = &state.player("p0").unwrap().adjustment;
        assert_eq!(adj.amount, -5000.0);
        assert_eq!(adj.reason, "về sớm");
    }

    #[test]
    fn paid_toggles_and_mark_all() {
        let mut state = state_with(&["An", "Bình"]);
        state.toggle_paid("p0");
        assert!(state.player("p0").unwrap().is_paid);
        state.toggle_paid("p0");
        assert!(!state.player("p0").unwrap().is_paid);

        state.mark_all_paid();
        assert!(state.players.iter().all(|p| p.is_paid));
    }

    #[test]
    fn save_session_snapshots_then_resets() {
        let mut state = state_with(&["An", "Bình", "Chi", "Dũng"]);
        state.auto_assign();
        state.end_match(0, Team::B);
        state.update_drink("p0", "nuoc-suoi", 2);
        state.toggle_paid("p0");

        let record = state.save_session(chrono::Utc::now());

        // Snapshot holds the settled fees and summary.
        assert_eq!(record.players.len(), 5);
        assert_eq!(record.summary.total_shuttlecock_cost, 28000.0);
        assert_eq!(record.game_type, GameType::Doubles);
        let an = record
            .players
            .iter()
            .find(|d| d.player.name == "An")
            .unwrap();
        assert!(an.player.is_paid);
        assert_eq!(an.drinks_cost, 10000.0);

        // Live state is back to a blank session, roster intact.
        assert_eq!(state.players.len(), 5);
        assert_eq!(state.ledgers.matches_played, 0);
        assert_eq!(state.board.occupied_count(), 0);
        assert!(state.players.iter().all(|p| !p.is_paid));
        assert!(state.players.iter().all(|p| p.consumed_drinks.is_empty()));
    }

    #[test]
    fn reset_restores_game_types() {
        let mut state = state();
        state.set_game_type(3, GameType::Singles);
        state.reset_session();
        assert_eq!(state.board.game_type(3), GameType::Doubles);
    }

    #[test]
    fn summary_shortcut_matches_manual_derivation() {
        let mut state = state_with(&["An"]);
        state.update_drink("p0", "nuoc-chai", 1);
        let summary = state.summary();
        // guest (1) + An (1) court fees + one bottle.
        assert_eq!(summary.total_court_fee, 30000.0);
        assert_eq!(summary.total_drinks_cost, 15000.0);
        assert_eq!(summary.grand_total, 45000.0);
        assert_eq!(state.head_count(), 2);
    }
}
