// Match settlement: losing team pays the shuttlecock fee.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::courts::CourtBoard;
use super::slot::Team;
use super::PlayerId;

/// Per-session counters fed by settled matches. Reset when a session is
/// saved or reset; never persisted across sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledgers {
    /// Matches lost per player.
    pub losses: HashMap<PlayerId, u32>,
    /// Accumulated shuttlecock fees per player. Kept as exact (unrounded)
    /// amounts; per-loser shares feed later sums and must not drift.
    pub shuttle_fees: HashMap<PlayerId, f64>,
    /// Matches settled so far this session.
    pub matches_played: u32,
}

impl Ledgers {
    pub fn losses_for(&self, player_id: &PlayerId) -> u32 {
        self.losses.get(player_id).copied().unwrap_or(0)
    }

    pub fn shuttle_fee_for(&self, player_id: &PlayerId) -> f64 {
        self.shuttle_fees.get(player_id).copied().unwrap_or(0.0)
    }

    /// Drop a player's counters (used when they are removed from the roster).
    pub fn forget_player(&mut self, player_id: &PlayerId) {
        self.losses.remove(player_id);
        self.shuttle_fees.remove(player_id);
    }

    pub fn reset(&mut self) {
        self.losses.clear();
        self.shuttle_fees.clear();
        self.matches_played = 0;
    }
}

/// The outcome of one settled match.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// 1-based number of this match within the session.
    pub match_number: u32,
    /// Losing players in position order.
    pub losers: Vec<PlayerId>,
    /// Exact share of the match fee charged to each loser.
    pub fee_per_loser: f64,
}

/// Settle a finished match on `court` where `losing_team` lost.
///
/// Reads the losing team's occupants under the court's current game type.
/// If that team is empty the whole operation is a no-op and returns `None`:
/// no counters move and the court is left untouched. Otherwise the match
/// counter advances, each loser's loss count goes up by one, each loser is
/// charged `fee_per_match / loser_count` (exact division, not rounded), and
/// every slot on the court — winners included — is freed.
pub fn settle_match(
    board: &mut CourtBoard,
    ledgers: &mut Ledgers,
    court: usize,
    losing_team: Team,
    fee_per_match: f64,
) -> Option<Settlement> {
    let losers = board.team_occupants(court, losing_team);
    if losers.is_empty() {
        return None;
    }

    let fee_per_loser = fee_per_match / losers.len() as f64;

    ledgers.matches_played += 1;
    for id in &losers {
        *ledgers.losses.entry(id.clone()).or_insert(0) += 1;
        *ledgers.shuttle_fees.entry(id.clone()).or_insert(0.0) += fee_per_loser;
    }

    // A concluded match frees the whole court, winners included.
    board.clear_court(court);

    Some(Settlement {
        match_number: ledgers.matches_played,
        losers,
        fee_per_loser,
    })
}
