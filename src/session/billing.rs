// Cost aggregation: pure derivations over players and ledgers.

use serde::{Deserialize, Serialize};

use crate::config::Drink;

use super::settlement::Ledgers;
use super::state::Player;

/// A player plus their derived bill at a point in time. Frozen snapshot —
/// the session history stores these, not live references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDetails {
    #[serde(flatten)]
    pub player: Player,
    pub total_cost: f64,
    pub losses: u32,
    pub drinks_cost: f64,
    pub shuttlecock_cost: f64,
}

/// Per-category totals for a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_court_fee: f64,
    pub total_drinks_cost: f64,
    pub total_shuttlecock_cost: f64,
    pub grand_total: f64,
}

/// Cost of everything a player drank. Unknown drink ids contribute zero and
/// are silently ignored, so stale persisted data referencing a removed drink
/// cannot corrupt the sums.
pub fn drinks_cost(player: &Player, menu: &[Drink]) -> f64 {
    player
        .consumed_drinks
        .iter()
        .filter_map(|(drink_id, qty)| {
            menu.iter()
                .find(|d| &d.id == drink_id)
                .map(|d| d.price * f64::from(*qty))
        })
        .sum()
}

/// Derive the full bill for every player. Pure and idempotent: calling it
/// again with unchanged inputs yields identical output.
pub fn derive_details(
    players: &[Player],
    ledgers: &Ledgers,
    menu: &[Drink],
    court_fee: f64,
) -> Vec<PlayerDetails> {
    players
        .iter()
        .map(|p| {
            let drinks = drinks_cost(p, menu);
            let losses = ledgers.losses_for(&p.id);
            let shuttlecock = ledgers.shuttle_fee_for(&p.id);
            let court = f64::from(p.quantity.max(1)) * court_fee;
            PlayerDetails {
                player: p.clone(),
                total_cost: court + drinks + shuttlecock + p.adjustment.amount,
                losses,
                drinks_cost: drinks,
                shuttlecock_cost: shuttlecock,
            }
        })
        .collect()
}

/// Session-wide totals over a set of derived bills. The grand total includes
/// adjustments (it is the sum of per-player totals), while the category
/// subtotals do not carry an adjustments line of their own.
pub fn summarize(details: &[PlayerDetails], court_fee: f64) -> SessionSummary {
    let total_court_fee: f64 = details
        .iter()
        .map(|d| f64::from(d.player.quantity.max(1)) * court_fee)
        .sum();
    SessionSummary {
        total_court_fee,
        total_drinks_cost: details.iter().map(|d| d.drinks_cost).sum(),
        total_shuttlecock_cost: details.iter().map(|d| d.shuttlecock_cost).sum(),
        grand_total: details.iter().map(|d| d.total_cost).sum(),
    }
}

/// Sum of totals over the paid subset.
pub fn total_paid(details: &[PlayerDetails]) -> f64 {
    details
        .iter()
        .filter(|d| d.player.is_paid)
        .map(|d| d.total_cost)
        .sum()
}

/// Headcount including guest walk-ins (each guest counts `quantity` heads).
pub fn head_count(players: &[Player]) -> u32 {
    players.iter().map(|p| p.quantity.max(1)).sum()
}
