// Slot identifiers and per-court game types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One side of a court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

impl FromStr for Team {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Team::A),
            "B" | "b" => Ok(Team::B),
            _ => Err(SlotParseError::bad(s)),
        }
    }
}

/// How a court is being played. Doubles is the venue default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Singles,
    #[default]
    Doubles,
}

impl GameType {
    /// Positions each team fields: 1 for singles, 2 for doubles.
    pub fn positions_per_team(self) -> u8 {
        match self {
            GameType::Singles => 1,
            GameType::Doubles => 2,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Singles => write!(f, "singles"),
            GameType::Doubles => write!(f, "doubles"),
        }
    }
}

impl FromStr for GameType {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "singles" => Ok(GameType::Singles),
            "doubles" => Ok(GameType::Doubles),
            _ => Err(SlotParseError::bad(s)),
        }
    }
}

/// One assignable position within a court: court index, team, and position
/// within the team (position 1 exists only while the court plays doubles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub court: usize,
    pub team: Team,
    pub position: u8,
}

impl SlotId {
    pub fn new(court: usize, team: Team, position: u8) -> Self {
        SlotId {
            court,
            team,
            position,
        }
    }
}

// Canonical text form, e.g. "court-3-A-1". This is the slot key format the
// display layer and persistence use.
impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "court-{}-{}-{}", self.court, self.team, self.position)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid slot identifier: {input}")]
pub struct SlotParseError {
    input: String,
}

impl SlotParseError {
    fn bad(input: &str) -> Self {
        SlotParseError {
            input: input.to_string(),
        }
    }
}

impl FromStr for SlotId {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let (Some("court"), Some(court), Some(team), Some(pos), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(SlotParseError::bad(s));
        };

        let court: usize = court.parse().map_err(|_| SlotParseError::bad(s))?;
        let team: Team = team.parse().map_err(|_| SlotParseError::bad(s))?;
        let position: u8 = pos.parse().map_err(|_| SlotParseError::bad(s))?;
        if position > 1 {
            return Err(SlotParseError::bad(s));
        }

        Ok(SlotId::new(court, team, position))
    }
}

/// The slots of one team on a court under a game type, position 0 first.
pub fn team_slots(court: usize, team: Team, game_type: GameType) -> Vec<SlotId> {
    (0..game_type.positions_per_team())
        .map(|p| SlotId::new(court, team, p))
        .collect()
}

/// All slots of a court in fill order: team A before B, position 0 before 1.
pub fn court_slots(court: usize, game_type: GameType) -> Vec<SlotId> {
    let mut slots = team_slots(court, Team::A, game_type);
    slots.extend(team_slots(court, Team::B, game_type));
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_display_round_trip() {
        let slot = SlotId::new(3, Team::A, 1);
        assert_eq!(slot.to_string(), "court-3-A-1");
        assert_eq!("court-3-A-1".parse::<SlotId>().unwrap(), slot);
    }

    #[test]
    fn slot_id_parse_rejects_garbage() {
        assert!("court-3-A".parse::<SlotId>().is_err());
        assert!("court-x-A-0".parse::<SlotId>().is_err());
        assert!("court-3-C-0".parse::<SlotId>().is_err());
        assert!("court-3-A-2".parse::<SlotId>().is_err());
        assert!("pitch-3-A-0".parse::<SlotId>().is_err());
        assert!("court-3-A-0-extra".parse::<SlotId>().is_err());
    }

    #[test]
    fn court_slots_doubles_order() {
        let slots = court_slots(0, GameType::Doubles);
        let rendered: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["court-0-A-0", "court-0-A-1", "court-0-B-0", "court-0-B-1"]
        );
    }

    #[test]
    fn court_slots_singles_order() {
        let slots = court_slots(2, GameType::Singles);
        let rendered: Vec<String> = slots.iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered, vec!["court-2-A-0", "court-2-B-0"]);
    }

    #[test]
    fn opponent_flips() {
        assert_eq!(Team::A.opponent(), Team::B);
        assert_eq!(Team::B.opponent(), Team::A);
    }

    #[test]
    fn game_type_default_is_doubles() {
        assert_eq!(GameType::default(), GameType::Doubles);
        assert_eq!(GameType::default().positions_per_team(), 2);
    }
}
