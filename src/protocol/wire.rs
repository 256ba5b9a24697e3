//! Game-state wire format.
//!
//! The front end sends the board as a flat checker list plus per-player bar
//! and borne-off bookkeeping keyed by player id:
//!
//! ```json
//! {
//!   "checkers": [{"point": 0, "player": 1}, {"point": 23, "player": 2}],
//!   "bar": {"1": [], "2": [{"player": 2}]},
//!   "borneOff": {"1": 0, "2": 3},
//!   "currentPlayer": 2
//! }
//! ```
//!
//! Bar entries may be a list (one element per checker) or a bare count.
//! Checkers whose point is outside 0..=23 are bookkeeping copies of bar or
//! borne-off checkers and are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Player, Position, PositionError, ALL_PLAYERS, POINT_COUNT};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown player id {0}")]
    UnknownPlayer(i64),

    #[error("too many checkers for player {0}")]
    Overflow(u8),

    #[error(transparent)]
    Position(#[from] PositionError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChecker {
    pub point: i64,
    pub player: i64,
}

/// A bar entry: the checkers themselves, or how many there are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireCount {
    Count(u32),
    List(Vec<serde_json::Value>),
}

impl WireCount {
    pub fn len(&self) -> usize {
        match self {
            WireCount::Count(n) => *n as usize,
            WireCount::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGameState {
    #[serde(default)]
    pub checkers: Vec<WireChecker>,
    #[serde(default)]
    pub bar: BTreeMap<String, WireCount>,
    #[serde(default)]
    pub borne_off: BTreeMap<String, u32>,
    /// Side to move. Defaults to the engine side.
    #[serde(default = "default_current_player")]
    pub current_player: i64,
}

fn default_current_player() -> i64 {
    2
}

fn to_u8(n: usize, player: Player) -> Result<u8, WireError> {
    u8::try_from(n).map_err(|_| WireError::Overflow(player.id()))
}

impl WireGameState {
    /// Builds and validates a position.
    pub fn to_position(&self) -> Result<Position, WireError> {
        let turn = player_from_id(self.current_player)?;
        let mut pos = Position::empty(turn);

        let mut counts = [[0usize; POINT_COUNT]; 2];
        for checker in &self.checkers {
            if !(0..POINT_COUNT as i64).contains(&checker.point) {
                continue;
            }
            let player = player_from_id(checker.player)?;
            counts[player.index()][checker.point as usize] += 1;
        }
        for player in ALL_PLAYERS {
            for (point, &n) in counts[player.index()].iter().enumerate() {
                pos.points[player.index()][point] = to_u8(n, player)?;
            }
            let key = player.id().to_string();
            let bar = self.bar.get(&key).map_or(0, WireCount::len);
            pos.bar[player.index()] = to_u8(bar, player)?;
            let off = self.borne_off.get(&key).copied().unwrap_or(0) as usize;
            pos.borne_off[player.index()] = to_u8(off, player)?;
        }

        pos.validate()?;
        Ok(pos)
    }

    /// The wire form of a position, with bar entries as counts.
    pub fn from_position(pos: &Position) -> Self {
        let mut checkers = Vec::new();
        let mut bar = BTreeMap::new();
        let mut borne_off = BTreeMap::new();
        for player in ALL_PLAYERS {
            for point in 0..POINT_COUNT {
                for _ in 0..pos.count(point, player) {
                    checkers.push(WireChecker {
                        point: point as i64,
                        player: player.id() as i64,
                    });
                }
            }
            let key = player.id().to_string();
            bar.insert(key.clone(), WireCount::Count(pos.bar_count(player) as u32));
            borne_off.insert(key, pos.borne_off_count(player) as u32);
        }
        WireGameState {
            checkers,
            bar,
            borne_off,
            current_player: pos.turn.id() as i64,
        }
    }
}

fn player_from_id(id: i64) -> Result<Player, WireError> {
    u8::try_from(id)
        .ok()
        .and_then(Player::from_id)
        .ok_or(WireError::UnknownPlayer(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> WireGameState {
        serde_json::from_value(v).unwrap()
    }

    fn starting_checkers() -> Vec<serde_json::Value> {
        let mut list = Vec::new();
        for (point, n) in [(0, 2), (11, 5), (16, 3), (18, 5)] {
            for _ in 0..n {
                list.push(json!({"point": point, "player": 1}));
            }
        }
        for (point, n) in [(23, 2), (12, 5), (7, 3), (5, 5)] {
            for _ in 0..n {
                list.push(json!({"point": point, "player": 2}));
            }
        }
        list
    }

    #[test]
    fn starting_position_from_wire() {
        let state = parse(json!({
            "checkers": starting_checkers(),
            "bar": {"1": [], "2": []},
            "borneOff": {"1": 0, "2": 0},
            "currentPlayer": 1
        }));
        let pos = state.to_position().unwrap();
        assert_eq!(pos, Position::starting());
    }

    #[test]
    fn bar_accepts_lists_and_counts() {
        let mut checkers = starting_checkers();
        // One checker of each side leaves its back point for the bar.
        checkers.retain(|c| c != &json!({"point": 0, "player": 1}));
        checkers.push(json!({"point": 0, "player": 1}));
        checkers.retain(|c| c != &json!({"point": 23, "player": 2}));
        checkers.push(json!({"point": 23, "player": 2}));

        let state = parse(json!({
            "checkers": checkers,
            "bar": {"1": [{"player": 1}], "2": 1},
            "borneOff": {},
            "currentPlayer": 2
        }));
        let pos = state.to_position().unwrap();
        assert_eq!(pos.bar, [1, 1]);
        assert_eq!(pos.count(0, Player::One), 1);
        assert_eq!(pos.count(23, Player::Two), 1);
        assert_eq!(pos.turn, Player::Two);
    }

    #[test]
    fn off_board_checkers_are_ignored() {
        let mut checkers = starting_checkers();
        checkers.push(json!({"point": 24, "player": 1}));
        checkers.push(json!({"point": -1, "player": 2}));
        let state = parse(json!({"checkers": checkers, "currentPlayer": 1}));
        assert_eq!(state.to_position().unwrap(), Position::starting());
    }

    #[test]
    fn missing_fields_default() {
        let state = parse(json!({"checkers": starting_checkers()}));
        let pos = state.to_position().unwrap();
        assert_eq!(pos.turn, Player::Two);
    }

    #[test]
    fn wrong_checker_count_is_rejected() {
        let mut checkers = starting_checkers();
        checkers.pop();
        let state = parse(json!({"checkers": checkers, "currentPlayer": 1}));
        assert!(matches!(
            state.to_position(),
            Err(WireError::Position(PositionError::WrongCheckerCount { player: 2, .. }))
        ));
    }

    #[test]
    fn unknown_player_is_rejected() {
        let state = parse(json!({"checkers": [{"point": 3, "player": 7}], "currentPlayer": 1}));
        assert_eq!(state.to_position(), Err(WireError::UnknownPlayer(7)));
        let state = parse(json!({"checkers": starting_checkers(), "currentPlayer": 0}));
        assert_eq!(state.to_position(), Err(WireError::UnknownPlayer(0)));
    }

    #[test]
    fn from_position_round_trips_a_midgame_board() {
        let mut pos = Position::starting();
        pos.points[Player::Two.index()][23] = 1;
        pos.bar[Player::Two.index()] = 1;
        pos.points[Player::One.index()][11] = 3;
        pos.borne_off[Player::One.index()] = 0;
        pos.points[Player::One.index()][20] = 2;
        pos.turn = Player::Two;
        assert!(pos.validate().is_ok());

        let wire = WireGameState::from_position(&pos);
        let text = serde_json::to_string(&wire).unwrap();
        let back: WireGameState = serde_json::from_str(&text).unwrap();
        assert_eq!(back.to_position().unwrap(), pos);
    }
}
