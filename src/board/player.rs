//! Player identities and the fixed geometry attached to each side.
//!
//! Points are indexed 0..24 from Player Two's home outward. Player One moves
//! upward and bears off past point 23; Player Two moves downward and bears
//! off past point 0.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Number of points on the board.
pub const POINT_COUNT: usize = 24;

/// Checkers each player owns for the whole game.
pub const CHECKERS_PER_PLAYER: u8 = 15;

/// Pip cost of a checker on the bar.
pub const BAR_PIPS: u32 = 25;

/// One of the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    One,
    Two,
}

/// The side the engine plays. Positive equity favors this player.
pub const ENGINE_SIDE: Player = Player::Two;

/// The human side. Negative equity favors this player.
pub const HUMAN_SIDE: Player = Player::One;

pub const ALL_PLAYERS: [Player; 2] = [Player::One, Player::Two];

impl Player {
    /// Array index for per-player storage.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    /// Wire identifier (1 or 2).
    pub const fn id(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    /// Parses a wire identifier.
    pub fn from_id(id: u8) -> Option<Player> {
        match id {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    #[inline]
    pub const fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Points forming this player's home board.
    pub const fn home(self) -> RangeInclusive<usize> {
        match self {
            Player::One => 18..=23,
            Player::Two => 0..=5,
        }
    }

    #[inline]
    pub fn is_home_point(self, point: usize) -> bool {
        self.home().contains(&point)
    }

    /// Points this player enters on from the bar (the opponent's home).
    pub const fn entry_points(self) -> RangeInclusive<usize> {
        self.opponent().home()
    }

    /// Pips a checker on `point` still has to travel to bear off.
    #[inline]
    pub const fn distance_to_off(self, point: usize) -> u32 {
        match self {
            Player::One => (POINT_COUNT - point) as u32,
            Player::Two => point as u32 + 1,
        }
    }

    /// Board index of the point `steps` pips ahead of `point`, or `None`
    /// once the checker would leave the board.
    pub fn advance(self, point: usize, steps: usize) -> Option<usize> {
        match self {
            Player::One => {
                let to = point + steps;
                (to < POINT_COUNT).then_some(to)
            }
            Player::Two => point.checked_sub(steps),
        }
    }
}

impl Serialize for Player {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.id())
    }
}

impl<'de> Deserialize<'de> for Player {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = u8::deserialize(deserializer)?;
        Player::from_id(id)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid player id {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        for p in ALL_PLAYERS {
            assert_eq!(Player::from_id(p.id()), Some(p));
        }
        assert_eq!(Player::from_id(0), None);
        assert_eq!(Player::from_id(3), None);
    }

    #[test]
    fn homes_and_entry_points() {
        assert_eq!(Player::One.home(), 18..=23);
        assert_eq!(Player::Two.home(), 0..=5);
        assert_eq!(Player::One.entry_points(), 0..=5);
        assert_eq!(Player::Two.entry_points(), 18..=23);
    }

    #[test]
    fn distance_to_off_runs_opposite_ways() {
        assert_eq!(Player::One.distance_to_off(0), 24);
        assert_eq!(Player::One.distance_to_off(23), 1);
        assert_eq!(Player::Two.distance_to_off(0), 1);
        assert_eq!(Player::Two.distance_to_off(23), 24);
    }

    #[test]
    fn advance_stops_at_board_edge() {
        assert_eq!(Player::One.advance(20, 3), Some(23));
        assert_eq!(Player::One.advance(20, 4), None);
        assert_eq!(Player::Two.advance(3, 3), Some(0));
        assert_eq!(Player::Two.advance(3, 4), None);
    }

    #[test]
    fn serde_uses_wire_ids() {
        assert_eq!(serde_json::to_string(&Player::Two).unwrap(), "2");
        let p: Player = serde_json::from_str("1").unwrap();
        assert_eq!(p, Player::One);
        assert!(serde_json::from_str::<Player>("7").is_err());
    }
}
