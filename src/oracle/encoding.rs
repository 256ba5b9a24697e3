//! Position encoding for the oracle's `set board` command.
//!
//! The oracle numbers points 1..24 from Player Two's side, with 25 as Player
//! One's bar and 0 as Player Two's bar. Player One checkers count positive,
//! Player Two checkers negative, and both sides accumulate into the same
//! sparse map:
//!
//! * Player One on board point p → oracle point 24 − p, +1 each
//! * Player Two on board point p → oracle point p + 1, −1 each
//! * Player One bar → 25:+n, Player Two bar → 0:−n
//!
//! Entries are listed by oracle point, descending, with zeros dropped. In the
//! starting layout every entry cancels, so its encoding is empty and the
//! board is reset rather than set.

use std::collections::BTreeMap;
use std::fmt;

use crate::board::{Player, Position, POINT_COUNT};

use super::OracleError;

/// Oracle point holding Player One's bar.
const PLAYER_ONE_BAR: u8 = 25;
/// Oracle point holding Player Two's bar.
const PLAYER_TWO_BAR: u8 = 0;

/// Sparse point:count list in the oracle's numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleBoard {
    pub entries: Vec<(u8, i16)>,
}

impl OracleBoard {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for OracleBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (point, count)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", point, count)?;
        }
        Ok(())
    }
}

/// Encodes a position. Fails for positions that break the board invariants.
pub fn encode_position(pos: &Position) -> Result<OracleBoard, OracleError> {
    pos.validate()
        .map_err(|e| OracleError::Encoding(e.to_string()))?;

    let mut points: BTreeMap<u8, i16> = BTreeMap::new();
    for point in 0..POINT_COUNT {
        let one = pos.count(point, Player::One) as i16;
        if one > 0 {
            *points.entry((POINT_COUNT - point) as u8).or_default() += one;
        }
        let two = pos.count(point, Player::Two) as i16;
        if two > 0 {
            *points.entry(point as u8 + 1).or_default() -= two;
        }
    }

    let bar_one = pos.bar_count(Player::One) as i16;
    if bar_one > 0 {
        *points.entry(PLAYER_ONE_BAR).or_default() += bar_one;
    }
    let bar_two = pos.bar_count(Player::Two) as i16;
    if bar_two > 0 {
        *points.entry(PLAYER_TWO_BAR).or_default() -= bar_two;
    }

    let entries = points
        .into_iter()
        .rev()
        .filter(|&(_, count)| count != 0)
        .collect();
    Ok(OracleBoard { entries })
}

/// The oracle's turn index: 0 for Player One, 1 for Player Two.
pub fn turn_index(player: Player) -> u8 {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}
