//! Board position snapshot.
//!
//! A position is the full checker layout of both sides plus bar and borne-off
//! counts and the side to move. Checkers are stored as per-player counts per
//! point, so the type is `Copy` and every evaluation branch works on its own
//! copy.

use thiserror::Error;

use super::player::{Player, ALL_PLAYERS, CHECKERS_PER_PLAYER, POINT_COUNT};

/// Starting layout for Player One: (point, count).
pub const PLAYER_ONE_START: [(usize, u8); 4] = [(0, 2), (11, 5), (16, 3), (18, 5)];

/// Starting layout for Player Two: (point, count).
pub const PLAYER_TWO_START: [(usize, u8); 4] = [(23, 2), (12, 5), (7, 3), (5, 5)];

/// Checkers that must still sit on starting points for the opening phase.
const OPENING_MIN_ON_START: u32 = 20;

/// Reasons a position is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("player {player} has {found} checkers, expected 15")]
    WrongCheckerCount { player: u8, found: u32 },

    #[error("point {0} holds checkers of both players")]
    SharedPoint(usize),

    #[error("point {0} is outside the board")]
    PointOutOfRange(usize),
}

/// Complete board state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Checker counts per point, indexed `[player.index()][point]`.
    pub points: [[u8; POINT_COUNT]; 2],
    pub bar: [u8; 2],
    pub borne_off: [u8; 2],
    pub turn: Player,
}

impl Position {
    /// An empty board. Not valid until 15 checkers per side are placed.
    pub fn empty(turn: Player) -> Self {
        Position {
            points: [[0; POINT_COUNT]; 2],
            bar: [0; 2],
            borne_off: [0; 2],
            turn,
        }
    }

    /// The standard starting layout with Player One to move.
    pub fn starting() -> Self {
        let mut pos = Position::empty(Player::One);
        for &(point, n) in PLAYER_ONE_START.iter() {
            pos.points[Player::One.index()][point] = n;
        }
        for &(point, n) in PLAYER_TWO_START.iter() {
            pos.points[Player::Two.index()][point] = n;
        }
        pos
    }

    /// Checkers of `player` on `point`.
    #[inline]
    pub fn count(&self, point: usize, player: Player) -> u8 {
        self.points[player.index()][point]
    }

    /// Owner and count of a point, if occupied.
    pub fn occupant(&self, point: usize) -> Option<(Player, u8)> {
        ALL_PLAYERS
            .iter()
            .map(|&p| (p, self.count(point, p)))
            .find(|&(_, n)| n > 0)
    }

    #[inline]
    pub fn bar_count(&self, player: Player) -> u8 {
        self.bar[player.index()]
    }

    #[inline]
    pub fn borne_off_count(&self, player: Player) -> u8 {
        self.borne_off[player.index()]
    }

    /// Checkers of `player` on the 24 points.
    pub fn on_board(&self, player: Player) -> u32 {
        self.points[player.index()].iter().map(|&n| n as u32).sum()
    }

    /// Adds `n` checkers of `player` to `point`.
    /// Returns false if the opponent occupies the point.
    pub fn place(&mut self, point: usize, player: Player, n: u8) -> bool {
        if point >= POINT_COUNT || self.count(point, player.opponent()) > 0 {
            return false;
        }
        self.points[player.index()][point] += n;
        true
    }

    /// Checks the 15-checkers-per-side invariant and that no point is shared.
    pub fn validate(&self) -> Result<(), PositionError> {
        for point in 0..POINT_COUNT {
            if self.count(point, Player::One) > 0 && self.count(point, Player::Two) > 0 {
                return Err(PositionError::SharedPoint(point));
            }
        }
        for p in ALL_PLAYERS {
            let total =
                self.on_board(p) + self.bar_count(p) as u32 + self.borne_off_count(p) as u32;
            if total != CHECKERS_PER_PLAYER as u32 {
                return Err(PositionError::WrongCheckerCount {
                    player: p.id(),
                    found: total,
                });
            }
        }
        Ok(())
    }

    /// Checkers (both sides) still standing on their own starting points,
    /// counting at most the starting number per point.
    pub fn checkers_on_start(&self) -> u32 {
        let side = |player: Player, layout: &[(usize, u8)]| -> u32 {
            layout
                .iter()
                .map(|&(point, n)| self.count(point, player).min(n) as u32)
                .sum()
        };
        side(Player::One, &PLAYER_ONE_START) + side(Player::Two, &PLAYER_TWO_START)
    }

    /// True while nothing has been borne off or hit and at least 20 of the
    /// 30 checkers remain on their starting points.
    pub fn is_opening_phase(&self) -> bool {
        self.borne_off == [0, 0]
            && self.bar == [0, 0]
            && self.checkers_on_start() >= OPENING_MIN_ON_START
    }
}
