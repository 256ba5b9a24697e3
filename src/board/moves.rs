//! Move descriptors and the apply seam.
//!
//! Legal moves arrive from the rules engine as opaque JSON values: an integer
//! destination point, a bear-off marker (`"bearoff"`, `"bearoff|sum|0,1"`,
//! `"bearoff|multimove|2"`), a compound multi-die descriptor
//! (`"dest|steps|kind|die"`), or checker notation from the mover's point of
//! view (`"8/5 6/5"`, `"bar/22"`, `"6/off"`, `"13/7*/1"`, `"24/18(2)"`).
//!
//! The core never checks legality. It only needs `MoveApplier::apply` to get
//! the position a candidate leads to so the evaluator can score it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::player::{Player, POINT_COUNT};
use super::position::{Position, PositionError};

/// An opaque, externally-defined move descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Move(pub serde_json::Value);

impl Move {
    /// A bare destination point.
    pub fn point(dest: u8) -> Self {
        Move(serde_json::Value::from(dest))
    }

    /// A string descriptor.
    pub fn descriptor(s: &str) -> Self {
        Move(serde_json::Value::from(s))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// Errors raised while applying a move for scoring.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("unrecognized move descriptor '{0}'")]
    Unrecognized(String),

    #[error("no checker to move from {0}")]
    EmptySource(String),

    #[error("point {0} is blocked")]
    Blocked(usize),

    #[error("no checker in the home board to bear off")]
    NothingToBearOff,

    #[error("move leaves an invalid position: {0}")]
    InvalidResult(#[from] PositionError),
}

/// A location in checker notation, numbered from the mover's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spot {
    Bar,
    /// Mover-relative point number, 1..=24.
    Point(u8),
    Off,
}

/// One checker step in notation form, repeated `count` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub from: Spot,
    pub to: Spot,
    pub count: u8,
}

/// Structured reading of a move descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveKind {
    /// Destination only; the source checker is not recoverable.
    Destination(i64),
    /// `dest|steps|kind|die`; same limitation as `Destination`.
    Compound { dest: i64, steps: u8 },
    /// Any bear-off marker.
    BearOff,
    /// Explicit checker notation.
    Notation(Vec<Hop>),
}

impl MoveKind {
    /// Parses a move descriptor.
    pub fn parse(mv: &Move) -> Result<MoveKind, MoveError> {
        if let Some(n) = mv.0.as_i64() {
            return Ok(MoveKind::Destination(n));
        }
        let s = mv
            .as_str()
            .ok_or_else(|| MoveError::Unrecognized(mv.to_string()))?
            .trim();

        if s == "bearoff" || s.starts_with("bearoff|") {
            return Ok(MoveKind::BearOff);
        }
        if s.contains('|') {
            return parse_compound(s);
        }
        if let Ok(n) = s.parse::<i64>() {
            return Ok(MoveKind::Destination(n));
        }
        parse_notation(s).map(MoveKind::Notation)
    }
}

fn parse_compound(s: &str) -> Result<MoveKind, MoveError> {
    let mut parts = s.split('|');
    let dest = parts
        .next()
        .and_then(|p| p.parse::<i64>().ok())
        .ok_or_else(|| MoveError::Unrecognized(s.to_string()))?;
    let steps = parts
        .next()
        .and_then(|p| p.parse::<u8>().ok())
        .unwrap_or(1);
    Ok(MoveKind::Compound { dest, steps })
}

fn parse_spot(token: &str, whole: &str) -> Result<Spot, MoveError> {
    let t = token.trim_end_matches('*');
    match t.to_ascii_lowercase().as_str() {
        "bar" => Ok(Spot::Bar),
        "off" => Ok(Spot::Off),
        num => match num.parse::<u8>() {
            Ok(n) if (1..=POINT_COUNT as u8).contains(&n) => Ok(Spot::Point(n)),
            _ => Err(MoveError::Unrecognized(whole.to_string())),
        },
    }
}

/// Parses notation such as `"13/7*/1 6/5(2)"` into single hops.
fn parse_notation(s: &str) -> Result<Vec<Hop>, MoveError> {
    let mut hops = Vec::new();
    for token in s.split_whitespace() {
        let (body, count) = match token.find('(') {
            Some(open) => {
                let n = token[open + 1..]
                    .trim_end_matches(')')
                    .parse::<u8>()
                    .map_err(|_| MoveError::Unrecognized(s.to_string()))?;
                (&token[..open], n)
            }
            None => (token, 1),
        };
        let spots: Vec<Spot> = body
            .split('/')
            .map(|t| parse_spot(t, s))
            .collect::<Result<_, _>>()?;
        if spots.len() < 2 {
            return Err(MoveError::Unrecognized(s.to_string()));
        }
        for pair in spots.windows(2) {
            hops.push(Hop {
                from: pair[0],
                to: pair[1],
                count,
            });
        }
    }
    if hops.is_empty() {
        return Err(MoveError::Unrecognized(s.to_string()));
    }
    Ok(hops)
}

/// Board index of a mover-relative point number.
#[inline]
pub fn board_index(mover: Player, n: u8) -> usize {
    match mover {
        Player::One => POINT_COUNT - n as usize,
        Player::Two => n as usize - 1,
    }
}

/// Applies a move to a copy of a position.
///
/// Implementations must be pure: the input position is never modified and
/// the returned position satisfies `Position::validate`.
pub trait MoveApplier: Send + Sync {
    fn apply(&self, pos: &Position, mv: &Move) -> Result<Position, MoveError>;
}

/// Default applier for the descriptor formats listed in the module docs.
///
/// Descriptors without a recoverable source (bare destinations and compound
/// descriptors) leave the position unchanged. The side to move is never
/// flipped, since a descriptor may be one part of a multi-die turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorApplier;

impl MoveApplier for DescriptorApplier {
    fn apply(&self, pos: &Position, mv: &Move) -> Result<Position, MoveError> {
        let mut next = *pos;
        match MoveKind::parse(mv)? {
            MoveKind::Destination(_) | MoveKind::Compound { .. } => {}
            MoveKind::BearOff => bear_off_deepest(&mut next)?,
            MoveKind::Notation(hops) => {
                for hop in hops {
                    for _ in 0..hop.count {
                        apply_hop(&mut next, hop)?;
                    }
                }
            }
        }
        next.validate()?;
        Ok(next)
    }
}

/// Bears off the home checker nearest the edge for the side to move.
fn bear_off_deepest(pos: &mut Position) -> Result<(), MoveError> {
    let mover = pos.turn;
    let point = match mover {
        Player::One => mover.home().rev().find(|&p| pos.count(p, mover) > 0),
        Player::Two => mover.home().find(|&p| pos.count(p, mover) > 0),
    }
    .ok_or(MoveError::NothingToBearOff)?;
    pos.points[mover.index()][point] -= 1;
    pos.borne_off[mover.index()] += 1;
    Ok(())
}

fn apply_hop(pos: &mut Position, hop: Hop) -> Result<(), MoveError> {
    let mover = pos.turn;
    let me = mover.index();
    let opp = mover.opponent();

    match hop.from {
        Spot::Bar => {
            if pos.bar[me] == 0 {
                return Err(MoveError::EmptySource("bar".into()));
            }
            pos.bar[me] -= 1;
        }
        Spot::Point(n) => {
            let idx = board_index(mover, n);
            if pos.points[me][idx] == 0 {
                return Err(MoveError::EmptySource(n.to_string()));
            }
            pos.points[me][idx] -= 1;
        }
        Spot::Off => return Err(MoveError::EmptySource("off".into())),
    }

    match hop.to {
        Spot::Off => pos.borne_off[me] += 1,
        Spot::Point(n) => {
            let idx = board_index(mover, n);
            match pos.count(idx, opp) {
                0 => {}
                1 => {
                    pos.points[opp.index()][idx] = 0;
                    pos.bar[opp.index()] += 1;
                }
                _ => return Err(MoveError::Blocked(idx)),
            }
            pos.points[me][idx] += 1;
        }
        Spot::Bar => return Err(MoveError::Unrecognized("move to bar".into())),
    }
    Ok(())
}
