//! Optional external equity oracle.
//!
//! The oracle is a slower, stronger evaluator (GNU Backgammon running as a
//! long-lived child process). It is strictly best-effort: every failure
//! comes back as an `OracleError`, and callers fall back to the heuristic
//! evaluator. Nothing in this module panics or outlives the call budget its
//! caller hands in.

pub mod encoding;
pub mod process;
pub mod protocol;

use std::time::Duration;

use thiserror::Error;

use crate::board::{Player, Position};

pub use process::GnubgOracle;

/// Why the oracle could not produce an answer.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable")]
    Unavailable,

    #[error("oracle busy with another request")]
    Busy,

    #[error("oracle call budget exhausted")]
    OutOfTime,

    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle process exited")]
    ProcessDied,

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("cannot encode position: {0}")]
    Encoding(String),

    #[error("oracle i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl OracleError {
    /// True if the process handle should be discarded and restarted.
    pub fn poisons_process(&self) -> bool {
        matches!(
            self,
            OracleError::Timeout(_) | OracleError::ProcessDied | OracleError::Io(_)
        )
    }
}

/// The oracle's recommended play for a roll.
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    /// Move in checker notation from the mover's side, e.g. `"8/5 6/5"`.
    pub notation: String,
    /// Equity after the move, engine-side perspective.
    pub equity: f64,
}

/// A source of high-quality equity estimates.
///
/// `budget` bounds the whole call: queueing behind other callers, starting
/// the process if needed, and every command it sends. A call that cannot
/// finish inside it returns an error no later than the budget.
pub trait Oracle: Send + Sync {
    /// True if the oracle is configured and worth consulting.
    fn is_available(&self) -> bool;

    /// Equity of `pos` from the engine side's perspective, in [-1, 1].
    fn evaluate(&self, pos: &Position, budget: Duration) -> Result<f64, OracleError>;

    /// Best play for `dice` in `pos`.
    fn hint(&self, pos: &Position, dice: (u8, u8), budget: Duration) -> Result<Hint, OracleError> {
        let _ = (pos, dice, budget);
        Err(OracleError::Unavailable)
    }
}

/// An oracle that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOracle;

impl Oracle for DisabledOracle {
    fn is_available(&self) -> bool {
        false
    }

    fn evaluate(&self, _pos: &Position, _budget: Duration) -> Result<f64, OracleError> {
        Err(OracleError::Unavailable)
    }
}

/// Converts an equity reported for the side to move into the engine-side
/// convention and clamps it to [-1, 1].
pub fn to_engine_perspective(equity: f64, side_to_move: Player) -> f64 {
    let e = match side_to_move {
        Player::One => -equity,
        Player::Two => equity,
    };
    e.clamp(-1.0, 1.0)
}
