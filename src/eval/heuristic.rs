//! Heuristic position evaluation.
//!
//! Combines the board metrics into a single equity in [-1, 1] from the
//! engine side's perspective. Five differential features are each normalized
//! by a fixed denominator and blended with one of two weight sets: the
//! default, or a trap-heavy set used when the trapped-checker imbalance is
//! large enough to outweigh the race.
//!
//! Design: deterministic and allocation-free. Identical positions always
//! produce bit-identical scores.

use crate::board::{Player, Position, ENGINE_SIDE, HUMAN_SIDE};

use super::metrics::{
    checkers_in_home, exposed_blots, is_certain_win, pip_count, trapped_count,
};

/// Normalization denominators (observed dynamic range of each difference).
const PIP_RANGE: f64 = 100.0;
const BORNE_RANGE: f64 = 15.0;
const TRAP_RANGE: f64 = 5.0;
const BLOT_RANGE: f64 = 10.0;
const HOME_RANGE: f64 = 15.0;

/// |trap score| above which the trap-heavy weights apply.
const TRAP_DOMINANCE: f64 = 0.3;

/// Feature weights. Each set sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub pip: f64,
    pub borne: f64,
    pub trap: f64,
    pub blot: f64,
    pub home: f64,
}

pub const DEFAULT_WEIGHTS: Weights = Weights {
    pip: 0.55,
    borne: 0.20,
    trap: 0.12,
    blot: 0.10,
    home: 0.03,
};

pub const TRAP_HEAVY_WEIGHTS: Weights = Weights {
    pip: 0.45,
    borne: 0.20,
    trap: 0.22,
    blot: 0.10,
    home: 0.03,
};

/// The component scores behind one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalBreakdown {
    pub pip: f64,
    pub borne: f64,
    pub trap: f64,
    pub blot: f64,
    pub home: f64,
    pub weights: Weights,
    /// Set when a certain-win test decided the result outright.
    pub decided: Option<Player>,
    pub equity: f64,
}

/// Evaluates a position. Positive favors the engine side.
pub fn evaluate(pos: &Position) -> f64 {
    evaluate_breakdown(pos).equity
}

/// Evaluates a position and returns every intermediate score.
pub fn evaluate_breakdown(pos: &Position) -> EvalBreakdown {
    let engine_won = is_certain_win(pos, ENGINE_SIDE);
    let human_won = is_certain_win(pos, HUMAN_SIDE);
    if engine_won != human_won {
        let (winner, equity) = if engine_won {
            (ENGINE_SIDE, 1.0)
        } else {
            (HUMAN_SIDE, -1.0)
        };
        return EvalBreakdown {
            pip: 0.0,
            borne: 0.0,
            trap: 0.0,
            blot: 0.0,
            home: 0.0,
            weights: DEFAULT_WEIGHTS,
            decided: Some(winner),
            equity,
        };
    }

    let me = ENGINE_SIDE;
    let opp = HUMAN_SIDE;

    let pip = (pip_count(pos, opp) as f64 - pip_count(pos, me) as f64) / PIP_RANGE;
    let borne =
        (pos.borne_off_count(me) as f64 - pos.borne_off_count(opp) as f64) / BORNE_RANGE;
    let trap = (trapped_count(pos, opp) - trapped_count(pos, me)) / TRAP_RANGE;
    let blot = (exposed_blots(pos, opp) as f64 - exposed_blots(pos, me) as f64) / BLOT_RANGE;
    let home =
        (checkers_in_home(pos, me) as f64 - checkers_in_home(pos, opp) as f64) / HOME_RANGE;

    let weights = if trap.abs() > TRAP_DOMINANCE {
        TRAP_HEAVY_WEIGHTS
    } else {
        DEFAULT_WEIGHTS
    };

    let raw = pip * weights.pip
        + borne * weights.borne
        + trap * weights.trap
        + blot * weights.blot
        + home * weights.home;

    EvalBreakdown {
        pip,
        borne,
        trap,
        blot,
        home,
        weights,
        decided: None,
        equity: raw.clamp(-1.0, 1.0),
    }
}
