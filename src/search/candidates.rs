//! Candidate ranking.
//!
//! Every legal move is scored with the heuristic evaluator in parallel. When
//! the oracle is available and the requested skill is high enough, the top
//! few candidates are re-scored by the oracle and that prefix is re-sorted.
//! Oracle failures never surface here: the candidate keeps its heuristic
//! score.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::board::{Move, MoveApplier, Position};
use crate::eval::evaluate;
use crate::oracle::Oracle;

/// Lowest difficulty that consults the oracle.
pub const ORACLE_MIN_DIFFICULTY: u8 = 7;
/// Difficulty at which three candidates are refined outside the opening.
pub const WIDE_REFINEMENT_DIFFICULTY: u8 = 9;
/// Time held back before the deadline for ranking, picking and answering.
pub const REFINEMENT_MARGIN: Duration = Duration::from_millis(200);

/// Which evaluator produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Heuristic,
    Oracle,
}

/// A legal move with its engine-side equity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMove {
    pub mv: Move,
    pub score: f64,
    pub source: ScoreSource,
}

/// Everything ranking needs besides the position and moves.
pub struct SearchContext<'a> {
    pub difficulty: u8,
    pub oracle: &'a dyn Oracle,
    pub applier: &'a dyn MoveApplier,
    /// Set by the caller once the result is no longer wanted.
    pub cancel: &'a AtomicBool,
    /// Selection deadline. Oracle calls must finish `REFINEMENT_MARGIN`
    /// before it.
    pub deadline: Instant,
}

/// Number of top candidates the oracle re-scores.
pub fn refinement_width(pos: &Position, difficulty: u8) -> usize {
    if pos.is_opening_phase() || difficulty < WIDE_REFINEMENT_DIFFICULTY {
        2
    } else {
        3
    }
}

fn by_score_desc(a: &ScoredMove, b: &ScoredMove) -> CmpOrdering {
    b.score.partial_cmp(&a.score).unwrap_or(CmpOrdering::Equal)
}

/// Scores and ranks `legal_moves`, best first.
///
/// Ties keep their legal-move order. Only the refined prefix is re-sorted
/// after oracle scoring; the tail keeps its heuristic order.
pub fn select_move_candidates(
    pos: &Position,
    legal_moves: &[Move],
    ctx: &SearchContext<'_>,
) -> Vec<ScoredMove> {
    let mut scored: Vec<ScoredMove> = legal_moves
        .par_iter()
        .map(|mv| {
            let score = match ctx.applier.apply(pos, mv) {
                Ok(next) => evaluate(&next),
                Err(e) => {
                    debug!("move {} does not apply ({}), scoring 0.0", mv, e);
                    0.0
                }
            };
            ScoredMove {
                mv: mv.clone(),
                score,
                source: ScoreSource::Heuristic,
            }
        })
        .collect();
    scored.sort_by(by_score_desc);

    for c in &scored {
        debug!("candidate {} heuristic {:.4}", c.mv, c.score);
    }

    if scored.len() >= 2
        && ctx.difficulty >= ORACLE_MIN_DIFFICULTY
        && ctx.oracle.is_available()
    {
        let k = refinement_width(pos, ctx.difficulty).min(scored.len());
        refine_prefix(pos, &mut scored[..k], ctx);
    }

    scored
}

fn refine_prefix(pos: &Position, prefix: &mut [ScoredMove], ctx: &SearchContext<'_>) {
    let Some(cutoff) = ctx.deadline.checked_sub(REFINEMENT_MARGIN) else {
        return;
    };
    for candidate in prefix.iter_mut() {
        if ctx.cancel.load(Ordering::Relaxed) {
            debug!("refinement cancelled");
            break;
        }
        let remaining = cutoff.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("refinement out of time");
            break;
        }
        let next = match ctx.applier.apply(pos, &candidate.mv) {
            Ok(next) => next,
            Err(_) => continue,
        };
        match ctx.oracle.evaluate(&next, remaining) {
            Ok(equity) => {
                debug!(
                    "candidate {} oracle {:.4} (heuristic {:.4})",
                    candidate.mv, equity, candidate.score
                );
                candidate.score = equity;
                candidate.source = ScoreSource::Oracle;
            }
            Err(e) => debug!("oracle skipped for {}: {}", candidate.mv, e),
        }
    }
    prefix.sort_by(by_score_desc);
}
