//! Position evaluation.
//!
//! Board metrics (pip count, blots, trapped checkers, certain-win test) and
//! the heuristic evaluator that blends them into an equity in [-1, 1].

pub mod heuristic;
pub mod metrics;

pub use heuristic::{evaluate, evaluate_breakdown, EvalBreakdown, Weights};
pub use metrics::{
    checkers_in_home, exposed_blots, is_certain_win, is_point_blocked, pip_count, trapped_count,
};
