//! Move selection.
//!
//! Ranks the legal moves (heuristic fast pass, optional oracle refinement),
//! applies the skill model for the requested difficulty, and bounds the
//! whole pipeline by a wall-clock deadline.

pub mod candidates;
pub mod difficulty;
pub mod harness;

pub use candidates::{select_move_candidates, ScoreSource, ScoredMove, SearchContext};
pub use difficulty::{accuracy, clamp_level, pick_move, SkillProfile, SKILL_TABLE};
pub use harness::{fallback_move, run_bounded, select_move, Method, Selection, SelectionJob};
