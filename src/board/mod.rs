//! Board representation.
//!
//! Players and board geometry, the position snapshot, and the move
//! descriptor / apply seam to the external rules engine.

pub mod moves;
pub mod player;
pub mod position;

pub use moves::{DescriptorApplier, Move, MoveApplier, MoveError, MoveKind};
pub use player::{
    Player, ALL_PLAYERS, BAR_PIPS, CHECKERS_PER_PLAYER, ENGINE_SIDE, HUMAN_SIDE, POINT_COUNT,
};
pub use position::{Position, PositionError};
