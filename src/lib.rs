//! Backgammon CPU opponent library.
//!
//! Exposes the board model, heuristic evaluation, the optional oracle,
//! move selection and the request protocol for use by integration tests and
//! the binaries.

pub mod board;
pub mod config;
pub mod engine;
pub mod eval;
pub mod oracle;
pub mod protocol;
pub mod search;
