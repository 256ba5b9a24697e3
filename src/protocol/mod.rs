//! Request protocol.
//!
//! Line-delimited JSON requests on stdin, one JSON response per line on
//! stdout, and the game-state wire format the requests carry.

pub mod request;
pub mod wire;

pub use request::{
    parse_request, DoubleAction, DoubleResponse, ErrorResponse, EvaluateResponse, HealthResponse,
    HintResponse, MoveResponse, OptionResponse, Request, RequestError,
};
pub use wire::{WireChecker, WireCount, WireError, WireGameState};
