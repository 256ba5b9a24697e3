//! Engine state management.
//!
//! Holds the configuration, the oracle handle, the move applier and the RNG,
//! and answers protocol requests. Every request gets exactly one JSON line on
//! the output; failures become `{"error": ...}` lines rather than aborting
//! the session.

use std::io::{self, Write};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::board::{DescriptorApplier, MoveApplier, Position};
use crate::config::{ConfigError, EngineConfig};
use crate::eval::evaluate;
use crate::oracle::{DisabledOracle, GnubgOracle, Hint, Oracle, OracleError};
use crate::protocol::{
    DoubleAction, DoubleResponse, ErrorResponse, EvaluateResponse, HealthResponse, HintResponse,
    MoveResponse, OptionResponse, Request, WireGameState,
};
use crate::protocol::request::{DoubleRequest, EvaluateRequest, HintRequest, MoveRequest};
use crate::search::{clamp_level, select_move, Method, ScoreSource, Selection, SelectionJob};

/// Service name reported by the health request.
pub const SERVICE_NAME: &str = "gammon-cpu";

/// Offer a double above this equity.
pub const DOUBLE_OFFER_THRESHOLD: f64 = 0.6;
/// Accept a double above this equity.
pub const DOUBLE_ACCEPT_THRESHOLD: f64 = -0.4;

/// Errors reported back to the caller as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("game state required")]
    MissingState,

    #[error("no legal moves available")]
    NoLegalMoves,

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::InvalidRequest(e.to_string())
    }
}

fn oracle_for(config: &EngineConfig) -> Arc<dyn Oracle> {
    if config.oracle_enabled {
        Arc::new(GnubgOracle::new(config.oracle.clone()))
    } else {
        info!("oracle disabled by configuration");
        Arc::new(DisabledOracle)
    }
}

fn rng_for(config: &EngineConfig) -> SmallRng {
    match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

fn position_of(state: Option<&WireGameState>) -> Result<Position, EngineError> {
    state
        .ok_or(EngineError::MissingState)?
        .to_position()
        .map_err(|e| EngineError::InvalidPosition(e.to_string()))
}

fn respond<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()
}

fn respond_error<W: Write>(out: &mut W, err: &EngineError) -> io::Result<()> {
    debug!("request failed: {}", err);
    respond(
        out,
        &ErrorResponse {
            error: err.to_string(),
        },
    )
}

/// Holds the mutable state of the engine between requests.
pub struct Engine {
    config: EngineConfig,
    oracle: Arc<dyn Oracle>,
    applier: Arc<dyn MoveApplier>,
    rng: SmallRng,
}

impl Engine {
    /// Creates an engine with the process-backed oracle (if enabled and
    /// found) and the descriptor move applier.
    pub fn new(config: EngineConfig) -> Self {
        let oracle = oracle_for(&config);
        Engine::with_parts(config, oracle, Arc::new(DescriptorApplier))
    }

    /// Creates an engine around explicit collaborators.
    pub fn with_parts(
        config: EngineConfig,
        oracle: Arc<dyn Oracle>,
        applier: Arc<dyn MoveApplier>,
    ) -> Self {
        let rng = rng_for(&config);
        Engine {
            config,
            oracle,
            applier,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle_available(&self) -> bool {
        self.oracle.is_available()
    }

    /// Applies an option. Oracle options restart the oracle handle and a
    /// seed option reseeds the RNG.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.config.apply_option(name, value)?;
        match name.to_ascii_lowercase().as_str() {
            "oracle" | "oraclepath" | "oracle_path" | "oracletimeoutms" | "oracle_timeout_ms" => {
                self.oracle = oracle_for(&self.config);
            }
            "seed" => self.rng = rng_for(&self.config),
            _ => {}
        }
        info!("option {} = {}", name, value);
        Ok(())
    }

    /// Chooses a move for the engine side.
    pub fn choose_move(&mut self, req: &MoveRequest) -> Result<Selection, EngineError> {
        let position = position_of(req.game_state.as_ref())?;
        if req.legal_moves.is_empty() {
            return Err(EngineError::NoLegalMoves);
        }
        let job = SelectionJob {
            position,
            legal_moves: req.legal_moves.clone(),
            difficulty: clamp_level(req.difficulty),
            oracle: Arc::clone(&self.oracle),
            applier: Arc::clone(&self.applier),
        };
        select_move(job, self.config.selection_deadline, &mut self.rng)
            .ok_or(EngineError::NoLegalMoves)
    }

    /// Equity of a position: the oracle's when it answers, else the heuristic.
    pub fn evaluate(&self, state: Option<&WireGameState>) -> Result<(f64, ScoreSource), EngineError> {
        let position = position_of(state)?;
        if self.oracle.is_available() {
            match self.oracle.evaluate(&position, self.config.oracle.eval_budget()) {
                Ok(e) => return Ok((e, ScoreSource::Oracle)),
                Err(e) => warn!("oracle evaluation failed, using heuristic: {}", e),
            }
        }
        Ok((evaluate(&position), ScoreSource::Heuristic))
    }

    /// Doubling decision from the heuristic evaluation.
    pub fn double(&self, req: &DoubleRequest) -> Result<DoubleResponse, EngineError> {
        let position = position_of(req.game_state.as_ref())?;
        let evaluation = evaluate(&position);
        let should = match req.action {
            DoubleAction::Offer => evaluation > DOUBLE_OFFER_THRESHOLD,
            DoubleAction::Accept => evaluation > DOUBLE_ACCEPT_THRESHOLD,
        };
        Ok(DoubleResponse {
            should,
            action: req.action,
            evaluation,
            difficulty: clamp_level(req.difficulty),
        })
    }

    /// The oracle's best play for the requested roll.
    pub fn hint(&self, req: &HintRequest) -> Result<Hint, EngineError> {
        let position = position_of(req.game_state.as_ref())?;
        if !self.oracle.is_available() {
            return Err(OracleError::Unavailable.into());
        }
        let dice = (req.dice[0], req.dice[1]);
        Ok(self
            .oracle
            .hint(&position, dice, self.config.oracle.hint_budget())?)
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok",
            oracle_available: self.oracle.is_available(),
            service: SERVICE_NAME,
        }
    }

    pub fn handle_move<W: Write>(&mut self, req: &MoveRequest, out: &mut W) -> io::Result<()> {
        match self.choose_move(req) {
            Ok(sel) => {
                let timed_out = sel.method == Method::TimeoutFallback;
                respond(
                    out,
                    &MoveResponse {
                        note: format!(
                            "Move selected (timeout: {}, accuracy: {:.1}%)",
                            timed_out,
                            sel.accuracy * 100.0
                        ),
                        mv: sel.mv,
                        method: sel.method,
                        difficulty: sel.difficulty,
                        accuracy: sel.accuracy,
                        score: sel.score,
                        source: sel.source,
                    },
                )
            }
            Err(e) => respond_error(out, &e),
        }
    }

    pub fn handle_evaluate<W: Write>(&self, req: &EvaluateRequest, out: &mut W) -> io::Result<()> {
        match self.evaluate(req.game_state.as_ref()) {
            Ok((evaluation, source)) => respond(out, &EvaluateResponse { evaluation, source }),
            Err(e) => respond_error(out, &e),
        }
    }

    pub fn handle_double<W: Write>(&self, req: &DoubleRequest, out: &mut W) -> io::Result<()> {
        match self.double(req) {
            Ok(resp) => respond(out, &resp),
            Err(e) => respond_error(out, &e),
        }
    }

    pub fn handle_hint<W: Write>(&self, req: &HintRequest, out: &mut W) -> io::Result<()> {
        match self.hint(req) {
            Ok(hint) => respond(
                out,
                &HintResponse {
                    notation: hint.notation,
                    equity: hint.equity,
                },
            ),
            Err(e) => respond_error(out, &e),
        }
    }

    pub fn handle_health<W: Write>(&self, out: &mut W) -> io::Result<()> {
        respond(out, &self.health())
    }

    pub fn handle_setoption<W: Write>(
        &mut self,
        name: &str,
        value: &str,
        out: &mut W,
    ) -> io::Result<()> {
        match self.set_option(name, value) {
            Ok(()) => respond(
                out,
                &OptionResponse {
                    status: "ok",
                    name: name.to_string(),
                },
            ),
            Err(e) => respond_error(out, &e),
        }
    }

    /// Dispatches one request. Returns `Ok(false)` when the session should end.
    pub fn handle_request<W: Write>(&mut self, request: Request, out: &mut W) -> io::Result<bool> {
        match request {
            Request::Move(req) => self.handle_move(&req, out)?,
            Request::Evaluate(req) => self.handle_evaluate(&req, out)?,
            Request::Double(req) => self.handle_double(&req, out)?,
            Request::Hint(req) => self.handle_hint(&req, out)?,
            Request::Health => self.handle_health(out)?,
            Request::SetOption(req) => {
                let value = req.value_text();
                self.handle_setoption(&req.name, &value, out)?
            }
            Request::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Reports a line that could not be parsed.
    pub fn handle_malformed<W: Write>(&self, message: &str, out: &mut W) -> io::Result<()> {
        respond_error(out, &EngineError::InvalidRequest(message.to_string()))
    }
}
