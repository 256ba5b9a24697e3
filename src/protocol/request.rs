//! Line-delimited JSON requests and responses.
//!
//! One request object per input line, tagged by `"type"`. Each request gets
//! exactly one response line.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::board::Move;
use crate::search::{Method, ScoreSource};

use super::wire::WireGameState;

/// Difficulty assumed when a request does not name one.
pub const DEFAULT_DIFFICULTY: i64 = 5;

fn default_difficulty() -> i64 {
    DEFAULT_DIFFICULTY
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub game_state: Option<WireGameState>,
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
    #[serde(default)]
    pub legal_moves: Vec<Move>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub game_state: Option<WireGameState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoubleAction {
    Offer,
    #[default]
    Accept,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubleRequest {
    pub game_state: Option<WireGameState>,
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
    #[serde(default)]
    pub action: DoubleAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub game_state: Option<WireGameState>,
    pub dice: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetOptionRequest {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl SetOptionRequest {
    /// The value as option text. Strings are taken verbatim, other JSON
    /// values in their compact form, and a missing value as empty.
    pub fn value_text(&self) -> String {
        match &self.value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    /// Choose a move from the supplied legal moves.
    Move(MoveRequest),

    /// Equity of a position, oracle first.
    Evaluate(EvaluateRequest),

    /// Offer or accept a double.
    Double(DoubleRequest),

    /// The oracle's best play for a roll.
    Hint(HintRequest),

    /// Liveness and oracle status.
    Health,

    /// Change an engine option.
    SetOption(SetOptionRequest),

    /// Stop reading input.
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_request(line: &str) -> Result<Option<Request>, RequestError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveResponse {
    #[serde(rename = "move")]
    pub mv: Move,
    pub method: Method,
    pub difficulty: u8,
    pub accuracy: f64,
    pub score: Option<f64>,
    pub source: Option<ScoreSource>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluateResponse {
    pub evaluation: f64,
    pub source: ScoreSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoubleResponse {
    pub should: bool,
    pub action: DoubleAction,
    pub evaluation: f64,
    pub difficulty: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HintResponse {
    #[serde(rename = "move")]
    pub notation: String,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub oracle_available: bool,
    pub service: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionResponse {
    pub status: &'static str,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_request("").unwrap().is_none());
        assert!(parse_request("   \t").unwrap().is_none());
    }

    #[test]
    fn parse_move_request() {
        let line = r#"{"type":"move","gameState":{"checkers":[]},"difficulty":8,"legalMoves":[5,"bearoff","13/7"]}"#;
        match parse_request(line).unwrap() {
            Some(Request::Move(req)) => {
                assert!(req.game_state.is_some());
                assert_eq!(req.difficulty, 8);
                assert_eq!(
                    req.legal_moves,
                    vec![
                        Move::point(5),
                        Move::descriptor("bearoff"),
                        Move::descriptor("13/7")
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn move_request_defaults() {
        match parse_request(r#"{"type":"move"}"#).unwrap() {
            Some(Request::Move(req)) => {
                assert!(req.game_state.is_none());
                assert_eq!(req.difficulty, DEFAULT_DIFFICULTY);
                assert!(req.legal_moves.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parse_double_actions() {
        let offer = parse_request(r#"{"type":"double","gameState":{},"action":"offer"}"#).unwrap();
        assert!(matches!(
            offer,
            Some(Request::Double(DoubleRequest {
                action: DoubleAction::Offer,
                ..
            }))
        ));
        let accept = parse_request(r#"{"type":"double","gameState":{}}"#).unwrap();
        assert!(matches!(
            accept,
            Some(Request::Double(DoubleRequest {
                action: DoubleAction::Accept,
                ..
            }))
        ));
    }

    #[test]
    fn parse_simple_requests() {
        assert_eq!(
            parse_request(r#"{"type":"health"}"#).unwrap(),
            Some(Request::Health)
        );
        assert_eq!(
            parse_request(r#"{"type":"quit"}"#).unwrap(),
            Some(Request::Quit)
        );
        match parse_request(r#"{"type":"hint","gameState":{},"dice":[6,1]}"#).unwrap() {
            Some(Request::Hint(req)) => assert_eq!(req.dice, [6, 1]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn setoption_value_text() {
        let parse_opt = |line: &str| match parse_request(line).unwrap() {
            Some(Request::SetOption(req)) => req,
            other => panic!("unexpected {:?}", other),
        };
        let req = parse_opt(r#"{"type":"setoption","name":"DeadlineMs","value":250}"#);
        assert_eq!(req.name, "DeadlineMs");
        assert_eq!(req.value_text(), "250");
        let req = parse_opt(r#"{"type":"setoption","name":"oracle","value":"off"}"#);
        assert_eq!(req.value_text(), "off");
        let req = parse_opt(r#"{"type":"setoption","name":"seed"}"#);
        assert_eq!(req.value_text(), "");
    }

    #[test]
    fn malformed_requests_error() {
        assert!(parse_request("not json").is_err());
        assert!(parse_request(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_request(r#"{"difficulty":3}"#).is_err());
    }

    #[test]
    fn move_response_shape() {
        let resp = MoveResponse {
            mv: Move::descriptor("bearoff"),
            method: Method::TimeoutFallback,
            difficulty: 9,
            accuracy: 0.998,
            score: None,
            source: None,
            note: "n".into(),
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            v,
            json!({
                "move": "bearoff",
                "method": "timeout-fallback",
                "difficulty": 9,
                "accuracy": 0.998,
                "score": null,
                "source": null,
                "note": "n"
            })
        );
    }
}
