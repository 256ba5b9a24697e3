//! Text protocol spoken with the oracle process.
//!
//! Commands are single lines on stdin. Each command's output ends when the
//! interactive prompt reappears. Output parsing is tolerant: it looks for the
//! deepest equity the evaluator printed and ignores everything else.

use crate::board::Player;

use super::encoding::{turn_index, OracleBoard};
use super::OracleError;

/// Interactive prompt printed when the oracle is ready for input.
pub const PROMPT: &str = "gnubg>";

/// Resets the match and sets up the starting position.
pub const NEW_GAME: &str = "new game";

/// Static evaluation of the current position.
pub const EVAL: &str = "eval";

/// Best-move analysis for the current dice.
pub const HINT: &str = "hint";

/// Command-line flags for a quiet, non-interactive session.
pub const LAUNCH_ARGS: [&str; 4] = ["-t", "-c", "--no-rc", "--quiet"];

/// `set board` command. An empty encoding resets to the starting layout.
pub fn board_command(board: &OracleBoard) -> String {
    if board.is_empty() {
        "set board".to_string()
    } else {
        format!("set board position {}", board)
    }
}

pub fn turn_command(player: Player) -> String {
    format!("set turn {}", turn_index(player))
}

pub fn dice_command(dice: (u8, u8)) -> Result<String, OracleError> {
    let valid = |d: u8| (1..=6).contains(&d);
    if !valid(dice.0) || !valid(dice.1) {
        return Err(OracleError::Encoding(format!(
            "dice out of range: {} {}",
            dice.0, dice.1
        )));
    }
    Ok(format!("set dice {} {}", dice.0, dice.1))
}

/// True if a line of output carries the prompt.
pub fn is_prompt(line: &str) -> bool {
    line.contains(PROMPT)
}

/// Extracts the side-to-move equity from `eval` output.
///
/// Accepts evaluator rows (`static:` / `N ply:`) whose equity sits in
/// parentheses, and plain `equity: x` lines. The last match wins, since
/// deeper plies are printed after shallower ones.
pub fn parse_equity(lines: &[String]) -> Result<f64, OracleError> {
    let mut found = None;
    for line in lines {
        let trimmed = line.trim();
        let lower = trimmed.to_ascii_lowercase();
        let value = if lower.starts_with("static:") || lower.contains("ply:") {
            trimmed
                .find('(')
                .and_then(|i| leading_number(&trimmed[i + 1..]))
        } else if let Some(i) = lower.find("equity:") {
            leading_number(&trimmed[i + "equity:".len()..])
        } else if let Some(i) = lower.find("(equity") {
            leading_number(&trimmed[i + "(equity".len()..])
        } else {
            None
        };
        if value.is_some() {
            found = value;
        }
    }
    found.ok_or_else(|| OracleError::Malformed(summarize(lines)))
}

/// Extracts the best move and its equity from `hint` output.
///
/// Two layouts are understood:
/// `Best move: 8/5 6/5 (equity +0.123)` and the ranked table row
/// `1. Cubeful 2-ply    8/5 6/5    Eq.:  +0.123`.
pub fn parse_hint(lines: &[String]) -> Result<(String, f64), OracleError> {
    for line in lines {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Best move:") {
            if let Some(i) = rest.find("(equity") {
                let notation = rest[..i].trim();
                if let Some(eq) = leading_number(&rest[i + "(equity".len()..]) {
                    if !notation.is_empty() {
                        return Ok((notation.to_string(), eq));
                    }
                }
            }
        }
        if let Some(rest) = trimmed.strip_prefix("1.") {
            if let Some(i) = rest.find("Eq.:") {
                let eq = leading_number(&rest[i + "Eq.:".len()..]);
                let notation = table_notation(&rest[..i]);
                if let (Some(eq), Some(notation)) = (eq, notation) {
                    return Ok((notation, eq));
                }
            }
        }
    }
    Err(OracleError::Malformed(summarize(lines)))
}

/// Move text of a ranked table row: everything after the evaluator label.
fn table_notation(row: &str) -> Option<String> {
    let tokens: Vec<&str> = row.split_whitespace().collect();
    let start = tokens
        .iter()
        .position(|t| t.ends_with("-ply") || t.eq_ignore_ascii_case("static"))?;
    let notation = tokens[start + 1..].join(" ");
    if notation.is_empty() {
        None
    } else {
        Some(notation)
    }
}

/// Parses the first signed decimal at the start of `s` (after whitespace).
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

fn summarize(lines: &[String]) -> String {
    let joined = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !is_prompt(l))
        .collect::<Vec<_>>()
        .join(" | ");
    if joined.is_empty() {
        "no output".to_string()
    } else {
        joined.chars().take(200).collect()
    }
}
