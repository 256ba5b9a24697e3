//! Board metrics.
//!
//! Pure functions over a position snapshot: pip count, blocked points,
//! blots, trapped checkers and the conservative certain-win test. Nothing
//! here allocates or keeps state, so any number of evaluations can run in
//! parallel on their own copies.

use crate::board::{Player, Position, BAR_PIPS, CHECKERS_PER_PLAYER, POINT_COUNT};

/// Points in front of a checker that must all be held to trap it.
const ESCAPE_WINDOW: usize = 6;

/// Blocked entry points needed before bar checkers count as half trapped.
const PARTIAL_ENTRY_BLOCK: usize = 4;

/// Certain-win race thresholds. Policy constants, not a bear-off proof.
const CLOSED_OUT_MAX_PIPS: u32 = 10;
const CLOSED_OUT_MIN_OPP_PIPS: u32 = 20;
const LATE_RACE_MIN_BORNE: u8 = 10;
const LATE_RACE_MAX_PIPS: u32 = 15;

/// Total pips `player` still has to travel, counting 25 per bar checker.
pub fn pip_count(pos: &Position, player: Player) -> u32 {
    let board: u32 = pos.points[player.index()]
        .iter()
        .enumerate()
        .map(|(point, &n)| n as u32 * player.distance_to_off(point))
        .sum();
    board + BAR_PIPS * pos.bar_count(player) as u32
}

/// True if `by_player` holds `point` with two or more checkers.
#[inline]
pub fn is_point_blocked(pos: &Position, point: usize, by_player: Player) -> bool {
    point < POINT_COUNT && pos.count(point, by_player) >= 2
}

/// Number of points holding exactly one checker of `player`.
pub fn exposed_blots(pos: &Position, player: Player) -> u32 {
    pos.points[player.index()].iter().filter(|&&n| n == 1).count() as u32
}

/// Checkers of `player` in their own home board.
pub fn checkers_in_home(pos: &Position, player: Player) -> u32 {
    player
        .home()
        .map(|point| pos.count(point, player) as u32)
        .sum()
}

/// Weighted count of trapped checkers.
///
/// Bar checkers weigh 1.0 when all six entry points are held by the
/// opponent and 0.5 when four or five are. A checker inside the opponent's
/// home weighs 1.0 when every point of the six-point window in front of it
/// is held by the opponent.
pub fn trapped_count(pos: &Position, player: Player) -> f64 {
    let opp = player.opponent();
    let mut trapped = 0.0;

    let on_bar = pos.bar_count(player) as f64;
    if on_bar > 0.0 {
        let blocked = player
            .entry_points()
            .filter(|&p| is_point_blocked(pos, p, opp))
            .count();
        if blocked >= ESCAPE_WINDOW {
            trapped += on_bar;
        } else if blocked >= PARTIAL_ENTRY_BLOCK {
            trapped += on_bar * 0.5;
        }
    }

    for point in opp.home() {
        let n = pos.count(point, player);
        if n > 0 && escape_blocked(pos, point, player) {
            trapped += n as f64;
        }
    }
    trapped
}

/// True if every point in the window ahead of `point` is held by the opponent.
fn escape_blocked(pos: &Position, point: usize, player: Player) -> bool {
    let opp = player.opponent();
    let mut seen = 0;
    for step in 1..=ESCAPE_WINDOW {
        match player.advance(point, step) {
            Some(ahead) => {
                if !is_point_blocked(pos, ahead, opp) {
                    return false;
                }
                seen += 1;
            }
            None => break,
        }
    }
    seen > 0
}

/// The one-sided race test behind `is_certain_win`.
fn race_locked(pos: &Position, player: Player) -> bool {
    let opp = player.opponent();
    let borne = pos.borne_off_count(player);
    if borne == CHECKERS_PER_PLAYER {
        return true;
    }

    if pos.bar_count(player) > 0
        || checkers_in_home(pos, player) + borne as u32 != CHECKERS_PER_PLAYER as u32
    {
        return false;
    }
    if player.home().any(|point| pos.count(point, opp) > 0) {
        return false;
    }

    let pips = pip_count(pos, player);
    let opp_pips = pip_count(pos, opp);
    (pips < CLOSED_OUT_MAX_PIPS && opp_pips > CLOSED_OUT_MIN_OPP_PIPS)
        || (borne >= LATE_RACE_MIN_BORNE && pips < LATE_RACE_MAX_PIPS)
}

/// Conservative certain-win test.
///
/// A side with every checker borne off has won. Otherwise all of
/// `player`'s checkers must be home or borne off with none on the bar, the
/// opponent must have nothing left inside that home, and the race must be
/// far enough ahead. False negatives are fine; false positives are not, so a position
/// where both sides pass the race test counts for neither.
pub fn is_certain_win(pos: &Position, player: Player) -> bool {
    race_locked(pos, player) && !race_locked(pos, player.opponent())
}
