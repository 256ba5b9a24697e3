//! Skill levels.
//!
//! Each level has an accuracy (chance of playing well), a near-miss rule for
//! what "playing well" means at that level, and a blunder slice at the bottom
//! of the ranking that bad plays are drawn from. All of it lives in
//! `SKILL_TABLE` so the curve can be tuned in one place.

use rand::Rng;

use crate::board::Move;

use super::candidates::ScoredMove;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 9;

/// What an accurate play looks like at a level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NearMiss {
    /// Always the top candidate.
    Never,
    /// With probability `chance`, a uniform pick among the top `n`.
    TopN { chance: f64, n: usize },
    /// With probability `chance`, the second-best candidate.
    SecondBest { chance: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillProfile {
    pub level: u8,
    /// Probability that a pick is an accurate play rather than a blunder.
    pub accuracy: f64,
    pub near_miss: NearMiss,
    /// Fraction of the ranking where the blunder slice starts.
    pub blunder_from: f64,
}

pub const SKILL_TABLE: [SkillProfile; 9] = [
    SkillProfile {
        level: 1,
        accuracy: 0.08,
        near_miss: NearMiss::TopN { chance: 1.0, n: 4 },
        blunder_from: 0.75,
    },
    SkillProfile {
        level: 2,
        accuracy: 0.15,
        near_miss: NearMiss::TopN { chance: 1.0, n: 3 },
        blunder_from: 0.5,
    },
    SkillProfile {
        level: 3,
        accuracy: 0.30,
        near_miss: NearMiss::TopN { chance: 0.3, n: 3 },
        blunder_from: 0.6,
    },
    SkillProfile {
        level: 4,
        accuracy: 0.45,
        near_miss: NearMiss::TopN { chance: 0.2, n: 3 },
        blunder_from: 0.7,
    },
    SkillProfile {
        level: 5,
        accuracy: 0.60,
        near_miss: NearMiss::SecondBest { chance: 0.15 },
        blunder_from: 0.75,
    },
    SkillProfile {
        level: 6,
        accuracy: 0.75,
        near_miss: NearMiss::SecondBest { chance: 0.05 },
        blunder_from: 0.75,
    },
    SkillProfile {
        level: 7,
        accuracy: 0.95,
        near_miss: NearMiss::Never,
        blunder_from: 0.7,
    },
    SkillProfile {
        level: 8,
        accuracy: 0.985,
        near_miss: NearMiss::Never,
        blunder_from: 0.7,
    },
    SkillProfile {
        level: 9,
        accuracy: 0.998,
        near_miss: NearMiss::Never,
        blunder_from: 0.7,
    },
];

/// Maps any requested difficulty onto a table level.
pub fn clamp_level(difficulty: i64) -> u8 {
    difficulty.clamp(MIN_LEVEL as i64, MAX_LEVEL as i64) as u8
}

pub fn profile(difficulty: u8) -> &'static SkillProfile {
    &SKILL_TABLE[clamp_level(difficulty as i64) as usize - 1]
}

/// Advertised accuracy for a difficulty.
pub fn accuracy(difficulty: u8) -> f64 {
    profile(difficulty).accuracy
}

/// Index into the blunder slice of a ranking of `len`. `len` must be > 0.
fn blunder_index<R: Rng + ?Sized>(len: usize, blunder_from: f64, rng: &mut R) -> usize {
    let start = (len as f64 * blunder_from) as usize;
    if start >= len {
        len - 1
    } else {
        rng.gen_range(start..len)
    }
}

/// Chooses an index into a best-first ranking of `len` candidates.
pub fn pick_index<R: Rng + ?Sized>(len: usize, difficulty: u8, rng: &mut R) -> Option<usize> {
    match len {
        0 => return None,
        1 => return Some(0),
        _ => {}
    }
    let skill = profile(difficulty);

    if rng.gen::<f64>() >= skill.accuracy {
        return Some(blunder_index(len, skill.blunder_from, rng));
    }

    let index = match skill.near_miss {
        NearMiss::Never => 0,
        NearMiss::TopN { chance, n } => {
            if chance >= 1.0 || rng.gen::<f64>() < chance {
                rng.gen_range(0..n.min(len))
            } else {
                0
            }
        }
        NearMiss::SecondBest { chance } => {
            if rng.gen::<f64>() < chance {
                1
            } else {
                0
            }
        }
    };
    Some(index)
}

/// Chooses a candidate from a best-first ranking.
pub fn pick_candidate<'a, R: Rng + ?Sized>(
    ranked: &'a [ScoredMove],
    difficulty: u8,
    rng: &mut R,
) -> Option<&'a ScoredMove> {
    pick_index(ranked.len(), difficulty, rng).map(|i| &ranked[i])
}

/// Chooses a move from a best-first ranking.
pub fn pick_move<R: Rng + ?Sized>(
    ranked: &[ScoredMove],
    difficulty: u8,
    rng: &mut R,
) -> Option<Move> {
    pick_candidate(ranked, difficulty, rng).map(|c| c.mv.clone())
}
