//! Skill curve audit.
//!
//! Samples the difficulty model over a synthetic best-first ranking for every
//! level and prints one JSON line per level with the observed pick rates.
//!
//! Usage:
//!   cargo run --release --bin calibrate -- [--trials N] [--candidates N] [--seed N]

use anyhow::{bail, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use gammon_cpu::board::Move;
use gammon_cpu::search::difficulty::{profile, MAX_LEVEL, MIN_LEVEL};
use gammon_cpu::search::{pick_move, ScoreSource, ScoredMove};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sample the skill curve of every difficulty level", long_about = None)]
struct Args {
    /// Picks sampled per level
    #[arg(long, default_value_t = 100_000)]
    trials: usize,

    /// Size of the synthetic ranking
    #[arg(long, default_value_t = 12)]
    candidates: u8,

    /// RNG seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Serialize)]
struct LevelReport {
    level: u8,
    accuracy: f64,
    top_rate: f64,
    second_rate: f64,
    blunder_rate: f64,
    mean_rank: f64,
}

fn ranking(n: u8) -> Vec<ScoredMove> {
    (0..n)
        .map(|i| ScoredMove {
            mv: Move::point(i),
            score: 1.0 - f64::from(i) / f64::from(n),
            source: ScoreSource::Heuristic,
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.candidates < 2 {
        bail!("--candidates must be at least 2");
    }
    if args.trials == 0 {
        bail!("--trials must be positive");
    }

    let ranked = ranking(args.candidates);
    let len = ranked.len();
    let mut rng = SmallRng::seed_from_u64(args.seed);

    for level in MIN_LEVEL..=MAX_LEVEL {
        let skill = profile(level);
        let blunder_start = ((len as f64 * skill.blunder_from) as usize).min(len - 1);
        let mut hits = vec![0usize; len];
        for _ in 0..args.trials {
            let Some(mv) = pick_move(&ranked, level, &mut rng) else {
                bail!("empty pick at level {}", level);
            };
            let Some(rank) = mv.0.as_u64() else {
                bail!("unexpected move {}", mv.0);
            };
            hits[rank as usize] += 1;
        }

        let trials = args.trials as f64;
        let rank_sum: usize = hits.iter().enumerate().map(|(i, n)| i * n).sum();
        let report = LevelReport {
            level,
            accuracy: skill.accuracy,
            top_rate: hits[0] as f64 / trials,
            second_rate: hits[1] as f64 / trials,
            blunder_rate: hits[blunder_start..].iter().sum::<usize>() as f64 / trials,
            mean_rank: rank_sum as f64 / trials,
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}
