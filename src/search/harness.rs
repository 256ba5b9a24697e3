//! Deadline-bounded move selection.
//!
//! The selection pipeline runs on its own thread. The caller waits on a
//! channel until the deadline; on expiry it raises the cancel flag, stops
//! waiting, and answers with a fallback move. The abandoned worker owns only
//! copies and shared handles, so it can finish (or not) without affecting
//! later requests.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, log_enabled, warn, Level};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::board::{Move, MoveApplier, Position};
use crate::eval::evaluate_breakdown;
use crate::oracle::Oracle;

use super::candidates::{select_move_candidates, ScoreSource, SearchContext};
use super::difficulty::{accuracy, clamp_level, pick_candidate};

/// Highest difficulty whose fallback is always the first legal move.
pub const FALLBACK_FIRST_MAX_DIFFICULTY: u8 = 5;
/// Candidates the higher-level fallback chooses among.
pub const FALLBACK_POOL: usize = 3;

/// How the returned move was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Evaluated,
    TimeoutFallback,
}

/// The chosen move and how it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub mv: Move,
    pub method: Method,
    /// Equity of the chosen move. `None` for fallback picks.
    pub score: Option<f64>,
    pub source: Option<ScoreSource>,
    pub accuracy: f64,
    pub difficulty: u8,
}

/// Runs `job` on a worker thread for at most `deadline`.
///
/// The job receives the cancel flag. If it does not finish in time (or
/// panics), `fallback` supplies the value instead.
pub fn run_bounded<T, J, F>(deadline: Duration, job: J, fallback: F) -> (T, Method)
where
    T: Send + 'static,
    J: FnOnce(&AtomicBool) -> T + Send + 'static,
    F: FnOnce() -> T,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let flag = Arc::clone(&cancel);
    let spawned = thread::Builder::new()
        .name("move-selection".into())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(&flag)));
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        error!("could not start selection worker: {}", e);
        return (fallback(), Method::TimeoutFallback);
    }

    match rx.recv_timeout(deadline) {
        Ok(Ok(value)) => (value, Method::Evaluated),
        Ok(Err(_)) => {
            error!("selection worker panicked, using fallback");
            (fallback(), Method::TimeoutFallback)
        }
        Err(RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            warn!("selection exceeded {:?}, using fallback", deadline);
            (fallback(), Method::TimeoutFallback)
        }
        Err(RecvTimeoutError::Disconnected) => {
            error!("selection worker vanished, using fallback");
            (fallback(), Method::TimeoutFallback)
        }
    }
}

/// Fallback pick: the first legal move at low levels, otherwise a uniform
/// pick among the first few.
pub fn fallback_move<R: Rng + ?Sized>(
    legal_moves: &[Move],
    difficulty: u8,
    rng: &mut R,
) -> Option<Move> {
    if legal_moves.is_empty() {
        return None;
    }
    if difficulty <= FALLBACK_FIRST_MAX_DIFFICULTY {
        return Some(legal_moves[0].clone());
    }
    let pool = legal_moves.len().min(FALLBACK_POOL);
    Some(legal_moves[rng.gen_range(0..pool)].clone())
}

/// Inputs for one selection.
#[derive(Clone)]
pub struct SelectionJob {
    pub position: Position,
    pub legal_moves: Vec<Move>,
    pub difficulty: u8,
    pub oracle: Arc<dyn Oracle>,
    pub applier: Arc<dyn MoveApplier>,
}

/// Ranks the legal moves, applies the skill model, and bounds the whole
/// thing by `deadline`. Returns `None` only when there are no legal moves.
pub fn select_move<R: Rng + ?Sized>(
    job: SelectionJob,
    deadline: Duration,
    rng: &mut R,
) -> Option<Selection> {
    if job.legal_moves.is_empty() {
        return None;
    }
    let difficulty = clamp_level(job.difficulty as i64);
    let started = Instant::now();
    let oracle_deadline = started + deadline;
    let worker_seed: u64 = rng.gen();
    let legal_for_fallback = job.legal_moves.clone();

    let (picked, method) = run_bounded(
        deadline,
        move |cancel| {
            let mut worker_rng = SmallRng::seed_from_u64(worker_seed);
            let ctx = SearchContext {
                difficulty,
                oracle: job.oracle.as_ref(),
                applier: job.applier.as_ref(),
                cancel,
                deadline: oracle_deadline,
            };
            let ranked = select_move_candidates(&job.position, &job.legal_moves, &ctx);
            let chosen = pick_candidate(&ranked, difficulty, &mut worker_rng).cloned();
            if let Some(c) = &chosen {
                if log_enabled!(Level::Debug) {
                    if let Ok(next) = job.applier.apply(&job.position, &c.mv) {
                        debug!("chosen {} breakdown {:?}", c.mv, evaluate_breakdown(&next));
                    }
                }
            }
            chosen.map(|c| (c.mv, Some(c.score), Some(c.source)))
        },
        || {
            fallback_move(&legal_for_fallback, difficulty, rng).map(|mv| (mv, None, None))
        },
    );

    let (mv, score, source) = picked?;
    debug!(
        "selected {} via {:?} in {:?}",
        mv,
        method,
        started.elapsed()
    );
    Some(Selection {
        mv,
        method,
        score,
        source,
        accuracy: accuracy(difficulty),
        difficulty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{DescriptorApplier, MoveError, Player};
    use crate::oracle::{DisabledOracle, OracleError};

    struct StallingOracle(Duration);

    impl Oracle for StallingOracle {
        fn is_available(&self) -> bool {
            true
        }

        fn evaluate(&self, _pos: &Position, _wait: Duration) -> Result<f64, OracleError> {
            thread::sleep(self.0);
            Ok(0.0)
        }
    }

    struct PanickingApplier;

    impl MoveApplier for PanickingApplier {
        fn apply(&self, _pos: &Position, _mv: &Move) -> Result<Position, MoveError> {
            panic!("applier exploded");
        }
    }

    fn legal() -> Vec<Move> {
        vec![
            Move::descriptor("13/7"),
            Move::descriptor("24/18"),
            Move::descriptor("8/5 6/5"),
            Move::descriptor("6/5"),
        ]
    }

    fn job(difficulty: u8, oracle: Arc<dyn Oracle>, applier: Arc<dyn MoveApplier>) -> SelectionJob {
        let mut position = Position::starting();
        position.turn = Player::Two;
        SelectionJob {
            position,
            legal_moves: legal(),
            difficulty,
            oracle,
            applier,
        }
    }

    #[test]
    fn run_bounded_returns_job_value() {
        let (v, method) = run_bounded(Duration::from_secs(2), |_| 7, || 0);
        assert_eq!(v, 7);
        assert_eq!(method, Method::Evaluated);
    }

    #[test]
    fn run_bounded_times_out_and_cancels() {
        let seen = Arc::new(AtomicBool::new(false));
        let seen_in_job = Arc::clone(&seen);
        let start = Instant::now();
        let (v, method) = run_bounded(
            Duration::from_millis(50),
            move |cancel| {
                while !cancel.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(5));
                }
                seen_in_job.store(true, Ordering::SeqCst);
                1
            },
            || 2,
        );
        assert_eq!(v, 2);
        assert_eq!(method, Method::TimeoutFallback);
        assert!(start.elapsed() < Duration::from_millis(500));

        // The abandoned worker observes the cancel flag.
        let wait_until = Instant::now() + Duration::from_secs(2);
        while !seen.load(Ordering::SeqCst) && Instant::now() < wait_until {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn run_bounded_survives_panics() {
        let (v, method) = run_bounded(
            Duration::from_secs(2),
            |_| -> i32 { panic!("boom") },
            || -1,
        );
        assert_eq!(v, -1);
        assert_eq!(method, Method::TimeoutFallback);
    }

    #[test]
    fn fallback_rules() {
        let moves = legal();
        let mut rng = SmallRng::seed_from_u64(11);
        for level in 1..=5 {
            assert_eq!(fallback_move(&moves, level, &mut rng), Some(moves[0].clone()));
        }
        for _ in 0..200 {
            let mv = fallback_move(&moves, 8, &mut rng).unwrap();
            assert!(moves[..3].contains(&mv));
        }
        assert_eq!(fallback_move(&[], 8, &mut rng), None);
        assert_eq!(
            fallback_move(&moves[..1], 9, &mut rng),
            Some(moves[0].clone())
        );
    }

    #[test]
    fn evaluated_selection_carries_score() {
        let mut rng = SmallRng::seed_from_u64(12);
        let sel = select_move(
            job(9, Arc::new(DisabledOracle), Arc::new(DescriptorApplier)),
            Duration::from_secs(5),
            &mut rng,
        )
        .unwrap();
        assert_eq!(sel.method, Method::Evaluated);
        assert!(legal().contains(&sel.mv));
        assert!(sel.score.is_some());
        assert_eq!(sel.source, Some(ScoreSource::Heuristic));
        assert_eq!(sel.difficulty, 9);
        assert_eq!(sel.accuracy, 0.998);
    }

    #[test]
    fn stalled_pipeline_falls_back_to_a_legal_move() {
        let mut rng = SmallRng::seed_from_u64(13);
        let start = Instant::now();
        let sel = select_move(
            job(
                9,
                Arc::new(StallingOracle(Duration::from_secs(3))),
                Arc::new(DescriptorApplier),
            ),
            Duration::from_millis(100),
            &mut rng,
        )
        .unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(sel.method, Method::TimeoutFallback);
        assert!(legal()[..3].contains(&sel.mv));
        assert_eq!(sel.score, None);
    }

    #[cfg(unix)]
    #[test]
    fn hung_oracle_keeps_the_heuristic_ranking() {
        use crate::config::OracleConfig;
        use crate::oracle::GnubgOracle;
        use std::path::PathBuf;

        let script = r#"
printf 'gnubg> '
while read line; do
  case "$line" in
    eval) exec sleep 30 ;;
  esac
  printf 'gnubg> '
done
"#;
        let oracle = GnubgOracle::new(OracleConfig {
            path: Some(PathBuf::from("/bin/sh")),
            launch_args: vec!["-c".to_string(), script.to_string()],
            ..OracleConfig::default()
        });

        // Late race, so three candidates are refined at level 9.
        let mut position = Position::empty(Player::Two);
        position.points[Player::Two.index()][0] = 5;
        position.borne_off[Player::Two.index()] = 10;
        position.points[Player::One.index()][20] = 15;
        assert!(!position.is_opening_phase());
        let moves: Vec<Move> = (1..=4).map(Move::point).collect();

        let deadline = Duration::from_millis(1500);
        let mut rng = SmallRng::seed_from_u64(18);
        let start = Instant::now();
        let sel = select_move(
            SelectionJob {
                position,
                legal_moves: moves.clone(),
                difficulty: 9,
                oracle: Arc::new(oracle),
                applier: Arc::new(DescriptorApplier),
            },
            deadline,
            &mut rng,
        )
        .unwrap();
        assert!(start.elapsed() < deadline, "took {:?}", start.elapsed());
        assert_eq!(sel.method, Method::Evaluated);
        assert!(moves.contains(&sel.mv));
        assert!(sel.score.is_some());
        assert_eq!(sel.source, Some(ScoreSource::Heuristic));
    }

    #[test]
    fn low_level_fallback_is_first_legal_move() {
        let mut rng = SmallRng::seed_from_u64(14);
        let sel = select_move(
            job(3, Arc::new(DisabledOracle), Arc::new(PanickingApplier)),
            Duration::from_secs(2),
            &mut rng,
        )
        .unwrap();
        assert_eq!(sel.method, Method::TimeoutFallback);
        assert_eq!(sel.mv, legal()[0]);
    }

    #[test]
    fn out_of_range_difficulty_is_clamped() {
        let mut rng = SmallRng::seed_from_u64(15);
        let sel = select_move(
            job(0, Arc::new(DisabledOracle), Arc::new(DescriptorApplier)),
            Duration::from_secs(5),
            &mut rng,
        )
        .unwrap();
        assert_eq!(sel.difficulty, 1);
        assert_eq!(sel.accuracy, 0.08);
    }

    #[test]
    fn no_legal_moves_selects_nothing() {
        let mut rng = SmallRng::seed_from_u64(16);
        let mut empty = job(5, Arc::new(DisabledOracle), Arc::new(DescriptorApplier));
        empty.legal_moves.clear();
        assert!(select_move(empty, Duration::from_secs(1), &mut rng).is_none());
    }

    #[test]
    fn single_legal_move_is_returned_at_every_level() {
        let mut rng = SmallRng::seed_from_u64(17);
        for level in 1..=9 {
            let mut one = job(level, Arc::new(DisabledOracle), Arc::new(DescriptorApplier));
            one.legal_moves.truncate(1);
            let sel = select_move(one, Duration::from_secs(5), &mut rng).unwrap();
            assert_eq!(sel.mv, legal()[0]);
            assert_eq!(sel.method, Method::Evaluated);
        }
    }
}
