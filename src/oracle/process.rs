//! GNU Backgammon as a long-lived child process.
//!
//! One process is started lazily on first use and kept for later requests.
//! A background thread pumps its stdout into a channel so every read can be
//! bounded with `recv_timeout`. Transport failures drop the process; the
//! next request starts a fresh one.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::{info, trace, warn};
use parking_lot::Mutex;

use crate::board::{Player, Position};
use crate::config::{OracleConfig, ORACLE_FALLBACK_PATHS, ORACLE_NAMES};

use super::encoding::{encode_position, OracleBoard};
use super::protocol::{
    board_command, dice_command, is_prompt, parse_equity, parse_hint, turn_command, EVAL, HINT,
    NEW_GAME,
};
use super::{to_engine_perspective, Hint, Oracle, OracleError};

/// Looks for an oracle executable on `PATH`, then in fixed install locations.
pub fn discover_executable() -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            for name in ORACLE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }
    ORACLE_FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Forwards stdout to `tx` line by line. A trailing prompt without a newline
/// is forwarded as soon as it arrives.
fn pump_output(mut stdout: ChildStdout, tx: Sender<String>) {
    let mut buf = [0u8; 4096];
    let mut pending = String::new();
    loop {
        let n = match stdout.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        pending.push_str(&String::from_utf8_lossy(&buf[..n]));
        while let Some(i) = pending.find('\n') {
            let line: String = pending.drain(..=i).collect();
            if tx.send(line.trim_end().to_string()).is_err() {
                return;
            }
        }
        if is_prompt(&pending) {
            if tx.send(std::mem::take(&mut pending)).is_err() {
                return;
            }
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(pending);
    }
}

/// A running oracle process.
pub struct GnubgProcess {
    child: Child,
    stdin: ChildStdin,
    output: Receiver<String>,
}

impl GnubgProcess {
    /// Launches the process and waits for its first prompt.
    pub fn spawn(
        program: &Path,
        args: &[String],
        startup_timeout: Duration,
    ) -> Result<Self, OracleError> {
        info!("starting oracle process {}", program.display());
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OracleError::ProcessDied);
            }
        };

        let (tx, rx) = mpsc::channel();
        if let Err(e) = thread::Builder::new()
            .name("oracle-stdout".into())
            .spawn(move || pump_output(stdout, tx))
        {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        let mut process = GnubgProcess {
            child,
            stdin,
            output: rx,
        };
        process.read_until_prompt(startup_timeout)?;
        info!("oracle process ready (pid {})", process.child.id());
        Ok(process)
    }

    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Sends one command and collects its output up to the next prompt.
    pub fn command(&mut self, cmd: &str, timeout: Duration) -> Result<Vec<String>, OracleError> {
        // Drop anything left over from an earlier command.
        while self.output.try_recv().is_ok() {}

        trace!("oracle <- {}", cmd);
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        self.read_until_prompt(timeout)
    }

    fn read_until_prompt(&mut self, timeout: Duration) -> Result<Vec<String>, OracleError> {
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.output.recv_timeout(remaining) {
                Ok(line) => {
                    trace!("oracle -> {}", line);
                    let done = is_prompt(&line);
                    lines.push(line);
                    if done {
                        return Ok(lines);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(OracleError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(OracleError::ProcessDied),
            }
        }
    }
}

impl Drop for GnubgProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Per-command timeout: the configured one, cut to what is left of the call
/// budget. Nothing is sent once the budget is spent.
fn bounded(timeout: Duration, deadline: Instant) -> Result<Duration, OracleError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(OracleError::OutOfTime);
    }
    Ok(timeout.min(left))
}

/// Sets up the board and side to move for the next command.
fn load_position(
    process: &mut GnubgProcess,
    board: &OracleBoard,
    turn: Player,
    timeout: Duration,
    deadline: Instant,
) -> Result<(), OracleError> {
    process.command(NEW_GAME, bounded(timeout, deadline)?)?;
    process.command(&board_command(board), bounded(timeout, deadline)?)?;
    process.command(&turn_command(turn), bounded(timeout, deadline)?)?;
    Ok(())
}

/// Oracle backed by a GNU Backgammon process.
pub struct GnubgOracle {
    config: OracleConfig,
    process: Mutex<Option<GnubgProcess>>,
}

impl GnubgOracle {
    /// Creates the oracle. If no path is configured, one is discovered.
    /// The process itself is not started until the first request.
    pub fn new(mut config: OracleConfig) -> Self {
        if config.path.is_none() {
            config.path = discover_executable();
        }
        match &config.path {
            Some(path) => info!("oracle executable: {}", path.display()),
            None => info!("no oracle executable found, using heuristic evaluation only"),
        }
        GnubgOracle {
            config,
            process: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.config.path.as_deref()
    }

    /// Runs `f` against a live process, starting one if needed. The lock
    /// wait, any startup and everything `f` sends share one `budget`; `f`
    /// receives the instant it must be done by.
    fn with_process<T>(
        &self,
        budget: Duration,
        f: impl FnOnce(&mut GnubgProcess, &OracleConfig, Instant) -> Result<T, OracleError>,
    ) -> Result<T, OracleError> {
        let path = self.config.path.as_deref().ok_or(OracleError::Unavailable)?;
        let deadline = Instant::now() + budget;
        let mut guard = self
            .process
            .try_lock_until(deadline)
            .ok_or(OracleError::Busy)?;

        let alive = guard.as_mut().map_or(false, |p| p.is_alive());
        if !alive {
            if guard.is_some() {
                warn!("oracle process exited, restarting");
            }
            *guard = None;
            let startup = bounded(self.config.startup_timeout, deadline)?;
            *guard = Some(GnubgProcess::spawn(path, &self.config.launch_args, startup)?);
        }
        let process = guard.as_mut().ok_or(OracleError::ProcessDied)?;

        let result = f(process, &self.config, deadline);
        if let Err(e) = &result {
            if e.poisons_process() {
                warn!("discarding oracle process: {}", e);
                *guard = None;
            }
        }
        result
    }
}

impl Oracle for GnubgOracle {
    fn is_available(&self) -> bool {
        self.config.path.is_some()
    }

    fn evaluate(&self, pos: &Position, budget: Duration) -> Result<f64, OracleError> {
        let board = encode_position(pos)?;
        let turn = pos.turn;
        let equity = self.with_process(budget, |process, config, deadline| {
            load_position(process, &board, turn, config.command_timeout, deadline)?;
            let out = process.command(EVAL, bounded(config.eval_timeout, deadline)?)?;
            parse_equity(&out)
        })?;
        Ok(to_engine_perspective(equity, turn))
    }

    fn hint(&self, pos: &Position, dice: (u8, u8), budget: Duration) -> Result<Hint, OracleError> {
        let board = encode_position(pos)?;
        let dice = dice_command(dice)?;
        let turn = pos.turn;
        let (notation, equity) = self.with_process(budget, |process, config, deadline| {
            load_position(process, &board, turn, config.command_timeout, deadline)?;
            process.command(&dice, bounded(config.command_timeout, deadline)?)?;
            let out = process.command(HINT, bounded(config.hint_timeout, deadline)?)?;
            parse_hint(&out)
        })?;
        Ok(Hint {
            notation,
            equity: to_engine_perspective(equity, turn),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// A scripted stand-in that speaks just enough of the protocol.
    const FAKE_ORACLE: &str = r#"
printf 'gnubg> '
while read line; do
  case "$line" in
    eval) printf 'static: 0.600 0.100 0.000 0.100 0.000 (+0.250 (+0.240))\n' ;;
    hint) printf 'Best move: 8/5 6/5 (equity +0.166)\n' ;;
    "set turn 1") sleep 1 ;;
  esac
  printf 'gnubg> '
done
"#;

    fn fake_config(script: &str) -> OracleConfig {
        OracleConfig {
            path: Some(PathBuf::from("/bin/sh")),
            launch_args: vec!["-c".to_string(), script.to_string()],
            startup_timeout: Duration::from_millis(1000),
            command_timeout: Duration::from_millis(2000),
            eval_timeout: Duration::from_millis(2000),
            hint_timeout: Duration::from_millis(2000),
        }
    }

    #[test]
    fn evaluate_flips_sign_for_player_one() {
        let oracle = GnubgOracle::new(fake_config(FAKE_ORACLE));
        assert!(oracle.is_available());
        let pos = Position::starting();
        assert_eq!(pos.turn, Player::One);
        let e = oracle.evaluate(&pos, Duration::from_secs(1)).unwrap();
        assert_eq!(e, -0.25);
    }

    #[test]
    fn process_is_reused_between_requests() {
        let oracle = GnubgOracle::new(fake_config(FAKE_ORACLE));
        let pos = Position::starting();
        oracle.evaluate(&pos, Duration::from_secs(1)).unwrap();
        let pid = oracle.process.lock().as_ref().map(|p| p.child.id());
        oracle.evaluate(&pos, Duration::from_secs(1)).unwrap();
        let pid_again = oracle.process.lock().as_ref().map(|p| p.child.id());
        assert!(pid.is_some());
        assert_eq!(pid, pid_again);
    }

    #[test]
    fn hint_parses_best_move() {
        let oracle = GnubgOracle::new(fake_config(FAKE_ORACLE));
        let hint = oracle
            .hint(&Position::starting(), (3, 1), Duration::from_secs(1))
            .unwrap();
        assert_eq!(hint.notation, "8/5 6/5");
        assert_eq!(hint.equity, -0.166);
    }

    #[test]
    fn missing_executable_is_an_io_error() {
        let mut config = fake_config("");
        config.path = Some(PathBuf::from("/nonexistent/gnubg"));
        let oracle = GnubgOracle::new(config);
        let result = oracle.evaluate(&Position::starting(), Duration::from_secs(1));
        assert!(matches!(result, Err(OracleError::Io(_))));
    }

    #[test]
    fn silent_process_times_out_at_startup() {
        let mut config = fake_config("sleep 5");
        config.startup_timeout = Duration::from_millis(200);
        let oracle = GnubgOracle::new(config);
        let start = Instant::now();
        let result = oracle.evaluate(&Position::starting(), Duration::from_secs(1));
        assert!(matches!(result, Err(OracleError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(oracle.process.lock().is_none());
    }

    #[test]
    fn garbage_output_is_malformed() {
        let script = r#"
printf 'gnubg> '
while read line; do
  printf 'Unknown keyword.\n'
  printf 'gnubg> '
done
"#;
        let oracle = GnubgOracle::new(fake_config(script));
        let result = oracle.evaluate(&Position::starting(), Duration::from_secs(1));
        assert!(matches!(result, Err(OracleError::Malformed(_))));
    }

    #[test]
    fn concurrent_caller_gets_busy() {
        let oracle = Arc::new(GnubgOracle::new(fake_config(FAKE_ORACLE)));
        let mut pos = Position::starting();
        pos.turn = Player::Two;

        let slow = {
            let oracle = Arc::clone(&oracle);
            thread::spawn(move || oracle.evaluate(&pos, Duration::from_secs(3)))
        };
        thread::sleep(Duration::from_millis(300));
        let quick = oracle.evaluate(&pos, Duration::from_millis(10));
        assert!(matches!(quick, Err(OracleError::Busy)));

        let e = slow.join().unwrap().unwrap();
        assert_eq!(e, 0.25);
    }

    #[test]
    fn hung_eval_returns_within_the_call_budget() {
        let script = r#"
printf 'gnubg> '
while read line; do
  case "$line" in
    eval) exec sleep 30 ;;
  esac
  printf 'gnubg> '
done
"#;
        // The configured eval timeout alone would outlast the budget.
        let mut config = fake_config(script);
        config.eval_timeout = Duration::from_secs(10);
        let oracle = GnubgOracle::new(config);
        let start = Instant::now();
        let result = oracle.evaluate(&Position::starting(), Duration::from_millis(400));
        let elapsed = start.elapsed();
        assert!(matches!(result, Err(OracleError::Timeout(_))));
        assert!(elapsed < Duration::from_millis(900), "took {:?}", elapsed);
        assert!(oracle.process.lock().is_none());
    }

    #[test]
    fn spent_budget_sends_nothing() {
        assert!(matches!(
            bounded(Duration::from_secs(1), Instant::now()),
            Err(OracleError::OutOfTime)
        ));
        let left = bounded(Duration::from_secs(1), Instant::now() + Duration::from_millis(50)).unwrap();
        assert!(left <= Duration::from_millis(50));
        let full = bounded(Duration::from_millis(20), Instant::now() + Duration::from_secs(5)).unwrap();
        assert_eq!(full, Duration::from_millis(20));
    }
}
