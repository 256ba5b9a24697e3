//! Engine configuration.
//!
//! Defaults come from constants, can be overridden from the environment at
//! startup (`EngineConfig::from_env`), and at runtime by a `setoption`
//! request (`EngineConfig::apply_option`).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::oracle::protocol::LAUNCH_ARGS;

/// Total wall-clock budget for one move selection.
pub const DEFAULT_SELECTION_DEADLINE_MS: u64 = 5000;
/// Wait for the first oracle prompt after launch.
pub const DEFAULT_ORACLE_STARTUP_MS: u64 = 2000;
/// Per-command oracle timeout for setup commands.
pub const DEFAULT_ORACLE_COMMAND_MS: u64 = 1000;
/// Oracle timeout for a position evaluation.
pub const DEFAULT_ORACLE_EVAL_MS: u64 = 2000;
/// Oracle timeout for a hint request.
pub const DEFAULT_ORACLE_HINT_MS: u64 = 4000;

/// Executable names searched on `PATH`, in order.
pub const ORACLE_NAMES: [&str; 2] = ["gnubg-cli", "gnubg"];
/// Fixed install locations tried after `PATH`.
pub const ORACLE_FALLBACK_PATHS: [&str; 2] = ["/usr/bin/gnubg", "/usr/local/bin/gnubg"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Settings for the process-backed oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Executable to launch. `None` means no oracle was found or configured.
    pub path: Option<PathBuf>,
    pub launch_args: Vec<String>,
    pub startup_timeout: Duration,
    pub command_timeout: Duration,
    pub eval_timeout: Duration,
    pub hint_timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            path: None,
            launch_args: LAUNCH_ARGS.iter().map(|a| a.to_string()).collect(),
            startup_timeout: Duration::from_millis(DEFAULT_ORACLE_STARTUP_MS),
            command_timeout: Duration::from_millis(DEFAULT_ORACLE_COMMAND_MS),
            eval_timeout: Duration::from_millis(DEFAULT_ORACLE_EVAL_MS),
            hint_timeout: Duration::from_millis(DEFAULT_ORACLE_HINT_MS),
        }
    }
}

impl OracleConfig {
    /// Call budget for a standalone request whose last command may take
    /// `last`: a cold start, the three setup commands, then that command.
    pub fn call_budget(&self, last: Duration) -> Duration {
        self.startup_timeout + self.command_timeout * 3 + last
    }

    pub fn eval_budget(&self) -> Duration {
        self.call_budget(self.eval_timeout)
    }

    /// Hint calls also send the dice.
    pub fn hint_budget(&self) -> Duration {
        self.call_budget(self.hint_timeout) + self.command_timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Budget for a whole move selection, including oracle refinement.
    pub selection_deadline: Duration,
    /// When false the oracle is never consulted, even if installed.
    pub oracle_enabled: bool,
    pub oracle: OracleConfig,
    /// Fixed RNG seed for reproducible play. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            selection_deadline: Duration::from_millis(DEFAULT_SELECTION_DEADLINE_MS),
            oracle_enabled: true,
            oracle: OracleConfig::default(),
            seed: None,
        }
    }
}

fn env_parse_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl EngineConfig {
    /// Defaults overridden by `GAMMON_*` environment variables.
    ///
    /// * `GAMMON_ORACLE=off` disables the oracle.
    /// * `GAMMON_ORACLE_PATH` names the oracle executable.
    /// * `GAMMON_DEADLINE_MS` sets the selection deadline.
    /// * `GAMMON_ORACLE_TIMEOUT_MS` sets the oracle evaluation timeout.
    /// * `GAMMON_SEED` fixes the RNG seed.
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        if let Ok(v) = std::env::var("GAMMON_ORACLE") {
            config.oracle_enabled = !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "off" | "0" | "false" | "no"
            );
        }
        if let Ok(path) = std::env::var("GAMMON_ORACLE_PATH") {
            if !path.trim().is_empty() {
                config.oracle.path = Some(PathBuf::from(path.trim()));
            }
        }
        if let Some(ms) = env_parse_u64("GAMMON_DEADLINE_MS") {
            config.selection_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse_u64("GAMMON_ORACLE_TIMEOUT_MS") {
            config.oracle.eval_timeout = Duration::from_millis(ms);
        }
        config.seed = env_parse_u64("GAMMON_SEED");
        config
    }

    /// Applies one named option. Names are case-insensitive.
    pub fn apply_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let millis = || -> Result<Duration, ConfigError> {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| invalid())
        };

        match name.to_ascii_lowercase().as_str() {
            "deadlinems" | "deadline_ms" => self.selection_deadline = millis()?,
            "oracletimeoutms" | "oracle_timeout_ms" => self.oracle.eval_timeout = millis()?,
            "oracle" => {
                self.oracle_enabled = match value.trim().to_ascii_lowercase().as_str() {
                    "on" | "true" | "1" => true,
                    "off" | "false" | "0" => false,
                    _ => return Err(invalid()),
                }
            }
            "oraclepath" | "oracle_path" => {
                let v = value.trim();
                self.oracle.path = if v.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(v))
                };
            }
            "seed" => {
                let v = value.trim();
                self.seed = if v.is_empty() {
                    None
                } else {
                    Some(v.parse().map_err(|_| invalid())?)
                };
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}
