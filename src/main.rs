//! gammon-cpu -- a backgammon CPU opponent speaking line-delimited JSON.
//!
//! Reads one request per line from stdin and writes one JSON response per
//! line to stdout. Diagnostics go to stderr through `env_logger`.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use gammon_cpu::config::EngineConfig;
use gammon_cpu::engine::Engine;
use gammon_cpu::protocol::parse_request;

#[derive(Parser, Debug)]
#[command(author, version, about = "Backgammon CPU move selector", long_about = None)]
struct Args {
    /// Oracle executable (GNU Backgammon). Searched on PATH when omitted.
    #[arg(long)]
    oracle_path: Option<PathBuf>,

    /// Never consult the oracle
    #[arg(long)]
    no_oracle: bool,

    /// Wall-clock budget for one move selection, in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Fixed RNG seed for reproducible play
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut EngineConfig) {
        if let Some(path) = &self.oracle_path {
            config.oracle.path = Some(path.clone());
        }
        if self.no_oracle {
            config.oracle_enabled = false;
        }
        if let Some(ms) = self.deadline_ms {
            config.selection_deadline = std::time::Duration::from_millis(ms);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = EngineConfig::from_env();
    args.apply(&mut config);
    info!(
        "deadline {:?}, oracle {}",
        config.selection_deadline,
        if config.oracle_enabled { "enabled" } else { "disabled" }
    );

    let mut engine = Engine::new(config);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                engine.handle_malformed(&format!("input is not valid UTF-8: {}", e), &mut out)?;
                continue;
            }
        };
        let request = match parse_request(line) {
            Ok(Some(r)) => r,
            Ok(None) => continue,
            Err(e) => {
                engine.handle_malformed(&e.to_string(), &mut out)?;
                continue;
            }
        };
        if !engine.handle_request(request, &mut out)? {
            break;
        }
    }
    Ok(())
}
