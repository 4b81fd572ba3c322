mod session;

pub use session::*;

use std::io::{stdout, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use clap::Parser;
use tokio::fs::File;
use tokio::io::{stdin, AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::{parse_utc_offset, AccountService, Config, ManualClock};
use crate::storage::AccountStore;

/// Contas - In-memory account ledger
#[derive(Parser, Debug)]
#[command(name = "contas")]
#[command(about = "Register accounts by tax id and keep their statements, one command per line")]
#[command(version)]
pub struct Cli {
    /// Read commands from this file instead of stdin
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// UTC offset used to group operations by calendar day (e.g., "-03:00")
    #[arg(long, env = "CONTAS_UTC_OFFSET", default_value = "+00:00", value_parser = parse_utc_offset)]
    pub utc_offset: FixedOffset,

    /// Stamp operations from a session clock starting at this time instead of the system clock
    #[arg(long)]
    pub clock: Option<String>,

    /// Print one JSON document per command
    #[arg(long)]
    pub json: bool,

    /// Stop at the first failed command
    #[arg(long)]
    pub fail_fast: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose);

        let config = Config::default().with_utc_offset(self.utc_offset);
        let store = Arc::new(AccountStore::new());

        let (service, clock) = match &self.clock {
            Some(start) => {
                let start = parse_instant(start, &config.utc_offset)?;
                let clock = Arc::new(ManualClock::new(start));
                let service = AccountService::with_clock(store, &config, clock.clone());
                (service, Some(clock))
            }
            None => (AccountService::new(store, &config), None),
        };

        let mut session = Session::new(service, stdout(), self.json).with_manual_clock(clock);

        let (reader, interactive): (Box<dyn AsyncBufRead + Unpin>, bool) = match &self.script {
            Some(path) => {
                let file = File::open(path)
                    .await
                    .with_context(|| format!("Failed to open script: {}", path.display()))?;
                (Box::new(BufReader::new(file)), false)
            }
            None => (
                Box::new(BufReader::new(stdin())),
                std::io::stdin().is_terminal(),
            ),
        };

        info!(utc_offset = %config.utc_offset, json = self.json, "session started");

        let mut lines = reader.lines();
        let mut line_number = 0usize;
        let mut failures = 0usize;
        loop {
            if interactive {
                print!("> ");
                stdout().flush()?;
            }

            let Some(line) = lines.next_line().await.context("Failed to read input")? else {
                break;
            };
            line_number += 1;

            match session.handle_line(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => {
                    failures += 1;
                    session.report_error(&err)?;
                    if self.fail_fast {
                        bail!("Command on line {} failed", line_number);
                    }
                }
            }
        }

        info!(
            lines = line_number,
            failures,
            accounts = session.service().store().len(),
            "session finished"
        );
        Ok(())
    }
}

/// Install the stderr log subscriber. RUST_LOG overrides the default level.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
