use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::*;
use order_sync_common::{helpers::env_flag, SubjectId};

mod formatting;
mod inspect;
mod scenario;

use crate::{inspect::inspect_snapshot, scenario::run_scenario};

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Order tracker diagnostics")]
pub struct Arguments {
    /// Print every tracker notification, not just the resulting state
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "replay", about = "Replay a scenario file against in-memory identity and order services")]
    Replay {
        /// A JSON array of scenario steps
        scenario: PathBuf,
    },
    #[clap(name = "inspect", about = "Reduce an order snapshot for one customer and show what would be flagged")]
    Inspect {
        /// The signed-in customer the snapshot is evaluated for
        #[arg(short = 's', long = "subject")]
        subject: SubjectId,
        /// A JSON array of order records
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let verbose = cli.verbose || env_flag("OSE_VERBOSE", false);
    debug!("🛠️ ordertools starting. Verbose: {verbose}");
    let output = match cli.command {
        Command::Replay { scenario } => run_scenario(&scenario, verbose)?,
        Command::Inspect { subject, snapshot } => inspect_snapshot(&subject, &snapshot)?,
    };
    println!("{output}");
    Ok(())
}
