//! Command-line front end for `popolo_core`.
//!
//! # Responsibility
//! - Inspect how partial dates parse and how two windows overlap.
//! - Create or upgrade a popolo SQLite database.

use clap::{Parser, Subcommand};
use log::info;
use popolo_core::db::migrations::current_user_version;
use popolo_core::{
    core_version, default_log_level, init_logging, open_db, Bound, Overlap, PartialDate,
    PartialDatesInterval,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Token standing for an open interval bound.
const OPEN_BOUND: &str = "-";

#[derive(Parser)]
#[command(name = "popolo", version, about = "Inspect partial dates and popolo databases")]
struct Cli {
    /// Log level: trace|debug|info|warn|error.
    #[arg(long, global = true, env = "POPOLO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rolling log files; logging is off when unset.
    #[arg(long, global = true, env = "POPOLO_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a partial date and print its bounds
    Parse {
        /// YYYY, YYYY-MM, YYYY-MM-DD or a date-time
        date: String,
    },
    /// Measure the overlap of two windows (`-` for an open bound)
    Overlap {
        a_start: String,
        a_end: String,
        b_start: String,
        b_end: String,
    },
    /// Create or upgrade a database and print its schema version
    Migrate {
        /// Path of the SQLite database file
        db: PathBuf,
    },
    /// Print the core version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Parse { date } => {
            let date = PartialDate::parse(&date).map_err(|err| err.to_string())?;
            println!("precision={}", date.precision().as_str());
            println!("canonical={date}");
            println!("earliest={}", date.earliest());
            println!("latest={}", date.latest());
        }
        Commands::Overlap {
            a_start,
            a_end,
            b_start,
            b_end,
        } => {
            let a = interval(&a_start, &a_end)?;
            let b = interval(&b_start, &b_end)?;
            let overlap = a.overlap(&b);
            println!("a={a}");
            println!("b={b}");
            println!("overlap={overlap}");
            println!("classification={}", classify(&overlap));
        }
        Commands::Migrate { db } => {
            let conn = open_db(&db).map_err(|err| err.to_string())?;
            let version = current_user_version(&conn).map_err(|err| err.to_string())?;
            info!("event=cli_migrate module=cli status=ok schema_version={version}");
            println!("schema_version={version}");
        }
        Commands::Version => println!("popolo_core version={}", core_version()),
    }

    Ok(())
}

fn interval(start: &str, end: &str) -> Result<PartialDatesInterval, String> {
    Ok(PartialDatesInterval::new(bound(start)?, bound(end)?))
}

fn bound(raw: &str) -> Result<Bound, String> {
    let raw = raw.trim();
    if raw == OPEN_BOUND {
        return Ok(Bound::Unbounded);
    }
    Bound::parse(Some(raw)).map_err(|err| err.to_string())
}

fn classify(overlap: &Overlap) -> &'static str {
    if overlap.is_crossing() {
        "crossing"
    } else if overlap.is_touching() {
        "touching"
    } else {
        "disjoint"
    }
}
