mod archive;
mod dashboard;
mod database;
mod ingest;
mod models;
mod reports;
mod utils;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};

use crate::archive::backup;
use crate::dashboard::{parse_params, render, Dashboard};
use crate::database::repo::LocalStore;
use crate::ingest::client::{ArtifactSource, HarvardClient};
use crate::reports::engine::ReportEngine;
use crate::utils::config::{self, Config, Overrides};

#[derive(Parser, Debug)]
#[command(author, version, about = "Harvard Art Museums artifact explorer", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(short, long, global = true)]
    db_path: Option<PathBuf>,

    /// Harvard Art Museums API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Records per API page (1-100)
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive fetch / insert / report session (default)
    Dashboard,
    /// Back up the database file, then create the tables
    Setup {
        /// Recreate the database from scratch after the backup
        #[arg(long)]
        reset: bool,
    },
    /// List classifications with live object counts
    Classifications,
    /// Row counts of the three tables
    Counts,
    /// Run one catalog report
    Report {
        id: String,
        /// Report parameter, e.g. culture=Roman
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .init();

    let overrides = Overrides {
        api_key: args.api_key.clone(),
        db_path: args.db_path.clone(),
        page_size: args.page_size,
        timeout_secs: args.timeout,
    };
    let config = config::load(&overrides)?;
    info!("DB: {:?}", config.db_path);

    match args.command.unwrap_or(Command::Dashboard) {
        Command::Dashboard => run_dashboard(&config),
        Command::Setup { reset } => run_setup(&config, args.api_key.as_deref(), reset),
        Command::Classifications => {
            let client = HarvardClient::new(&config)?;
            let list = client.fetch_classifications()?;
            for c in &list {
                println!("{:<32} {}", c.name, c.objectcount);
            }
            Ok(())
        }
        Command::Counts => {
            let store = LocalStore::open(&config.db_path)?;
            let mut out = io::stdout().lock();
            render::table_counts(&mut out, &store.counts()?)?;
            render::integrity(&mut out, store.orphaned_colors()?)?;
            Ok(())
        }
        Command::Report { id, params } => {
            let params = parse_params(params.iter().map(String::as_str))?;
            let store = LocalStore::open(&config.db_path)?;
            let output = ReportEngine::new().run(&store, &id, &params)?;
            let mut out = io::stdout().lock();
            render::query_result(&mut out, &output.result, usize::MAX)?;
            if let Some(hint) = output.chart() {
                render::bar_chart(&mut out, &output.result, hint)?;
            }
            Ok(())
        }
    }
}

fn run_dashboard(config: &Config) -> Result<()> {
    let client = match HarvardClient::new(config) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("Fetching disabled: {:#}", e);
            None
        }
    };
    let source = client.as_ref().map(|c| c as &dyn ArtifactSource);

    let mut dashboard = Dashboard::new(source, config.db_path.clone());
    let stdin = io::stdin();
    dashboard.run(stdin.lock(), &mut io::stdout())
}

/// Setup halts at the first failing step and exits non-zero.
fn run_setup(config: &Config, api_key: Option<&str>, reset: bool) -> Result<()> {
    if let Some(key) = api_key {
        config::save_to_env(Path::new(config::ENV_FILE), config::API_KEY_VAR, key)?;
    }

    let today = chrono::Local::now().date_naive();
    let report = backup::run_setup(&config.db_path, today, reset)
        .inspect_err(|e| error!("Setup failed: {}", e))
        .context("Setup aborted")?;

    match &report.backup {
        Some(path) => println!("Backup written to {}", path.display()),
        None => println!("No existing database, nothing to back up."),
    }
    println!("Database ready at {}", config.db_path.display());
    render::table_counts(&mut io::stdout().lock(), &report.counts)?;
    Ok(())
}
