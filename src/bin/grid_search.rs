//! Grid-search CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use fewshot_rnd::{run_search, JsonlLogger, SearchSpace};

#[derive(Parser)]
#[command(name = "grid-search")]
#[command(about = "Sweep few-shot experiment hyperparameters and append results to CSV")]
#[command(version)]
struct Cli {
    /// TOML file with [experiment] base config and [search] value lists
    #[arg(short, long)]
    config: PathBuf,

    /// CSV file results are appended to (created with a header if missing)
    #[arg(short, long, default_value = "results.csv")]
    results: PathBuf,

    /// Optional JSONL file for per-point records
    #[arg(long)]
    log: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let space = SearchSpace::load_from_file(&cli.config)?;
    let mut logger = match &cli.log {
        Some(path) => Some(JsonlLogger::create(path)?),
        None => None,
    };

    let accuracies = run_search(&space, &cli.results, logger.as_mut(), cli.quiet)?;

    if !cli.quiet {
        if let Some(best) = accuracies.iter().cloned().fold(None, |best: Option<f64>, a| {
            Some(best.map_or(a, |b| b.max(a)))
        }) {
            println!("Finished {} configurations. Best accuracy: {:.3}", accuracies.len(), best);
        }
    }
    Ok(())
}
