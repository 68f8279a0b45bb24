use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tradeimport::{base::save_transactions_to_json, parse_file, schemas, ParseOutcome, Transaction};

#[derive(Parser)]
#[command(name = "tradeimport", about = "Convert exchange trade-history exports into canonical transactions", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one or more exports and print the resulting transactions
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write the transactions as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// List the supported export formats
    Schemas,

    /// Parse every enabled export listed in a sources file
    Sources {
        sources: PathBuf,

        /// Also write the merged transactions as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[derive(Serialize, Deserialize)]
struct TransactionSource {
    path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    name: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(skip)]
    full_path: PathBuf,
}

fn enabled_by_default() -> bool {
    true
}

impl TransactionSource {
    fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.path } else { &self.name }
    }
}

fn load_sources(sources_file: &Path) -> Result<Vec<TransactionSource>> {
    let sources_path = sources_file.parent().unwrap_or(Path::new(""));
    let json = std::fs::read_to_string(sources_file)
        .with_context(|| format!("failed to read sources file '{}'", sources_file.display()))?;
    let mut sources: Vec<TransactionSource> = serde_json::from_str(&json)
        .with_context(|| format!("invalid sources file '{}'", sources_file.display()))?;

    sources.iter_mut().for_each(|source| {
        source.full_path = sources_path.join(&source.path);
    });

    Ok(sources)
}

/// Parses each file on its own; a file with an unknown header is reported and skipped.
fn parse_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a Path)>) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (name, path) in files {
        match parse_file(path) {
            Ok(file_outcome) => {
                info!("{}: {} transaction(s)", name, file_outcome.transactions.len());
                outcome.extend(file_outcome);
            }
            Err(e) => {
                error!("Error loading {}: {:#}", name, anyhow::Error::from(e));
            }
        }
    }

    outcome.transactions.sort_by(|a, b| a.executed_at.cmp(&b.executed_at));
    outcome
}

fn print_transactions(transactions: &[Transaction]) -> Result<()> {
    #[derive(Serialize)]
    struct CsvTransaction<'a> {
        uid: &'a str,
        executed: String,
        base: &'static str,
        quote: &'static str,
        action: String,
        #[serde(rename = "baseQuantity")]
        base_quantity: Decimal,
        #[serde(rename = "unitPrice")]
        unit_price: Decimal,
        #[serde(rename = "feeQuote")]
        fee_quote: Decimal,
    }

    let mut wtr = csv::Writer::from_writer(io::stdout().lock());

    for tx in transactions {
        wtr.serialize(CsvTransaction {
            uid: tx.external_id.as_deref().unwrap_or(""),
            executed: tx.executed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            base: tx.base.code(),
            quote: tx.quote.code(),
            action: tx.action.to_string(),
            base_quantity: tx.base_quantity,
            unit_price: tx.unit_price,
            fee_quote: tx.fee_quote,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

fn print_statistics(outcome: &ParseOutcome) {
    println!();
    println!("Transactions:  {}", outcome.transactions.len());
    println!("Ignored rows:  {}", outcome.ignored_row_count());
    println!("Failed rows:   {}", outcome.failed_row_count());
    println!("Ignored fees:  {}", outcome.ignored_fee_count);

    for row_error in &outcome.errors {
        println!("{:?}: {} ({})", row_error.kind, row_error.message, row_error.raw);
    }
}

fn report(outcome: &ParseOutcome, json: Option<&Path>) -> Result<()> {
    print_transactions(&outcome.transactions)?;
    print_statistics(outcome);

    if let Some(json) = json {
        save_transactions_to_json(&outcome.transactions, json)
            .with_context(|| format!("failed to write '{}'", json.display()))?;
    }

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Parse { files, json } => {
            let names: Vec<String> = files.iter().map(|path| path.display().to_string()).collect();
            let outcome = parse_files(names.iter().map(String::as_str).zip(files.iter().map(PathBuf::as_path)));
            report(&outcome, json.as_deref())
        }
        Commands::Schemas => {
            for schema in schemas() {
                println!("{:<18} {:<14} {}", schema.id, schema.exchange.to_string(), schema.header.trim_start_matches('\u{feff}'));
            }
            Ok(())
        }
        Commands::Sources { sources, json } => {
            let sources = load_sources(&sources)?;
            let enabled = sources
                .iter()
                .filter(|source| source.enabled)
                .map(|source| (source.display_name(), source.full_path.as_path()));
            let outcome = parse_files(enabled);
            report(&outcome, json.as_deref())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tradeimport=info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
