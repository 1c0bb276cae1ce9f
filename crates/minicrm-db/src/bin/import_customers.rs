//! # Customer Import CLI
//!
//! Imports customers from a CSV export into the MiniCRM database, with
//! dedup by email/phone and fill-empty-only merging.
//!
//! ## Usage
//! ```bash
//! # Import a file
//! cargo run -p minicrm-db --bin import_customers -- --file data/customers.csv
//!
//! # Plan without writing, custom report location
//! cargo run -p minicrm-db --bin import_customers -- \
//!     --file data/customers.csv --dry-run --report reports/dryrun.json
//!
//! # First 100 rows only, explicit database path
//! cargo run -p minicrm-db --bin import_customers -- \
//!     --file data/customers.csv --limit 100 --db ./minicrm.db
//! ```
//!
//! ## Exit Codes
//! - 0: import completed, no row errors
//! - 1: the run itself failed (unreadable file, database unavailable)
//! - 2: import completed but some rows failed (see the report)

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use minicrm_db::{Database, DbConfig, ImportOptions, Importer};

#[derive(Debug, Parser)]
#[command(name = "import_customers", about = "Import customers from a CSV file")]
struct Args {
    /// CSV file to import
    #[arg(long)]
    file: PathBuf,

    /// SQLite database path
    #[arg(long, default_value = "minicrm.db")]
    db: PathBuf,

    /// Compute planned actions without writing
    #[arg(long)]
    dry_run: bool,

    /// Process only the first N data rows
    #[arg(long)]
    limit: Option<usize>,

    /// Where to write the JSON report
    #[arg(long, default_value = "reports/etl-customers-report.json")]
    report: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(had_row_errors) => {
            if had_row_errors {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("import failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let db = Database::new(DbConfig::new(&args.db)).await?;
    let importer = Importer::new(db.clone());

    let options = ImportOptions {
        dry_run: args.dry_run,
        limit: args.limit,
    };
    let report = importer.run(&args.file, &options).await?;

    if let Some(parent) = args.report.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.report, serde_json::to_vec_pretty(&report)?)?;

    // console summary mirrors the report's counters
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "file": args.file.display().to_string(),
            "totalRows": report.summary.total_rows,
            "created": report.summary.created,
            "updated": report.summary.updated,
            "unchanged": report.summary.unchanged,
            "warnings": report.summary.warnings,
            "errors": report.summary.errors,
            "report": args.report.display().to_string(),
        }))?
    );

    let had_row_errors = report.has_errors();
    db.close().await;
    Ok(had_row_errors)
}
