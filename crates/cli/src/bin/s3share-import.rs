//! Seed the catalog from an existing bucket listing.
//!
//! Reads `<date> <time> <size> <key>` lines, numbers the objects by upload
//! time, and writes them to the catalog table. Meant to run once, before the
//! first `s3share` upload.

use anyhow::{Context, Result};
use clap::Parser;
use s3share_cli::{app, backfill, health};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "s3share-import")]
#[command(about = "Import a bucket listing into the s3share catalog")]
#[command(version)]
struct Args {
    /// Listing file (default: stdin)
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Print the numbered rows without writing them
    #[arg(long)]
    dry_run: bool,

    /// Config file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log progress
    #[arg(short, long)]
    verbose: bool,

    /// Log everything, including SDK internals
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    app::init_tracing(args.verbose, args.debug);

    let listing = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read listing from stdin")?;
            buf
        }
    };

    let entries = backfill::plan(&listing, &app::SystemZone)?;
    for entry in &entries {
        println!("{}", backfill::describe(entry));
    }

    if args.dry_run {
        tracing::info!(count = entries.len(), "dry run, nothing written");
        return Ok(());
    }

    let config_path = app::config_path(args.config.as_deref())?;
    let config = app::load_config(&config_path)?;

    app::runtime()?.block_on(async {
        let table = s3share_catalog::from_config(&config.catalog)
            .await
            .context("failed to initialize catalog")?;
        if args.verbose || args.debug {
            health::report(None, table.as_ref()).await;
        }
        backfill::import(table.as_ref(), &entries).await
    })
}
