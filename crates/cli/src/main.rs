//! Share files through S3 and list everything shared so far.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use s3share_catalog::StateFile;
use s3share_cli::{app, health, list, upload};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "s3share")]
#[command(about = "Upload files to S3 and print their public URLs")]
#[command(version)]
struct Cli {
    /// Log progress
    #[arg(short, long)]
    verbose: bool,

    /// Log everything, including SDK internals
    #[arg(short, long)]
    debug: bool,

    /// List every shared file with its upload time
    #[arg(short, long)]
    list: bool,

    /// Config file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Files to upload
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.paths.is_empty() && !cli.list {
        Cli::command().write_help(&mut std::io::stderr())?;
        return Ok(ExitCode::FAILURE);
    }

    app::init_tracing(cli.verbose, cli.debug);
    app::runtime()?.block_on(run(cli))?;
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = app::config_path(cli.config.as_deref())?;
    let config = app::load_config(&config_path)?;

    let state_path = app::state_path(&config)?;
    let state_file = StateFile::open(&state_path)
        .await
        .with_context(|| format!("failed to lock {}", state_path.display()))?;
    let mut state = state_file
        .load()
        .await
        .with_context(|| format!("failed to read {}", state_path.display()))?;

    let table = s3share_catalog::from_config(&config.catalog)
        .await
        .context("failed to initialize catalog")?;

    let store = if cli.paths.is_empty() {
        None
    } else {
        Some(
            s3share_storage::from_config(&config.storage)
                .await
                .context("failed to initialize storage")?,
        )
    };

    if cli.verbose || cli.debug {
        health::report(store.as_deref(), table.as_ref()).await;
    }

    if let Some(store) = &store {
        let recorded = upload::run(
            store.as_ref(),
            table.as_ref(),
            &mut state,
            &config,
            &cli.paths,
        )
        .await?;
        tracing::info!(count = recorded.len(), "uploads recorded");
    }

    if cli.list {
        list::run(
            table.as_ref(),
            &mut state,
            &config.serve_base_url(),
            &app::SystemZone,
        )
        .await?;
    }

    state_file
        .save(&state)
        .await
        .with_context(|| format!("failed to write {}", state_path.display()))?;
    Ok(())
}
