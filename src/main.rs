//! atlas - glyph atlas generator client and document synchronizer.

#![allow(dead_code)]

mod cli;
mod codec;
mod config;
mod core;
mod engine;
mod export;
mod host;
mod logger;
mod sync;
mod utils;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::AtlasConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    if let Commands::Inspect { fnt, json } = &cli.command {
        return cli::inspect::inspect(fnt, *json);
    }

    let config = AtlasConfig::load(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(&cli, config))
}

async fn run(cli: &Cli, config: AtlasConfig) -> Result<()> {
    match &cli.command {
        Commands::Generate { .. } => cli::generate::generate(&config).await,
        Commands::Sync {
            host, image, fnt, ..
        } => {
            cli::sync::sync_atlas(&config, host.simulate, image.as_deref(), fnt.as_deref()).await
        }
        Commands::Session { host, .. } => cli::session::run_session(config, host.simulate).await,
        Commands::Inspect { fnt, json } => cli::inspect::inspect(fnt, *json),
    }
}
