//! quadload - bulk-load RDF statements into a document store
//!
//! Reads N-Triples/N-Quads, turns each statement into a content-addressed
//! document and writes them in batches through a bounded pool of writers.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod source;

use config::Config;

#[derive(Parser)]
#[command(name = "quadload")]
#[command(about = "Bulk-load RDF statements into a document store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./quadload.toml or ~/.config/quadload/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load an N-Triples or N-Quads file
    Load(cmd::load::LoadArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(quadload_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug; the spinner shows activity
    //   non-TTY: info unless --debug; per-batch log lines are the progress
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    quadload_core::init_logging(quiet, cli.debug, multi);

    match run(cli, &progress) {
        Ok(code) => code,
        Err(e) => {
            log::error!("Fatal error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli, progress: &quadload_core::SharedProgress) -> Result<ExitCode> {
    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Load(args) => cmd::load::run(args, &config, progress),
        Command::Config => {
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let geo = match config.serialize.geo {
        quadload_core::GeoMode::Off => "off",
        quadload_core::GeoMode::BestEffort => "best-effort",
        quadload_core::GeoMode::Mandatory => "mandatory",
    };

    table.add_row(vec![
        "Output directory",
        &config.store.output_dir.display().to_string(),
    ]);
    table.add_row(vec!["Database", &config.store.database]);
    table.add_row(vec!["Collection", &config.store.collection()]);
    table.add_row(vec![
        "Batch size",
        &quadload_core::fmt_num(config.load.batch_size),
    ]);
    table.add_row(vec!["Workers", &config.load.workers.to_string()]);
    table.add_row(vec![
        "Hashed fields",
        if config.serialize.hashed_fields {
            "on"
        } else {
            "off"
        },
    ]);
    table.add_row(vec!["Geo indexing", geo]);
    table.add_row(vec!["Max retries", &config.retry.max_retries.to_string()]);
    table.add_row(vec![
        "Retry delay",
        &format!("{}ms", config.retry.base_delay_ms),
    ]);

    eprintln!("\n{table}");
}
