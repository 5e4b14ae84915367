//! Load subcommand - stream an N-Triples/N-Quads file into the document store

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use quadload_core::{
    CountingHandler, DocumentStore, GeoMode, Loader, LoaderConfig, MemoryStore, NdjsonStore,
    SharedProgress, Snapshot, fmt_num, request_shutdown,
};

use crate::config::Config;
use crate::source::{self, SourceStats};

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Input file (.nt / .nq, optionally .gz); "-" reads stdin
    pub input: PathBuf,

    /// Store directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Database name; the collection defaults to <database>__triples
    #[arg(long)]
    pub database: Option<String>,

    /// Target collection
    #[arg(long)]
    pub collection: Option<String>,

    /// Statements per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Number of writer workers (max batches in flight)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Add 4-byte hashes of subject, predicate and object
    #[arg(long)]
    pub hashed_fields: bool,

    /// WKT literal handling
    #[arg(long, value_enum)]
    pub geo: Option<GeoArg>,

    /// Retries for transient batch failures (0 = fire-and-forget)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Milliseconds before the first retry; doubles on each attempt
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Serialize and insert into memory only; nothing is written
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum GeoArg {
    Off,
    BestEffort,
    Mandatory,
}

impl From<GeoArg> for GeoMode {
    fn from(g: GeoArg) -> Self {
        match g {
            GeoArg::Off => GeoMode::Off,
            GeoArg::BestEffort => GeoMode::BestEffort,
            GeoArg::Mandatory => GeoMode::Mandatory,
        }
    }
}

impl LoadArgs {
    /// File settings with command-line overrides applied
    fn loader_config(&self, config: &Config) -> LoaderConfig {
        let mut store = config.store.clone();
        if let Some(db) = &self.database {
            store.database = db.clone();
        }
        if let Some(c) = &self.collection {
            store.collection = Some(c.clone());
        }

        let mut cfg = config.loader_config();
        cfg.collection = store.collection();
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(n) = self.workers {
            cfg.workers = n;
        }
        cfg.serializer.hashed_fields |= self.hashed_fields;
        if let Some(geo) = self.geo {
            cfg.serializer.geo = geo.into();
        }
        if let Some(n) = self.max_retries {
            cfg.retry.max_retries = n;
        }
        if let Some(ms) = self.retry_delay_ms {
            cfg.retry.base_delay = Duration::from_millis(ms);
        }
        cfg
    }
}

pub fn run(args: LoadArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let loader_config = args.loader_config(config);
    setup_signal_handler()?;

    let reader = source::open(&args.input)?;
    log::info!("Loading {}", args.input.display());

    if args.dry_run {
        log::info!("Dry run: documents are kept in memory and discarded");
        return load_into(Arc::new(MemoryStore::new()), &loader_config, reader, progress);
    }

    let output_dir = args
        .output
        .unwrap_or_else(|| config.store.output_dir.clone());
    let store = NdjsonStore::open(&output_dir)
        .with_context(|| format!("Failed to open store at {}", output_dir.display()))?;
    log::info!(
        "Writing to {}",
        store.collection_path(&loader_config.collection).display()
    );
    load_into(Arc::new(store), &loader_config, reader, progress)
}

fn load_into<S: DocumentStore>(
    store: Arc<S>,
    config: &LoaderConfig,
    reader: Box<dyn std::io::BufRead>,
    progress: &SharedProgress,
) -> Result<ExitCode> {
    let loader = Loader::new(store, config)
        .context("Failed to start loader")?
        .with_progress(progress.load_line(&config.collection));

    let mut handler = CountingHandler::new(loader);
    let stats = source::read_statements(reader, &mut handler)?;
    let summary = handler.into_inner().finish();

    if stats.skipped > 0 {
        log::warn!("{} malformed lines skipped", fmt_num(stats.skipped as usize));
    }
    if progress.is_tty() {
        print_summary(&summary, &stats);
    }
    if stats.interrupted {
        log::warn!("Shutdown requested, load incomplete");
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the end-of-run summary table on stderr
fn print_summary(summary: &Snapshot, stats: &SourceStats) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Load").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let n = |v: u64| fmt_num(v as usize);
    let failed_cell = |v: u64| {
        if v > 0 {
            Cell::new(n(v)).fg(Color::Red)
        } else {
            Cell::new(n(v))
        }
    };

    table.add_row(vec![Cell::new("Lines read"), Cell::new(n(stats.lines))]);
    table.add_row(vec![Cell::new("Malformed lines"), failed_cell(stats.skipped)]);
    table.add_row(vec![Cell::new("Statements"), Cell::new(n(summary.statements))]);
    table.add_row(vec![
        Cell::new("Batches"),
        Cell::new(n(summary.batches_completed)),
    ]);
    table.add_row(vec![Cell::new("Failed batches"), failed_cell(summary.batches_failed)]);
    table.add_row(vec![Cell::new("Inserted"), Cell::new(n(summary.inserted))]);
    table.add_row(vec![Cell::new("Duplicates"), Cell::new(n(summary.duplicates))]);
    table.add_row(vec![Cell::new("Write errors"), failed_cell(summary.write_failures)]);
    table.add_row(vec![
        Cell::new("Serialize errors"),
        failed_cell(summary.serialize_errors),
    ]);
    table.add_row(vec![Cell::new("Lost"), failed_cell(summary.lost)]);
    table.add_row(vec![
        Cell::new("Peak in flight"),
        Cell::new(summary.peak_in_flight),
    ]);
    table.add_row(vec![
        Cell::new("Time"),
        Cell::new(format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ]);
    table.add_row(vec![
        Cell::new("Throughput"),
        Cell::new(format!("{:.0} statements/s", summary.throughput())),
    ]);

    eprintln!("\n{table}");
}

/// First signal: stop reading, flush and drain as usual.
/// Second signal: exit immediately.
fn setup_signal_handler() -> Result<()> {
    // SAFETY: the handlers only swap an atomic and call `low_level::exit`
    // (`_exit`), both async-signal-safe
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGTERM, || {
            if request_shutdown() {
                signal_hook::low_level::exit(130);
            }
        })
        .context("Failed to register SIGTERM handler")?;
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {
            if request_shutdown() {
                signal_hook::low_level::exit(130);
            }
        })
        .context("Failed to register SIGINT handler")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        load: LoadArgs,
    }

    fn parse(args: &[&str]) -> LoadArgs {
        let mut argv = vec!["quadload"];
        argv.extend_from_slice(args);
        TestCli::parse_from(argv).load
    }

    #[test]
    fn defaults_come_from_config() {
        let args = parse(&["data.nt"]);
        let cfg = args.loader_config(&Config::default());
        assert_eq!(cfg.batch_size, 1_000_000);
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.collection, "rya__triples");
        assert_eq!(cfg.serializer.geo, GeoMode::BestEffort);
        assert!(!cfg.serializer.hashed_fields);
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "data.nq.gz",
            "--batch-size",
            "500",
            "-w",
            "6",
            "--database",
            "rya_exp",
            "--hashed-fields",
            "--geo",
            "mandatory",
            "--max-retries",
            "0",
        ]);
        let cfg = args.loader_config(&Config::default());
        assert_eq!(cfg.batch_size, 500);
        assert_eq!(cfg.workers, 6);
        assert_eq!(cfg.collection, "rya_exp__triples");
        assert!(cfg.serializer.hashed_fields);
        assert_eq!(cfg.serializer.geo, GeoMode::Mandatory);
        assert_eq!(cfg.retry.max_retries, 0);
    }

    #[test]
    fn collection_flag_beats_database() {
        let args = parse(&["x.nt", "--database", "a", "--collection", "b"]);
        assert_eq!(args.loader_config(&Config::default()).collection, "b");
    }

    #[test]
    fn load_into_ndjson_store() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.nt");
        std::fs::write(
            &input,
            "<a> <p> <b> .\n<a> <p> \"x\" <g> .\nbroken\n<a> <p> <b> .\n",
        )
        .unwrap();

        let store = Arc::new(NdjsonStore::open(dir.path().join("out")).unwrap());
        let cfg = LoaderConfig {
            batch_size: 2,
            ..Default::default()
        };
        let progress = Arc::new(quadload_core::ProgressContext::with_tty(false));
        let code = load_into(
            Arc::clone(&store),
            &cfg,
            source::open(&input).unwrap(),
            &progress,
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let written = std::fs::read_to_string(store.collection_path("rya__triples")).unwrap();
        assert_eq!(written.lines().count(), 2);
    }
}
