use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use immich_cull::catalog::{self, Catalog, CatalogSnapshot, DryRunCatalog, ImmichCatalog, InMemoryCatalog};
use immich_cull::config::Config;
use immich_cull::core::{
    DuplicateIndex, PresenceClassifier, PriorityRanker, ResolutionEngine, ResolutionReport,
};
use immich_cull::history::History;
use immich_cull::models::{Library, LibraryRef};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "immich-cull",
    version,
    about = "Hide redundant copies of duplicate photos in an Immich catalog"
)]
struct Cli {
    /// Config file (default: `<config dir>/immich-cull/config.toml`)
    #[arg(long, global = true, value_name = "FILE", env = "IMMICH_CULL_CONFIG")]
    config: Option<PathBuf>,

    /// Env file holding X_API_KEY (default: `./.env` if present)
    #[arg(long, global = true, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Immich API base URL
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    /// Immich API key
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Read the duplicate listing from a saved `/duplicates` response
    #[arg(long, global = true, value_name = "FILE", conflicts_with = "snapshot")]
    duplicates_file: Option<PathBuf>,

    /// Work against a JSON catalog snapshot instead of a server; nothing is written back
    #[arg(long, global = true, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Keep one visible copy of every duplicate group, archive the rest
    Dedup {
        /// Only show what would change
        #[arg(long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Read-only listings
    List {
        #[command(subcommand)]
        command: ListCmd,
    },

    /// Work with resolution history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ListCmd {
    /// Assets with no duplicate anywhere, with their library
    SingleStored,

    /// Assets with no copy in the given library
    NotInLibrary {
        /// Library id or name (`upload` for uploads)
        #[arg(value_name = "LIBRARY")]
        library: String,
    },

    /// All libraries, including the upload pseudo-library
    Libraries,
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List all resolution history records
    List,

    /// Undo recorded resolutions (latest by default)
    Restore {
        /// Restore a specific record index
        #[arg(long, conflicts_with = "all")]
        record: Option<usize>,
        /// Restore all records
        #[arg(long, conflicts_with = "record")]
        all: bool,
        /// Only show what would change
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref(), cli.env_file.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }

    match &cli.command {
        Commands::Dedup { dry_run, yes } => dedup(&cli, &config, *dry_run, *yes),

        Commands::List { command } => {
            let catalog = open_catalog(&cli, &config)?;
            match command {
                ListCmd::SingleStored => {
                    let index = load_index(catalog.as_ref())?;
                    let classifier = PresenceClassifier::new(catalog.as_ref(), &index);
                    let found = with_spinner("Enumerating libraries…", || {
                        classifier.find_single_stored()
                    })?;
                    print_json(&found)
                }
                ListCmd::NotInLibrary { library } => {
                    let target = find_library(catalog.as_ref(), library)?;
                    let index = load_index(catalog.as_ref())?;
                    let classifier = PresenceClassifier::new(catalog.as_ref(), &index);
                    let found = with_spinner("Enumerating libraries…", || {
                        classifier.find_not_in_library(&target)
                    })?;
                    print_json(&found)
                }
                ListCmd::Libraries => {
                    let libraries = catalog::all_libraries(catalog.as_ref())
                        .context("Failed to list libraries")?;
                    print_json(&libraries)
                }
            }
        }

        Commands::History { command } => {
            let history = History::new(config.history_path());
            match command {
                HistoryCmd::List => {
                    let records = history.records()?;
                    println!("🗂️  Resolution History ({}):", history.path().display());
                    for (i, rec) in records.iter().enumerate() {
                        println!(
                            "[{}] {}\n     group: {}\n     kept: {} in {}\n     archived: {:?}\n     restored: {:?}\n",
                            i,
                            rec.timestamp,
                            rec.duplicate_id,
                            rec.keeper,
                            rec.blessed_prefix,
                            rec.archived,
                            rec.restored
                        );
                    }
                    Ok(())
                }

                HistoryCmd::Restore {
                    record,
                    all,
                    dry_run,
                } => {
                    let records = history.records()?;
                    if records.is_empty() {
                        anyhow::bail!("No history records to restore");
                    }
                    let selected = history.select(&records, *record, *all)?;

                    let catalog = open_catalog(&cli, &config)?;
                    let catalog: Box<dyn Catalog> = if *dry_run {
                        Box::new(DryRunCatalog::new(catalog))
                    } else {
                        catalog
                    };

                    // snapshot restores only touch the in-memory copy
                    let commit = !*dry_run && cli.snapshot.is_none();
                    let restored = history.restore(catalog.as_ref(), records, &selected, commit)?;

                    if *dry_run {
                        println!("\n⚠️  Dry-run only; no assets were changed.");
                    } else if cli.snapshot.is_some() {
                        println!("\n⚠️  Snapshot mode; history file left untouched.");
                    } else {
                        println!("🧹 Updated history, removed {} record(s)", restored);
                    }
                    Ok(())
                }
            }
        }
    }
}

fn dedup(cli: &Cli, config: &Config, dry_run: bool, yes: bool) -> Result<()> {
    let ranker = PriorityRanker::new(config.priority.iter().cloned());
    let catalog = open_catalog(cli, config)?;
    let catalog: Box<dyn Catalog> = if dry_run {
        Box::new(DryRunCatalog::new(catalog))
    } else {
        catalog
    };

    let source = match &cli.snapshot {
        Some(path) => format!("snapshot {}", path.display()),
        None => config.url.clone(),
    };
    println!(
        "▶ Resolving duplicates in {} with {} prioritized location(s)",
        source,
        ranker.prefixes().len()
    );

    if !dry_run && !yes && cli.snapshot.is_none() {
        let confirmed = Confirm::new()
            .with_prompt("Archive redundant copies now?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted; nothing was changed.");
            return Ok(());
        }
    }

    let engine = ResolutionEngine::new(catalog.as_ref(), &ranker);
    let report = benchmark("resolving duplicate groups", || engine.resolve_all())
        .context("Duplicate resolution aborted")?;
    print_report(&report, cli.verbose);

    if dry_run {
        println!("\n⚠️  Dry-run only; no assets were changed.");
    } else if cli.snapshot.is_some() {
        println!("\n⚠️  Snapshot mode; changes were applied in memory only.");
    } else if !report.resolutions.is_empty() {
        let history = History::new(config.history_path());
        let written = history.append(&report.resolutions)?;
        println!(
            "\n✅ Recorded {} resolution(s) in {}",
            written,
            history.path().display()
        );
    }

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} visibility update(s) failed; re-run to retry",
            report.failures.len()
        );
    }
    Ok(())
}

fn open_catalog(cli: &Cli, config: &Config) -> Result<Box<dyn Catalog>> {
    if let Some(path) = &cli.snapshot {
        let snapshot = CatalogSnapshot::load(path)
            .with_context(|| format!("Failed to load snapshot {:?}", path))?;
        return Ok(Box::new(InMemoryCatalog::from_snapshot(snapshot)));
    }

    let catalog = ImmichCatalog::new(&config.url, config.api_key()?)
        .context("Failed to create Immich client")?
        .with_upload_device_id(config.upload_device_id.clone())
        .with_duplicates_file(cli.duplicates_file.clone());
    Ok(Box::new(catalog))
}

fn load_index(catalog: &dyn Catalog) -> Result<DuplicateIndex> {
    benchmark("indexing duplicates", || DuplicateIndex::build(catalog))
        .context("Failed to index duplicates")
}

/// Match a library by id or name; `upload` names the upload pseudo-library.
fn find_library(catalog: &dyn Catalog, wanted: &str) -> Result<LibraryRef> {
    let libraries = catalog::all_libraries(catalog).context("Failed to list libraries")?;
    libraries
        .iter()
        .find(|library| library.id == wanted)
        .or_else(|| libraries.iter().find(|library| library.name == wanted))
        .map(Library::library_ref)
        .ok_or_else(|| anyhow!("No library with id or name {:?}", wanted))
}

fn print_report(report: &ResolutionReport, verbose: bool) {
    println!("\n✨ Processed {} duplicate group(s):", report.groups_processed);
    println!("   📦 Archived {} redundant cop(ies)", report.archived_count);
    println!("   🏆 Restored {} keeper(s) to the timeline", report.restored_count);
    println!(
        "   ⏭️  Skipped {} group(s) with no prioritized location",
        report.skipped_count
    );

    if verbose {
        for resolution in &report.resolutions {
            println!(
                "   🏆 {} → keeping {} in {} (archived {:?})",
                resolution.duplicate_id,
                resolution.keeper,
                resolution.blessed_prefix,
                resolution.archived
            );
        }
        for skipped in &report.skipped {
            println!(
                "   ⏭️  {} → unlisted prefixes {:?}",
                skipped.duplicate_id, skipped.unlisted_prefixes
            );
        }
    }

    for failure in &report.failures {
        eprintln!(
            "⚠️  Group {}: failed to set {} on {:?}: {}",
            failure.duplicate_id, failure.visibility, failure.asset_ids, failure.reason
        );
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "immich_cull=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run `f()` behind a spinner on stderr.
fn with_spinner<T, F: FnOnce() -> T>(message: &'static str, f: F) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    result
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    info!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
