//! # CLI Module
//!
//! Command-line interface for the similar image finder.
//!
//! ## Usage
//! ```bash
//! # Find near-duplicates and list them
//! similar-images scan ~/Pictures
//!
//! # Move every near-duplicate into a separate folder
//! similar-images scan ~/Pictures --move-to ~/Pictures/similar_images
//!
//! # Write a similarity record for every pair to SQLite
//! similar-images records ~/Pictures --db records.db --batch-size 50000
//!
//! # JSON output
//! similar-images scan ~/Pictures --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use similar_images::core::comparator::CascadeThresholds;
use similar_images::core::organize::{DuplicateMover, MoveReport};
use similar_images::core::persist::SqliteRecordStore;
use similar_images::core::pipeline::{
    Pipeline, PipelineResult, RecordRunResult, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS,
};
use similar_images::error::{Result, SimilarImagesError};
use similar_images::events::{
    CompareEvent, Event, EventChannel, EventReceiver, PersistEvent, PipelineEvent, ScanEvent,
};
use std::path::{Path, PathBuf};
use std::thread;

/// Similar Images - Find near-duplicate pictures in a folder
#[derive(Parser, Debug)]
#[command(name = "similar-images")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find images that have at least one near-duplicate
    Scan {
        /// Directory to scan
        dir: PathBuf,

        /// Move every near-duplicate into this directory
        #[arg(long, value_name = "DIR")]
        move_to: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Write a similarity record for every pair to a SQLite database
    Records {
        /// Directory to scan
        dir: PathBuf,

        /// Record database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Records committed per transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Flags shared by both modes
#[derive(Args, Debug)]
struct CommonArgs {
    /// Number of comparison workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// dHash distance at or below which a pair is a near match candidate
    #[arg(long, default_value_t = 10)]
    near_distance: u32,

    /// dHash distance above which a pair is never similar
    #[arg(long, default_value_t = 20)]
    max_distance: u32,

    /// Grayscale similarity a near match must exceed
    #[arg(long, default_value_t = 0.5)]
    near_grayscale: f64,

    /// Grayscale similarity a far match must exceed
    #[arg(long, default_value_t = 0.825)]
    far_grayscale: f64,

    /// Include hidden files
    #[arg(long)]
    include_hidden: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl CommonArgs {
    fn thresholds(&self) -> CascadeThresholds {
        CascadeThresholds {
            near_distance: self.near_distance,
            max_distance: self.max_distance,
            near_grayscale: self.near_grayscale,
            far_grayscale: self.far_grayscale,
            ..CascadeThresholds::default()
        }
    }

    fn pipeline(&self, dir: PathBuf) -> Result<Pipeline> {
        Pipeline::builder()
            .root(dir)
            .workers(self.workers)
            .thresholds(self.thresholds())
            .include_hidden(self.include_hidden)
            .build()
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            dir,
            move_to,
            output,
            common,
        } => {
            similar_images::init_tracing(common.verbose);
            run_scan(dir, move_to, output, &common)
        }
        Commands::Records {
            dir,
            db,
            batch_size,
            common,
        } => {
            similar_images::init_tracing(common.verbose);
            run_records(dir, db, batch_size, &common)
        }
    }
}

fn run_scan(
    dir: PathBuf,
    move_to: Option<PathBuf>,
    output: OutputFormat,
    common: &CommonArgs,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        print_header(&term);
    }

    let pipeline = common.pipeline(dir)?;

    let (sender, receiver) = EventChannel::new();
    let progress = pretty.then(create_progress_bar);
    let event_thread = spawn_event_thread(receiver, progress, common.verbose);

    let result = pipeline.find_duplicates_with_events(&sender);

    // Dropping the sender lets the event thread finish
    drop(sender);
    event_thread.join().ok();
    let result = result?;

    let moved = match move_to {
        Some(target) if !result.duplicates.is_empty() => {
            let mover = DuplicateMover::new(target)?;
            Some(mover.move_all(&result.duplicates))
        }
        _ => None,
    };

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, moved.as_ref(), common.verbose),
        OutputFormat::Json => print_json_results(&result, moved.as_ref())?,
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    Ok(())
}

fn run_records(
    dir: PathBuf,
    db: Option<PathBuf>,
    batch_size: usize,
    common: &CommonArgs,
) -> Result<()> {
    let term = Term::stderr();
    print_header(&term);

    let db_path = db.unwrap_or_else(default_db_path);
    let store = SqliteRecordStore::open(&db_path)?;

    let pipeline = Pipeline::builder()
        .root(dir)
        .workers(common.workers)
        .batch_size(batch_size)
        .thresholds(common.thresholds())
        .include_hidden(common.include_hidden)
        .build()?;

    let (sender, receiver) = EventChannel::new();
    let event_thread = spawn_event_thread(receiver, Some(create_progress_bar()), common.verbose);

    let result = pipeline.generate_records_with_events(&store, &sender);

    drop(sender);
    event_thread.join().ok();
    let result = result?;

    print_record_results(&term, &result, &db_path, common.verbose);

    Ok(())
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("similar-images")
        .join("records.db")
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Similar Images").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(bar_style);
    pb
}

/// Drive the progress bar from pipeline events until the channel closes
fn spawn_event_thread(
    receiver: EventReceiver,
    progress: Option<ProgressBar>,
    verbose: bool,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Completed { total_images }) => {
                    pb.set_message(format!("{} images", total_images));
                }
                Event::Compare(CompareEvent::Started { total_pairs, workers }) => {
                    pb.set_length(total_pairs as u64);
                    pb.set_message(format!("Comparing with {} workers", workers));
                }
                Event::Compare(CompareEvent::Progress(p)) => {
                    pb.set_position(p.pairs_completed as u64);
                }
                Event::Compare(CompareEvent::PairSkipped { first, second, message }) => {
                    if verbose {
                        pb.println(format!(
                            "  {} {} / {}: {}",
                            style("skipped").yellow(),
                            file_name(&first),
                            file_name(&second),
                            message
                        ));
                    }
                }
                Event::Persist(PersistEvent::BatchCommitted { batch, records }) => {
                    if verbose {
                        pb.println(format!("  batch {} committed ({} records)", batch, records));
                    }
                }
                Event::Persist(PersistEvent::BatchRolledBack { batch, message, .. }) => {
                    pb.println(format!(
                        "  {} batch {}: {}",
                        style("rolled back").red(),
                        batch,
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    })
}

fn print_pretty_results(
    term: &Term,
    result: &PipelineResult,
    moved: Option<&MoveReport>,
    verbose: bool,
) {
    term.write_line("").ok();
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images, {} pairs compared in {:.1}s",
        style(result.total_images).cyan(),
        style(result.compared_pairs).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} similar pairs",
        style(result.similar_pairs).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} images with a near-duplicate",
        style(result.duplicates.len()).yellow()
    ))
    .ok();

    if result.skipped_pairs > 0 {
        term.write_line(&format!(
            "  {} pairs skipped",
            style(result.skipped_pairs).red()
        ))
        .ok();
    }
    if verbose {
        term.write_line(&format!(
            "  {} decodes, {} cache hits",
            style(result.cache.decodes).dim(),
            style(result.cache.hits).dim()
        ))
        .ok();
        for error in &result.errors {
            term.write_line(&format!("    {}", style(error).dim())).ok();
        }
    }

    term.write_line("").ok();

    if result.duplicates.is_empty() {
        term.write_line(&format!("  {} No near-duplicates found", style("✓").green()))
            .ok();
    } else {
        term.write_line(&format!("{}", style("Near-duplicates:").bold().underlined()))
            .ok();
        for path in &result.duplicates {
            term.write_line(&format!("    {} {}", style("○").dim(), display_path(path)))
                .ok();
        }
    }

    term.write_line("").ok();

    match moved {
        Some(report) => {
            term.write_line(&format!(
                "  {} files moved",
                style(report.moved.len()).green()
            ))
            .ok();
            for error in &report.errors {
                term.write_line(&format!("    {} {}", style("✗").red(), error))
                    .ok();
            }
        }
        None => {
            term.write_line(&format!(
                "{}",
                style("No files were moved. Use --move-to to collect the duplicates.").dim()
            ))
            .ok();
        }
    }
}

fn print_json_results(result: &PipelineResult, moved: Option<&MoveReport>) -> Result<()> {
    let output = serde_json::json!({
        "total_images": result.total_images,
        "total_pairs": result.total_pairs,
        "compared_pairs": result.compared_pairs,
        "similar_pairs": result.similar_pairs,
        "skipped_pairs": result.skipped_pairs,
        "duration_ms": result.duration_ms,
        "duplicates": result.duplicates,
        "errors": result.errors,
        "cache": result.cache,
        "moved": moved,
    });

    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| SimilarImagesError::Config(format!("JSON output failed: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_minimal_results(result: &PipelineResult) {
    for path in &result.duplicates {
        println!("{}", path.display());
    }
}

fn print_record_results(term: &Term, result: &RecordRunResult, db_path: &Path, verbose: bool) {
    let persist = &result.persist;

    term.write_line("").ok();
    term.write_line(&format!("{} Records Written", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images, {} pairs compared in {:.1}s",
        style(result.total_images).cyan(),
        style(result.compared_pairs).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} records in {} batches",
        style(persist.records_committed).cyan(),
        persist.batches_committed
    ))
    .ok();

    if persist.batches_rolled_back > 0 {
        term.write_line(&format!(
            "  {} batches rolled back ({} records lost)",
            style(persist.batches_rolled_back).red(),
            persist.records_rolled_back
        ))
        .ok();
    }
    if result.skipped_pairs > 0 {
        term.write_line(&format!(
            "  {} pairs skipped",
            style(result.skipped_pairs).red()
        ))
        .ok();
    }
    if verbose {
        for error in result.errors.iter().chain(&persist.errors) {
            term.write_line(&format!("    {}", style(error).dim())).ok();
        }
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  Database: {}",
        style(display_path(db_path)).dim()
    ))
    .ok();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
