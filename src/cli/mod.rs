//! # CLI Module
//!
//! Command-line interface for the image curator.
//!
//! ## Usage
//! ```bash
//! # Fingerprint the corpus, filling the persisted log
//! image-curator scan images/download images/pass
//!
//! # Resolve pairs interactively, picking up new downloads as they land
//! image-curator curate images/download images/pass --quarantine images/trash --watch
//!
//! # Inspect a single fingerprint
//! image-curator fingerprint cat.jpg --grid cat-grid.png
//!
//! # Compare two images directly
//! image-curator distance a.jpg b.jpg
//! ```

use clap::{Args, Parser, Subcommand};
use console::{style, Term};
use image_curator::core::hasher::PerceptualHasher;
use image_curator::core::matcher::{CandidatePair, Image, ThresholdPolicy};
use image_curator::core::scanner::{ScanConfig, ScanStats};
use image_curator::core::session::{default_data_dir, Session, SessionBuilder};
use image_curator::core::watcher::{FolderWatcher, WatcherConfig};
use image_curator::error::{FingerprintError, Result};
use image_curator::events::{Event, EventChannel, ResolveEvent, ScanEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread;

/// Image Curator - resolve near-duplicate images one pair at a time
#[derive(Parser, Debug)]
#[command(name = "image-curator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Directory holding the fingerprint and skip logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for the shuffled scan and search order
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Starting similarity threshold (pairs must be strictly below it)
    #[arg(short, long, global = true, default_value = "50")]
    threshold: u32,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint every image under the roots
    Scan {
        /// Corpus roots
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Worker threads for fingerprinting (0 = one per core)
        #[arg(long, default_value = "0")]
        jobs: usize,
    },

    /// Resolve candidate pairs interactively
    Curate {
        /// Corpus roots
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Where rejected images are moved
        #[arg(short, long)]
        quarantine: PathBuf,

        /// Pick up images created under the roots while curating
        #[arg(short, long)]
        watch: bool,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,
    },

    /// Print the fingerprint of one image
    Fingerprint {
        image: PathBuf,

        /// Grid size
        #[arg(long, default_value = "8")]
        size: u32,

        /// Downsample factor; must divide the grid size
        #[arg(long, default_value = "1")]
        downsample: u32,

        /// Also write the fingerprint as a grayscale PNG
        #[arg(long)]
        grid: Option<PathBuf>,
    },

    /// Print the fingerprint distance between two images
    Distance { first: PathBuf, second: PathBuf },
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    image_curator::init_tracing(if cli.common.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Scan {
            roots,
            include_hidden,
            jobs,
        } => run_scan(&cli.common, roots, include_hidden, jobs),
        Commands::Curate {
            roots,
            quarantine,
            watch,
            include_hidden,
        } => run_curate(&cli.common, roots, quarantine, watch, include_hidden),
        Commands::Fingerprint {
            image,
            size,
            downsample,
            grid,
        } => run_fingerprint(&image, size, downsample, grid.as_deref()),
        Commands::Distance { first, second } => run_distance(&first, &second),
    }
}

fn session_builder(common: &CommonArgs, roots: Vec<PathBuf>, scan: ScanConfig) -> SessionBuilder {
    let mut builder = Session::builder()
        .roots(roots)
        .data_dir(common.data_dir.clone().unwrap_or_else(default_data_dir))
        .threshold(ThresholdPolicy::default().starting_at(common.threshold))
        .scan_config(scan);
    if let Some(seed) = common.seed {
        builder = builder.seed(seed);
    }
    builder
}

fn run_scan(common: &CommonArgs, roots: Vec<PathBuf>, include_hidden: bool, jobs: usize) -> Result<()> {
    let term = Term::stderr();
    term.write_line(&format!(
        "{} {}",
        style("Image Curator").bold().cyan(),
        style(env!("CARGO_PKG_VERSION")).dim()
    ))
    .ok();

    let (sender, receiver) = EventChannel::new();
    let scan = ScanConfig::default()
        .with_hidden(include_hidden)
        .with_worker_threads(jobs);
    let mut session = session_builder(common, roots, scan)
        .events(sender)
        .build()?;

    let pb = ProgressBar::new(0);
    if let Ok(bar_style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(bar_style.progress_chars("█▓░"));
    }

    let progress = pb.clone();
    let verbose = common.verbose;
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Scan(ScanEvent::Queued { count }) => progress.inc_length(count as u64),
                Event::Scan(ScanEvent::Progress(p)) => {
                    progress.set_position(p.processed as u64);
                    progress.set_message(format!("{} ready, {} cached", p.working_set, p.cache_hits));
                }
                Event::Scan(ScanEvent::Failed { path, message }) if verbose => {
                    progress.println(format!("{} {}: {}", style("✗").red(), path.display(), message));
                }
                Event::Scan(ScanEvent::Idle { .. }) => progress.finish_and_clear(),
                _ => {}
            }
        }
    });

    let stats = session.scan_until_idle()?;
    let stored = session.store().stats()?;

    // Drop the session's senders so the event thread can finish
    drop(session);
    event_thread.join().ok();

    print_scan_summary(&term, &stats, stored.total_entries, stored.malformed_lines);
    Ok(())
}

fn print_scan_summary(term: &Term, stats: &ScanStats, stored: usize, malformed: usize) {
    term.write_line("").ok();
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold())).ok();
    term.write_line(&format!("  {} images ready for matching", style(stats.working_set).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} fingerprints computed, {} from the log",
        style(stats.computed).cyan(),
        style(stats.cache_hits).dim()
    ))
    .ok();
    if stats.failures > 0 {
        term.write_line(&format!("  {} images could not be read", style(stats.failures).red()))
            .ok();
    }
    term.write_line(&format!("  {} entries in the fingerprint log", style(stored).dim()))
        .ok();
    if malformed > 0 {
        term.write_line(&format!("  {} malformed log lines skipped", style(malformed).yellow()))
            .ok();
    }
}

fn run_curate(
    common: &CommonArgs,
    roots: Vec<PathBuf>,
    quarantine: PathBuf,
    watch: bool,
    include_hidden: bool,
) -> Result<()> {
    let term = Term::stdout();
    let scan = ScanConfig::default().with_hidden(include_hidden);
    let (sender, receiver) = EventChannel::new();
    let mut session = session_builder(common, roots.clone(), scan)
        .quarantine_dir(&quarantine)
        .events(sender.clone())
        .build()?;

    let _watcher = if watch {
        let mut watcher = FolderWatcher::new(WatcherConfig::default(), session.notifier(), sender)?;
        for root in &roots {
            watcher.watch(root)?;
        }
        Some(watcher)
    } else {
        drop(sender);
        None
    };

    let scanner = session.start_scanner()?;
    let outcome = curate_loop(&term, &mut session, &receiver);

    session.shutdown();
    match scanner.join() {
        Ok(result) => {
            result?;
        }
        Err(_) => tracing::error!("scanner thread panicked"),
    }
    outcome
}

fn curate_loop(
    term: &Term,
    session: &mut Session,
    receiver: &image_curator::events::EventReceiver,
) -> Result<()> {
    print_help(term);

    loop {
        let ready = session.working_set().len()?;
        let controller = session.controller();
        let current = controller.get_current()?;
        report_decisions(term, receiver);

        match &current {
            Some(pair) => print_pair(term, pair, controller.threshold()),
            None => {
                term.write_line(&format!(
                    "{} No candidate under threshold {} ({} images ready). Press n to look again.",
                    style("…").dim(),
                    controller.threshold(),
                    ready
                ))
                .ok();
            }
        }

        let key = match term.read_char() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "could not read from terminal");
                return Ok(());
            }
        };

        let result = match key {
            'l' => controller.delete_left().map(|_| ()),
            'r' => controller.delete_right().map(|_| ()),
            'b' => controller.delete_both().map(|_| ()),
            's' => controller.skip().map(|_| ()),
            'n' => Ok(()),
            'q' => return Ok(()),
            _ => {
                print_help(term);
                Ok(())
            }
        };

        if let Err(e) = result {
            term.write_line(&format!("{} {}", style("✗").red().bold(), e)).ok();
        }
    }
}

fn report_decisions(term: &Term, receiver: &image_curator::events::EventReceiver) {
    for event in receiver.drain() {
        match event {
            Event::Resolve(ResolveEvent::Moved { from, to, overwrote }) => {
                let note = if overwrote { " (overwrote)" } else { "" };
                term.write_line(&format!(
                    "  {} {} → {}{}",
                    style("moved").yellow(),
                    from.display(),
                    to.display(),
                    note
                ))
                .ok();
            }
            Event::Resolve(ResolveEvent::AutoResolved { kept, removed }) => {
                term.write_line(&format!(
                    "  {} kept {}, removed exact duplicate {}",
                    style("auto").green(),
                    kept.display(),
                    removed.display()
                ))
                .ok();
            }
            Event::Resolve(ResolveEvent::AutoResolveFailed { removed, message, .. }) => {
                term.write_line(&format!(
                    "  {} could not move exact duplicate {}: {}",
                    style("✗").red(),
                    removed.display(),
                    message
                ))
                .ok();
            }
            _ => {}
        }
    }
}

fn print_pair(term: &Term, pair: &CandidatePair, threshold: u32) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} distance {} (threshold {})",
        style("Candidate").bold().underlined(),
        style(pair.distance).cyan(),
        threshold
    ))
    .ok();
    term.write_line(&format!("  {} {}", style("L").bold(), describe(&pair.left))).ok();
    term.write_line(&format!("  {} {}", style("R").bold(), describe(&pair.right))).ok();
}

fn describe(image: &Image) -> String {
    format!(
        "{}  {}x{}  {}",
        image.path.display(),
        image.width,
        image.height,
        format_bytes(image.size)
    )
}

fn print_help(term: &Term) {
    term.write_line(&format!(
        "{}",
        style("[l] delete left  [r] delete right  [b] delete both  [s] skip  [n] refresh  [q] quit").dim()
    ))
    .ok();
}

fn run_fingerprint(image: &Path, size: u32, downsample: u32, grid: Option<&Path>) -> Result<()> {
    let hasher = PerceptualHasher::with_params(size, downsample)?;
    let fingerprint = hasher.hash_file(image)?;

    println!("{}", fingerprint.to_hex());
    println!("{}", fingerprint.to_base64());

    if let Some(grid_path) = grid {
        let encode_error = |reason: String| FingerprintError::Encode {
            path: grid_path.to_path_buf(),
            reason,
        };
        let grid_image = fingerprint
            .to_grid_image()
            .ok_or_else(|| encode_error("fingerprint is not a square grid".into()))?;
        grid_image
            .save(grid_path)
            .map_err(|e| encode_error(e.to_string()))?;
        eprintln!("{} grid written to {}", style("✓").green(), grid_path.display());
    }
    Ok(())
}

fn run_distance(first: &Path, second: &Path) -> Result<()> {
    let hasher = PerceptualHasher::default();
    let a = hasher.hash_file(first)?;
    let b = hasher.hash_file(second)?;
    println!("{}", a.distance(&b)?);
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
