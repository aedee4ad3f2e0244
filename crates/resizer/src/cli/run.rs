//! The `resizer run` command: one batch from discovery to summary.

use anyhow::Context;
use clap::{Args, ValueEnum};
use indicatif::ProgressBar;
use resizer_core::pipeline::FileDiscovery;
use resizer_core::{
    Config, ImageResizer, OutputFormat, OutputWriter, PoolError, ResizeFilter, ResizeMode,
    Results, WorkerPool,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Arguments for the `run` command.
///
/// Every flag overrides the matching config value.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(short, long, env = "RESIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Folder to read images from
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Folder to write resized images to
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Target width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// How the target size is applied
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Resampling filter
    #[arg(long, value_enum)]
    pub filter: Option<FilterArg>,

    /// Descend into subfolders of the source folder
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip images whose destination file already exists
    #[arg(long)]
    pub skip_existing: bool,

    /// Write a per-file report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Resize modes accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Stretch to exactly width x height
    Exact,
    /// Fit within width x height, keeping the aspect ratio
    Fit,
}

impl From<ModeArg> for ResizeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Exact => ResizeMode::Exact,
            ModeArg::Fit => ResizeMode::Fit,
        }
    }
}

/// Resampling filters accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FilterArg {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<FilterArg> for ResizeFilter {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::Nearest => ResizeFilter::Nearest,
            FilterArg::Triangle => ResizeFilter::Triangle,
            FilterArg::CatmullRom => ResizeFilter::CatmullRom,
            FilterArg::Gaussian => ResizeFilter::Gaussian,
            FilterArg::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl RunArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.paths.source_folder = source.clone();
        }
        if let Some(dest) = &self.dest {
            config.paths.destination_folder = dest.clone();
        }
        if let Some(workers) = self.workers {
            config.processing.parallel_workers = workers;
        }
        if let Some(width) = self.width {
            config.resize.width = width;
        }
        if let Some(height) = self.height {
            config.resize.height = height;
        }
        if let Some(mode) = self.mode {
            config.resize.mode = mode.into();
        }
        if let Some(filter) = self.filter {
            config.resize.filter = filter.into();
        }
        if self.recursive {
            config.processing.recursive = true;
        }
        if self.skip_existing {
            config.processing.skip_existing = true;
        }
        if let Some(report) = &self.report {
            config.output.report = Some(report.clone());
        }
        if let Some(format) = self.format {
            config.output.format = format.to_string();
        }
    }
}

/// Per-run counts collected from the result stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    succeeded: u64,
    failed: u64,
}

/// Execute the run command.
pub fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let source = config.source_folder();
    let destination = config.destination_folder();

    tracing::info!("==== Resizer v{} starting ====", resizer_core::VERSION);
    tracing::info!(
        workers = config.processing.parallel_workers,
        "Resizing {:?} -> {:?} at {}x{} ({:?}, {:?})",
        source,
        destination,
        config.resize.width,
        config.resize.height,
        config.resize.mode,
        config.resize.filter,
    );

    if !source.is_dir() {
        anyhow::bail!(
            "Source folder does not exist: {:?}\n\n  Hint: Pass --source or set paths.source_folder.",
            source
        );
    }
    std::fs::create_dir_all(&destination)
        .with_context(|| format!("Cannot create destination folder {:?}", destination))?;

    let discovery = FileDiscovery::new(config.processing.clone());
    let files = discovery
        .discover(&source)
        .with_context(|| format!("Cannot list source folder {:?}", source))?;
    tracing::info!(
        "Found {} image(s), {:.1} MB",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );

    let plan = discovery.plan(&files, &source, &destination, config.resize.params());
    let skipped = plan.skipped.len() as u64;
    if skipped > 0 {
        tracing::info!("Skipping {} image(s) with an existing destination", skipped);
    }
    if plan.tasks.is_empty() {
        tracing::warn!("No images to resize in {:?}", source);
        tracing::info!("==== Resizer finished ====");
        return Ok(());
    }

    let report = open_report(&config)?;
    let resizer = Arc::new(ImageResizer::new(config.limits.clone()));
    let pool = WorkerPool::spawn(config.pool_config(), resizer)?;
    let results = pool.results();
    let progress = create_progress_bar(plan.tasks.len() as u64);
    let start_time = Instant::now();

    let (tally, stopped) = std::thread::scope(|s| -> anyhow::Result<_> {
        let progress = &progress;
        let consumer = s.spawn(move || consume(results, progress, report, start_time));

        for task in plan.tasks {
            if let Err(e) = pool.submit(task) {
                tracing::error!("Stopped submitting: {}", e);
                break;
            }
        }
        let stopped = pool.drain_and_stop();

        let tally = consumer
            .join()
            .map_err(|_| anyhow::anyhow!("Result consumer panicked"))??;
        Ok((tally, stopped))
    })?;

    let elapsed = start_time.elapsed();
    progress.finish_and_clear();
    print_summary(tally, skipped, elapsed);

    let summary = match stopped {
        Ok(summary) => summary,
        Err(e @ PoolError::PoolStalled { .. }) => {
            return Err(anyhow::Error::new(e)
                .context("Batch aborted: every worker died with images still queued"));
        }
        Err(e) => return Err(e.into()),
    };

    if summary.failed > 0 {
        tracing::warn!("{} image(s) failed; see the log for details", summary.failed);
    }
    tracing::info!("==== Resizer finished in {:.1}s ====", elapsed.as_secs_f64());
    Ok(())
}

/// Open the report writer when `output.report` is set.
fn open_report(config: &Config) -> anyhow::Result<Option<OutputWriter<BufWriter<File>>>> {
    let Some(path) = &config.output.report else {
        return Ok(None);
    };
    let format = OutputFormat::parse(&config.output.format)
        .with_context(|| format!("Unknown report format {:?}", config.output.format))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("Cannot create report file {:?}", path))?;
    Ok(Some(OutputWriter::new(
        BufWriter::new(file),
        format,
        config.output.pretty,
    )))
}

/// Drain the result stream, updating progress and the report.
fn consume(
    results: Results,
    progress: &ProgressBar,
    mut report: Option<OutputWriter<BufWriter<File>>>,
    start_time: Instant,
) -> anyhow::Result<Tally> {
    let mut tally = Tally::default();

    for result in results {
        if result.outcome.is_success() {
            tally.succeeded += 1;
        } else {
            tally.failed += 1;
        }
        if let Some(writer) = &mut report {
            writer.write(&result)?;
        }

        // Update progress bar with rate
        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let processed = tally.succeeded + tally.failed;
            progress.set_message(format!("{:.1} img/sec", processed as f64 / elapsed));
        }
    }

    if let Some(mut writer) = report {
        writer.finish()?;
        tracing::info!("Report written ({} record(s))", writer.items_written());
    }
    Ok(tally)
}

fn create_progress_bar(total: u64) -> ProgressBar {
    use indicatif::ProgressStyle;

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the batch.
fn print_summary(tally: Tally, skipped: u64, elapsed: Duration) {
    let total = tally.succeeded + tally.failed + skipped;
    let rate = if elapsed.as_secs_f64() > 0.0 {
        (tally.succeeded + tally.failed) as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", tally.succeeded);
    if tally.failed > 0 {
        eprintln!("    Failed:       {:>8}", tally.failed);
    }
    if skipped > 0 {
        eprintln!("    Skipped:      {:>8}", skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
