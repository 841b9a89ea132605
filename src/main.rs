//! imgbatch CLI - batch WebP conversion and image downloading
//!
//! Both subcommands run their items through a bounded worker pool, show a
//! single-line progress indicator, and append failures to an error log
//! instead of stopping.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use tracing::info;

use imgbatch::{
    discover_images, init_logging, read_url_list, BatchItem, BatchObserver, BatchRunner,
    BatchSummary, BatchWorker, Config, FailureLog, ImageDownloader, ImgBatchError, WebpConverter,
};

/// imgbatch - bounded-concurrency image batch tools
#[derive(Parser)]
#[command(
    name = "imgbatch",
    version,
    about = "Convert folders of images to WebP and download image lists in parallel",
    long_about = "imgbatch runs one operation over many images with a fixed number of \
                  workers. Failed items are appended to an error log and never stop the batch."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (.toml or .yaml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// List the items that would be processed without processing them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print the final summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only, no progress indicator)
    #[arg(short = 'Q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Convert every PNG, JPEG and GIF in a folder to WebP
    Convert {
        /// Folder containing the images (not searched recursively)
        image_folder: PathBuf,

        /// Output folder name (default: webp_images)
        #[arg(short, long, value_name = "OUTPUT_FOLDER")]
        output: Option<PathBuf>,

        /// Maximum number of threads (default: 8)
        #[arg(short, long, value_name = "THREADS")]
        threads: Option<usize>,

        /// Error log file (default: webp_error_log.txt)
        #[arg(long, value_name = "FILE")]
        error_log: Option<PathBuf>,

        /// Path to the cwebp executable
        #[arg(long, value_name = "PATH", env = "IMGBATCH_CWEBP")]
        cwebp: Option<PathBuf>,
    },
    /// Download images from a file of URLs, one per line
    Download {
        /// File containing image URLs
        url_file: PathBuf,

        /// Output folder name (default: images)
        #[arg(short, long, value_name = "OUTPUT_FOLDER")]
        output: Option<PathBuf>,

        /// Maximum number of threads (default: 8)
        #[arg(short, long, value_name = "THREADS")]
        threads: Option<usize>,

        /// Error log file (default: error_log.txt)
        #[arg(long, value_name = "FILE")]
        error_log: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path (.toml or .yaml)
        #[arg(short, long, default_value = "imgbatch.toml")]
        output: PathBuf,
    },
}

/// Presentation switches shared by both batch commands
struct OutputOptions {
    dry_run: bool,
    json: bool,
    quiet: bool,
}

impl OutputOptions {
    fn show_progress(&self) -> bool {
        !self.json && !self.quiet
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    if let Err(e) = init_logging(log_level) {
        fail(&e);
    }

    let options = OutputOptions {
        dry_run: cli.dry_run,
        json: cli.json,
        quiet: cli.quiet,
    };

    let outcome = match cli.command {
        Commands::Convert {
            image_folder,
            output,
            threads,
            error_log,
            cwebp,
        } => {
            let mut settings = config.convert.clone();
            if let Some(output) = output {
                settings.output = output;
            }
            if let Some(threads) = threads {
                settings.threads = threads;
            }
            if let Some(error_log) = error_log {
                settings.error_log = error_log;
            }
            if let Some(cwebp) = cwebp {
                settings.cwebp_path = cwebp;
            }

            run_convert(&image_folder, &settings, &options).await
        }
        Commands::Download {
            url_file,
            output,
            threads,
            error_log,
            timeout,
        } => {
            let mut settings = config.download.clone();
            if let Some(output) = output {
                settings.output = output;
            }
            if let Some(threads) = threads {
                settings.threads = threads;
            }
            if let Some(error_log) = error_log {
                settings.error_log = error_log;
            }
            if timeout.is_some() {
                settings.timeout_seconds = timeout;
            }

            run_download(&url_file, &settings, &options).await
        }
        Commands::ExampleConfig { output } => generate_example_config(&output),
    };

    if let Err(e) = outcome {
        match e.downcast_ref::<ImgBatchError>() {
            Some(err) => fail(err),
            None => {
                eprintln!("{}: {:#}", style("Error").red().bold(), e);
                process::exit(1);
            }
        }
    }
}

/// Report a startup error and exit with status 1
fn fail(err: &ImgBatchError) -> ! {
    eprintln!("{}: {}", style("Error").red().bold(), err.user_message());
    process::exit(1);
}

fn load_config(path: Option<&Path>) -> imgbatch::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.logging.validate()?;
    Ok(config)
}

/// Run the convert command
async fn run_convert(
    image_folder: &Path,
    settings: &imgbatch::ConvertConfig,
    options: &OutputOptions,
) -> anyhow::Result<()> {
    settings.validate()?;
    let runner = BatchRunner::new(settings.threads)?;

    let images = discover_images(image_folder)?;
    info!("Found {} images in {:?}", images.len(), image_folder);

    let converter = WebpConverter::from_config(settings);
    let job = BatchJob {
        command: "convert",
        past_tense: "Converted",
        error_log: &settings.error_log,
    };

    job.run(&runner, images, converter, options).await
}

/// Run the download command
async fn run_download(
    url_file: &Path,
    settings: &imgbatch::DownloadConfig,
    options: &OutputOptions,
) -> anyhow::Result<()> {
    settings.validate()?;
    let runner = BatchRunner::new(settings.threads)?;

    let urls = read_url_list(url_file)?;
    info!("Read {} URLs from {:?}", urls.len(), url_file);

    let downloader = ImageDownloader::new(settings)?;
    let job = BatchJob {
        command: "download",
        past_tense: "Completed",
        error_log: &settings.error_log,
    };

    job.run(&runner, urls, downloader, options).await
}

/// Shared driver for one batch command
struct BatchJob<'a> {
    command: &'static str,
    past_tense: &'static str,
    error_log: &'a Path,
}

impl BatchJob<'_> {
    async fn run<I, W>(
        &self,
        runner: &BatchRunner,
        items: Vec<I>,
        worker: W,
        options: &OutputOptions,
    ) -> anyhow::Result<()>
    where
        I: BatchItem,
        W: BatchWorker<I> + 'static,
    {
        if options.dry_run {
            println!("{} items would be processed:", style(items.len()).bold());
            for item in &items {
                println!("  {}", item.label());
            }
            return Ok(());
        }

        let progress = if options.show_progress() {
            self.progress_bar(items.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        // Worker panics become item failures; keep their hook output off the bar
        let bar = progress.clone();
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| bar.suspend(|| default_hook(info))));

        let observer = Arc::new(ConsoleObserver {
            progress: progress.clone(),
            failure_log: FailureLog::new(self.error_log, worker.action()),
        });

        let summary = runner.run(items, Arc::new(worker), Arc::clone(&observer)).await?;
        progress.finish_and_clear();

        self.print_summary(&summary, observer.failure_log.entries(), options.json)?;
        Ok(())
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        let template = format!(
            "{{spinner:.green}} {} {{pos}} of {{len}} images... [{{elapsed_precise}}] [{{wide_bar:.cyan/blue}}] ({{eta}})",
            self.past_tense
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr()).with_style(style)
    }

    fn print_summary(
        &self,
        summary: &BatchSummary,
        logged: usize,
        json: bool,
    ) -> anyhow::Result<()> {
        if json {
            let report = JsonReport {
                command: self.command,
                summary,
                error_log: self.error_log,
                logged_failures: logged,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "{} {} of {} images. Errors logged to {}.",
            self.past_tense,
            summary.completed(),
            summary.total,
            self.error_log.display()
        );

        if summary.failed > 0 {
            println!("  {}: {}", style("Failed").red(), summary.failed);
        }
        Ok(())
    }
}

/// Machine-readable summary for `--json`
#[derive(Serialize)]
struct JsonReport<'a> {
    command: &'static str,
    #[serde(flatten)]
    summary: &'a BatchSummary,
    error_log: &'a Path,
    logged_failures: usize,
}

/// Drives the progress bar and writes failures to the error log
struct ConsoleObserver {
    progress: ProgressBar,
    failure_log: FailureLog,
}

impl<I: BatchItem> BatchObserver<I> for ConsoleObserver {
    fn on_progress(&self, completed: usize, _total: usize) {
        self.progress.set_position(completed as u64);
    }

    fn on_failure(&self, item: &I, reason: &str) {
        BatchObserver::<I>::on_failure(&self.failure_log, item, reason);
    }
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path) -> anyhow::Result<()> {
    let config = Config::default();
    config.to_file(output_path)?;

    println!(
        "{}: Generated example configuration: {}",
        style("Success").green().bold(),
        output_path.display()
    );

    Ok(())
}
