//! Command-line interface for mirrored archive extraction.
//!
//! Scans a source tree for LHA and LZX archives and extracts each one into
//! the matching subdirectory of the destination tree.

use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use whd_extractor::{
    mirror, ArchiveKind, ExtractError, ExtractMode, LowSpacePolicy, ProgressEvent,
    RunSummary, ToolPaths, WalkOptions,
};

#[derive(Parser)]
#[command(name = "whdextract")]
#[command(
    version,
    about = "Locate LHA and LZX archives in nested directories and extract them to a destination, preserving the directory hierarchy",
    long_about = None
)]
struct Cli {
    /// Directory to scan for archives
    source: PathBuf,

    /// Existing directory to extract into
    destination: PathBuf,

    /// Check for free space on the destination before each archive
    #[arg(long, alias = "enablespacecheck")]
    enable_space_check: bool,

    /// Only test archives, write nothing
    #[arg(long, alias = "testarchivesonly")]
    test_archives_only: bool,

    /// Stop the whole run the first time free space is too low
    #[arg(long, requires = "enable_space_check")]
    halt_on_low_space: bool,

    /// Minimum free space in megabytes for the space check
    #[arg(long, default_value = "20")]
    min_free_mb: u64,

    /// Number of errors after which the run is aborted
    #[arg(long, default_value = "40")]
    max_errors: usize,

    /// Do not clear protection bits on earlier output before re-extracting
    #[arg(long)]
    no_protection_reset: bool,

    /// Path to the lha program
    #[arg(long)]
    lha: Option<PathBuf>,

    /// Path to the unlzx program
    #[arg(long)]
    unlzx: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            space_check: self.enable_space_check,
            min_free_mb: self.min_free_mb,
            low_space_policy: if self.halt_on_low_space {
                LowSpacePolicy::HaltWalk
            } else {
                LowSpacePolicy::SkipFile
            },
            mode: if self.test_archives_only {
                ExtractMode::TestOnly
            } else {
                ExtractMode::Extract
            },
            error_capacity: self.max_errors,
            reset_protection: !self.no_protection_reset,
        }
    }

    fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            lha: self.lha.clone(),
            unlzx: self.unlzx.clone(),
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };

    if let Err(e) = handle_run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn handle_run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = cli.walk_options();
    tracing::debug!(?options, "starting run");

    if !cli.json {
        println!("Scanning directory:     {}", cli.source.display());
        println!("Extracting archives to: {}", cli.destination.display());
    }

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel_flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })?;

    let spinner = progress_spinner(cli.json);
    let progress_cb = {
        let spinner = spinner.clone();
        move |event: &ProgressEvent| report_progress(&spinner, event)
    };

    let result = mirror(
        &cli.source,
        &cli.destination,
        &options,
        &cli.tool_paths(),
        &progress_cb,
        cancel_flag,
    );
    spinner.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        // Missing roots, a missing lha and a failed up-front space check end
        // the run without a walk and without a failure status.
        Err(
            e @ (ExtractError::SourceNotFound(_)
            | ExtractError::DestinationNotFound(_)
            | ExtractError::InsufficientDiskSpace { .. }),
        ) => {
            println!("\n{}\n", e);
            return Ok(());
        }
        Err(ExtractError::ToolNotFound(tool)) => {
            println!(
                "\n{} was not found. It is required to extract the archives, so the program will now quit. Please install lha, or point to it with --lha.\n",
                tool
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn progress_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn report_progress(spinner: &ProgressBar, event: &ProgressEvent) {
    match event {
        ProgressEvent::Scanning { directory } => {
            spinner.set_message(format!("Scanning {}", directory));
        }
        ProgressEvent::Extracting {
            archive,
            destination,
            ..
        } => {
            spinner.println(format!("Extracting {} to {}", archive, destination));
            spinner.set_message(format!("Extracting {}", archive));
        }
        // Failures are already logged by the library and listed in the summary.
        ProgressEvent::Finished { .. } => {}
    }
}

fn print_summary(summary: &RunSummary) {
    let lha = summary.found(ArchiveKind::Lha);
    let lzx = summary.found(ArchiveKind::Lzx);

    println!(
        "Scanned {} directories and found {} archives.",
        summary.directories_scanned,
        summary.total_found()
    );
    println!("Archives composed of {} LHA and {} LZX archives.", lha, lzx);

    let deferred = summary.deferred(ArchiveKind::Lzx);
    if deferred > 0 {
        println!(
            "UnLZX is not installed.  {} LZX archives were found but not expanded.",
            deferred
        );
    }

    if summary.cancelled {
        println!("Run cancelled.");
    }

    let secs = summary.duration.as_secs();
    println!(
        "\nElapsed time: {}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );

    if summary.errors.is_empty() {
        println!("\nNo errors encountered.");
    } else {
        println!("\nErrors encountered during execution:");
        for (i, error) in summary.errors.iter().enumerate() {
            println!("Error: {}: {}", i + 1, error);
        }
    }
}
