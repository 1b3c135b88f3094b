use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use framecull::config::Settings;
use framecull::core::actions::{copy_frames_parallel, remove_frames};
use framecull::core::coordinator::{Coordinator, PairProgress};
use framecull::core::loader::load_frames;
use framecull::core::sequencer::DiskFrames;
use framecull::core::FramesByCamera;
use framecull::logging::init_logging;
use framecull::GlobalPartition;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "framecull",
    version,
    about = "Find and remove near-duplicate camera frames"
)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print which frames would be kept and which deleted
    Scan {
        #[command(flatten)]
        compare: CompareArgs,
        /// Write the partition as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Copy the distinct frames into another directory
    Copy {
        #[command(flatten)]
        compare: CompareArgs,
        /// Destination for the kept frames
        #[arg(long, value_name = "DIR", default_value = "./data/unique_images")]
        output_path: PathBuf,
        /// Only show what would be copied
        #[arg(long)]
        dry_run: bool,
    },

    /// Permanently delete redundant frames in place
    Delete {
        #[command(flatten)]
        compare: CompareArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Directory holding the camera frames
    #[arg(long, value_name = "DIR")]
    data_path: PathBuf,

    /// Gaussian kernel sizes applied in order (0 disables blurring)
    #[arg(long, value_name = "K", num_args = 1..)]
    gaussian_blur_radius_list: Option<Vec<u32>>,

    /// Contours smaller than this area are ignored
    #[arg(long, value_name = "AREA")]
    min_contour_area: Option<f64>,

    /// Pairs scoring below this are duplicates
    #[arg(long, value_name = "SCORE")]
    score_threshold: Option<f64>,

    /// Worker threads (default: all cores)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Settings file (default: user config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl CompareArgs {
    /// Settings file, then command line flags on top
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref()).context("Failed to load settings")?;

        if let Some(kernels) = &self.gaussian_blur_radius_list {
            settings.blur_kernels = kernels.clone();
        }
        if let Some(area) = self.min_contour_area {
            settings.min_contour_area = area;
        }
        if let Some(threshold) = self.score_threshold {
            settings.score_threshold = threshold;
        }
        if self.workers.is_some() {
            settings.workers = self.workers;
        }

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

#[derive(Serialize)]
struct ScanReport<'a> {
    generated_at: DateTime<Utc>,
    data_path: &'a Path,
    score_threshold: f64,
    total_keep: usize,
    total_delete: usize,
    cameras: &'a GlobalPartition,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan { compare, report } => {
            println!("▶ Scanning frames in: {}", compare.data_path.display());
            let settings = compare.settings()?;
            let partition = find_redundant_frames(&compare.data_path, &settings)?;

            for (camera_id, camera) in partition.cameras() {
                println!(
                    "\n✨ Camera {}: {} keep, {} delete",
                    camera_id,
                    camera.keep.len(),
                    camera.delete.len()
                );
                for frame in &camera.keep {
                    println!("   🏆 Keep   {}", frame);
                }
                for frame in &camera.delete {
                    println!("   🗑️  Delete {}", frame);
                }
            }
            print_totals(&partition);

            if let Some(report_path) = report {
                let report = ScanReport {
                    generated_at: Utc::now(),
                    data_path: &compare.data_path,
                    score_threshold: settings.score_threshold,
                    total_keep: partition.total_keep(),
                    total_delete: partition.total_delete(),
                    cameras: &partition,
                };
                fs::write(&report_path, serde_json::to_string_pretty(&report)?)
                    .with_context(|| format!("Failed to write report {:?}", report_path))?;
                println!("\n✅ Wrote report to {}", report_path.display());
            }
        }

        Commands::Copy {
            compare,
            output_path,
            dry_run,
        } => {
            println!("▶ Copying unique frames from: {}", compare.data_path.display());
            let settings = compare.settings()?;
            let partition = find_redundant_frames(&compare.data_path, &settings)?;
            print_totals(&partition);

            if dry_run {
                for (_, camera) in partition.cameras() {
                    for frame in &camera.keep {
                        println!("   📦 [dry-run] COPY {} → {}", frame, output_path.display());
                    }
                }
                println!("\n⚠️  Dry-run only; no files were changed.");
                return Ok(());
            }

            let copied = benchmark("copying unique frames", || {
                copy_frames_parallel(
                    &partition.keep_map(),
                    &compare.data_path,
                    &output_path,
                    settings.worker_count(),
                )
            })
            .context("Failed to copy unique frames")?;
            println!("\n✅ Copied {} frame(s) to {}", copied, output_path.display());
        }

        Commands::Delete { compare, yes } => {
            println!("▶ Deleting redundant frames in: {}", compare.data_path.display());
            let settings = compare.settings()?;
            let partition = find_redundant_frames(&compare.data_path, &settings)?;
            print_totals(&partition);

            if partition.total_delete() == 0 {
                println!("No redundant frames found.");
                return Ok(());
            }

            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!(
                        "Permanently delete {} frame(s)?",
                        partition.total_delete()
                    ))
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("Aborted; no files were changed.");
                return Ok(());
            }

            let removed = remove_frames(&partition.delete_map(), &compare.data_path)
                .context("Failed to delete redundant frames")?;
            println!("\n✅ Deleted {} frame(s)", removed);
        }
    }

    Ok(())
}

/// List the frames in `dir` grouped by camera, behind a spinner.
fn discover_frames(dir: &Path) -> Result<FramesByCamera> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning for frames…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let frames = load_frames(dir).with_context(|| format!("Failed to list frames in {:?}", dir));
    spinner.finish_with_message("Scan complete");
    frames
}

/// Discover, compare and partition every camera in `dir`.
fn find_redundant_frames(dir: &Path, settings: &Settings) -> Result<GlobalPartition> {
    let frames = benchmark("discovering frames", || discover_frames(dir))?;
    let total_frames: usize = frames.values().map(Vec::len).sum();
    let total_pairs: usize = frames.values().map(|f| f.len().saturating_sub(1)).sum();
    println!(
        "▶ Comparing {} frame(s) from {} camera(s)…",
        total_frames,
        frames.len()
    );

    let bar = ProgressBar::new(total_pairs as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} pairs [{elapsed_precise}] {msg}",
    )?);
    let reporter = bar.clone();

    let coordinator = Coordinator::new(settings).with_progress(Box::new(move |p: PairProgress| {
        reporter.set_message(p.camera_id);
        reporter.inc(1);
    }));

    let result = benchmark("comparing frames", || {
        coordinator.run(&frames, &DiskFrames::new(dir))
    });
    match result {
        Ok(partition) => {
            bar.finish_with_message("done");
            Ok(partition)
        }
        Err(e) => {
            bar.abandon_with_message("failed");
            Err(anyhow::Error::new(e).context("Frame comparison failed; no files were changed"))
        }
    }
}

fn print_totals(partition: &GlobalPartition) {
    println!(
        "\nFound {} distinct and {} redundant frame(s) across {} camera(s).",
        partition.total_keep(),
        partition.total_delete(),
        partition.camera_count()
    );
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::info!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
