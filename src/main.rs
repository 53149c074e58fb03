use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use restyle::imaging::RustBackend;
use restyle::types::{ProgressStatus, ProgressUpdate};
use restyle::{batch, config, logging, main_image, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "restyle")]
#[command(version)]
#[command(about = "Batch image restyling with reproducible anti-dedup perturbations")]
#[command(long_about = "\
Batch image restyling with reproducible anti-dedup perturbations

Every source image is fitted to a fixed aspect ratio and minimum size,
optionally framed, then optionally perturbed so that near-identical images
stop matching in duplicate detectors.

Pipeline per image:

  load (EXIF orientation) → style (contain | cover, border, overlay)
    → anti-dedup (mirror, color jitter, noise, rotation, watermarks, texture)
    → save (JPEG or PNG by extension)

A job is described by one TOML file. Relative paths in it resolve against
the file's directory. Set random_seed to make a run reproducible.

Run 'restyle gen-config' to generate a documented job file.")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// A job file argument shared by commands that read one.
#[derive(clap::Args, Clone)]
struct JobArgs {
    /// Path to the TOML job file
    job: PathBuf,
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Override random_seed from the job file
    #[arg(long)]
    seed: Option<u64>,

    /// Override max_workers from the job file
    #[arg(long)]
    workers: Option<usize>,

    /// Override output.output_dir from the job file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the full batch result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Process every source image of a job
    Run(RunArgs),
    /// List sources and their planned destinations without writing anything
    Scan(JobArgs),
    /// Load and validate a job file
    Check(JobArgs),
    /// Print a stock job file with all options documented
    GenConfig,
    /// Make each subfolder's main image square and at least SIZE pixels wide
    EnsureMain {
        /// Folder whose immediate subfolders are inspected
        dir: PathBuf,

        /// Minimum edge length of a compliant main image
        #[arg(long, default_value_t = main_image::DEFAULT_TARGET_SIZE)]
        size: u32,

        /// File name of the main image inside each subfolder
        #[arg(long, default_value = main_image::DEFAULT_FILE_NAME)]
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    match cli.command {
        Command::Run(args) => {
            let mut job = config::load_config(&args.job.job)?;
            if let Some(seed) = args.seed {
                job.random_seed = Some(seed);
            }
            if let Some(workers) = args.workers {
                job.max_workers = workers;
            }
            if let Some(output_dir) = args.output {
                job.output.output_dir = output_dir;
            }
            job.validate()?;

            let style = ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
                )?
                .progress_chars("##-");
            let (tx, rx) = std::sync::mpsc::channel::<ProgressUpdate>();
            let printer = std::thread::spawn(move || {
                let bar = ProgressBar::new(0);
                bar.set_style(style);
                bar.set_message("scanning...");
                for update in rx {
                    bar.set_length(update.total as u64);
                    bar.set_position(update.completed as u64);
                    let message = update.message.unwrap_or_default();
                    match update.status {
                        ProgressStatus::Running => bar.set_message(message),
                        ProgressStatus::Finished => bar.finish_with_message(message),
                    }
                }
            });

            let result = batch::process_batch(&job, Some(tx));
            printer
                .join()
                .map_err(|_| "progress display thread panicked")?;
            let result = result?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_summary(&result);
            }
        }
        Command::Scan(args) => {
            let job = config::load_config(&args.job)?;
            let plan = batch::plan_batch(&job)?;
            output::print_plan(&plan, &job.output.output_dir);
        }
        Command::Check(args) => {
            println!("==> Checking {}", args.job.display());
            let job = config::load_config(&args.job)?;
            output::print_job(&job);
            println!("==> Job is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::EnsureMain { dir, size, name } => {
            if size == 0 {
                return Err("--size must be at least 1".into());
            }
            let stats = main_image::ensure_main_image_size(&RustBackend::new(), &dir, size, &name);
            println!("{}", output::format_adjustment_stats(&stats));
        }
    }

    Ok(())
}
