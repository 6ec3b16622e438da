use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use gpxhr::config::AppConfig;
use gpxhr::export::{GpxOutput, OutputKind};
use gpxhr::generator::{SessionRequest, TrackGenerator};
use gpxhr::inspect;
use gpxhr::logging::init_logging;
use gpxhr::models::EndpointPolicy;
use gpxhr::noise::GaussianNoise;
use gpxhr::session::TimezonePolicy;
use gpxhr::{GpxHrError, TrackAnnotator};

/// gpxhr - synthetic heart-rate GPX tracks
///
/// Generates GPX sessions with simulated heart rate, or injects simulated
/// heart rate into an existing GPX track.
#[derive(Parser)]
#[command(name = "gpxhr")]
#[command(version)]
#[command(about = "Synthetic heart-rate GPX generator", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of log output (stderr)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic session
    Generate {
        /// Start date (YYYY-MM-DD), today if omitted
        #[arg(short, long)]
        date: Option<String>,

        /// Start time of day (HH:MM)
        #[arg(short, long)]
        time: Option<String>,

        /// Base heart rate in bpm
        #[arg(long)]
        hr: Option<i32>,

        /// Session length in minutes
        #[arg(short = 'm', long, allow_negative_numbers = true)]
        duration: Option<i64>,

        /// Interpret the start time as local to a zone this many minutes east of UTC
        #[arg(long, allow_negative_numbers = true, conflicts_with = "local")]
        utc_offset: Option<i32>,

        /// Interpret the start time in this machine's timezone
        #[arg(long)]
        local: bool,

        /// Do not emit a point for the final minute
        #[arg(long)]
        exclusive: bool,

        #[command(flatten)]
        common: RunArgs,
    },

    /// Add simulated heart rate to an existing GPX file
    Annotate {
        /// GPX file to read
        input: PathBuf,

        /// Base heart rate in bpm
        #[arg(long)]
        hr: Option<i32>,

        #[command(flatten)]
        common: RunArgs,
    },

    /// Summarize a GPX file
    Inspect {
        /// GPX file to read
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

/// Options shared by both pipelines
#[derive(Args)]
struct RunArgs {
    /// Smoothing factor in (0, 1]
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Seed for reproducible noise
    #[arg(long)]
    seed: Option<u64>,

    /// Write the document to this file instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "save")]
    output: Option<PathBuf>,

    /// Save under the default file name in the configured output directory
    #[arg(long)]
    save: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<GpxHrError>() {
                Some(gpx_err) => {
                    gpx_err.log();
                    gpx_err.user_message()
                }
                None => format!("{:#}", err),
            };
            eprintln!("{} {}", "error:".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    match cli.command {
        Commands::Generate {
            date,
            time,
            hr,
            duration,
            utc_offset,
            local,
            exclusive,
            common,
        } => {
            let mut settings = config.generator.settings();
            if let Some(minutes) = utc_offset {
                settings.timezone = TimezonePolicy::FixedOffset { minutes };
            } else if local {
                settings.timezone = TimezonePolicy::Local;
            }
            if exclusive {
                settings.endpoint = EndpointPolicy::Exclusive;
            }

            let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
            let request = SessionRequest::new(
                date,
                time.unwrap_or_else(|| config.generator.start_time.clone()),
                hr.unwrap_or(config.generator.base_hr),
                duration.unwrap_or(config.generator.duration_minutes as i64),
            )
            .with_alpha(common.alpha.unwrap_or(config.generator.alpha));

            let mut noise = GaussianNoise::from_seed_option(common.seed);
            let xml = TrackGenerator::new(settings).generate(&request, &mut noise)?;
            deliver(GpxOutput::new(OutputKind::Generated, xml), &common, &config)?;
        }

        Commands::Annotate { input, hr, common } => {
            let bytes = fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let annotator = TrackAnnotator::new(
                hr.unwrap_or(config.annotator.base_hr),
                common.alpha.unwrap_or(config.annotator.alpha),
            )?
            .with_noise_std_dev(config.annotator.noise_std_dev)?;

            let mut noise = GaussianNoise::from_seed_option(common.seed);
            let xml = annotator.annotate_bytes(&bytes, &mut noise)?;
            deliver(GpxOutput::new(OutputKind::Updated, xml), &common, &config)?;
        }

        Commands::Inspect { input, json } => {
            let xml = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let summary = inspect::summarize(&xml)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", input.display().to_string().bold());
                println!("  Tracks:      {}", summary.tracks);
                println!("  Segments:    {}", summary.segments);
                println!("  Points:      {}", summary.points);
                if let (Some(first), Some(last)) = (summary.first_time, summary.last_time) {
                    println!("  From:        {}", first.to_rfc3339());
                    println!("  To:          {}", last.to_rfc3339());
                }
                match (summary.min_heart_rate, summary.max_heart_rate) {
                    (Some(min), Some(max)) => println!(
                        "  Heart rate:  {} samples, {}-{} bpm",
                        summary.heart_rates, min, max
                    ),
                    _ => println!("  Heart rate:  {}", "none".dimmed()),
                }
            }
        }

        Commands::Config { init, show } => {
            if init {
                AppConfig::default().save_to_file(&config_path)?;
                eprintln!(
                    "{}",
                    format!("✓ Wrote default configuration to {}", config_path.display()).green()
                );
            }
            if show || !init {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Print the document, or write it where the user asked
fn deliver(output: GpxOutput, args: &RunArgs, config: &AppConfig) -> Result<()> {
    if let Some(path) = &args.output {
        output.write_to(path)?;
        eprintln!("{}", format!("✓ Saved {}", path.display()).green());
    } else if args.save {
        let path = output.save_in(&config.output.directory)?;
        eprintln!("{}", format!("✓ Saved {}", path.display()).green());
    } else {
        print!("{}", output.content);
    }
    Ok(())
}
