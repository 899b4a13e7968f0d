//! artifact-eval CLI - full-reference distortion analysis tool

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// Blocking-artifact and region analysis for reference / distorted image pairs.
#[derive(Parser)]
#[command(name = "artifact-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect blocking artifacts in one image pair
    Blocking {
        /// Reference image
        reference: PathBuf,

        /// Distorted image
        distorted: PathBuf,

        /// Output artifact mask (PNG)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output reference image with artifacts painted red (PNG)
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Output per-pixel max RGB difference (PNG)
        #[arg(long)]
        diff: Option<PathBuf>,

        /// Output JSON report
        #[arg(long)]
        json: Option<PathBuf>,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write flat / mid / detail masks for one image
    Regions {
        /// Input image
        image: PathBuf,

        /// Directory for the mask PNGs
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Vote masks onto a block grid (size from the config)
        #[arg(long)]
        blocks: bool,

        /// Block grid size, overriding the config; implies --blocks
        #[arg(long)]
        block_size: Option<usize>,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Analyse every distorted image in a directory against its reference
    Batch {
        /// Directory of reference images
        reference_dir: PathBuf,

        /// Directory of distorted images
        distorted_dir: PathBuf,

        /// Output CSV file
        #[arg(long)]
        csv: PathBuf,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Blocking {
            reference,
            distorted,
            output,
            overlay,
            diff,
            json,
            config,
        } => {
            commands::blocking::run(
                &reference,
                &distorted,
                &commands::blocking::Outputs {
                    mask: output,
                    overlay,
                    diff,
                    json,
                },
                config.as_deref(),
                cli.verbose,
            )
        }
        Commands::Regions {
            image,
            out_dir,
            blocks,
            block_size,
            config,
        } => commands::regions::run(
            &image,
            out_dir.as_deref(),
            &commands::regions::Grid { blocks, block_size },
            config.as_deref(),
            cli.verbose,
        ),
        Commands::Batch {
            reference_dir,
            distorted_dir,
            csv,
            config,
        } => commands::batch::run(
            &reference_dir,
            &distorted_dir,
            &csv,
            config.as_deref(),
            cli.verbose,
        ),
        Commands::Config => commands::config::run(),
    }
}
