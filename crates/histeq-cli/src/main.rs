mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "histeq",
    about = "Histogram equalization on a GPU or CPU compute device",
    version,
    ignore_errors = true
)]
pub struct Cli {
    /// Platform index (see -l)
    #[arg(short = 'p', long)]
    pub platform: Option<usize>,

    /// Device index within the platform
    #[arg(short = 'd', long)]
    pub device: Option<usize>,

    /// List all platforms and devices
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Input image file [default: test.pgm]
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Number of histogram bins, 1..=65536 [default: 256]
    #[arg(short = 'b', long = "bins")]
    pub bins: Option<usize>,

    /// Write the equalized image to this path
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Pipeline config file (TOML); explicit flags override it
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.list {
        commands::list::run();
    }

    let config = commands::config::resolve(&cli)?;
    commands::run::run(&config)
}
