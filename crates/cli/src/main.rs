//! orderscan CLI
//!
//! Interactive tool that reads scanned service-order forms from a folder,
//! extracts their fields with Tesseract and keeps them in a spreadsheet
//! that can be listed and searched.
//!
//! Copyright (c) 2025 Michael A Wright

mod shell;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use form_pipeline::{Config, Pipeline};
use std::path::PathBuf;
use tracing::{debug, Level};

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nhost: ",
    env!("BUILT_HOST"),
    "\ntarget: ",
    env!("BUILT_TARGET"),
    " (",
    env!("BUILT_PROFILE"),
    ")",
    "\ncommit: ",
    env!("BUILT_GIT_COMMIT_HASH"),
    "\nbuilt: ",
    env!("BUILT_TIME_UTC"),
);

#[derive(Parser)]
#[command(name = "orderscan")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Digitize scanned service-order forms into a searchable spreadsheet", long_about = None)]
struct Cli {
    /// Config file (defaults to ./orderscan.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder containing form images
    #[arg(long)]
    images: Option<PathBuf>,

    /// Spreadsheet file holding the records
    #[arg(long)]
    store: Option<PathBuf>,

    /// Path to the tesseract executable
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// Log more detail to stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// Config file settings with command-line overrides applied
    fn resolve_config(&self) -> Result<Config> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let mut config = Config::discover(self.config.as_deref(), &cwd)?;

        if let Some(images) = &self.images {
            config.image_folder = images.clone();
        }
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(tesseract) = &self.tesseract {
            config.ocr.tesseract_cmd = tesseract.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they stay out of the menu
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();
    debug!(
        version = built_info::PKG_VERSION,
        target = built_info::TARGET,
        rustc = built_info::RUSTC_VERSION,
        "Starting"
    );

    let config = cli.resolve_config()?;
    let pipeline = Pipeline::new(config)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    shell::Shell::new(&pipeline, stdin.lock(), stdout.lock())
        .run()
        .context("Console I/O failed")
}
