//! Process command - extract bank details from a single file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use ribex_core::models::document::mime_for_extension;

use crate::output::{format_records, OutputFormat};
use crate::worker::{needs_ocr, Worker};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, image or OCR text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Ask the vision model instead of running OCR
    #[arg(long)]
    vision: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if mime_for_extension(&extension).is_none() {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    let worker = Worker::new(&config, args.vision, needs_ocr(&args.input))?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(if args.vision { "Asking vision model..." } else { "Reading document..." });

    let record = worker.run_path(&args.input).await;
    pb.finish_and_clear();

    let output = format_records(std::slice::from_ref(&record), args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if !record.is_ok() {
        eprintln!("{} {}", style("✗").red(), record.status());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
