//! Batch processing command for multiple RIB files.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use ribex_core::models::document::mime_for_extension;
use ribex_core::ExtractedRecord;

use crate::output::{format_records, OutputFormat};
use crate::worker::{needs_ocr, Worker};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Number of documents processed concurrently
    #[arg(short = 'j', long, default_value = "1")]
    jobs: usize,

    /// Ask the vision model instead of running OCR
    #[arg(long)]
    vision: bool,

    /// Print success and failure counts when done
    #[arg(long)]
    summary: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .and_then(mime_for_extension)
                .is_some()
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let ocr = files.iter().any(|f| needs_ocr(f));
    let worker = Arc::new(Worker::new(&config, args.vision, ocr)?);
    let jobs = args.jobs.max(1);
    info!("Processing {} files with {} workers", files.len(), jobs);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // `buffered` keeps input order regardless of completion order
    let records: Vec<ExtractedRecord> = stream::iter(files)
        .map(|path| {
            let worker = Arc::clone(&worker);
            let pb = pb.clone();
            async move {
                let record = worker.run_path(&path).await;
                debug!("{} -> {}", path.display(), record.status());
                pb.inc(1);
                record
            }
        })
        .buffered(jobs)
        .collect()
        .await;

    pb.finish_and_clear();

    let output = format_records(&records, args.format)?;
    if let Some(output_path) = &args.output {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.summary {
        print_summary(&records, start);
    }

    Ok(())
}

fn print_summary(records: &[ExtractedRecord], start: Instant) {
    let failed: Vec<&ExtractedRecord> = records.iter().filter(|r| !r.is_ok()).collect();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        records.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(records.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for record in failed {
            eprintln!("  - {}: {}", record.source_name, record.status());
        }
    }
}
