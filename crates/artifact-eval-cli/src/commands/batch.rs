//! Directory batch analysis.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use artifact_eval::report::write_csv_file;
use artifact_eval::{CsvRow, Summary, discover_pairs};
use log::warn;
use rayon::prelude::*;

use super::blocking::analyse_pair;
use super::load_config;

pub fn run(
    reference_dir: &Path,
    distorted_dir: &Path,
    csv: &Path,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let pairs = discover_pairs(reference_dir, distorted_dir).with_context(|| {
        format!(
            "Failed to pair {} with {}",
            distorted_dir.display(),
            reference_dir.display()
        )
    })?;
    if pairs.is_empty() {
        bail!("No distorted images in {} match a reference", distorted_dir.display());
    }
    if verbose {
        eprintln!("Found {} pairs", pairs.len());
    }

    let done = AtomicUsize::new(0);
    let total = pairs.len();
    // pairs are independent
    let results: Vec<Result<CsvRow>> = pairs
        .par_iter()
        .map(|pair| {
            let row = analyse_pair(&pair.reference, &pair.distorted, &config)
                .map(|out| out.report.csv_row());
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if verbose {
                eprintln!("[{n}/{total}] {}", pair.distorted_name());
            }
            row
        })
        .collect();

    let mut rows = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (pair, result) in pairs.iter().zip(results) {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                failed += 1;
                warn!("skipping {}: {e:#}", pair.distorted.display());
            }
        }
    }

    write_csv_file(&rows, csv).with_context(|| format!("Failed to write {}", csv.display()))?;

    let flagged = rows.iter().filter(|r| r.artifacts > 0).count();
    println!("Analysed {} pairs ({failed} failed)", rows.len());
    println!("  With blocking artifacts: {flagged}");
    let fractions: Vec<f64> = rows.iter().map(|r| r.artifact_fraction * 100.0).collect();
    if let Some(summary) = Summary::compute(&fractions) {
        println!(
            "  Artifact coverage: mean {:.2}%, median {:.2}%, p95 {:.2}%, max {:.2}%",
            summary.mean, summary.median, summary.p95, summary.max
        );
    }
    println!("Saved CSV to: {}", csv.display());
    Ok(())
}
