//! Single-pair blocking detection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use artifact_eval::mask::{channel_max_diff, overlay};
use artifact_eval::{
    AnalysisConfig, BlockingAnalysis, BlockingReport, blocking_strength, decode, detect_blocking,
    lab_mse, lab_shift,
};
use imgref::ImgVec;
use rgb::RGB8;

use super::{load_config, load_lab};

const OVERLAY_COLOR: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

/// Optional output files.
pub struct Outputs {
    pub mask: Option<PathBuf>,
    pub overlay: Option<PathBuf>,
    pub diff: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// Everything produced for one pair.
pub struct PairOutput {
    pub report: BlockingReport,
    pub analysis: BlockingAnalysis,
    pub reference: ImgVec<RGB8>,
    pub distorted: ImgVec<RGB8>,
}

/// Analyse one pair and build its report.
pub fn analyse_pair(
    reference: &Path,
    distorted: &Path,
    config: &AnalysisConfig,
) -> Result<PairOutput> {
    let (ref_rgb, ref_lab) = load_lab(reference)?;
    let (dist_rgb, dist_lab) = load_lab(distorted)?;
    ensure!(
        (ref_lab.width(), ref_lab.height()) == (dist_lab.width(), dist_lab.height()),
        "Size mismatch: {} is {}x{}, {} is {}x{}",
        reference.display(),
        ref_lab.width(),
        ref_lab.height(),
        distorted.display(),
        dist_lab.width(),
        dist_lab.height()
    );

    let analysis = detect_blocking(&ref_lab, &dist_lab, &config.blocking)
        .with_context(|| format!("Blocking detection failed for {}", distorted.display()))?;
    let mse = lab_mse(&ref_lab, &dist_lab)?;
    let shift = lab_shift(&ref_lab, &dist_lab)?;
    let strength = blocking_strength(&dist_rgb, &config.strength)
        .with_context(|| format!("Blocking strength failed for {}", distorted.display()))?;

    let name = |p: &Path| {
        p.file_name()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
    };
    let report = BlockingReport::new(name(reference), name(distorted), &analysis, &config.blocking)
        .with_lab_mse(mse)
        .with_blocking_strength(strength)
        .with_lab_shift(shift);
    Ok(PairOutput {
        report,
        analysis,
        reference: ref_rgb,
        distorted: dist_rgb,
    })
}

pub fn run(
    reference: &Path,
    distorted: &Path,
    outputs: &Outputs,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config)?;
    if verbose {
        eprintln!("Comparing {} against {}", distorted.display(), reference.display());
    }

    let PairOutput {
        report,
        analysis,
        reference: ref_rgb,
        distorted: dist_rgb,
    } = analyse_pair(reference, distorted, &config)?;

    println!("{} vs {}", report.distorted, report.reference);
    println!("  Size: {}x{}", report.width, report.height);
    println!("  Candidate pixels: {}", report.candidate_pixels);
    println!("  Regions: {}", report.region_count);
    println!(
        "  Artifacts: {} ({} px, {:.2}%)",
        report.artifacts.len(),
        report.artifact_pixels,
        report.artifact_fraction * 100.0
    );
    if let Some(mse) = report.lab_mse {
        println!("  MSE L/a/b: {:.3} / {:.3} / {:.3}", mse.l, mse.a, mse.b);
    }
    if let Some(strength) = report.blocking_strength {
        println!(
            "  Blocking strength: {:.4} (Y/Cr/Cb ratio {:.3} / {:.3} / {:.3})",
            strength.strength, strength.ratios[0], strength.ratios[1], strength.ratios[2]
        );
    }
    if let Some(shift) = report.lab_shift {
        println!(
            "  Lab shift: L {:.3}x{:+.3}, a {:.3}x{:+.3}, b {:.3}x{:+.3}",
            shift.l.slope,
            shift.l.offset,
            shift.a.slope,
            shift.a.offset,
            shift.b.slope,
            shift.b.offset
        );
    }

    if let Some(path) = &outputs.mask {
        decode::save_mask_png(&analysis.mask, path)
            .with_context(|| format!("Failed to write mask to {}", path.display()))?;
        println!("Saved mask to: {}", path.display());
    }

    if let Some(path) = &outputs.overlay {
        let painted = overlay(&ref_rgb, &analysis.mask, OVERLAY_COLOR)?;
        decode::save_rgb_png(&painted, path)
            .with_context(|| format!("Failed to write overlay to {}", path.display()))?;
        println!("Saved overlay to: {}", path.display());
    }

    if let Some(path) = &outputs.diff {
        let diff = channel_max_diff(&ref_rgb, &dist_rgb)?;
        decode::save_mask_png(&diff, path)
            .with_context(|| format!("Failed to write difference map to {}", path.display()))?;
        println!("Saved difference map to: {}", path.display());
    }

    if let Some(path) = &outputs.json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Saved report to: {}", path.display());
    }

    Ok(())
}
