//! Subcommand implementations.

pub mod batch;
pub mod blocking;
pub mod config;
pub mod regions;

use std::path::Path;

use anyhow::{Context, Result};
use artifact_eval::{AnalysisConfig, LabImage, decode};
use imgref::ImgVec;
use rgb::RGB8;

/// Load a config file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::from_json_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Decode an image and convert it to Lab planes.
pub fn load_lab(path: &Path) -> Result<(ImgVec<RGB8>, LabImage)> {
    let rgb = decode::load_image(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let lab = LabImage::from_rgb8(&rgb);
    Ok((rgb, lab))
}
