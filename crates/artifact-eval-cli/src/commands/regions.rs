//! Flat / mid / detail region masks for one image.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use artifact_eval::regions::{
    BlockRegionProvider, PixelwiseRegionProvider, RegionClass, RegionProvider,
};
use artifact_eval::{decode, mask};

use super::{load_config, load_lab};

/// Block-grid options from the command line.
pub struct Grid {
    pub blocks: bool,
    pub block_size: Option<usize>,
}

pub fn run(
    image: &Path,
    out_dir: Option<&Path>,
    grid: &Grid,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(size) = grid.block_size {
        config.block_size = size;
        config.validate().context("Invalid --block-size")?;
    }
    let (_, lab) = load_lab(image)?;

    let provider: Box<dyn RegionProvider> = if grid.blocks || grid.block_size.is_some() {
        Box::new(BlockRegionProvider::from_config(&config))
    } else {
        Box::new(PixelwiseRegionProvider::new(&config.regions))
    };
    if verbose {
        eprintln!("Computing regions for {} ({})", image.display(), provider.name());
    }

    let masks = provider
        .compute_regions(&lab.l)
        .with_context(|| format!("Region segmentation failed for {}", image.display()))?;

    println!(
        "{} ({}x{}, {})",
        image.display(),
        masks.width(),
        masks.height(),
        provider.name()
    );
    println!(
        "  Gradient thresholds: flat <= {:.4}, detail >= {:.4}",
        masks.flat_threshold, masks.detail_threshold
    );
    for class in [RegionClass::Flat, RegionClass::Mid, RegionClass::Detail] {
        let m = masks.mask(class);
        let pct = mask::coverage(m) * 100.0;
        println!("  {class}: {} px ({pct:.1}%)", mask::count_set(m));
    }

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let stem = image
            .file_stem()
            .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned());
        for class in [RegionClass::Flat, RegionClass::Mid, RegionClass::Detail] {
            let path = dir.join(format!("{stem}_{class}.png"));
            decode::save_mask_png(masks.mask(class), &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if verbose {
                eprintln!("Saved {}", path.display());
            }
        }
        println!("Saved masks to: {}", dir.display());
    }

    Ok(())
}
