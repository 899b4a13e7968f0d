//! Masked difference scores driven by region masks.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::{LuminanceField, MASK_ON, Mask, ensure_non_empty, ensure_same_size};
use crate::regions::gradient::GradientFieldBuilder;
use crate::regions::percentile::RegionMasks;
use crate::stats::{mean, percentile_sorted, sort_floats};

/// Mean and tail of a set of per-pixel values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskedScore {
    pub mean: f64,
    pub p95: f64,
    /// Number of pixels that contributed.
    pub count: usize,
}

impl MaskedScore {
    fn from_values(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        sort_floats(&mut values);
        Self {
            mean: mean(&values),
            p95: percentile_sorted(&values, 0.95),
            count: values.len(),
        }
    }
}

fn masked_values(mask: &Mask, values: impl Iterator<Item = f64>) -> Vec<f64> {
    mask.pixels()
        .zip(values)
        .filter(|&(m, _)| m == MASK_ON)
        .map(|(_, v)| v)
        .collect()
}

/// Absolute difference `|ref - dist|` over flat pixels.
///
/// Isolated spikes in otherwise smooth areas show up here first.
pub fn impulse_score(
    reference: &LuminanceField,
    distorted: &LuminanceField,
    masks: &RegionMasks,
) -> Result<MaskedScore> {
    ensure_non_empty(reference, "reference")?;
    ensure_same_size(reference, distorted)?;
    ensure_same_size(reference, &masks.flat)?;

    let diffs = reference
        .pixels()
        .zip(distorted.pixels())
        .map(|(r, d)| f64::from((r - d).abs()));
    Ok(MaskedScore::from_values(masked_values(&masks.flat, diffs)))
}

/// Gradient loss `max(0, gRef - gDist)` over detail pixels.
///
/// The distorted gradient is built with `builder`, which should match the
/// one that produced `masks.gradient`.
pub fn blur_score(
    reference: &LuminanceField,
    distorted: &LuminanceField,
    masks: &RegionMasks,
    builder: &GradientFieldBuilder,
) -> Result<MaskedScore> {
    ensure_non_empty(reference, "reference")?;
    ensure_same_size(reference, distorted)?;
    ensure_same_size(reference, &masks.gradient)?;

    let dist_grad = builder.build(distorted)?;
    let loss = masks
        .gradient
        .pixels()
        .zip(dist_grad.pixels())
        .map(|(r, d)| f64::from((r - d).max(0.0)));
    Ok(MaskedScore::from_values(masked_values(&masks.detail, loss)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::gradient::gaussian_blur3;
    use crate::regions::percentile::{PixelwiseRegionProvider, RegionProvider};
    use imgref::ImgVec;

    /// Flat left half, 2-pixel stripes on the right.
    fn textured(w: usize, h: usize) -> LuminanceField {
        let value = move |x: usize, y: usize| {
            if x < w / 2 {
                40.0
            } else if ((x / 2) + y) % 2 == 0 {
                20.0
            } else {
                80.0
            }
        };
        let data = (0..h).flat_map(|y| (0..w).map(move |x| value(x, y))).collect();
        ImgVec::new(data, w, h)
    }

    #[test]
    fn test_identical_images_score_zero() {
        let lum = textured(24, 24);
        let masks = PixelwiseRegionProvider::default().compute_regions(&lum).unwrap();
        let imp = impulse_score(&lum, &lum, &masks).unwrap();
        assert_eq!(imp.mean, 0.0);
        assert!(imp.count > 0);
        let blur = blur_score(&lum, &lum, &masks, &GradientFieldBuilder::default()).unwrap();
        assert_eq!(blur.mean, 0.0);
        assert_eq!(blur.p95, 0.0);
    }

    #[test]
    fn test_impulse_on_flat_area() {
        let lum = textured(24, 24);
        let masks = PixelwiseRegionProvider::default().compute_regions(&lum).unwrap();
        let mut dist = lum.clone();
        dist[(3usize, 3usize)] += 30.0;
        let imp = impulse_score(&lum, &dist, &masks).unwrap();
        assert!(imp.mean > 0.0);
        assert!(imp.p95 <= 30.0);
    }

    #[test]
    fn test_blur_reduces_detail() {
        let lum = textured(24, 24);
        let masks = PixelwiseRegionProvider::default().compute_regions(&lum).unwrap();
        let blurred = gaussian_blur3(&gaussian_blur3(&lum, 2.0), 2.0);
        let blur = blur_score(&lum, &blurred, &masks, &GradientFieldBuilder::default()).unwrap();
        assert!(blur.count > 0);
        assert!(blur.mean > 0.0);
    }

    #[test]
    fn test_empty_mask_yields_zero() {
        assert_eq!(MaskedScore::from_values(Vec::new()), MaskedScore::default());
    }
}
