//! No-reference blocking strength.
//!
//! Measures how much larger the luma and chroma steps across codec block
//! boundaries are than the steps inside blocks, restricted to flat luma
//! areas where a boundary step cannot be explained by texture. An image
//! without blocking has a boundary-to-inner ratio near 1; the reported
//! strength is the weighted ratio above that baseline.

use imgref::ImgVec;
use log::debug;
use rgb::RGB8;
use serde::{Deserialize, Serialize};

use crate::color::{YCrCbImage, unit_plane};
use crate::config::StrengthConfig;
use crate::error::{Error, Result};
use crate::field::{
    LuminanceField, MASK_ON, Mask, empty_mask, ensure_non_empty, ensure_same_size,
};
use crate::regions::gradient::neighbours;
use crate::stats::RunningStats;

/// Floor for the inner-step mean, so perfectly smooth blocks do not divide by
/// zero.
const MIN_INNER_MEAN: f64 = 1e-6;

/// Result of [`blocking_strength`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockingStrength {
    /// Weighted boundary ratio above the baseline, never negative.
    pub strength: f64,
    /// Boundary-to-inner ratio of the Y, Cr and Cb planes.
    pub ratios: [f64; 3],
    /// Weight of each plane in the combined score.
    pub weights: [f64; 3],
}

impl Default for BlockingStrength {
    fn default() -> Self {
        Self {
            strength: 0.0,
            ratios: [1.0; 3],
            weights: [1.0, 0.0, 0.0],
        }
    }
}

/// Mark pixels whose 3x3 diagonal Laplacian magnitude is below `threshold`.
///
/// The kernel is `[[2, 0, 2], [0, -8, 0], [2, 0, 2]]` with mirrored borders.
#[must_use]
pub fn flat_mask(luma: &LuminanceField, threshold: f32) -> Mask {
    let (w, h) = (luma.width(), luma.height());
    let mut out = empty_mask(w, h);
    for y in 0..h {
        let [u, _, d] = neighbours(y, h);
        for x in 0..w {
            let [l, _, r] = neighbours(x, w);
            let corners = luma[(l, u)] + luma[(r, u)] + luma[(l, d)] + luma[(r, d)];
            let lap = 2.0 * corners - 8.0 * luma[(x, y)];
            if lap.abs() < threshold {
                out[(x, y)] = MASK_ON;
            }
        }
    }
    out
}

/// Mean absolute step across block boundaries divided by the mean step
/// inside blocks, averaged over both axes.
///
/// Only steps starting on a pixel set in `flat` are counted. Planes smaller
/// than two blocks in either direction give 1.
///
/// # Errors
///
/// Returns an error for a zero block size or a mask of a different size.
pub fn boundary_ratio(
    plane: &LuminanceField,
    block_size: usize,
    flat: Option<&Mask>,
) -> Result<f64> {
    if block_size == 0 {
        return Err(Error::InvalidParameter {
            name: "block_size",
            reason: "must be at least 1".to_string(),
        });
    }
    if let Some(flat) = flat {
        ensure_same_size(plane, flat)?;
    }

    let (w, h) = (plane.width(), plane.height());
    if w < 2 * block_size || h < 2 * block_size {
        return Ok(1.0);
    }
    let is_flat = |x: usize, y: usize| flat.is_none_or(|m| m[(x, y)] != 0);
    let step = |a: f32, b: f32| f64::from((a - b).abs());

    let mut boundary = RunningStats::new();
    let mut inner = RunningStats::new();
    for y in 0..h {
        for x in (block_size..w - 1).step_by(block_size) {
            if is_flat(x - 1, y) {
                boundary.push(step(plane[(x, y)], plane[(x - 1, y)]));
            }
        }
        for x in (1..w - 1).filter(|x| x % block_size != 0) {
            if is_flat(x, y) {
                inner.push(step(plane[(x + 1, y)], plane[(x, y)]));
            }
        }
    }
    let ratio_x = boundary.mean() / inner.mean().max(MIN_INNER_MEAN);

    let mut boundary = RunningStats::new();
    let mut inner = RunningStats::new();
    for x in 0..w {
        for y in (block_size..h - 1).step_by(block_size) {
            if is_flat(x, y - 1) {
                boundary.push(step(plane[(x, y)], plane[(x, y - 1)]));
            }
        }
        for y in (1..h - 1).filter(|y| y % block_size != 0) {
            if is_flat(x, y) {
                inner.push(step(plane[(x, y + 1)], plane[(x, y)]));
            }
        }
    }
    let ratio_y = boundary.mean() / inner.mean().max(MIN_INNER_MEAN);

    Ok(0.5 * (ratio_x + ratio_y))
}

/// Weight of a chroma plane with the given 8-bit value range.
#[must_use]
pub fn chroma_weight(range: f64, config: &StrengthConfig) -> f64 {
    if range < config.min_chroma_range {
        0.0
    } else {
        (range / config.full_weight_range).min(1.0)
    }
}

fn value_range(plane: &ImgVec<u8>) -> f64 {
    let (lo, hi) = plane
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    f64::from(hi.saturating_sub(lo))
}

/// Score blocking in a single decoded image.
///
/// Luma always has weight 1. Each chroma plane is weighted by its value
/// range so that near-gray images are judged on luma alone.
///
/// # Errors
///
/// Returns an error for an invalid config or an empty image.
pub fn blocking_strength(
    image: &ImgVec<RGB8>,
    config: &StrengthConfig,
) -> Result<BlockingStrength> {
    config.validate()?;
    ensure_non_empty(image, "image")?;

    let ycc = YCrCbImage::from_rgb8(image);
    let luma = unit_plane(&ycc.y);
    let flat = flat_mask(&luma, config.flat_laplacian);

    let mut ratios = [0.0; 3];
    let mut weights = [1.0, 0.0, 0.0];
    for (i, plane) in ycc.planes().into_iter().enumerate() {
        ratios[i] = if i == 0 {
            boundary_ratio(&luma, config.block_size, Some(&flat))?
        } else {
            weights[i] = chroma_weight(value_range(plane), config);
            boundary_ratio(&unit_plane(plane), config.block_size, Some(&flat))?
        };
    }

    let total: f64 = weights.iter().sum();
    let weighted =
        ratios.iter().zip(&weights).map(|(r, w)| r * w).sum::<f64>() / (total + 1e-12);
    let strength = (weighted - config.baseline).max(0.0);
    debug!("blocking strength {strength:.4} (ratios {ratios:?}, weights {weights:?})");

    Ok(BlockingStrength {
        strength,
        ratios,
        weights,
    })
}
