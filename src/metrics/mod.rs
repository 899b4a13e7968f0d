//! Global per-channel error metrics.
//!
//! - **MSE**: mean squared error of one plane, optionally weighted by a mask
//! - **PSNR**: peak signal-to-noise ratio derived from an MSE (higher is better)
//! - **Lab shift**: least-squares `distorted ~ slope * reference + offset` per
//!   Lab plane, exposing global brightness, contrast and tint changes
//!
//! For Lab planes the natural peak is [`LAB_L_MAX`](crate::color::LAB_L_MAX).

use serde::{Deserialize, Serialize};

use crate::color::{LAB_L_MAX, LabImage};
use crate::error::Result;
use crate::field::{LuminanceField, Mask, ensure_non_empty, ensure_same_size};

/// Squared error of each Lab plane and their mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabMse {
    pub l: f64,
    pub a: f64,
    pub b: f64,
    /// Mean of the three planes.
    pub mean: f64,
}

impl LabMse {
    /// PSNR of the L plane against the L* range.
    #[must_use]
    pub fn psnr_l(&self) -> f64 {
        psnr_from_mse(self.l, f64::from(LAB_L_MAX))
    }
}

/// Mean squared error of one plane.
///
/// With a mask, each pixel is weighted by `mask / 255`; a mask with no set
/// pixels gives 0.
///
/// # Errors
///
/// Returns an error if the planes (or the mask) differ in size or are empty.
pub fn channel_mse(
    reference: &LuminanceField,
    distorted: &LuminanceField,
    mask: Option<&Mask>,
) -> Result<f64> {
    ensure_non_empty(reference, "reference plane")?;
    ensure_same_size(reference, distorted)?;

    let sq = reference.pixels().zip(distorted.pixels()).map(|(r, d)| {
        let diff = f64::from(r) - f64::from(d);
        diff * diff
    });

    let Some(mask) = mask else {
        let n = (reference.width() * reference.height()) as f64;
        return Ok(sq.sum::<f64>() / n);
    };

    ensure_same_size(reference, mask)?;
    let (sum, weight) = sq
        .zip(mask.pixels())
        .fold((0.0, 0.0), |(s, w), (e, m)| {
            let m = f64::from(m) / 255.0;
            (s + e * m, w + m)
        });
    Ok(if weight > 0.0 { sum / weight } else { 0.0 })
}

/// MSE of each Lab plane.
///
/// # Errors
///
/// Returns an error if the images differ in size.
pub fn lab_mse(reference: &LabImage, distorted: &LabImage) -> Result<LabMse> {
    let l = channel_mse(&reference.l, &distorted.l, None)?;
    let a = channel_mse(&reference.a, &distorted.a, None)?;
    let b = channel_mse(&reference.b, &distorted.b, None)?;
    Ok(LabMse {
        l,
        a,
        b,
        mean: (l + a + b) / 3.0,
    })
}

/// PSNR in dB for a given MSE and peak value. Returns `f64::INFINITY` for a
/// zero MSE.
#[must_use]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    if mse <= 0.0 {
        f64::INFINITY
    } else {
        10.0 * (peak * peak / mse).log10()
    }
}

/// Least-squares line mapping reference values onto distorted values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub offset: f64,
}

impl Default for LinearFit {
    /// The identity mapping.
    fn default() -> Self {
        Self {
            slope: 1.0,
            offset: 0.0,
        }
    }
}

impl LinearFit {
    /// Apply the fit to a reference value.
    #[must_use]
    pub fn apply(&self, x: f64) -> f64 {
        self.slope * x + self.offset
    }
}

/// Fit `distorted ~ slope * reference + offset` over all pixels.
///
/// A constant reference plane has no defined slope; it gets slope 1 and
/// the difference of means as offset.
///
/// # Errors
///
/// Returns an error if the planes differ in size or are empty.
pub fn linear_fit(reference: &LuminanceField, distorted: &LuminanceField) -> Result<LinearFit> {
    ensure_non_empty(reference, "reference plane")?;
    ensure_same_size(reference, distorted)?;

    let n = (reference.width() * reference.height()) as f64;
    let (sx, sy) = reference
        .pixels()
        .zip(distorted.pixels())
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + f64::from(x), sy + f64::from(y)));
    let (mean_x, mean_y) = (sx / n, sy / n);

    let (num, den) = reference
        .pixels()
        .zip(distorted.pixels())
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = f64::from(x) - mean_x;
            (num + dx * (f64::from(y) - mean_y), den + dx * dx)
        });

    if den < 1e-12 {
        return Ok(LinearFit {
            slope: 1.0,
            offset: mean_y - mean_x,
        });
    }
    let slope = num / den;
    Ok(LinearFit {
        slope,
        offset: mean_y - slope * mean_x,
    })
}

/// Per-plane linear shift between two Lab images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabShift {
    pub l: LinearFit,
    pub a: LinearFit,
    pub b: LinearFit,
}

/// Fit a [`LinearFit`] to each Lab plane.
///
/// # Errors
///
/// Returns an error if the images differ in size or are empty.
pub fn lab_shift(reference: &LabImage, distorted: &LabImage) -> Result<LabShift> {
    Ok(LabShift {
        l: linear_fit(&reference.l, &distorted.l)?,
        a: linear_fit(&reference.a, &distorted.a)?,
        b: linear_fit(&reference.b, &distorted.b)?,
    })
}
