//! Smoothed gradient-magnitude field.
//!
//! Pipeline: 3x3 Gaussian (σ≈1) → Sobel in x and y → `sqrt(gx²+gy²)` →
//! 3x3 Gaussian (σ≈0.8). Borders are mirrored without repeating the edge
//! sample (`dcb|abcd|cba`), so a constant field has zero gradient everywhere.

use imgref::ImgVec;

use crate::config::RegionConfig;
use crate::error::Result;
use crate::field::{GradientField, LuminanceField, ensure_non_empty};

type Kernel3 = [f32; 3];

const SOBEL_SMOOTH: Kernel3 = [1.0, 2.0, 1.0];
const SOBEL_DIFF: Kernel3 = [-1.0, 0.0, 1.0];

/// Normalised 3-tap Gaussian for the given sigma.
#[must_use]
pub fn gaussian_kernel3(sigma: f32) -> Kernel3 {
    let side = (-1.0 / (2.0 * sigma * sigma)).exp();
    let norm = 1.0 + 2.0 * side;
    [side / norm, 1.0 / norm, side / norm]
}

#[inline]
fn mirror(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    if i < 0 {
        (-i) as usize
    } else if i as usize >= n {
        2 * n - 2 - i as usize
    } else {
        i as usize
    }
}

/// Indices of `i - 1`, `i`, `i + 1`, mirrored at the edges without repeating
/// the edge sample.
#[inline]
pub(crate) fn neighbours(i: usize, n: usize) -> [usize; 3] {
    let i = i as isize;
    [mirror(i - 1, n), mirror(i, n), mirror(i + 1, n)]
}

/// Convolve with `kx` along rows then `ky` along columns.
fn separable3(src: &LuminanceField, kx: &Kernel3, ky: &Kernel3) -> LuminanceField {
    let (w, h) = (src.width(), src.height());
    let mut tmp = vec![0.0f32; w * h];
    for (y, row) in src.rows().enumerate() {
        let out = &mut tmp[y * w..(y + 1) * w];
        for (x, o) in out.iter_mut().enumerate() {
            let [l, c, r] = neighbours(x, w);
            *o = row[l] * kx[0] + row[c] * kx[1] + row[r] * kx[2];
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        let [u, c, d] = neighbours(y, h);
        let (ru, rc, rd) = (&tmp[u * w..][..w], &tmp[c * w..][..w], &tmp[d * w..][..w]);
        for x in 0..w {
            out[y * w + x] = ru[x] * ky[0] + rc[x] * ky[1] + rd[x] * ky[2];
        }
    }
    ImgVec::new(out, w, h)
}

/// 3x3 Gaussian blur.
#[must_use]
pub fn gaussian_blur3(src: &LuminanceField, sigma: f32) -> LuminanceField {
    let k = gaussian_kernel3(sigma);
    separable3(src, &k, &k)
}

/// Unsmoothed Sobel gradient magnitude.
#[must_use]
pub fn sobel_magnitude(src: &LuminanceField) -> GradientField {
    let gx = separable3(src, &SOBEL_DIFF, &SOBEL_SMOOTH);
    let gy = separable3(src, &SOBEL_SMOOTH, &SOBEL_DIFF);
    let mag: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(x, y)| (x * x + y * y).sqrt())
        .collect();
    ImgVec::new(mag, src.width(), src.height())
}

/// Builds a [`GradientField`] from a luminance plane.
#[derive(Debug, Clone, Copy)]
pub struct GradientFieldBuilder {
    pre_sigma: f32,
    post_sigma: f32,
}

impl Default for GradientFieldBuilder {
    fn default() -> Self {
        Self::from_config(&RegionConfig::default())
    }
}

impl GradientFieldBuilder {
    #[must_use]
    pub fn new(pre_sigma: f32, post_sigma: f32) -> Self {
        Self {
            pre_sigma,
            post_sigma,
        }
    }

    #[must_use]
    pub fn from_config(config: &RegionConfig) -> Self {
        Self::new(config.pre_sigma, config.post_sigma)
    }

    /// Compute the smoothed gradient magnitude of `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`](crate::Error::EmptyImage) for a field
    /// with no pixels.
    pub fn build(&self, field: &LuminanceField) -> Result<GradientField> {
        ensure_non_empty(field, "luminance field")?;
        let smoothed = gaussian_blur3(field, self.pre_sigma);
        let magnitude = sobel_magnitude(&smoothed);
        Ok(gaussian_blur3(&magnitude, self.post_sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize, slope: f32) -> LuminanceField {
        let data = (0..h)
            .flat_map(|_| (0..w).map(move |x| x as f32 * slope))
            .collect();
        ImgVec::new(data, w, h)
    }

    #[test]
    fn test_kernel_normalised() {
        for sigma in [0.5f32, 0.8, 1.0, 2.0] {
            let k = gaussian_kernel3(sigma);
            assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
            assert!(k[1] > k[0]);
        }
    }

    #[test]
    fn test_constant_field_has_zero_gradient() {
        let field = ImgVec::new(vec![42.0f32; 10 * 7], 10, 7);
        let grad = GradientFieldBuilder::default().build(&field).unwrap();
        assert_eq!((grad.width(), grad.height()), (10, 7));
        assert!(grad.pixels().all(|g| g.abs() < 1e-4));
    }

    #[test]
    fn test_horizontal_ramp_interior() {
        // Sobel of a unit ramp is 8 per pixel step in x, 0 in y
        let field = ramp(12, 12, 1.0);
        let mag = sobel_magnitude(&field);
        assert!((mag[(5usize, 5usize)] - 8.0).abs() < 1e-4);
        // mirrored border: left/right edge derivative cancels
        assert!(mag[(0usize, 5usize)].abs() < 1e-4);
    }

    #[test]
    fn test_gradient_nonnegative_and_localised() {
        let mut data = vec![0.0f32; 16 * 16];
        for y in 0..16 {
            for x in 8..16 {
                data[y * 16 + x] = 50.0;
            }
        }
        let field = ImgVec::new(data, 16, 16);
        let grad = GradientFieldBuilder::default().build(&field).unwrap();
        assert!(grad.pixels().all(|g| g >= 0.0));
        assert!(grad[(8usize, 8usize)] > grad[(2usize, 8usize)]);
        assert!(grad[(2usize, 8usize)] < 1e-3);
    }

    #[test]
    fn test_single_pixel_field() {
        let field = ImgVec::new(vec![3.0f32], 1, 1);
        let grad = GradientFieldBuilder::default().build(&field).unwrap();
        assert_eq!(grad.buf().len(), 1);
        assert!(grad.buf()[0].abs() < 1e-6);
    }
}
