//! Utilities for 8-bit masks.

use imgref::ImgVec;
use rgb::RGB8;

use crate::error::Result;
use crate::field::{Mask, ensure_same_size};

/// Count pixels whose value is non-zero.
#[must_use]
pub fn count_set(mask: &Mask) -> usize {
    count_above(mask, 0)
}

/// Count pixels whose value is strictly greater than `threshold`.
#[must_use]
pub fn count_above(mask: &Mask, threshold: u8) -> usize {
    mask.rows()
        .map(|row| row.iter().filter(|&&v| v > threshold).count())
        .sum()
}

/// Fraction of set pixels (0.0 for an empty mask).
#[must_use]
pub fn coverage(mask: &Mask) -> f64 {
    let total = mask.width() * mask.height();
    if total == 0 {
        0.0
    } else {
        count_set(mask) as f64 / total as f64
    }
}

/// Per-pixel maximum absolute channel difference of two RGB8 images.
///
/// # Errors
///
/// Returns an error if the images differ in size.
pub fn channel_max_diff(a: &ImgVec<RGB8>, b: &ImgVec<RGB8>) -> Result<Mask> {
    ensure_same_size(a, b)?;
    let mut out = Vec::with_capacity(a.width() * a.height());
    for (ra, rb) in a.rows().zip(b.rows()) {
        out.extend(ra.iter().zip(rb).map(|(p, q)| {
            let dr = p.r.abs_diff(q.r);
            let dg = p.g.abs_diff(q.g);
            let db = p.b.abs_diff(q.b);
            dr.max(dg).max(db)
        }));
    }
    Ok(ImgVec::new(out, a.width(), a.height()))
}

/// Paint every masked pixel of `image` with `color`.
///
/// # Errors
///
/// Returns an error if the mask and image differ in size.
pub fn overlay(image: &ImgVec<RGB8>, mask: &Mask, color: RGB8) -> Result<ImgVec<RGB8>> {
    ensure_same_size(image, mask)?;
    let mut out = Vec::with_capacity(image.width() * image.height());
    for (irow, mrow) in image.rows().zip(mask.rows()) {
        out.extend(
            irow.iter()
                .zip(mrow)
                .map(|(&px, &m)| if m != 0 { color } else { px }),
        );
    }
    Ok(ImgVec::new(out, image.width(), image.height()))
}
