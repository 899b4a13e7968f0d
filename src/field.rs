//! Plane types shared by every analysis stage.
//!
//! A [`LuminanceField`] is one float channel of a perceptual color space
//! (L* in 0-100 for the Lab pipeline). A [`Mask`] is an 8-bit plane whose
//! pixels are either 0 or 255.

use imgref::ImgVec;

use crate::error::{Error, Result};

/// Dense 2D grid of luminance (or any single-channel) samples.
pub type LuminanceField = ImgVec<f32>;

/// Non-negative gradient magnitudes derived from a [`LuminanceField`].
pub type GradientField = ImgVec<f32>;

/// Binary mask, one byte per pixel, values restricted to {0, 255}.
pub type Mask = ImgVec<u8>;

/// Value written to set mask pixels.
pub const MASK_ON: u8 = 255;

/// Create an all-zero mask.
#[must_use]
pub fn empty_mask(width: usize, height: usize) -> Mask {
    ImgVec::new(vec![0; width * height], width, height)
}

/// Create a zero-filled float plane.
#[must_use]
pub fn zero_field(width: usize, height: usize) -> LuminanceField {
    ImgVec::new(vec![0.0; width * height], width, height)
}

/// Build a field from row-major samples.
///
/// # Errors
///
/// Returns an error if either dimension is zero or
/// `data.len() != width * height`.
pub fn field_from_vec(data: Vec<f32>, width: usize, height: usize) -> Result<LuminanceField> {
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage(format!("{width}x{height} field")));
    }
    if data.len() != width * height {
        return Err(Error::InvalidParameter {
            name: "data",
            reason: format!(
                "expected {} samples for {width}x{height}, got {}",
                width * height,
                data.len()
            ),
        });
    }
    Ok(ImgVec::new(data, width, height))
}

/// Dimensions of an image as `(width, height)`.
#[inline]
pub fn dims<T>(img: &ImgVec<T>) -> (usize, usize) {
    (img.width(), img.height())
}

/// Fail with [`Error::EmptyImage`] if the image has no pixels.
pub fn ensure_non_empty<T>(img: &ImgVec<T>, what: &str) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(Error::EmptyImage(what.to_string()));
    }
    Ok(())
}

/// Fail with [`Error::DimensionMismatch`] unless both images share a size.
pub fn ensure_same_size<A, B>(expected: &ImgVec<A>, actual: &ImgVec<B>) -> Result<()> {
    if dims(expected) != dims(actual) {
        return Err(Error::DimensionMismatch {
            expected: dims(expected),
            actual: dims(actual),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_vec_length_check() {
        assert!(field_from_vec(vec![0.0; 6], 3, 2).is_ok());
        let err = field_from_vec(vec![0.0; 5], 3, 2);
        assert!(matches!(err, Err(Error::InvalidParameter { name: "data", .. })));
    }

    #[test]
    fn test_ensure_same_size() {
        let a = zero_field(4, 3);
        let b = empty_mask(4, 3);
        let c = empty_mask(3, 4);
        assert!(ensure_same_size(&a, &b).is_ok());
        match ensure_same_size(&a, &c) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, (4, 3));
                assert_eq!(actual, (3, 4));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_ensure_non_empty() {
        assert!(ensure_non_empty(&zero_field(1, 1), "field").is_ok());
        assert!(matches!(
            field_from_vec(vec![], 0, 5),
            Err(Error::EmptyImage(_))
        ));
    }
}
