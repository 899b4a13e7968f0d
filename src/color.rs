//! sRGB to CIE L*a*b* and 8-bit YCrCb conversion.
//!
//! The analysis stages operate on float planes in a perceptual space. This
//! module produces those planes from decoded 8-bit sRGB pixels: gamma decode,
//! linear RGB to XYZ under a D65 white point, then the CIE L*a*b* transfer.
//! L* is in 0-100, a*/b* roughly in -128..127.
//!
//! [`YCrCbImage`] is the codec-side view used by the blocking-strength score:
//! BT.601 luma and chroma computed directly on the gamma-encoded values.

use imgref::ImgVec;
use rgb::RGB8;

use crate::error::{Error, Result};
use crate::field::{LuminanceField, ensure_same_size};

/// Full-scale value of the L* channel.
pub const LAB_L_MAX: f32 = 100.0;

const SRGB_TO_XYZ: [f32; 9] = [
    0.412_453, 0.357_580, 0.180_423, // X
    0.212_671, 0.715_160, 0.072_169, // Y
    0.019_334, 0.119_193, 0.950_227, // Z
];

const D65_WHITE: [f32; 3] = [0.950_456, 1.0, 1.088_754];

const LAB_EPSILON: f32 = 0.008_856;
const LAB_KAPPA: f32 = 903.3;

/// sRGB gamma decoding (sRGB to linear RGB).
#[inline]
fn srgb_to_linear_f32(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert sRGB u8 to linear float.
#[inline]
fn srgb_u8_to_linear(v: u8) -> f32 {
    srgb_to_linear_f32(f32::from(v) / 255.0)
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Convert linear RGB to L*a*b*.
fn linear_rgb_to_lab(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let m = &SRGB_TO_XYZ;
    let x = (m[0] * r + m[1] * g + m[2] * b) / D65_WHITE[0];
    let y = (m[3] * r + m[4] * g + m[5] * b) / D65_WHITE[1];
    let z = (m[6] * r + m[7] * g + m[8] * b) / D65_WHITE[2];

    let l = if y > LAB_EPSILON {
        116.0 * y.cbrt() - 16.0
    } else {
        LAB_KAPPA * y
    };

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    (l, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert one sRGB8 pixel to `(L*, a*, b*)`.
#[must_use]
pub fn srgb8_to_lab(px: RGB8) -> (f32, f32, f32) {
    linear_rgb_to_lab(
        srgb_u8_to_linear(px.r),
        srgb_u8_to_linear(px.g),
        srgb_u8_to_linear(px.b),
    )
}

/// An image split into L*, a* and b* float planes.
#[derive(Debug, Clone)]
pub struct LabImage {
    /// Lightness, 0-100.
    pub l: LuminanceField,
    /// Green-red opponent axis.
    pub a: LuminanceField,
    /// Blue-yellow opponent axis.
    pub b: LuminanceField,
}

impl LabImage {
    /// Convert an sRGB8 image.
    #[must_use]
    pub fn from_rgb8(img: &ImgVec<RGB8>) -> Self {
        let (w, h) = (img.width(), img.height());
        let mut l = Vec::with_capacity(w * h);
        let mut a = Vec::with_capacity(w * h);
        let mut b = Vec::with_capacity(w * h);
        for row in img.rows() {
            for &px in row {
                let (lv, av, bv) = srgb8_to_lab(px);
                l.push(lv);
                a.push(av);
                b.push(bv);
            }
        }
        Self {
            l: ImgVec::new(l, w, h),
            a: ImgVec::new(a, w, h),
            b: ImgVec::new(b, w, h),
        }
    }

    /// Assemble from existing planes.
    ///
    /// # Errors
    ///
    /// Returns an error if the planes differ in size.
    pub fn from_planes(l: LuminanceField, a: LuminanceField, b: LuminanceField) -> Result<Self> {
        ensure_same_size(&l, &a)?;
        ensure_same_size(&l, &b)?;
        Ok(Self { l, a, b })
    }

    /// Build a Lab image from a lightness plane alone (a* = b* = 0).
    #[must_use]
    pub fn from_lightness(l: LuminanceField) -> Self {
        let (w, h) = (l.width(), l.height());
        Self {
            l,
            a: ImgVec::new(vec![0.0; w * h], w, h),
            b: ImgVec::new(vec![0.0; w * h], w, h),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.l.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.l.height()
    }

    /// The three planes in L, a, b order.
    #[must_use]
    pub fn planes(&self) -> [&LuminanceField; 3] {
        [&self.l, &self.a, &self.b]
    }

    /// Plane by channel index (0 = L, 1 = a, 2 = b).
    ///
    /// # Errors
    ///
    /// Returns an error for an index above 2.
    pub fn channel(&self, index: usize) -> Result<&LuminanceField> {
        match index {
            0 => Ok(&self.l),
            1 => Ok(&self.a),
            2 => Ok(&self.b),
            _ => Err(Error::ChannelMismatch {
                expected: 3,
                actual: index + 1,
            }),
        }
    }
}

/// Convert one sRGB8 pixel to 8-bit `(Y, Cr, Cb)` (BT.601, chroma offset 128).
#[must_use]
pub fn rgb8_to_ycrcb(px: RGB8) -> (u8, u8, u8) {
    let (r, g, b) = (f32::from(px.r), f32::from(px.g), f32::from(px.b));
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    (to_u8(y), to_u8(cr), to_u8(cb))
}

/// An image split into 8-bit Y, Cr and Cb planes.
#[derive(Debug, Clone)]
pub struct YCrCbImage {
    pub y: ImgVec<u8>,
    pub cr: ImgVec<u8>,
    pub cb: ImgVec<u8>,
}

impl YCrCbImage {
    #[must_use]
    pub fn from_rgb8(img: &ImgVec<RGB8>) -> Self {
        let (w, h) = (img.width(), img.height());
        let mut y = Vec::with_capacity(w * h);
        let mut cr = Vec::with_capacity(w * h);
        let mut cb = Vec::with_capacity(w * h);
        for px in img.pixels() {
            let (yv, crv, cbv) = rgb8_to_ycrcb(px);
            y.push(yv);
            cr.push(crv);
            cb.push(cbv);
        }
        Self {
            y: ImgVec::new(y, w, h),
            cr: ImgVec::new(cr, w, h),
            cb: ImgVec::new(cb, w, h),
        }
    }

    /// The three planes in Y, Cr, Cb order.
    #[must_use]
    pub fn planes(&self) -> [&ImgVec<u8>; 3] {
        [&self.y, &self.cr, &self.cb]
    }
}

/// An 8-bit plane scaled to floats in [0, 1].
#[must_use]
pub fn unit_plane(plane: &ImgVec<u8>) -> LuminanceField {
    let data = plane.pixels().map(|v| f32::from(v) / 255.0).collect();
    ImgVec::new(data, plane.width(), plane.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white() {
        let (l, a, b) = srgb8_to_lab(RGB8::new(0, 0, 0));
        assert!(l.abs() < 1e-3);
        assert!(a.abs() < 1e-3 && b.abs() < 1e-3);

        let (l, a, b) = srgb8_to_lab(RGB8::new(255, 255, 255));
        assert!((l - 100.0).abs() < 0.05, "white L = {l}");
        assert!(a.abs() < 0.05 && b.abs() < 0.05);
    }

    #[test]
    fn test_mid_gray() {
        // sRGB 119 is close to L* 50
        let (l, _, _) = srgb8_to_lab(RGB8::new(119, 119, 119));
        assert!((l - 50.0).abs() < 0.5, "L = {l}");
    }

    #[test]
    fn test_red_has_positive_a() {
        let (_, a, b) = srgb8_to_lab(RGB8::new(255, 0, 0));
        assert!(a > 70.0);
        assert!(b > 50.0);
    }

    #[test]
    fn test_lab_image_planes() {
        let img = ImgVec::new(vec![RGB8::new(255, 255, 255); 6], 3, 2);
        let lab = LabImage::from_rgb8(&img);
        assert_eq!(lab.width(), 3);
        assert_eq!(lab.height(), 2);
        assert!(lab.l.pixels().all(|v| (v - 100.0).abs() < 0.05));
        assert!(lab.channel(3).is_err());
    }

    #[test]
    fn test_from_planes_checks_size() {
        let l = ImgVec::new(vec![0.0; 4], 2, 2);
        let a = ImgVec::new(vec![0.0; 4], 2, 2);
        let b = ImgVec::new(vec![0.0; 3], 3, 1);
        assert!(LabImage::from_planes(l, a, b).is_err());
    }

    #[test]
    fn test_ycrcb_gray_and_red() {
        assert_eq!(rgb8_to_ycrcb(RGB8::new(100, 100, 100)), (100, 128, 128));
        // Cr saturates for pure red
        assert_eq!(rgb8_to_ycrcb(RGB8::new(255, 0, 0)), (76, 255, 85));
    }

    #[test]
    fn test_ycrcb_image_and_unit_plane() {
        let img = ImgVec::new(vec![RGB8::new(255, 255, 255), RGB8::new(0, 0, 0)], 2, 1);
        let ycc = YCrCbImage::from_rgb8(&img);
        assert_eq!(ycc.y.pixels().collect::<Vec<_>>(), vec![255, 0]);
        assert!(ycc.cr.pixels().all(|v| v == 128));
        let unit = unit_plane(&ycc.y);
        assert_eq!(unit.pixels().collect::<Vec<_>>(), vec![1.0, 0.0]);
        assert_eq!(ycc.planes().len(), 3);
    }
}
