//! Data-driven flat / mid / detail segmentation of a gradient field.

use imgref::ImgVec;
use serde::{Deserialize, Serialize};

use crate::config::RegionConfig;
use crate::error::Result;
use crate::field::{GradientField, LuminanceField, MASK_ON, Mask, ensure_non_empty};
use crate::mask::count_set;
use crate::regions::gradient::GradientFieldBuilder;
use crate::stats::{percentile_sorted, sort_floats};

/// Texture class of a pixel relative to the whole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionClass {
    Flat,
    Mid,
    Detail,
}

impl std::fmt::Display for RegionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Mid => write!(f, "mid"),
            Self::Detail => write!(f, "detail"),
        }
    }
}

/// Three disjoint class masks plus the gradient field they were cut from.
#[derive(Debug, Clone)]
pub struct RegionMasks {
    pub flat: Mask,
    pub mid: Mask,
    pub detail: Mask,
    /// Smoothed gradient magnitude of the source plane.
    pub gradient: GradientField,
    /// Gradient value at the flat percentile.
    pub flat_threshold: f64,
    /// Gradient value at the detail percentile.
    pub detail_threshold: f64,
}

impl RegionMasks {
    /// Mask for one class.
    #[must_use]
    pub fn mask(&self, class: RegionClass) -> &Mask {
        match class {
            RegionClass::Flat => &self.flat,
            RegionClass::Mid => &self.mid,
            RegionClass::Detail => &self.detail,
        }
    }

    /// Pixel counts as `(flat, mid, detail)`.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        (count_set(&self.flat), count_set(&self.mid), count_set(&self.detail))
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.flat.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.flat.height()
    }
}

/// Thresholds a gradient field at two percentiles of its own distribution.
///
/// A pixel is flat iff `g <= flat_threshold`, detail iff
/// `g >= detail_threshold` (and not flat), mid otherwise. The flat test runs
/// first, so when both thresholds coincide the tied pixels are flat.
#[derive(Debug, Clone, Copy)]
pub struct PercentileRegionClassifier {
    flat_percentile: f32,
    detail_percentile: f32,
}

impl Default for PercentileRegionClassifier {
    fn default() -> Self {
        Self::from_config(&RegionConfig::default())
    }
}

impl PercentileRegionClassifier {
    #[must_use]
    pub fn new(flat_percentile: f32, detail_percentile: f32) -> Self {
        Self {
            flat_percentile,
            detail_percentile,
        }
    }

    #[must_use]
    pub fn from_config(config: &RegionConfig) -> Self {
        Self::new(config.flat_percentile, config.detail_percentile)
    }

    #[must_use]
    pub fn flat_percentile(&self) -> f32 {
        self.flat_percentile
    }

    #[must_use]
    pub fn detail_percentile(&self) -> f32 {
        self.detail_percentile
    }

    /// Split `gradient` into class masks. The field is moved into the result.
    pub fn classify(&self, gradient: GradientField) -> Result<RegionMasks> {
        ensure_non_empty(&gradient, "gradient field")?;

        let mut sorted: Vec<f32> = gradient.pixels().collect();
        sort_floats(&mut sorted);
        let flat_threshold = percentile_sorted(&sorted, f64::from(self.flat_percentile));
        let detail_threshold = percentile_sorted(&sorted, f64::from(self.detail_percentile));

        let (w, h) = (gradient.width(), gradient.height());
        let mut flat = vec![0u8; w * h];
        let mut mid = vec![0u8; w * h];
        let mut detail = vec![0u8; w * h];

        for (i, g) in gradient.pixels().enumerate() {
            let g = f64::from(g);
            if g <= flat_threshold {
                flat[i] = MASK_ON;
            } else if g >= detail_threshold {
                detail[i] = MASK_ON;
            } else {
                mid[i] = MASK_ON;
            }
        }

        Ok(RegionMasks {
            flat: ImgVec::new(flat, w, h),
            mid: ImgVec::new(mid, w, h),
            detail: ImgVec::new(detail, w, h),
            gradient,
            flat_threshold,
            detail_threshold,
        })
    }
}

/// Source of flat / mid / detail masks for a reference plane.
pub trait RegionProvider {
    /// Compute class masks for `reference`.
    fn compute_regions(&self, reference: &LuminanceField) -> Result<RegionMasks>;

    /// Identifier used in reports.
    fn name(&self) -> &'static str;
}

/// Per-pixel percentile segmentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelwiseRegionProvider {
    gradient: GradientFieldBuilder,
    classifier: PercentileRegionClassifier,
}

impl PixelwiseRegionProvider {
    #[must_use]
    pub fn new(config: &RegionConfig) -> Self {
        Self {
            gradient: GradientFieldBuilder::from_config(config),
            classifier: PercentileRegionClassifier::from_config(config),
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &PercentileRegionClassifier {
        &self.classifier
    }
}

impl RegionProvider for PixelwiseRegionProvider {
    fn compute_regions(&self, reference: &LuminanceField) -> Result<RegionMasks> {
        let gradient = self.gradient.build(reference)?;
        self.classifier.classify(gradient)
    }

    fn name(&self) -> &'static str {
        "pixelwise_percentiles"
    }
}
