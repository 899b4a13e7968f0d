//! Compression-blocking detection.
//!
//! Three stages run in order:
//!
//! 1. [`RowFlatnessDetector`] marks columns where the distorted image went
//!    flat over a short window while differing from the reference.
//! 2. [`StreamingRegionExtractor`] groups the marked pixels into vertically
//!    contiguous regions in a single top-to-bottom pass.
//! 3. [`RegionClassifier`] keeps the regions whose statistics look like a
//!    quantized block rather than naturally flat content.
//!
//! [`blocking_strength`] is a separate no-reference score that compares
//! steps across codec block boundaries with steps inside blocks.
//!
//! # Example
//!
//! ```
//! use artifact_eval::blocking::detect_blocking;
//! use artifact_eval::color::LabImage;
//! use artifact_eval::config::BlockingConfig;
//! use imgref::ImgVec;
//!
//! let lum = ImgVec::new(vec![50.0f32; 32 * 32], 32, 32);
//! let reference = LabImage::from_lightness(lum.clone());
//! let distorted = LabImage::from_lightness(lum);
//!
//! let config = BlockingConfig::default();
//! let analysis = detect_blocking(&reference, &distorted, &config).unwrap();
//! assert_eq!(analysis.artifact_pixels, 0);
//! ```

pub mod classify;
pub mod extract;
pub mod flatness;
pub mod score;

use log::debug;

pub use classify::{Classification, ClassifiedRegion, RegionClassifier, RegionStats};
pub use extract::{Region, Run, StreamingRegionExtractor, extract_regions};
pub use flatness::RowFlatnessDetector;
pub use score::{BlockingStrength, blocking_strength};

use crate::color::LabImage;
use crate::config::BlockingConfig;
use crate::error::Result;
use crate::field::{LuminanceField, Mask, ensure_same_size};
use crate::mask::count_set;

/// Everything produced by one blocking analysis.
#[derive(Debug, Clone)]
pub struct BlockingAnalysis {
    /// Final 0/255 artifact mask.
    pub mask: Mask,
    /// All extracted candidate regions, classified or not.
    pub regions: Vec<Region>,
    /// Regions judged to be blocking artifacts.
    pub classified: Vec<ClassifiedRegion>,
    /// Set pixels in the candidate mask.
    pub candidate_pixels: usize,
    /// Set pixels in the final mask.
    pub artifact_pixels: usize,
}

impl BlockingAnalysis {
    /// Share of image pixels flagged as artifacts.
    #[must_use]
    pub fn artifact_fraction(&self) -> f64 {
        let total = self.mask.width() * self.mask.height();
        if total == 0 {
            0.0
        } else {
            self.artifact_pixels as f64 / total as f64
        }
    }
}

/// Run the full pipeline on two Lab images. All three planes feed the
/// flatness detector; the classifier uses L only.
///
/// # Errors
///
/// Returns an error for invalid configuration, empty images, or images of
/// different sizes.
pub fn detect_blocking(
    reference: &LabImage,
    distorted: &LabImage,
    config: &BlockingConfig,
) -> Result<BlockingAnalysis> {
    detect_blocking_planes(
        &reference.planes(),
        &distorted.planes(),
        &reference.l,
        &distorted.l,
        config,
    )
}

/// Run the full pipeline on arbitrary planes (one to three channels), with
/// separate luminance planes for the classifier statistics.
///
/// # Errors
///
/// Returns an error for invalid configuration, a bad channel count, or any
/// plane whose size differs from the others.
pub fn detect_blocking_planes(
    reference: &[&LuminanceField],
    distorted: &[&LuminanceField],
    reference_l: &LuminanceField,
    distorted_l: &LuminanceField,
    config: &BlockingConfig,
) -> Result<BlockingAnalysis> {
    config.validate()?;

    let candidates =
        RowFlatnessDetector::from_config(&config.flatness).candidate_mask(reference, distorted)?;
    ensure_same_size(&candidates, reference_l)?;
    ensure_same_size(&candidates, distorted_l)?;
    let candidate_pixels = count_set(&candidates);

    let regions = extract_regions(&candidates);
    let Classification { mask, artifacts } = RegionClassifier::new(config.classifier)
        .classify(&regions, &candidates, reference_l, distorted_l)?;
    let artifact_pixels = count_set(&mask);

    debug!(
        "blocking: {candidate_pixels} candidate px, {} regions, \
         {} artifacts ({artifact_pixels} px)",
        regions.len(),
        artifacts.len()
    );

    Ok(BlockingAnalysis {
        mask,
        regions,
        classified: artifacts,
        candidate_pixels,
        artifact_pixels,
    })
}
