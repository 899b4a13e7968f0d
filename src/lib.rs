//! # artifact-eval
//!
//! Full-reference image distortion analysis.
//!
//! The library compares a reference image against a distorted version of it.
//! Its core is a blocking-artifact detector: a per-row flatness scan, a
//! streaming region extractor and a statistical region classifier. Around it
//! sit flat / mid / detail region masks, masked difference scores and
//! per-channel error metrics.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use artifact_eval::{AnalysisConfig, LabImage, decode, detect_blocking};
//!
//! let config = AnalysisConfig::builder().window(8).build()?;
//! let reference = LabImage::from_rgb8(&decode::load_image("ref.png".as_ref())?);
//! let distorted = LabImage::from_rgb8(&decode::load_image("ref_q30.jpg".as_ref())?);
//!
//! let analysis = detect_blocking(&reference, &distorted, &config.blocking)?;
//! decode::save_mask_png(&analysis.mask, "blocking.png".as_ref())?;
//! ```
//!
//! ## Modules
//!
//! - [`blocking`]: Blocking-artifact detection pipeline and no-reference strength
//! - [`regions`]: Gradient field, percentile region masks, block grid, masked scores
//! - [`color`]: sRGB to CIE L*a*b* and YCrCb planes
//! - [`config`]: Tunable thresholds with JSON loading
//! - [`metrics`]: MSE, PSNR and Lab linear shift
//! - [`report`]: JSON and CSV reports
//! - [`decode`]: PNG / JPEG input and PNG output
//! - [`pairing`]: Reference / distorted file pairing
//! - [`stats`]: Descriptive statistics

pub mod blocking;
pub mod color;
pub mod config;
pub mod decode;
pub mod error;
pub mod field;
pub mod mask;
pub mod metrics;
pub mod pairing;
pub mod regions;
pub mod report;
pub mod stats;

// Re-export commonly used types
pub use blocking::{
    BlockingAnalysis, BlockingStrength, Region, RegionStats, blocking_strength, detect_blocking,
    detect_blocking_planes,
};
pub use color::{LabImage, YCrCbImage};
pub use config::{
    AnalysisConfig, BlockingConfig, ClassifierConfig, FlatnessConfig, RegionConfig,
    StrengthConfig,
};
pub use error::{Error, Result};
pub use field::{GradientField, LuminanceField, MASK_ON, Mask};
pub use metrics::{LabMse, LabShift, LinearFit, channel_mse, lab_mse, lab_shift, psnr_from_mse};
pub use pairing::{ImagePair, discover_pairs};
pub use regions::{
    BlockRegionProvider, PixelwiseRegionProvider, RegionClass, RegionMasks, RegionProvider,
};
pub use report::{BlockingReport, CsvRow};
pub use stats::Summary;
