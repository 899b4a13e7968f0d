//! Tunable thresholds for every analysis stage.
//!
//! Each stage takes its own config struct; [`AnalysisConfig`] bundles them
//! for callers that run the whole pipeline. All structs deserialize with
//! missing fields falling back to the defaults, so a JSON file only needs to
//! name the values it overrides:
//!
//! ```
//! use artifact_eval::AnalysisConfig;
//!
//! let json = r#"{ "blocking": { "flatness": { "window": 4 } } }"#;
//! let config = AnalysisConfig::from_json_str(json).unwrap();
//! assert_eq!(config.blocking.flatness.window, 4);
//! assert_eq!(config.blocking.classifier.min_area, 64);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Percentile split of the gradient field into flat / mid / detail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Gradient percentile at or below which a pixel is flat.
    pub flat_percentile: f32,
    /// Gradient percentile at or above which a pixel is detail.
    pub detail_percentile: f32,
    /// Sigma of the 3x3 smoothing applied before differentiation.
    pub pre_sigma: f32,
    /// Sigma of the 3x3 smoothing applied to the magnitude.
    pub post_sigma: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            flat_percentile: 0.30,
            detail_percentile: 0.70,
            pre_sigma: 1.0,
            post_sigma: 0.8,
        }
    }
}

impl RegionConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("flat_percentile", f64::from(self.flat_percentile))?;
        check_unit("detail_percentile", f64::from(self.detail_percentile))?;
        check_positive("pre_sigma", f64::from(self.pre_sigma))?;
        check_positive("post_sigma", f64::from(self.post_sigma))
    }
}

/// Sliding-window thresholds for per-row flatness candidates.
///
/// All ranges are in the units of the analysed planes (L* units for Lab).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatnessConfig {
    /// Window length in pixels.
    pub window: usize,
    /// Maximum max-min range of the distorted window to count as flat.
    pub flat_range: f32,
    /// Minimum |distorted - reference| at the pixel.
    pub diff_threshold: f32,
    /// Reference window range above which the reference counts as textured.
    pub ref_range: f32,
}

impl Default for FlatnessConfig {
    fn default() -> Self {
        Self {
            window: 8,
            flat_range: 0.5,
            diff_threshold: 1.0,
            ref_range: 1.0,
        }
    }
}

impl FlatnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::InvalidParameter {
                name: "window",
                reason: "must be at least 1".to_string(),
            });
        }
        check_non_negative("flat_range", f64::from(self.flat_range))?;
        check_non_negative("diff_threshold", f64::from(self.diff_threshold))?;
        check_non_negative("ref_range", f64::from(self.ref_range))
    }
}

/// Region filters and statistical thresholds for blocking classification.
///
/// The three `*_fraction` values are relative to `luminance_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum pixel area of a region.
    pub min_area: usize,
    /// Minimum of bounding-box width and height.
    pub min_side: usize,
    /// Minimum area / bounding-box area.
    pub min_fill_ratio: f64,
    /// Mean |distorted - reference| threshold, as a fraction of scale.
    pub diff_fraction: f64,
    /// Minimum reference standard deviation, as a fraction of scale.
    pub ref_detail_fraction: f64,
    /// Maximum distorted standard deviation, as a fraction of scale.
    pub flat_fraction: f64,
    /// Full-scale luminance value (100 for L*).
    pub luminance_scale: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_area: 64,
            min_side: 4,
            min_fill_ratio: 0.30,
            diff_fraction: 0.12,
            ref_detail_fraction: 0.03,
            flat_fraction: 0.20,
            luminance_scale: 100.0,
        }
    }
}

impl ClassifierConfig {
    /// Absolute mean-difference threshold (`T_diff`).
    #[must_use]
    pub fn diff_threshold(&self) -> f64 {
        self.diff_fraction * self.luminance_scale
    }

    /// Absolute reference-detail threshold (`T_refDetail`).
    #[must_use]
    pub fn ref_detail_threshold(&self) -> f64 {
        self.ref_detail_fraction * self.luminance_scale
    }

    /// Absolute distorted-flatness threshold (`T_flat`).
    #[must_use]
    pub fn flat_threshold(&self) -> f64 {
        self.flat_fraction * self.luminance_scale
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("min_fill_ratio", self.min_fill_ratio)?;
        check_non_negative("diff_fraction", self.diff_fraction)?;
        check_non_negative("ref_detail_fraction", self.ref_detail_fraction)?;
        check_non_negative("flat_fraction", self.flat_fraction)?;
        check_positive("luminance_scale", self.luminance_scale)
    }
}

/// Configuration of the blocking-artifact pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    pub flatness: FlatnessConfig,
    pub classifier: ClassifierConfig,
}

impl BlockingConfig {
    pub fn validate(&self) -> Result<()> {
        self.flatness.validate()?;
        self.classifier.validate()
    }
}

/// No-reference blocking strength measured on the distorted image alone.
///
/// Ranges are in 8-bit channel units; `flat_laplacian` applies to luma
/// scaled to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthConfig {
    /// Codec block size whose boundaries are measured.
    pub block_size: usize,
    /// Luma pixels with a smaller absolute Laplacian count as flat.
    pub flat_laplacian: f32,
    /// Chroma planes with a smaller max-min range get no weight.
    pub min_chroma_range: f64,
    /// Chroma range at which a plane reaches full weight.
    pub full_weight_range: f64,
    /// Boundary-to-inner ratio of an image without blocking.
    pub baseline: f64,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            block_size: 8,
            flat_laplacian: 2.0,
            min_chroma_range: 1.5,
            full_weight_range: 20.0,
            baseline: 1.0,
        }
    }
}

impl StrengthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidParameter {
                name: "strength.block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        check_non_negative("flat_laplacian", f64::from(self.flat_laplacian))?;
        check_non_negative("min_chroma_range", self.min_chroma_range)?;
        check_positive("full_weight_range", self.full_weight_range)?;
        check_non_negative("baseline", self.baseline)
    }
}

/// Configuration for a complete analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Flat / mid / detail segmentation.
    pub regions: RegionConfig,
    /// Blocking-artifact detection.
    pub blocking: BlockingConfig,
    /// No-reference blocking strength.
    pub strength: StrengthConfig,
    /// Block size for block-level region masks.
    pub block_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            regions: RegionConfig::default(),
            blocking: BlockingConfig::default(),
            strength: StrengthConfig::default(),
            block_size: 16,
        }
    }
}

impl AnalysisConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.regions.validate()?;
        self.blocking.validate()?;
        self.strength.validate()?;
        if self.block_size == 0 {
            return Err(Error::InvalidParameter {
                name: "block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    /// Set the flat / detail gradient percentiles.
    #[must_use]
    pub fn percentiles(mut self, flat: f32, detail: f32) -> Self {
        self.config.regions.flat_percentile = flat;
        self.config.regions.detail_percentile = detail;
        self
    }

    /// Set the flatness window length.
    #[must_use]
    pub fn window(mut self, window: usize) -> Self {
        self.config.blocking.flatness.window = window;
        self
    }

    /// Replace the flatness thresholds.
    #[must_use]
    pub fn flatness(mut self, flatness: FlatnessConfig) -> Self {
        self.config.blocking.flatness = flatness;
        self
    }

    /// Replace the classifier thresholds.
    #[must_use]
    pub fn classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.config.blocking.classifier = classifier;
        self
    }

    /// Set the luminance full-scale value used by the classifier.
    #[must_use]
    pub fn luminance_scale(mut self, scale: f64) -> Self {
        self.config.blocking.classifier.luminance_scale = scale;
        self
    }

    /// Set the block size for block-level region masks.
    #[must_use]
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<AnalysisConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidParameter {
            name,
            reason: format!("{value} is outside [0, 1]"),
        });
    }
    Ok(())
}

fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(Error::InvalidParameter {
            name,
            reason: format!("{value} must be non-negative"),
        });
    }
    Ok(())
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(Error::InvalidParameter {
            name,
            reason: format!("{value} must be positive"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.regions.flat_percentile, 0.30);
        assert_eq!(config.regions.detail_percentile, 0.70);
        assert_eq!(config.blocking.flatness.window, 8);
        assert_eq!(config.blocking.flatness.flat_range, 0.5);
        assert_eq!(config.blocking.flatness.diff_threshold, 1.0);
        assert_eq!(config.blocking.flatness.ref_range, 1.0);
        assert_eq!(config.blocking.classifier.min_area, 64);
        assert_eq!(config.blocking.classifier.min_side, 4);
        assert_eq!(config.strength.block_size, 8);
        assert_eq!(config.strength.baseline, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_derived_thresholds() {
        let c = ClassifierConfig::default();
        assert!((c.diff_threshold() - 12.0).abs() < 1e-9);
        assert!((c.ref_detail_threshold() - 3.0).abs() < 1e-9);
        assert!((c.flat_threshold() - 20.0).abs() < 1e-9);

        let scaled = ClassifierConfig {
            luminance_scale: 255.0,
            ..c
        };
        assert!((scaled.diff_threshold() - 30.6).abs() < 1e-9);
    }

    #[test]
    fn test_builder() {
        let config = AnalysisConfig::builder()
            .percentiles(0.2, 0.8)
            .window(4)
            .block_size(8)
            .build()
            .unwrap();
        assert_eq!(config.regions.flat_percentile, 0.2);
        assert_eq!(config.blocking.flatness.window, 4);
        assert_eq!(config.block_size, 8);
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(matches!(
            AnalysisConfig::builder().window(0).build(),
            Err(Error::InvalidParameter { name: "window", .. })
        ));
        assert!(matches!(
            AnalysisConfig::builder().percentiles(-0.1, 0.7).build(),
            Err(Error::InvalidParameter { name: "flat_percentile", .. })
        ));
        assert!(matches!(
            AnalysisConfig::builder().luminance_scale(0.0).build(),
            Err(Error::InvalidParameter { name: "luminance_scale", .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"strength": {"block_size": 0}}"#),
            Err(Error::InvalidParameter { name: "strength.block_size", .. })
        ));
    }

    #[test]
    fn test_json_roundtrip_and_partial() {
        let config = AnalysisConfig::builder().window(5).build().unwrap();
        let json = config.to_json_string().unwrap();
        let back = AnalysisConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);

        let partial = AnalysisConfig::from_json_str(r#"{"block_size": 32}"#).unwrap();
        assert_eq!(partial.block_size, 32);
        assert_eq!(partial.blocking, BlockingConfig::default());
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"regions": {"flat_percentile": 0.25}}"#).unwrap();
        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.regions.flat_percentile, 0.25);
        assert_eq!(config.regions.detail_percentile, 0.70);
    }
}
