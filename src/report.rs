//! Report types for blocking analyses.
//!
//! A [`BlockingReport`] is the JSON document written for a single image
//! pair; batch runs flatten each report into a [`CsvRow`].

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blocking::{BlockingAnalysis, BlockingStrength, ClassifiedRegion};
use crate::config::BlockingConfig;
use crate::error::Result;
use crate::metrics::{LabMse, LabShift};

/// Result of comparing one distorted image against its reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingReport {
    /// Reference image name.
    pub reference: String,

    /// Distorted image name.
    pub distorted: String,

    pub width: usize,
    pub height: usize,

    /// Pixels flagged by the flatness detector.
    pub candidate_pixels: usize,

    /// Regions extracted from the candidate mask.
    pub region_count: usize,

    /// Pixels in the final artifact mask.
    pub artifact_pixels: usize,

    /// `artifact_pixels` over the image area.
    pub artifact_fraction: f64,

    /// Classified regions and their statistics.
    pub artifacts: Vec<ClassifiedRegion>,

    /// Per-plane Lab error, when computed.
    #[serde(default)]
    pub lab_mse: Option<LabMse>,

    /// No-reference blocking strength of the distorted image, when computed.
    #[serde(default)]
    pub blocking_strength: Option<BlockingStrength>,

    /// Global Lab shift from reference to distorted, when computed.
    #[serde(default)]
    pub lab_shift: Option<LabShift>,

    /// Thresholds the analysis ran with.
    pub config: BlockingConfig,

    /// When this report was generated.
    #[serde(with = "chrono_serde")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl BlockingReport {
    /// Build a report from a finished analysis.
    #[must_use]
    pub fn new(
        reference: String,
        distorted: String,
        analysis: &BlockingAnalysis,
        config: &BlockingConfig,
    ) -> Self {
        Self {
            reference,
            distorted,
            width: analysis.mask.width(),
            height: analysis.mask.height(),
            candidate_pixels: analysis.candidate_pixels,
            region_count: analysis.regions.len(),
            artifact_pixels: analysis.artifact_pixels,
            artifact_fraction: analysis.artifact_fraction(),
            artifacts: analysis.classified.clone(),
            lab_mse: None,
            blocking_strength: None,
            lab_shift: None,
            config: *config,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn with_lab_mse(mut self, mse: LabMse) -> Self {
        self.lab_mse = Some(mse);
        self
    }

    #[must_use]
    pub fn with_blocking_strength(mut self, strength: BlockingStrength) -> Self {
        self.blocking_strength = Some(strength);
        self
    }

    #[must_use]
    pub fn with_lab_shift(mut self, shift: LabShift) -> Self {
        self.lab_shift = Some(shift);
        self
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Flatten into one CSV record.
    #[must_use]
    pub fn csv_row(&self) -> CsvRow {
        CsvRow {
            reference: self.reference.clone(),
            distorted: self.distorted.clone(),
            width: self.width,
            height: self.height,
            candidate_pixels: self.candidate_pixels,
            regions: self.region_count,
            artifacts: self.artifacts.len(),
            artifact_pixels: self.artifact_pixels,
            artifact_fraction: self.artifact_fraction,
            mse_l: self.lab_mse.map(|m| m.l),
            psnr_l: self.lab_mse.map(|m| m.psnr_l()),
            blocking_strength: self.blocking_strength.map(|s| s.strength),
            shift_l_slope: self.lab_shift.map(|s| s.l.slope),
            shift_l_offset: self.lab_shift.map(|s| s.l.offset),
        }
    }
}

/// One line of the batch CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub reference: String,
    pub distorted: String,
    pub width: usize,
    pub height: usize,
    pub candidate_pixels: usize,
    pub regions: usize,
    pub artifacts: usize,
    pub artifact_pixels: usize,
    pub artifact_fraction: f64,
    pub mse_l: Option<f64>,
    pub psnr_l: Option<f64>,
    pub blocking_strength: Option<f64>,
    pub shift_l_slope: Option<f64>,
    pub shift_l_offset: Option<f64>,
}

/// Write rows with a header line.
pub fn write_csv<W: Write>(rows: &[CsvRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write rows to a CSV file.
pub fn write_csv_file(rows: &[CsvRow], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(rows, file)
}

mod chrono_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.to_rfc3339().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::{Region, RegionStats};
    use crate::metrics::LinearFit;
    use imgref::ImgVec;

    fn analysis() -> BlockingAnalysis {
        let mut mask = ImgVec::new(vec![0u8; 100], 10, 10);
        for y in 0..5usize {
            for x in 0..5usize {
                mask[(x, y)] = 255;
            }
        }
        let region = Region {
            min_col: 0,
            max_col: 4,
            min_row: 0,
            max_row: 4,
            pixel_area: 25,
        };
        BlockingAnalysis {
            mask,
            regions: vec![region],
            classified: vec![ClassifiedRegion {
                region,
                stats: RegionStats {
                    masked_pixels: 25,
                    fill_ratio: 1.0,
                    mean_diff: 15.0,
                    std_ref: 6.0,
                    std_dist: 0.5,
                },
            }],
            candidate_pixels: 30,
            artifact_pixels: 25,
        }
    }

    fn report(distorted: &str) -> BlockingReport {
        BlockingReport::new(
            "a.png".into(),
            distorted.into(),
            &analysis(),
            &BlockingConfig::default(),
        )
    }

    #[test]
    fn test_report_from_analysis() {
        let report = report("a_q30.jpg");
        assert_eq!((report.width, report.height), (10, 10));
        assert_eq!(report.region_count, 1);
        assert!((report.artifact_fraction - 0.25).abs() < 1e-12);
        assert!(report.lab_mse.is_none());
        assert!(report.blocking_strength.is_none());
        assert!(report.lab_shift.is_none());
    }

    #[test]
    fn test_json_keeps_timestamp_and_config() {
        let report = report("b.png").with_blocking_strength(BlockingStrength {
            strength: 0.75,
            ratios: [1.75, 1.0, 1.0],
            weights: [1.0, 0.0, 0.0],
        });
        let json = report.to_json().unwrap();
        let back: BlockingReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp.to_rfc3339(), report.timestamp.to_rfc3339());
        assert_eq!(back.config, report.config);
        assert_eq!(back.artifacts, report.artifacts);
        assert_eq!(back.blocking_strength, report.blocking_strength);
    }

    #[test]
    fn test_json_without_optional_scores_still_parses() {
        let mut value: serde_json::Value =
            serde_json::from_str(&report("b.png").to_json().unwrap()).unwrap();
        let fields = value.as_object_mut().unwrap();
        fields.remove("blocking_strength");
        fields.remove("lab_shift");
        let back: BlockingReport = serde_json::from_value(value).unwrap();
        assert!(back.blocking_strength.is_none());
        assert!(back.lab_shift.is_none());
    }

    #[test]
    fn test_csv_output() {
        let report = report("a_q30.jpg")
            .with_lab_mse(LabMse {
                l: 4.0,
                a: 0.0,
                b: 0.0,
                mean: 4.0 / 3.0,
            })
            .with_blocking_strength(BlockingStrength {
                strength: 0.5,
                ..BlockingStrength::default()
            })
            .with_lab_shift(LabShift {
                l: LinearFit {
                    slope: 0.5,
                    offset: 2.0,
                },
                ..LabShift::default()
            });
        let mut out = Vec::new();
        write_csv(&[report.csv_row()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(concat!(
                "reference,distorted,width,height,candidate_pixels,regions,artifacts,",
                "artifact_pixels,artifact_fraction,mse_l,psnr_l,blocking_strength,",
                "shift_l_slope,shift_l_offset"
            ))
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("a.png,a_q30.jpg,10,10,30,1,1,25,0.25,4.0,"));
        assert!(row.ends_with(",0.5,0.5,2.0"), "{row}");
    }
}
