//! Statistical classification of extracted regions as blocking artifacts.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::blocking::extract::Region;
use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::field::{LuminanceField, MASK_ON, Mask, ensure_same_size};
use crate::stats::RunningStats;

/// Aggregates over the set candidate pixels inside a region's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Candidate pixels that contributed.
    pub masked_pixels: usize,
    pub fill_ratio: f64,
    /// Mean `|dist - ref|`.
    pub mean_diff: f64,
    pub std_ref: f64,
    pub std_dist: f64,
}

/// A region that passed classification, with the numbers that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRegion {
    pub region: Region,
    pub stats: RegionStats,
}

/// Output of [`RegionClassifier::classify`].
#[derive(Debug, Clone)]
pub struct Classification {
    /// 0/255 mask of artifact pixels.
    pub mask: Mask,
    pub artifacts: Vec<ClassifiedRegion>,
}

/// Decides which regions are blocking artifacts.
///
/// A region qualifies when it is large and solid enough, the reference was
/// textured over it, the distorted image is nearly flat there, and the two
/// differ by a clear margin on average.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionClassifier {
    config: ClassifierConfig,
}

impl RegionClassifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Area and shape filter applied before any statistics.
    #[must_use]
    pub fn passes_shape(&self, region: &Region) -> bool {
        region.pixel_area >= self.config.min_area
            && region.width().min(region.height()) >= self.config.min_side
    }

    /// Statistics over candidate pixels inside `region`'s bounding box, or
    /// `None` when no candidate pixel falls inside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the region's bounds are inverted or reach past
    /// the mask.
    pub fn region_stats(
        &self,
        region: &Region,
        candidates: &Mask,
        reference: &LuminanceField,
        distorted: &LuminanceField,
    ) -> Result<Option<RegionStats>> {
        check_bounds(region, candidates.width(), candidates.height())?;

        let mut refs = RunningStats::new();
        let mut dists = RunningStats::new();
        let mut diff_sum = 0.0;

        for y in region.min_row..=region.max_row {
            for x in region.min_col..=region.max_col {
                if candidates[(x, y)] == 0 {
                    continue;
                }
                let r = f64::from(reference[(x, y)]);
                let d = f64::from(distorted[(x, y)]);
                diff_sum += (d - r).abs();
                refs.push(r);
                dists.push(d);
            }
        }

        let n = refs.count();
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(RegionStats {
            masked_pixels: n,
            fill_ratio: region.fill_ratio(),
            mean_diff: diff_sum / n as f64,
            std_ref: refs.std_dev(),
            std_dist: dists.std_dev(),
        }))
    }

    /// Threshold test on computed statistics.
    #[must_use]
    pub fn is_artifact(&self, stats: &RegionStats) -> bool {
        stats.fill_ratio >= self.config.min_fill_ratio
            && stats.mean_diff >= self.config.diff_threshold()
            && stats.std_ref >= self.config.ref_detail_threshold()
            && stats.std_dist <= self.config.flat_threshold()
    }

    /// Classify every region and paint the candidate pixels of artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask and the two planes differ in size, or if
    /// any region does not fit inside the mask. Nothing is classified then.
    pub fn classify(
        &self,
        regions: &[Region],
        candidates: &Mask,
        reference: &LuminanceField,
        distorted: &LuminanceField,
    ) -> Result<Classification> {
        ensure_same_size(candidates, reference)?;
        ensure_same_size(candidates, distorted)?;

        let (w, h) = (candidates.width(), candidates.height());
        for region in regions {
            check_bounds(region, w, h)?;
        }

        let mut out = Mask::new(vec![0; w * h], w, h);
        let mut artifacts = Vec::new();

        for region in regions.iter().filter(|r| self.passes_shape(r)) {
            let Some(stats) = self.region_stats(region, candidates, reference, distorted)? else {
                continue;
            };
            if !self.is_artifact(&stats) {
                continue;
            }
            trace!(
                "artifact at cols {}..={} rows {}..={}: area={} fill={:.2} diff={:.2} \
                 std_ref={:.2} std_dist={:.2}",
                region.min_col,
                region.max_col,
                region.min_row,
                region.max_row,
                region.pixel_area,
                stats.fill_ratio,
                stats.mean_diff,
                stats.std_ref,
                stats.std_dist
            );
            for y in region.min_row..=region.max_row {
                for x in region.min_col..=region.max_col {
                    if candidates[(x, y)] != 0 {
                        out[(x, y)] = MASK_ON;
                    }
                }
            }
            artifacts.push(ClassifiedRegion { region: *region, stats });
        }

        Ok(Classification { mask: out, artifacts })
    }
}

fn check_bounds(region: &Region, width: usize, height: usize) -> Result<()> {
    if region.min_col > region.max_col || region.min_row > region.max_row {
        return Err(Error::InvalidParameter {
            name: "region",
            reason: format!(
                "inverted bounds: cols {}..={} rows {}..={}",
                region.min_col, region.max_col, region.min_row, region.max_row
            ),
        });
    }
    if region.max_col >= width || region.max_row >= height {
        return Err(Error::DimensionMismatch {
            expected: (width, height),
            actual: (region.max_col + 1, region.max_row + 1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::extract::extract_regions;
    use crate::mask::count_set;
    use imgref::ImgVec;

    fn checker(w: usize, h: usize) -> LuminanceField {
        let data = (0..h)
            .flat_map(|y| (0..w).map(move |x| if (x + y) % 2 == 0 { 40.0 } else { 60.0 }))
            .collect();
        ImgVec::new(data, w, h)
    }

    fn block_mask(w: usize, h: usize, x0: usize, y0: usize, side: usize) -> Mask {
        let data = (0..h)
            .flat_map(|y| {
                (0..w).map(move |x| {
                    let inside = (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y);
                    if inside { 255 } else { 0 }
                })
            })
            .collect();
        ImgVec::new(data, w, h)
    }

    fn fill_block(
        field: &mut LuminanceField,
        x0: usize,
        y0: usize,
        side: usize,
        f: impl Fn(usize, usize) -> f32,
    ) {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                field[(x, y)] = f(x, y);
            }
        }
    }

    #[test]
    fn test_flattened_block_is_artifact() {
        let reference = checker(16, 16);
        let mut distorted = reference.clone();
        fill_block(&mut distorted, 4, 4, 8, |_, _| 70.0);
        let mask = block_mask(16, 16, 4, 4, 8);
        let regions = extract_regions(&mask);

        let out = RegionClassifier::default()
            .classify(&regions, &mask, &reference, &distorted)
            .unwrap();
        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(count_set(&out.mask), 64);
        let stats = out.artifacts[0].stats;
        assert!((stats.mean_diff - 20.0).abs() < 1e-9);
        assert!((stats.std_ref - 10.0).abs() < 1e-9);
        assert!(stats.std_dist.abs() < 1e-9);
        assert!((stats.fill_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_block_is_not_artifact() {
        let reference = checker(16, 16);
        let mut distorted = reference.clone();
        // mean offset stays at 20 but distorted std is 30
        fill_block(&mut distorted, 4, 4, 8, |x, y| {
            if (x + y) % 2 == 0 { 40.0 } else { 100.0 }
        });
        let mask = block_mask(16, 16, 4, 4, 8);
        let regions = extract_regions(&mask);

        let classifier = RegionClassifier::default();
        let stats = classifier
            .region_stats(&regions[0], &mask, &reference, &distorted)
            .unwrap()
            .unwrap();
        assert!(stats.std_dist > classifier.config().flat_threshold());
        let out = classifier.classify(&regions, &mask, &reference, &distorted).unwrap();
        assert!(out.artifacts.is_empty());
        assert_eq!(count_set(&out.mask), 0);
    }

    #[test]
    fn test_flat_reference_is_not_artifact() {
        // naturally flat area shifted in brightness: std_ref below threshold
        let reference = ImgVec::new(vec![50.0f32; 256], 16, 16);
        let mut distorted = reference.clone();
        fill_block(&mut distorted, 4, 4, 8, |_, _| 70.0);
        let mask = block_mask(16, 16, 4, 4, 8);
        let regions = extract_regions(&mask);
        let out = RegionClassifier::default()
            .classify(&regions, &mask, &reference, &distorted)
            .unwrap();
        assert!(out.artifacts.is_empty());
    }

    #[test]
    fn test_shape_filters() {
        let classifier = RegionClassifier::default();
        let thin = Region {
            min_col: 0,
            max_col: 99,
            min_row: 0,
            max_row: 2,
            pixel_area: 300,
        };
        assert!(!classifier.passes_shape(&thin));
        let small = Region {
            min_col: 0,
            max_col: 6,
            min_row: 0,
            max_row: 6,
            pixel_area: 49,
        };
        assert!(!classifier.passes_shape(&small));
        let ok = Region {
            min_col: 0,
            max_col: 7,
            min_row: 0,
            max_row: 7,
            pixel_area: 64,
        };
        assert!(classifier.passes_shape(&ok));
    }

    #[test]
    fn test_sparse_region_rejected_by_fill() {
        let classifier = RegionClassifier::default();
        let stats = RegionStats {
            masked_pixels: 64,
            fill_ratio: 0.2,
            mean_diff: 20.0,
            std_ref: 10.0,
            std_dist: 0.0,
        };
        assert!(!classifier.is_artifact(&stats));
        assert!(classifier.is_artifact(&RegionStats { fill_ratio: 0.3, ..stats }));
    }

    #[test]
    fn test_size_mismatch() {
        let mask = block_mask(8, 8, 0, 0, 4);
        let lum = checker(8, 4);
        assert!(RegionClassifier::default().classify(&[], &mask, &lum, &lum).is_err());
    }

    #[test]
    fn test_region_past_mask_is_rejected() {
        let lum = checker(8, 8);
        let mask = block_mask(8, 8, 0, 0, 8);
        let overhang = Region {
            min_col: 0,
            max_col: 9,
            min_row: 0,
            max_row: 9,
            pixel_area: 100,
        };
        let classifier = RegionClassifier::default();
        assert!(matches!(
            classifier.classify(&[overhang], &mask, &lum, &lum),
            Err(Error::DimensionMismatch { expected: (8, 8), actual: (10, 10) })
        ));
        assert!(classifier.region_stats(&overhang, &mask, &lum, &lum).is_err());

        // a valid region next to the bad one does not rescue the call
        let inside = Region { max_col: 7, max_row: 7, pixel_area: 64, ..overhang };
        assert!(classifier.classify(&[inside, overhang], &mask, &lum, &lum).is_err());
        assert!(classifier.classify(&[inside], &mask, &lum, &lum).is_ok());
    }

    #[test]
    fn test_inverted_region_is_rejected() {
        let lum = checker(8, 8);
        let mask = block_mask(8, 8, 0, 0, 8);
        let inverted = Region {
            min_col: 5,
            max_col: 2,
            min_row: 0,
            max_row: 7,
            pixel_area: 64,
        };
        assert!(matches!(
            RegionClassifier::default().classify(&[inverted], &mask, &lum, &lum),
            Err(Error::InvalidParameter { name: "region", .. })
        ));
    }

    #[test]
    fn test_region_without_candidates_is_skipped() {
        // big enough to pass the shape filter, but the mask is empty under it
        let reference = checker(16, 16);
        let mut distorted = reference.clone();
        fill_block(&mut distorted, 4, 4, 8, |_, _| 70.0);
        let mask = block_mask(16, 16, 0, 0, 0);
        let region = Region {
            min_col: 4,
            max_col: 11,
            min_row: 4,
            max_row: 11,
            pixel_area: 64,
        };
        let classifier = RegionClassifier::default();
        assert!(classifier.passes_shape(&region));
        assert_eq!(
            classifier.region_stats(&region, &mask, &reference, &distorted).unwrap(),
            None
        );
        let out = classifier.classify(&[region], &mask, &reference, &distorted).unwrap();
        assert!(out.artifacts.is_empty());
        assert_eq!(count_set(&out.mask), 0);
    }
}
