//! Streaming row-by-row region extraction from a binary mask.
//!
//! Each row is run-length encoded. Active regions, in creation order, take
//! the first unassigned run of the next row that overlaps their column span.
//! Regions that find no run are finished; runs that find no region open new
//! ones. Only vertically adjacent rows merge, so a single empty row always
//! splits a blob in two.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::Mask;

/// Maximal horizontal span of set pixels, `[col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub row: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Run {
    #[must_use]
    pub fn width(&self) -> usize {
        self.col_end - self.col_start
    }

    fn overlaps(&self, region: &Region) -> bool {
        self.col_start <= region.max_col && self.col_end > region.min_col
    }
}

/// Vertically contiguous stack of runs. Column and row bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub min_col: usize,
    pub max_col: usize,
    pub min_row: usize,
    pub max_row: usize,
    /// Exact number of set pixels merged into the region.
    pub pixel_area: usize,
}

impl Region {
    fn from_run(run: &Run) -> Self {
        Self {
            min_col: run.col_start,
            max_col: run.col_end - 1,
            min_row: run.row,
            max_row: run.row,
            pixel_area: run.width(),
        }
    }

    fn extend(&mut self, run: &Run) {
        self.min_col = self.min_col.min(run.col_start);
        self.max_col = self.max_col.max(run.col_end - 1);
        self.max_row = run.row;
        self.pixel_area += run.width();
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    #[must_use]
    pub fn bbox_area(&self) -> usize {
        self.width() * self.height()
    }

    /// Set pixels per bounding-box pixel, in (0, 1].
    #[must_use]
    pub fn fill_ratio(&self) -> f64 {
        self.pixel_area as f64 / self.bbox_area() as f64
    }
}

/// Append the runs of one mask row (any non-zero byte is set) to `runs`.
pub fn collect_runs(row_index: usize, row: &[u8], runs: &mut Vec<Run>) {
    let mut start = None;
    for (x, &v) in row.iter().enumerate() {
        match (v != 0, start) {
            (true, None) => start = Some(x),
            (false, Some(s)) => {
                runs.push(Run {
                    row: row_index,
                    col_start: s,
                    col_end: x,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(Run {
            row: row_index,
            col_start: s,
            col_end: row.len(),
        });
    }
}

/// Incremental region builder fed one mask row at a time, top to bottom.
///
/// Regions live in an arena and are addressed by index; `active` holds the
/// ones that may still grow, `finished` the ones that no longer can.
#[derive(Debug, Default)]
pub struct StreamingRegionExtractor {
    regions: Vec<Region>,
    active: Vec<usize>,
    finished: Vec<usize>,
    next_row: usize,
    width: Option<usize>,
    runs: Vec<Run>,
    assigned: Vec<bool>,
}

impl StreamingRegionExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows consumed so far.
    #[must_use]
    pub fn rows_seen(&self) -> usize {
        self.next_row
    }

    /// Regions that may still be extended by the next row.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Feed the next row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row length differs from the first row's.
    pub fn push_row(&mut self, row: &[u8]) -> Result<()> {
        match self.width {
            None => self.width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(Error::DimensionMismatch {
                    expected: (w, 1),
                    actual: (row.len(), 1),
                });
            }
            Some(_) => {}
        }
        self.push_row_unchecked(row);
        Ok(())
    }

    /// Row step without the width check.
    fn push_row_unchecked(&mut self, row: &[u8]) {
        let row_index = self.next_row;
        let Self {
            regions,
            active,
            finished,
            runs,
            assigned,
            ..
        } = self;

        runs.clear();
        collect_runs(row_index, row, runs);
        assigned.clear();
        assigned.resize(runs.len(), false);

        let mut still_active = Vec::with_capacity(active.len() + runs.len());
        for &idx in active.iter() {
            let region = &mut regions[idx];
            let next_row = region.max_row + 1;
            let hit = runs.iter().enumerate().find(|&(i, run)| {
                !assigned[i] && run.row == next_row && run.overlaps(region)
            });
            match hit {
                Some((i, run)) => {
                    region.extend(run);
                    assigned[i] = true;
                    still_active.push(idx);
                }
                None => finished.push(idx),
            }
        }

        for (run, _) in runs.iter().zip(assigned.iter()).filter(|&(_, &a)| !a) {
            regions.push(Region::from_run(run));
            still_active.push(regions.len() - 1);
        }

        *active = still_active;
        self.next_row += 1;
    }

    /// Finish every active region and return all regions in the order they
    /// were finished.
    #[must_use]
    pub fn finish(mut self) -> Vec<Region> {
        self.finished.append(&mut self.active);
        self.finished.iter().map(|&i| self.regions[i]).collect()
    }
}

/// Extract all regions of a mask in one pass.
#[must_use]
pub fn extract_regions(mask: &Mask) -> Vec<Region> {
    let mut extractor = StreamingRegionExtractor {
        width: Some(mask.width()),
        ..StreamingRegionExtractor::new()
    };
    for row in mask.rows() {
        extractor.push_row_unchecked(row);
    }
    extractor.finish()
}
