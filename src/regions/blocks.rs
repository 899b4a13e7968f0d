//! Block-level region masks on a regular grid.
//!
//! Each block takes a single class from the pixel masks inside it, which
//! suppresses pixel noise and lines up with block-based codec artifacts.

use imgref::ImgVec;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::field::{LuminanceField, MASK_ON, Mask, ensure_same_size};
use crate::regions::percentile::{
    PixelwiseRegionProvider, RegionClass, RegionMasks, RegionProvider,
};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Regular grid of `block_size` squares covering an image; the last row
/// and column of blocks are clipped at the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    pub width: usize,
    pub height: usize,
    pub block_size: usize,
    pub blocks_x: usize,
    pub blocks_y: usize,
}

impl BlockGrid {
    /// Build a grid, rounding the block counts up.
    ///
    /// # Errors
    ///
    /// Returns an error if `block_size` is zero.
    pub fn new(width: usize, height: usize, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidParameter {
                name: "block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            width,
            height,
            block_size,
            blocks_x: width.div_ceil(block_size),
            blocks_y: height.div_ceil(block_size),
        })
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks_x * self.blocks_y
    }

    /// Index of the block containing pixel `(x, y)`; the pixel must be
    /// inside the image.
    #[must_use]
    pub fn block_index(&self, x: usize, y: usize) -> usize {
        (y / self.block_size) * self.blocks_x + x / self.block_size
    }

    /// Pixel rectangle of a block, clipped to the image.
    #[must_use]
    pub fn block_rect(&self, index: usize) -> BlockRect {
        let bx = index % self.blocks_x;
        let by = index / self.blocks_x;
        let x = bx * self.block_size;
        let y = by * self.block_size;
        BlockRect {
            x,
            y,
            width: self.block_size.min(self.width.saturating_sub(x)),
            height: self.block_size.min(self.height.saturating_sub(y)),
        }
    }
}

/// Decision thresholds for [`block_region_masks`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockVote {
    /// Minimum fraction the majority class needs to label a block.
    pub min_dominant_frac: f64,
    /// Flat and detail both at or above this (with mid below it) makes the
    /// block mid.
    pub strong_pair_frac: f64,
}

impl Default for BlockVote {
    fn default() -> Self {
        Self {
            min_dominant_frac: 0.5,
            strong_pair_frac: 0.3,
        }
    }
}

impl BlockVote {
    /// Class for a block given its per-class pixel counts, or `None` when no
    /// class dominates.
    #[must_use]
    pub fn decide(
        &self,
        flat: usize,
        mid: usize,
        detail: usize,
        area: usize,
    ) -> Option<RegionClass> {
        if area == 0 {
            return None;
        }
        let frac = |n: usize| n as f64 / area as f64;

        if frac(flat) >= self.strong_pair_frac
            && frac(detail) >= self.strong_pair_frac
            && frac(mid) < self.strong_pair_frac
        {
            return Some(RegionClass::Mid);
        }

        let mut best = (flat, RegionClass::Flat);
        if mid > best.0 {
            best = (mid, RegionClass::Mid);
        }
        if detail > best.0 {
            best = (detail, RegionClass::Detail);
        }
        (frac(best.0) >= self.min_dominant_frac).then_some(best.1)
    }
}

/// Collapse pixel-level masks to block-level masks.
///
/// Unclassified blocks stay zero in all three outputs. The returned
/// `gradient` and thresholds are carried over from `pixel`.
pub fn block_region_masks(
    grid: &BlockGrid,
    pixel: &RegionMasks,
    vote: &BlockVote,
) -> Result<RegionMasks> {
    ensure_same_size(&pixel.flat, &pixel.mid)?;
    ensure_same_size(&pixel.flat, &pixel.detail)?;
    if (pixel.width(), pixel.height()) != (grid.width, grid.height) {
        return Err(Error::DimensionMismatch {
            expected: (grid.width, grid.height),
            actual: (pixel.width(), pixel.height()),
        });
    }

    let (w, h) = (grid.width, grid.height);
    let mut flat = vec![0u8; w * h];
    let mut mid = vec![0u8; w * h];
    let mut detail = vec![0u8; w * h];

    for index in 0..grid.block_count() {
        let r = grid.block_rect(index);
        let area = r.width * r.height;
        if area == 0 {
            continue;
        }

        let (mut nf, mut nm, mut nd) = (0, 0, 0);
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                nf += usize::from(pixel.flat[(x, y)] == MASK_ON);
                nm += usize::from(pixel.mid[(x, y)] == MASK_ON);
                nd += usize::from(pixel.detail[(x, y)] == MASK_ON);
            }
        }

        let target = match vote.decide(nf, nm, nd, area) {
            Some(RegionClass::Flat) => &mut flat,
            Some(RegionClass::Mid) => &mut mid,
            Some(RegionClass::Detail) => &mut detail,
            None => continue,
        };
        for y in r.y..r.y + r.height {
            target[y * w + r.x..y * w + r.x + r.width].fill(MASK_ON);
        }
    }

    Ok(RegionMasks {
        flat: ImgVec::new(flat, w, h),
        mid: ImgVec::new(mid, w, h),
        detail: ImgVec::new(detail, w, h),
        gradient: pixel.gradient.clone(),
        flat_threshold: pixel.flat_threshold,
        detail_threshold: pixel.detail_threshold,
    })
}

/// Region provider that votes pixelwise classes into grid blocks.
#[derive(Debug, Clone, Copy)]
pub struct BlockRegionProvider {
    pixelwise: PixelwiseRegionProvider,
    block_size: usize,
    vote: BlockVote,
}

impl Default for BlockRegionProvider {
    fn default() -> Self {
        Self::new(PixelwiseRegionProvider::default(), 16)
    }
}

impl BlockRegionProvider {
    #[must_use]
    pub fn new(pixelwise: PixelwiseRegionProvider, block_size: usize) -> Self {
        Self {
            pixelwise,
            block_size,
            vote: BlockVote::default(),
        }
    }

    /// Segmentation settings and block size from an analysis config.
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(PixelwiseRegionProvider::new(&config.regions), config.block_size)
    }

    #[must_use]
    pub fn with_vote(mut self, vote: BlockVote) -> Self {
        self.vote = vote;
        self
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl RegionProvider for BlockRegionProvider {
    fn compute_regions(&self, reference: &LuminanceField) -> Result<RegionMasks> {
        let pixel = self.pixelwise.compute_regions(reference)?;
        let grid = BlockGrid::new(reference.width(), reference.height(), self.block_size)?;
        block_region_masks(&grid, &pixel, &self.vote)
    }

    fn name(&self) -> &'static str {
        "block_grid"
    }
}

/// Set every pixel of a rectangle in `mask`.
pub fn fill_rect(mask: &mut Mask, rect: BlockRect) {
    for row in mask.rows_mut().skip(rect.y).take(rect.height) {
        row[rect.x..rect.x + rect.width].fill(MASK_ON);
    }
}
