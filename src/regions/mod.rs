//! Flat / mid / detail region segmentation of a reference plane.
//!
//! A smoothed gradient field is cut at two percentiles of its own
//! distribution ([`PercentileRegionClassifier`]). The resulting masks can be
//! used pixelwise or voted onto a block grid ([`BlockRegionProvider`]), and
//! drive the masked scores in [`scores`].

pub mod blocks;
pub mod gradient;
pub mod percentile;
pub mod scores;

pub use blocks::{BlockGrid, BlockRect, BlockRegionProvider, BlockVote, block_region_masks};
pub use gradient::GradientFieldBuilder;
pub use percentile::{
    PercentileRegionClassifier, PixelwiseRegionProvider, RegionClass, RegionMasks, RegionProvider,
};
pub use scores::{MaskedScore, blur_score, impulse_score};
