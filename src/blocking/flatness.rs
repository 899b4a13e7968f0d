//! Per-row sliding-window flatness detection.
//!
//! A column is a candidate when the distorted samples in the trailing window
//! are nearly constant while the pixel moved away from the reference, or
//! the reference was textured over the same window. Channels are combined
//! with a logical OR.

use std::collections::VecDeque;

use imgref::ImgVec;
use rayon::prelude::*;

use crate::config::FlatnessConfig;
use crate::error::{Error, Result};
use crate::field::{LuminanceField, MASK_ON, Mask, ensure_non_empty, ensure_same_size};

/// Most channels a candidate row may combine (L, a, b).
pub const MAX_CHANNELS: usize = 3;

/// Trailing window of the last `capacity` samples.
#[derive(Debug)]
struct Window {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl Window {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    fn push(&mut self, v: f32) {
        self.samples.push_back(v);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// `max - min` over the window.
    fn range(&self) -> f32 {
        let (lo, hi) = self
            .samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo > hi { 0.0 } else { hi - lo }
    }
}

/// Sliding-window detector for one row at a time.
#[derive(Debug, Clone, Copy)]
pub struct RowFlatnessDetector {
    window: usize,
    flat_range: f32,
    diff_threshold: f32,
    ref_range: f32,
}

impl Default for RowFlatnessDetector {
    fn default() -> Self {
        Self::from_config(&FlatnessConfig::default())
    }
}

impl RowFlatnessDetector {
    #[must_use]
    pub fn new(window: usize, flat_range: f32, diff_threshold: f32, ref_range: f32) -> Self {
        Self {
            window,
            flat_range,
            diff_threshold,
            ref_range,
        }
    }

    #[must_use]
    pub fn from_config(config: &FlatnessConfig) -> Self {
        Self::new(config.window, config.flat_range, config.diff_threshold, config.ref_range)
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Mark candidate columns of one channel into `hits`. Columns already set
    /// are left set, so calling this per channel ORs the channels.
    ///
    /// When a candidate follows a non-candidate column, the `window - 1`
    /// columns before it are marked as well: they sit inside the same flat
    /// window. The lookback never reaches further than the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices differ in length or the window is 0.
    pub fn mark_channel(
        &self,
        reference: &[f32],
        distorted: &[f32],
        hits: &mut [bool],
    ) -> Result<()> {
        if self.window == 0 {
            return Err(Error::InvalidParameter {
                name: "window",
                reason: "must be at least 1".to_string(),
            });
        }
        if reference.len() != distorted.len() || hits.len() != distorted.len() {
            return Err(Error::DimensionMismatch {
                expected: (distorted.len(), 1),
                actual: (reference.len().min(hits.len()), 1),
            });
        }

        let mut dist_win = Window::new(self.window);
        let mut ref_win = Window::new(self.window);
        let mut after_gap = false;

        for (x, (&r, &d)) in reference.iter().zip(distorted).enumerate() {
            dist_win.push(d);
            ref_win.push(r);

            let candidate = dist_win.is_full()
                && dist_win.range() <= self.flat_range
                && ((d - r).abs() >= self.diff_threshold || ref_win.range() > self.ref_range);

            if candidate {
                hits[x] = true;
                if after_gap {
                    // window is full, so x + 1 >= window
                    hits[x + 1 - self.window..x].fill(true);
                    after_gap = false;
                }
            } else {
                after_gap = true;
            }
        }
        Ok(())
    }

    /// Candidate row over several channels, written as 0/255 into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel counts differ, exceed
    /// [`MAX_CHANNELS`], are zero, or any row length differs from `out`.
    pub fn detect_row(
        &self,
        reference: &[&[f32]],
        distorted: &[&[f32]],
        out: &mut [u8],
    ) -> Result<()> {
        check_channels(reference.len(), distorted.len())?;
        let mut hits = vec![false; out.len()];
        for (r, d) in reference.iter().zip(distorted) {
            self.mark_channel(r, d, &mut hits)?;
        }
        for (o, hit) in out.iter_mut().zip(hits) {
            *o = if hit { MASK_ON } else { 0 };
        }
        Ok(())
    }

    /// Candidate mask over whole planes. Rows are scanned in parallel.
    ///
    /// # Errors
    ///
    /// Returns an error for empty planes, size mismatches between any two
    /// planes, or an invalid channel count.
    pub fn candidate_mask(
        &self,
        reference: &[&LuminanceField],
        distorted: &[&LuminanceField],
    ) -> Result<Mask> {
        check_channels(reference.len(), distorted.len())?;
        let first = reference[0];
        ensure_non_empty(first, "reference plane")?;
        for plane in reference.iter().chain(distorted) {
            ensure_same_size(first, plane)?;
        }

        let (w, h) = (first.width(), first.height());
        let mut out = vec![0u8; w * h];

        // rows are independent; window state never crosses a row boundary
        out.par_chunks_exact_mut(w)
            .enumerate()
            .try_for_each(|(y, out_row)| {
                let ref_rows: Vec<&[f32]> = reference.iter().map(|p| plane_row(p, y)).collect();
                let dist_rows: Vec<&[f32]> = distorted.iter().map(|p| plane_row(p, y)).collect();
                self.detect_row(&ref_rows, &dist_rows, out_row)
            })?;
        Ok(ImgVec::new(out, w, h))
    }
}

fn plane_row(plane: &LuminanceField, y: usize) -> &[f32] {
    &plane.buf()[y * plane.stride()..][..plane.width()]
}

fn check_channels(reference: usize, distorted: usize) -> Result<()> {
    if reference != distorted {
        return Err(Error::ChannelMismatch {
            expected: reference,
            actual: distorted,
        });
    }
    if reference == 0 || reference > MAX_CHANNELS {
        return Err(Error::ChannelMismatch {
            expected: MAX_CHANNELS,
            actual: reference,
        });
    }
    Ok(())
}
