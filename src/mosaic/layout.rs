//! Row layout search.
//!
//! Every row is scaled so its images share one height and together fill the
//! output width exactly:
//!
//! ```text
//! row_height = width / Σ(w_i / h_i)
//! ```

use std::ops::Range;

use crate::error::MosaicError;

/// Default target aspect ratio (width / height) of the whole mosaic.
pub const DEFAULT_TARGET_RATIO: f64 = 1.35;

/// Default lower bound for images per row.
pub const DEFAULT_MIN_PER_ROW: usize = 1;

/// Default upper bound for images per row.
pub const DEFAULT_MAX_PER_ROW: usize = 5;

/// Default tallest canvas a layout may produce, in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 4096;

/// Hard ceiling for `LayoutOptions::max_height`.
pub const MAX_MOSAIC_HEIGHT: u32 = 8192;

/// Bounds for the layout search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub target_ratio: f64,
    pub min_per_row: usize,
    pub max_per_row: usize,

    /// Candidates taller than this (after rounding) are skipped
    pub max_height: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            target_ratio: DEFAULT_TARGET_RATIO,
            min_per_row: DEFAULT_MIN_PER_ROW,
            max_per_row: DEFAULT_MAX_PER_ROW,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

impl LayoutOptions {
    fn validate(&self) -> Result<(), MosaicError> {
        if self.min_per_row == 0 {
            return Err(MosaicError::InvalidOptions(
                "min_per_row must be at least 1".to_string(),
            ));
        }
        if self.min_per_row > self.max_per_row {
            return Err(MosaicError::InvalidOptions(format!(
                "min_per_row ({}) exceeds max_per_row ({})",
                self.min_per_row, self.max_per_row
            )));
        }
        if !self.target_ratio.is_finite() || self.target_ratio <= 0.0 {
            return Err(MosaicError::InvalidOptions(format!(
                "target_ratio must be positive, got {}",
                self.target_ratio
            )));
        }
        if self.max_height == 0 || self.max_height > MAX_MOSAIC_HEIGHT {
            return Err(MosaicError::InvalidOptions(format!(
                "max_height must be between 1 and {}, got {}",
                MAX_MOSAIC_HEIGHT, self.max_height
            )));
        }
        Ok(())
    }
}

/// A candidate arrangement of images into rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Output width in pixels
    pub width: u32,

    /// Images per row used to partition (the last row may hold fewer)
    pub images_per_row: usize,

    /// Consecutive image index ranges, one per row
    pub rows: Vec<Range<usize>>,

    /// Height of each row, aligned with `rows`
    pub row_heights: Vec<f64>,

    /// Sum of all row heights
    pub total_height: f64,

    /// `width / total_height`
    pub ratio: f64,
}

impl Layout {
    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Partition images into rows of `images_per_row` and measure the result.
///
/// `aspects` holds `width / height` for each image, in order. Callers must
/// pass at least one aspect and a non-zero `images_per_row`.
pub fn calculate_layout(aspects: &[f64], width: u32, images_per_row: usize) -> Layout {
    let per_row = images_per_row.max(1);
    let rows: Vec<Range<usize>> = (0..aspects.len())
        .step_by(per_row)
        .map(|start| start..(start + per_row).min(aspects.len()))
        .collect();

    let row_heights: Vec<f64> = rows
        .iter()
        .map(|row| row_height(&aspects[row.clone()], width))
        .collect();
    let total_height: f64 = row_heights.iter().sum();

    Layout {
        width,
        images_per_row: per_row,
        rows,
        row_heights,
        total_height,
        ratio: f64::from(width) / total_height,
    }
}

/// Height at which the given aspects exactly fill `width`.
pub(crate) fn row_height(aspects: &[f64], width: u32) -> f64 {
    f64::from(width) / aspects.iter().sum::<f64>()
}

/// Pick the layout whose ratio is closest to `options.target_ratio`.
///
/// Candidates are tried in ascending images-per-row order and only a strictly
/// better candidate replaces the current best, so ties go to fewer images per
/// row. Candidates taller than `options.max_height` are never chosen; if none
/// fit, the error reports the shortest one.
pub fn choose_layout(
    aspects: &[f64],
    width: u32,
    options: &LayoutOptions,
) -> Result<Layout, MosaicError> {
    if aspects.is_empty() {
        return Err(MosaicError::NoImages);
    }
    if width == 0 {
        return Err(MosaicError::ZeroWidth);
    }
    options.validate()?;

    let mut best: Option<(f64, Layout)> = None;
    let mut shortest = f64::INFINITY;

    for images_per_row in options.min_per_row..=options.max_per_row {
        let layout = calculate_layout(aspects, width, images_per_row);
        shortest = shortest.min(layout.total_height);

        if !fits(&layout, options.max_height) {
            continue;
        }

        let diff = (layout.ratio - options.target_ratio).abs();
        if best.as_ref().map_or(true, |(best_diff, _)| diff < *best_diff) {
            best = Some((diff, layout));
        }
    }

    best.map(|(_, layout)| layout)
        .ok_or_else(|| MosaicError::TooLarge {
            width,
            height: rounded_height(shortest),
        })
}

fn fits(layout: &Layout, max_height: u32) -> bool {
    let height = layout.total_height.round();
    height.is_finite() && height <= f64::from(max_height)
}

/// Canvas height for a total row height, saturating on overflow.
pub(crate) fn rounded_height(total_height: f64) -> u64 {
    // `as` saturates, and maps NaN to 0.
    total_height.round() as u64
}
