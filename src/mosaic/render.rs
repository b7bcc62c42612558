//! Mosaic rasterization and PNG output.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, Rgba, RgbaImage};

use super::layout::{choose_layout, rounded_height, Layout, LayoutOptions, MAX_MOSAIC_HEIGHT};
use crate::error::MosaicError;

/// Default output width in pixels.
pub const DEFAULT_MOSAIC_WIDTH: u32 = 1024;

/// Widest canvas `Mosaic::new` accepts.
pub const MAX_MOSAIC_WIDTH: u32 = 4096;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A set of decoded images and the width they must fill.
#[derive(Debug)]
pub struct Mosaic<'a> {
    images: &'a [DynamicImage],
    width: u32,
    aspects: Vec<f64>,
}

impl<'a> Mosaic<'a> {
    /// Validate the inputs and precompute aspect ratios.
    ///
    /// # Errors
    ///
    /// Fails when `images` is empty, `width` is zero or above
    /// [`MAX_MOSAIC_WIDTH`], or any image has a zero dimension.
    pub fn new(images: &'a [DynamicImage], width: u32) -> Result<Self, MosaicError> {
        if images.is_empty() {
            return Err(MosaicError::NoImages);
        }
        if width == 0 {
            return Err(MosaicError::ZeroWidth);
        }
        if width > MAX_MOSAIC_WIDTH {
            return Err(MosaicError::TooLarge { width, height: 0 });
        }

        let aspects = images
            .iter()
            .enumerate()
            .map(|(index, img)| {
                let (w, h) = img.dimensions();
                if w == 0 || h == 0 {
                    Err(MosaicError::InvalidImage {
                        index,
                        width: w,
                        height: h,
                    })
                } else {
                    Ok(f64::from(w) / f64::from(h))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            images,
            width,
            aspects,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// `width / height` of each image, in input order.
    pub fn aspects(&self) -> &[f64] {
        &self.aspects
    }

    /// Search for the layout closest to the target ratio.
    pub fn best_layout(&self, options: &LayoutOptions) -> Result<Layout, MosaicError> {
        choose_layout(&self.aspects, self.width, options)
    }

    /// Paint `layout` onto an opaque black canvas.
    ///
    /// Cell edges are rounded from the exact floating point positions, so
    /// neighbouring cells share an edge and every row reaches the right border.
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::TooLarge`] before allocating when the layout is
    /// taller than [`MAX_MOSAIC_HEIGHT`].
    pub fn draw(&self, layout: &Layout) -> Result<RgbaImage, MosaicError> {
        let height = rounded_height(layout.total_height);
        if !layout.total_height.is_finite() || height > u64::from(MAX_MOSAIC_HEIGHT) {
            return Err(MosaicError::TooLarge {
                width: self.width,
                height,
            });
        }

        let canvas_height = (height as u32).max(1);
        let mut canvas = RgbaImage::from_pixel(self.width, canvas_height, BACKGROUND);
        let last_row = layout.rows.len().saturating_sub(1);

        let mut y = 0.0_f64;
        for (row_index, (row, &row_height)) in
            layout.rows.iter().zip(&layout.row_heights).enumerate()
        {
            let top = y.round() as u32;
            y += row_height;
            let bottom = if row_index == last_row {
                canvas_height
            } else {
                (y.round() as u32).min(canvas_height)
            };
            if bottom <= top {
                continue;
            }

            let mut x = 0.0_f64;
            for image_index in row.clone() {
                let left = x.round() as u32;
                x += row_height * self.aspects[image_index];
                let right = if image_index + 1 == row.end {
                    self.width
                } else {
                    (x.round() as u32).min(self.width)
                };
                if right <= left {
                    continue;
                }

                let cell = self.images[image_index]
                    .resize_exact(right - left, bottom - top, FilterType::Triangle)
                    .to_rgba8();
                imageops::overlay(&mut canvas, &cell, i64::from(left), i64::from(top));
            }
        }

        Ok(canvas)
    }

    /// Choose the best layout for `options` and draw it.
    pub fn render(&self, options: &LayoutOptions) -> Result<RgbaImage, MosaicError> {
        let layout = self.best_layout(options)?;
        self.draw(&layout)
    }
}

/// Encode a canvas as PNG.
pub fn encode_png(canvas: &RgbaImage) -> Result<Bytes, MosaicError> {
    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| MosaicError::EncodeError {
            message: e.to_string(),
        })?;

    Ok(Bytes::from(output))
}
