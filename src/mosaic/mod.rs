//! Image mosaic engine.
//!
//! Lays out N images of arbitrary aspect ratio in rows that each span the full
//! output width, picking the images-per-row count whose overall aspect ratio
//! is closest to a target, then rasterizes the result.
//!
//! # Example
//!
//! ```
//! use fxtg::mosaic::{LayoutOptions, Mosaic};
//! use image::{DynamicImage, RgbaImage};
//!
//! let images: Vec<DynamicImage> = (0..4)
//!     .map(|_| DynamicImage::ImageRgba8(RgbaImage::new(100, 100)))
//!     .collect();
//!
//! let mosaic = Mosaic::new(&images, 400).unwrap();
//! let layout = mosaic.best_layout(&LayoutOptions::default()).unwrap();
//! let canvas = mosaic.draw(&layout).unwrap();
//!
//! // Two rows of two: 400 wide, 400 tall, ratio 1.0 is closest to 1.35.
//! assert_eq!(layout.images_per_row, 2);
//! assert_eq!((canvas.width(), canvas.height()), (400, 400));
//! ```

mod layout;
mod loader;
mod render;

pub use layout::{
    calculate_layout, choose_layout, Layout, LayoutOptions, DEFAULT_MAX_HEIGHT,
    DEFAULT_MAX_PER_ROW, DEFAULT_MIN_PER_ROW, DEFAULT_TARGET_RATIO, MAX_MOSAIC_HEIGHT,
};
pub use loader::{decode_image, load_images};
pub use render::{encode_png, Mosaic, DEFAULT_MOSAIC_WIDTH, MAX_MOSAIC_WIDTH};
