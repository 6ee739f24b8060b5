//! Page image loading.
//!
//! This module provides:
//! - `PageImage`: a decoded invoice page with its file name
//! - `header_bounds`: image dimensions from the file header only
//! - Magic-byte and extension checks for supported image formats

mod page;

pub use page::{
    IMAGE_EXTENSIONS, ImageLoadError, PageImage, is_image_filename, looks_like_image,
    header_bounds,
};
