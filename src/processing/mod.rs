//! Per-item workers plugged into the batch runner
//!
//! Each worker turns one input (an image path or a URL) into one file in its
//! output folder and reports a [`WorkResult`](crate::parallel::WorkResult).

pub mod convert;
pub mod download;
pub mod formats;

pub use convert::{discover_images, WebpConverter};
pub use download::{file_name_from_url, read_url_list, ImageDownloader};
pub use formats::{is_convertible_path, webp_output_path, ImageFormat};
