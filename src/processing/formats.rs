//! Image format detection by file extension

use std::path::{Path, PathBuf};

use crate::error::{ImgBatchError, Result};

/// Formats the converter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Get file extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }

    /// Match an extension, ignoring ASCII case
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Whether files of this format are picked up for WebP conversion
    pub fn is_convertible(self) -> bool {
        !matches!(self, Self::WebP)
    }
}

/// Check if a path has a convertible extension
pub fn is_convertible_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .map_or(false, ImageFormat::is_convertible)
}

/// `<output_folder>/<file stem>.webp` for a source image
pub fn webp_output_path<P: AsRef<Path>>(input: P, output_folder: &Path) -> Result<PathBuf> {
    let input = input.as_ref();
    let stem = input.file_stem().ok_or_else(|| {
        ImgBatchError::invalid_item(format!("{} has no file name", input.display()))
    })?;

    // Appended rather than set_extension: stems may contain dots
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(ImageFormat::WebP.extension());
    Ok(output_folder.join(file_name))
}
