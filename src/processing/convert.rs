//! WebP conversion through the external `cwebp` tool

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::ConvertConfig;
use crate::error::{ImgBatchError, Result};
use crate::parallel::{BatchWorker, WorkResult};
use crate::processing::formats::{is_convertible_path, webp_output_path};

/// Converts one image per call by running `<binary> [args] <input> -o <output>`
#[derive(Debug, Clone)]
pub struct WebpConverter {
    output_folder: PathBuf,
    binary: PathBuf,
    extra_args: Vec<String>,
}

impl WebpConverter {
    /// Converter writing into `output_folder` with the default `cwebp` binary
    pub fn new<P: Into<PathBuf>>(output_folder: P) -> Self {
        Self {
            output_folder: output_folder.into(),
            binary: PathBuf::from("cwebp"),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(&config.output)
            .binary(&config.cwebp_path)
            .extra_args(config.cwebp_args.clone())
    }

    /// Use a different conversion executable
    pub fn binary<P: Into<PathBuf>>(mut self, binary: P) -> Self {
        self.binary = binary.into();
        self
    }

    /// Arguments passed before the input path
    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Convert a single image and return the path of the `.webp` written
    pub async fn convert(&self, input: &Path) -> Result<PathBuf> {
        // create_dir_all tolerates the folder appearing concurrently
        tokio::fs::create_dir_all(&self.output_folder).await?;

        let output = webp_output_path(input, &self.output_folder)?;
        let program = self.binary.display().to_string();

        debug!("Running {} on {:?} -> {:?}", program, input, output);

        let result = Command::new(&self.binary)
            .args(&self.extra_args)
            .arg(input)
            .arg("-o")
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ImgBatchError::process(&program, format!("could not be launched: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let detail = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last();

            let message = match detail {
                Some(detail) => format!("exited with {}: {}", result.status, detail),
                None => format!("exited with {}", result.status),
            };
            return Err(ImgBatchError::process(program, message));
        }

        debug!("Converted {:?} -> {:?}", input, output);
        Ok(output)
    }
}

#[async_trait]
impl BatchWorker<PathBuf> for WebpConverter {
    async fn process(&self, item: &PathBuf) -> WorkResult {
        self.convert(item).await.into()
    }

    fn action(&self) -> &'static str {
        "converting"
    }
}

/// List the convertible images directly inside `folder`.
///
/// Not recursive. Only regular files with a png/jpg/jpeg/gif extension (any
/// case) are returned, sorted for a stable processing order.
pub fn discover_images<P: AsRef<Path>>(folder: P) -> Result<Vec<PathBuf>> {
    let folder = folder.as_ref();

    let metadata = std::fs::metadata(folder)
        .map_err(|e| ImgBatchError::input_not_found(folder.to_path_buf(), e.to_string()))?;
    if !metadata.is_dir() {
        return Err(ImgBatchError::input_not_found(folder.to_path_buf(), "not a directory"));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ImgBatchError::input_not_found(folder.to_path_buf(), e.to_string())
        })?;

        // Follows symlinks the same way a plain metadata() call would
        let is_file = std::fs::metadata(entry.path()).map_or(false, |m| m.is_file());
        if is_file && is_convertible_path(entry.path()) {
            images.push(entry.into_path());
        }
    }

    images.sort();
    Ok(images)
}
