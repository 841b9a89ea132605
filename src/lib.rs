//! imgbatch - bounded-concurrency batch tools for images
//!
//! Two batch jobs share one core:
//!
//! - **convert**: turn every PNG/JPEG/GIF in a folder into WebP via `cwebp`
//! - **download**: fetch a list of image URLs into a folder
//!
//! Both run a per-item worker through [`BatchRunner`], which keeps at most N
//! workers in flight, counts completions, and hands every failure to an
//! observer (normally a [`FailureLog`]) instead of aborting the batch.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imgbatch::{discover_images, BatchRunner, FailureLog, WebpConverter};
//!
//! # async fn demo() -> imgbatch::Result<()> {
//! let images = discover_images("photos")?;
//! let converter = WebpConverter::new("webp_images");
//! let log = FailureLog::new("webp_error_log.txt", "converting");
//!
//! let summary = BatchRunner::new(8)?
//!     .run(images, Arc::new(converter), Arc::new(log))
//!     .await?;
//!
//! println!("{} converted, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, ConvertConfig, DownloadConfig};
pub use error::{ImgBatchError, Result};
pub use parallel::{
    BatchItem, BatchObserver, BatchRunner, BatchSummary, BatchWorker, FailureLog, NoopObserver,
    WorkResult,
};
pub use processing::{discover_images, read_url_list, ImageDownloader, WebpConverter};

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber, logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| ImgBatchError::config(format!("Invalid log level '{}': {}", default_level, e)))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        debug!("imgbatch v{} initialized", VERSION);
    }

    Ok(())
}

/// Initialize logging with the default `warn` level
pub fn init() -> Result<()> {
    init_logging("warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Should not fail on multiple calls
        assert!(init().is_ok());
        assert!(init_logging("debug").is_ok());
    }
}
