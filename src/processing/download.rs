//! Streaming HTTP image downloads

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::DownloadConfig;
use crate::error::{ImgBatchError, Result};
use crate::parallel::{BatchWorker, WorkResult};

/// Downloads one URL per call into a fixed folder.
///
/// A single [`reqwest::Client`] is shared by every call, so connections are
/// pooled across the batch.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    output_folder: PathBuf,
}

impl ImageDownloader {
    /// Build a downloader writing into `config.output`
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("imgbatch/{}", crate::VERSION));

        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            client: builder.build()?,
            output_folder: config.output.clone(),
        })
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Download `url` and return the path of the file written
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        let url = Url::parse(url)
            .map_err(|e| ImgBatchError::invalid_item(format!("invalid URL: {}", e)))?;
        let file_name = file_name_from_url(&url).ok_or_else(|| {
            ImgBatchError::invalid_item("cannot derive a file name from URL")
        })?;

        tokio::fs::create_dir_all(&self.output_folder).await?;

        let mut response = self.client.get(url).send().await?.error_for_status()?;

        let destination = self.output_folder.join(file_name);
        let mut file = File::create(&destination).await?;

        match stream_body(&mut response, &mut file).await {
            Ok(bytes) => {
                debug!("Saved {} bytes to {:?}", bytes, destination);
                Ok(destination)
            }
            Err(e) => {
                drop(file);
                // Partial files would look like successful downloads
                let _ = tokio::fs::remove_file(&destination).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl BatchWorker<String> for ImageDownloader {
    async fn process(&self, item: &String) -> WorkResult {
        self.download(item).await.into()
    }

    fn action(&self) -> &'static str {
        "downloading"
    }
}

async fn stream_body(response: &mut Response, file: &mut File) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Last segment of the URL path, or `None` when the path ends in `/`.
///
/// The segment is used as-is (still percent-encoded); the query string and
/// fragment are ignored.
pub fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .last()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Read one URL per line from `path`.
///
/// Trailing whitespace (including `\r`) is stripped. Blank lines are kept as
/// items; they fail individually and end up in the error log.
pub fn read_url_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ImgBatchError::input_not_found(path.to_path_buf(), e.to_string()))?;

    Ok(content.lines().map(|line| line.trim_end().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url(&url("https://example.com/img/cat.jpg?size=large#top")),
            Some("cat.jpg".to_string())
        );
        assert_eq!(
            file_name_from_url(&url("https://example.com/a%20b.png")),
            Some("a%20b.png".to_string())
        );
        assert_eq!(file_name_from_url(&url("https://example.com/img/")), None);
        assert_eq!(file_name_from_url(&url("https://example.com")), None);
        assert_eq!(file_name_from_url(&url("mailto:someone@example.com")), None);
    }

    #[test]
    fn test_read_url_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://a/1.jpg  \r\n\nhttp://a/2.png\t\n").unwrap();

        let urls = read_url_list(&path).unwrap();
        assert_eq!(urls, vec!["http://a/1.jpg", "", "http://a/2.png"]);
    }

    #[test]
    fn test_read_missing_url_list() {
        let dir = TempDir::new().unwrap();
        let err = read_url_list(dir.path().join("missing.txt")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_invalid_items_fail_without_network() {
        let dir = TempDir::new().unwrap();
        let config = DownloadConfig {
            output: dir.path().join("images"),
            ..DownloadConfig::default()
        };
        let downloader = ImageDownloader::new(&config).unwrap();

        let blank = downloader.process(&String::new()).await;
        assert!(matches!(blank, WorkResult::Failure { ref reason } if reason.starts_with("invalid URL")));

        let folder = downloader.process(&"http://127.0.0.1:9/images/".to_string()).await;
        assert_eq!(folder, WorkResult::failure("cannot derive a file name from URL"));
    }
}
