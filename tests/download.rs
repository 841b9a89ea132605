use std::net::SocketAddr;
use std::sync::Arc;

use imgbatch::{BatchRunner, BatchWorker, DownloadConfig, FailureLog, ImageDownloader, WorkResult};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal HTTP/1.1 server with a few canned responses
async fn spawn_image_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&request);
                let target = request.split_whitespace().nth(1).unwrap_or("/");
                let path = target.split('?').next().unwrap_or("/");

                let (status, declared_len, body): (&str, Option<usize>, Vec<u8>) = match path {
                    "/img/cat.jpg" => ("200 OK", None, b"cat bytes".to_vec()),
                    "/img/big.png" => ("200 OK", None, vec![7u8; 100_000]),
                    "/img/truncated.jpg" => ("200 OK", Some(1000), b"only ten b".to_vec()),
                    _ => ("404 Not Found", None, b"missing".to_vec()),
                };

                let header = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                    status,
                    declared_len.unwrap_or(body.len())
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn downloader(dir: &TempDir) -> ImageDownloader {
    let config = DownloadConfig {
        output: dir.path().join("images"),
        timeout_seconds: Some(10),
        ..DownloadConfig::default()
    };
    ImageDownloader::new(&config).unwrap()
}

#[tokio::test]
async fn downloads_body_to_last_path_segment() {
    let addr = spawn_image_server().await;
    let dir = TempDir::new().unwrap();
    let downloader = downloader(&dir);

    let path = downloader
        .download(&format!("http://{}/img/cat.jpg?size=large", addr))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("images").join("cat.jpg"));
    assert_eq!(std::fs::read(&path).unwrap(), b"cat bytes");
}

#[tokio::test]
async fn large_body_is_streamed_completely() {
    let addr = spawn_image_server().await;
    let dir = TempDir::new().unwrap();

    let path = downloader(&dir)
        .download(&format!("http://{}/img/big.png", addr))
        .await
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 100_000);
    assert!(bytes.iter().all(|b| *b == 7));
}

#[tokio::test]
async fn http_error_status_is_item_failure() {
    let addr = spawn_image_server().await;
    let dir = TempDir::new().unwrap();
    let downloader = downloader(&dir);

    let result = downloader
        .process(&format!("http://{}/img/missing.jpg", addr))
        .await;

    match result {
        WorkResult::Failure { reason } => assert!(reason.contains("404"), "{}", reason),
        WorkResult::Success => panic!("404 must not count as success"),
    }
    assert!(!dir.path().join("images").join("missing.jpg").exists());
}

#[tokio::test]
async fn truncated_body_leaves_no_partial_file() {
    let addr = spawn_image_server().await;
    let dir = TempDir::new().unwrap();

    let result = downloader(&dir)
        .process(&format!("http://{}/img/truncated.jpg", addr))
        .await;

    assert!(!result.is_success());
    assert!(!dir.path().join("images").join("truncated.jpg").exists());
}

#[tokio::test]
async fn refused_connection_is_item_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = TempDir::new().unwrap();

    let result = downloader(&dir)
        .process(&format!("http://127.0.0.1:{}/img/cat.jpg", port))
        .await;

    assert!(!result.is_success());
}

#[tokio::test]
async fn batch_download_logs_failures_and_keeps_going() {
    let addr = spawn_image_server().await;
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("error_log.txt");

    let missing = format!("http://{}/img/missing.jpg", addr);
    let urls = vec![
        format!("http://{}/img/cat.jpg", addr),
        missing.clone(),
        String::new(),
        format!("http://{}/img/big.png", addr),
    ];

    let log = Arc::new(FailureLog::new(&log_path, "downloading"));
    let summary = BatchRunner::new(3)
        .unwrap()
        .run(urls, Arc::new(downloader(&dir)), Arc::clone(&log))
        .await
        .unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(log.entries(), 2);

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents
        .lines()
        .any(|line| line.starts_with(&format!("Error downloading {}: ", missing)) && line.contains("404")));
    assert!(contents
        .lines()
        .any(|line| line.starts_with("Error downloading : invalid URL")));

    assert!(dir.path().join("images").join("cat.jpg").exists());
    assert!(dir.path().join("images").join("big.png").exists());
}
