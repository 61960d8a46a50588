use crate::config::TransferMode;
use crate::core::api::{ensure_success, ApiClient};
use crate::core::error::{ClientError, ClientResult};
use crate::core::metadata::{AudioFormat, VideoInfo};
use crate::utils::{filename_from_content_disposition, numbered_path, sanitize_filename};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const DEFAULT_VIDEO_FILENAME: &str = "download.mp4";
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Byte counts after a received chunk. `percent` is only known when the
/// response declared its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub received: u64,
    pub total: Option<u64>,
    pub percent: Option<u8>,
}

impl Progress {
    pub fn new(received: u64, total: Option<u64>) -> Self {
        let percent = total.map(|total| {
            if total == 0 {
                100
            } else {
                (received.saturating_mul(100) / total).min(100) as u8
            }
        });
        Self {
            received,
            total,
            percent,
        }
    }

    fn complete(received: u64, total: Option<u64>) -> Self {
        Self {
            received,
            total,
            percent: total.map(|_| 100),
        }
    }
}

/// Where finished downloads end up.
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<PathBuf>;
}

/// Writes into a directory without overwriting existing files.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // create_new claims a name atomically
        let mut n = 0;
        let (path, mut file) = loop {
            let path = numbered_path(&self.dir, filename, n);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(&bytes).await?;
        file.flush().await?;
        info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

pub struct Downloader {
    api: ApiClient,
    mode: TransferMode,
    sink: Arc<dyn FileSink>,
}

impl Downloader {
    pub fn new(api: ApiClient, mode: TransferMode, sink: Arc<dyn FileSink>) -> Self {
        Self { api, mode, sink }
    }

    /// Has the backend prepare `quality` of the submitted video and saves the result.
    pub async fn download_video<F>(
        &self,
        source_url: &str,
        info: &VideoInfo,
        quality: &str,
        on_progress: F,
    ) -> ClientResult<PathBuf>
    where
        F: FnMut(Progress) + Send,
    {
        let response = self.api.process_download(source_url, info, quality).await?;
        self.receive(response, DEFAULT_VIDEO_FILENAME, on_progress).await
    }

    /// Audio formats carry a direct URL, so the backend is skipped.
    pub async fn download_audio<F>(&self, format: &AudioFormat, on_progress: F) -> ClientResult<PathBuf>
    where
        F: FnMut(Progress) + Send,
    {
        info!("Downloading audio {} from {}", format.label(), format.url);
        let response = self
            .api
            .http()
            .get(&format.url)
            .send()
            .await
            .map_err(ClientError::transport)?;
        let response = ensure_success(response).await?;

        let ext = sanitize_filename(&format.ext);
        let fallback = if ext.is_empty() {
            "audio".to_string()
        } else {
            format!("audio.{}", ext)
        };
        self.receive(response, &fallback, on_progress).await
    }

    async fn receive<F>(
        &self,
        response: reqwest::Response,
        fallback_name: &str,
        mut on_progress: F,
    ) -> ClientResult<PathBuf>
    where
        F: FnMut(Progress) + Send,
    {
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| fallback_name.to_string());
        let total = response.content_length();
        debug!("receiving {} ({:?} bytes declared)", filename, total);

        let bytes = match self.mode {
            TransferMode::Buffered => {
                let bytes = response.bytes().await.map_err(ClientError::transport)?;
                bytes.to_vec()
            }
            TransferMode::Streaming => {
                let mut buffer = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);
                on_progress(Progress::new(0, total));
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(ClientError::transport)?;
                    buffer.extend_from_slice(&chunk);
                    on_progress(Progress::new(buffer.len() as u64, total));
                }
                buffer
            }
        };

        on_progress(Progress::complete(bytes.len() as u64, total));
        self.sink.save(&filename, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress::new(0, Some(200)).percent, Some(0));
        assert_eq!(Progress::new(50, Some(200)).percent, Some(25));
        assert_eq!(Progress::new(300, Some(200)).percent, Some(100));
        assert_eq!(Progress::new(0, Some(0)).percent, Some(100));
        assert_eq!(Progress::new(1024, None).percent, None);
    }

    #[test]
    fn test_complete_is_full_only_with_known_total() {
        assert_eq!(Progress::complete(10, Some(10)).percent, Some(100));
        assert_eq!(Progress::complete(10, None).percent, None);
    }

    #[tokio::test]
    async fn test_directory_sink_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("nested"));
        let first = sink.save("clip.mp4", b"one".to_vec()).await.unwrap();
        let second = sink.save("clip.mp4", b"two".to_vec()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert_eq!(second, dir.path().join("nested").join("clip (1).mp4"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let saves = (0..8u8).map(|i| sink.save("clip.mp4", vec![i; 4096]));
        let paths: Vec<PathBuf> = futures::future::try_join_all(saves).await.unwrap();

        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), 8);
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(std::fs::read(path).unwrap(), vec![i as u8; 4096]);
        }
    }
}
