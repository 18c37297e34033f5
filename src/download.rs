//! Checkpoint downloading from remote model repositories
//!
//! Downloads the single ONNX checkpoint file a model spec points at, streaming
//! it to a temporary location and renaming it into the cache only once the
//! transfer is complete. A failed download never leaves a partial file where
//! the cache lookup would find it, so the next request retries the fetch.

use crate::cache::ModelCache;
use crate::error::{InpaintError, Result};
use futures_util::TryStreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Checkpoint downloader
#[derive(Debug)]
pub struct ModelDownloader {
    client: Client,
    cache: ModelCache,
}

impl ModelDownloader {
    /// Create a new downloader backed by the default cache location
    ///
    /// # Errors
    /// - Failed to create the HTTP client
    /// - Failed to initialize the checkpoint cache
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| InpaintError::network_error("Failed to create HTTP client", e))?;

        let cache = ModelCache::new()?;
        Ok(Self { client, cache })
    }

    /// Create a downloader using an existing cache manager
    #[must_use]
    pub fn with_cache(client: Client, cache: ModelCache) -> Self {
        Self { client, cache }
    }

    /// Ensure the checkpoint for `url`/`file_name` is present in the cache
    ///
    /// Returns the local path to the checkpoint. If the file is already
    /// cached the download is skipped entirely.
    ///
    /// # Errors
    /// - Network failures or non-success HTTP status during the fetch
    /// - File system errors while writing to the cache
    pub async fn ensure_checkpoint(&self, url: &str, file_name: &str) -> Result<PathBuf> {
        let model_id = ModelCache::url_to_model_id(url);
        let final_path = self.cache.checkpoint_path(&model_id, file_name);

        if self.cache.is_model_cached(&model_id, file_name) {
            tracing::info!(model_id, "checkpoint already cached");
            return Ok(final_path);
        }

        let file_url = format!("{}/resolve/main/{}", url.trim_end_matches('/'), file_name);
        tracing::info!(model_id, url = %file_url, "downloading checkpoint");

        let temp_path = final_path.with_extension("download");
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| InpaintError::file_io_error("create model directory", parent, &e))?;
        }

        match self.download_file(&file_url, &temp_path).await {
            Ok(bytes) => {
                fs::rename(&temp_path, &final_path).map_err(|e| {
                    InpaintError::file_io_error("move downloaded checkpoint into cache", &final_path, &e)
                })?;
                tracing::info!(model_id, bytes, "checkpoint download complete");
                Ok(final_path)
            },
            Err(e) => {
                if temp_path.exists() {
                    if let Err(cleanup_err) = fs::remove_file(&temp_path) {
                        tracing::warn!("failed to clean up partial download: {cleanup_err}");
                    }
                }
                Err(e)
            },
        }
    }

    /// Stream a single file to disk, returning the byte count
    async fn download_file(&self, url: &str, dest: &PathBuf) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InpaintError::network_error("Checkpoint request failed", e))?;

        if !response.status().is_success() {
            return Err(InpaintError::model(format!(
                "Checkpoint fetch returned HTTP {} for {url}",
                response.status()
            )));
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| InpaintError::file_io_error("create download file", dest, &e))?;

        // Hash incrementally while streaming so the checkpoint is never held
        // in memory or re-read from disk.
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 64 * 1024];
        let mut bytes: u64 = 0;
        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|e| InpaintError::network_error("Checkpoint transfer failed", e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            file.write_all(&buffer[..read])
                .await
                .map_err(|e| InpaintError::file_io_error("write download file", dest, &e))?;
            bytes += read as u64;
        }
        file.flush()
            .await
            .map_err(|e| InpaintError::file_io_error("flush download file", dest, &e))?;

        if bytes == 0 {
            return Err(InpaintError::model(format!("Checkpoint at {url} is empty")));
        }

        // Digest logged for manual verification; the repository publishes no
        // authoritative checksum to compare against.
        let digest = hasher.finalize();
        tracing::debug!(sha256 = %format!("{digest:x}"), bytes, "checkpoint integrity digest");

        Ok(bytes)
    }
}
