//! Checkpoint cache management
//!
//! Downloaded checkpoints live in an XDG-compliant directory keyed by a
//! filesystem-safe model identifier derived from the repository URL. A cached
//! checkpoint is reused for the lifetime of the installation; the cache is
//! only written during the first download.

use crate::error::{InpaintError, Result};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the cache location
pub const CACHE_DIR_ENV: &str = "LAMA_INPAINT_CACHE_DIR";

/// Checkpoint cache manager
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new cache manager, creating the cache directory if needed
    ///
    /// Uses the XDG Base Directory specification:
    /// - Linux/macOS: `~/.cache/lama-inpaint/models/`
    /// - Windows: `%LOCALAPPDATA%/lama-inpaint/models/`
    ///
    /// # Errors
    /// - Failed to determine or create the cache directory
    pub fn new() -> Result<Self> {
        let cache_dir = Self::resolve_cache_dir()?;

        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)
                .map_err(|e| InpaintError::file_io_error("create cache directory", &cache_dir, &e))?;
        }

        Ok(Self { cache_dir })
    }

    fn resolve_cache_dir() -> Result<PathBuf> {
        if let Ok(cache_override) = std::env::var(CACHE_DIR_ENV) {
            return Ok(PathBuf::from(cache_override).join("models"));
        }

        Ok(dirs::cache_dir()
            .ok_or_else(|| {
                InpaintError::invalid_config(format!(
                    "Failed to determine cache directory. Set {CACHE_DIR_ENV} to override."
                ))
            })?
            .join("lama-inpaint")
            .join("models"))
    }

    /// Generate a filesystem-safe model ID from a repository URL
    ///
    /// HuggingFace URLs map to readable identifiers
    /// (`https://huggingface.co/Carve/LaMa-ONNX` becomes `Carve--LaMa-ONNX`);
    /// anything else falls back to a digest of the URL.
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        let prefix = "https://huggingface.co/";
        if let Some(repo) = url.strip_prefix(prefix) {
            repo.trim_end_matches('/').replace('/', "--")
        } else {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(url.as_bytes());
            let digest = format!("url-{:x}", hasher.finalize());
            digest.get(..16).unwrap_or(&digest).to_string()
        }
    }

    /// Path where a model's checkpoint file is (or will be) cached
    #[must_use]
    pub fn checkpoint_path(&self, model_id: &str, file_name: &str) -> PathBuf {
        self.cache_dir.join(model_id).join(file_name)
    }

    /// Check whether a checkpoint is cached and non-empty
    ///
    /// A zero-length file is treated as absent so an interrupted download is
    /// retried by the next request.
    #[must_use]
    pub fn is_model_cached(&self, model_id: &str, file_name: &str) -> bool {
        let path = self.checkpoint_path(model_id, file_name);
        fs::metadata(&path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
    }

    /// Root cache directory
    #[must_use]
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }
}
