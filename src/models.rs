//! Model specification and resolution

use crate::cache::ModelCache;
use std::path::PathBuf;

/// Default checkpoint repository (ONNX export of big-lama)
pub const DEFAULT_MODEL_URL: &str = "https://huggingface.co/Carve/LaMa-ONNX";

/// Checkpoint file name inside the repository
pub const DEFAULT_MODEL_FILE: &str = "lama_fp32.onnx";

/// Model source specification
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ModelSource {
    /// Checkpoint file already on the local filesystem
    External(PathBuf),
    /// Checkpoint fetched from a remote repository on first use and cached
    Remote {
        /// Repository URL (HuggingFace layout)
        url: String,
        /// File name to fetch from the repository
        file_name: String,
    },
}

impl ModelSource {
    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            ModelSource::External(path) => format!(
                "external:{}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
            ModelSource::Remote { url, file_name } => {
                format!("{}:{}", ModelCache::url_to_model_id(url), file_name)
            },
        }
    }
}

/// Complete model specification
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelSpec {
    pub source: ModelSource,
}

impl ModelSpec {
    /// Specification for a remote repository checkpoint
    #[must_use]
    pub fn remote<U: Into<String>, F: Into<String>>(url: U, file_name: F) -> Self {
        Self {
            source: ModelSource::Remote {
                url: url.into(),
                file_name: file_name.into(),
            },
        }
    }

    /// Specification for a checkpoint file on disk
    #[must_use]
    pub fn external<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            source: ModelSource::External(path.into()),
        }
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::remote(DEFAULT_MODEL_URL, DEFAULT_MODEL_FILE)
    }
}
