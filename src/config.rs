//! Configuration types for inpainting operations

use crate::error::{InpaintError, Result};
use crate::models::ModelSpec;
use serde::{Deserialize, Serialize};

/// Output image format options for encoded results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[value(rename_all = "lower")]
pub enum OutputFormat {
    /// PNG, lossless (default)
    Png,
    /// JPEG, lossy
    Jpeg,
    /// WebP
    WebP,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

impl OutputFormat {
    /// Map onto the image crate's format enum
    #[must_use]
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

/// Configuration for the inpainting processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InpaintConfig {
    /// Model specification (remote repository or local file)
    pub model_spec: ModelSpec,

    /// Output format for encoded results
    pub output_format: OutputFormat,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            model_spec: ModelSpec::default(),
            output_format: OutputFormat::default(),
            intra_threads: 0,
            inter_threads: 0,
        }
    }
}

impl InpaintConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> InpaintConfigBuilder {
        InpaintConfigBuilder::new()
    }
}

/// Builder for [`InpaintConfig`]
#[derive(Debug, Default)]
pub struct InpaintConfigBuilder {
    config: InpaintConfig,
}

impl InpaintConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model specification
    #[must_use]
    pub fn model_spec(mut self, model_spec: ModelSpec) -> Self {
        self.config.model_spec = model_spec;
        self
    }

    /// Set the output format for encoded results
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set intra-op thread count (0 = auto-detect)
    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    /// Set inter-op thread count (0 = auto-detect)
    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    /// - Thread counts outside the supported range
    pub fn build(self) -> Result<InpaintConfig> {
        if self.config.intra_threads > 256 {
            return Err(InpaintError::invalid_config(format!(
                "Invalid intra_threads: {} (valid range: 0-256)",
                self.config.intra_threads
            )));
        }
        if self.config.inter_threads > 256 {
            return Err(InpaintError::invalid_config(format!(
                "Invalid inter_threads: {} (valid range: 0-256)",
                self.config.inter_threads
            )));
        }
        Ok(self.config)
    }
}
