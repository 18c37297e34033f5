#![allow(clippy::uninlined_format_args)]

//! # LaMa Inpainting Service
//!
//! An HTTP service and library for removing objects from images using a
//! pretrained LaMa (Large Mask Inpainting) model running on ONNX Runtime.
//!
//! Given an image and a mask (white = regenerate, black = preserve), the
//! pipeline binarizes and dilates the mask, reflect-pads both inputs to the
//! model's required dimension multiple, zeroes the masked image region, runs
//! a single forward pass, then crops and composites the reconstruction back
//! against the original so unmasked pixels are bit-preserved.
//!
//! The checkpoint is fetched from a model repository on first use and cached
//! locally; initialization is guarded so concurrent first requests load the
//! model exactly once.
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use lama_inpaint::{InpaintConfig, InpaintProcessor};
//!
//! # async fn example(image: image::DynamicImage, mask: image::DynamicImage) -> anyhow::Result<()> {
//! let config = InpaintConfig::builder().build()?;
//! let processor = InpaintProcessor::new(config);
//!
//! let result = processor.inpaint_image(&image, &mask).await?;
//! result.save("output.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving
//!
//! The `lama-inpaint` binary serves `POST /api/v1/inpaint` accepting
//! `{image, mask}` as base64 or data URIs and returning `{result}` as a PNG
//! data URI.

pub mod backends;
pub mod cache;
pub mod codec;
pub mod config;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod postprocess;
pub mod preprocess;
pub mod processor;
pub mod server;

// Public API exports
pub use backends::OnnxBackend;
pub use cache::ModelCache;
pub use config::{InpaintConfig, InpaintConfigBuilder, OutputFormat};
pub use download::ModelDownloader;
pub use error::{InpaintError, Result};
pub use inference::InpaintBackend;
pub use models::{ModelSource, ModelSpec, DEFAULT_MODEL_FILE, DEFAULT_MODEL_URL};
pub use processor::{BackendFactory, DefaultBackendFactory, InpaintProcessor};
pub use server::{AppState, ServerArgs, SERVICE_NAME};
