//! ONNX Runtime backend for the inpainting model
//!
//! Implements [`InpaintBackend`] using `ort`. The LaMa export takes two
//! positional inputs (masked image, mask) and produces one output tensor; the
//! session is built once from the checkpoint bytes and reused for every
//! forward pass. CPU execution only.

use crate::config::InpaintConfig;
use crate::error::{InpaintError, Result};
use crate::inference::InpaintBackend;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::Path;
use std::time::{Duration, Instant};

/// ONNX Runtime backend holding the loaded inference session
#[derive(Debug, Default)]
pub struct OnnxBackend {
    session: Option<Session>,
}

impl OnnxBackend {
    /// Create an uninitialized backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn load_model(&mut self, model_path: &Path, config: &InpaintConfig) -> Result<Duration> {
        let model_load_start = Instant::now();

        let model_data = std::fs::read(model_path)
            .map_err(|e| InpaintError::file_io_error("read checkpoint", model_path, &e))?;

        // Auto-detect threading when unset: all cores for intra-op work, a
        // small pool for inter-op coordination.
        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
        };
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
                / 4)
            .max(1)
        };

        let session = Session::builder()
            .map_err(|e| InpaintError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InpaintError::model(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| InpaintError::model(format!("Failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| InpaintError::model(format!("Failed to set inter threads: {e}")))?
            .commit_from_memory(&model_data)
            .map_err(|e| {
                InpaintError::model(format!("Failed to create session from checkpoint data: {e}"))
            })?;

        self.session = Some(session);

        let model_load_time = model_load_start.elapsed();
        #[allow(clippy::cast_precision_loss)] // display only
        let size_mb = model_data.len() as f64 / (1024.0 * 1024.0);
        tracing::info!(
            "model loaded: {size_mb:.2} MB in {:.0}ms ({intra_threads} intra / {inter_threads} inter threads)",
            model_load_time.as_secs_f64() * 1000.0
        );

        Ok(model_load_time)
    }
}

impl InpaintBackend for OnnxBackend {
    fn initialize(
        &mut self,
        model_path: &Path,
        config: &InpaintConfig,
    ) -> Result<Option<Duration>> {
        if self.session.is_some() {
            return Ok(None);
        }
        let model_load_time = self.load_model(model_path, config)?;
        Ok(Some(model_load_time))
    }

    fn infer(&mut self, image: &Array4<f32>, mask: &Array4<f32>) -> Result<Array4<f32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| InpaintError::internal("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        tracing::debug!(input_shape = ?image.dim(), "starting inference");

        let image_value = Value::from_array(image.clone()).map_err(|e| {
            InpaintError::processing(format!("Failed to convert image tensor: {e}"))
        })?;
        let mask_value = Value::from_array(mask.clone())
            .map_err(|e| InpaintError::processing(format!("Failed to convert mask tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![image_value, mask_value])
            .map_err(|e| InpaintError::inference(format!("ONNX inference failed: {e}")))?;

        // Positional output access; the export has a single output
        let output_tensor = {
            let keys: Vec<_> = outputs.keys().collect();
            let first_key = keys
                .first()
                .ok_or_else(|| InpaintError::inference("No output tensors found"))?;
            outputs
                .get(first_key)
                .ok_or_else(|| InpaintError::inference("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    InpaintError::inference(format!("Failed to extract output tensor: {e}"))
                })?
        };

        let output_shape = output_tensor.shape().to_vec();
        if output_shape.len() != 4 {
            return Err(InpaintError::inference(format!(
                "Expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        }

        let output_data = output_tensor.view().to_owned();
        let result = Array4::from_shape_vec(
            (
                output_shape.first().copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(1),
                output_shape.get(3).copied().unwrap_or(1),
            ),
            output_data.into_raw_vec_and_offset().0,
        )
        .map_err(|e| InpaintError::inference(format!("Failed to reshape output tensor: {e}")))?;

        tracing::info!(
            "inference complete: {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(result)
    }

    fn is_initialized(&self) -> bool {
        self.session.is_some()
    }
}
