//! Inference backend abstraction

use crate::config::InpaintConfig;
use crate::error::Result;
use ndarray::Array4;
use std::path::Path;
use std::time::Duration;

/// Trait for inpainting inference backends
///
/// A backend wraps a loaded checkpoint and exposes a single forward pass. The
/// model is an opaque function from (zeroed-masked image tensor, mask tensor)
/// to a reconstructed image tensor; backends are read-only after
/// initialization and never reloaded.
pub trait InpaintBackend: Send {
    /// Load the checkpoint at `model_path` and prepare an inference session
    ///
    /// Idempotent: calling on an already-initialized backend is a no-op
    /// returning `Ok(None)`. On first call, returns the model load duration.
    ///
    /// # Errors
    /// - Checkpoint file missing or unreadable
    /// - Malformed checkpoint data
    /// - Session construction failures
    fn initialize(&mut self, model_path: &Path, config: &InpaintConfig)
        -> Result<Option<Duration>>;

    /// Run one forward pass
    ///
    /// `image` is NCHW (1, 3, H, W) with masked pixels zeroed, `mask` is
    /// (1, 1, H, W); both normalized to [0, 1] with H and W multiples of 8.
    /// Synchronous, no gradient tracking, CPU execution.
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Tensor conversion or shape mismatches
    /// - Model runtime failures
    fn infer(&mut self, image: &Array4<f32>, mask: &Array4<f32>) -> Result<Array4<f32>>;

    /// Check whether the backend holds a loaded model
    fn is_initialized(&self) -> bool;
}
