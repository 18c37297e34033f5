//! Mock backend for deterministic testing
//!
//! Compiled into the library so integration tests can drive the full pipeline
//! without a checkpoint download or an ONNX Runtime session.

use crate::config::InpaintConfig;
use crate::error::Result;
use crate::inference::InpaintBackend;
use ndarray::Array4;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock inpainting backend returning a constant fill value
///
/// Records how many times `initialize` performed a load, which lets tests
/// assert the one-time-initialization guarantee under concurrency.
#[derive(Debug)]
pub struct MockInpaintBackend {
    initialized: bool,
    fill: f32,
    init_delay: Duration,
    infer_delay: Duration,
    init_count: Arc<AtomicUsize>,
}

impl MockInpaintBackend {
    /// Create a mock that reconstructs every pixel as `fill` (in [0, 1])
    #[must_use]
    pub fn new(fill: f32) -> Self {
        Self {
            initialized: false,
            fill,
            init_delay: Duration::ZERO,
            infer_delay: Duration::ZERO,
            init_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay initialization to widen the race window in concurrency tests
    #[must_use]
    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    /// Make the forward pass take `delay` of wall-clock time, imitating a
    /// real model's CPU-bound inference
    #[must_use]
    pub fn with_infer_delay(mut self, delay: Duration) -> Self {
        self.infer_delay = delay;
        self
    }

    /// Share the initialization counter with a test
    #[must_use]
    pub fn init_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.init_count)
    }

    /// Use an externally owned counter, so a factory can observe
    /// initializations of the backends it hands out
    #[must_use]
    pub fn with_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.init_count = counter;
        self
    }
}

impl InpaintBackend for MockInpaintBackend {
    fn initialize(
        &mut self,
        _model_path: &Path,
        _config: &InpaintConfig,
    ) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        if !self.init_delay.is_zero() {
            std::thread::sleep(self.init_delay);
        }
        self.init_count.fetch_add(1, Ordering::SeqCst);
        self.initialized = true;
        Ok(Some(self.init_delay))
    }

    fn infer(&mut self, image: &Array4<f32>, _mask: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.infer_delay.is_zero() {
            std::thread::sleep(self.infer_delay);
        }
        let (_, _, height, width) = image.dim();
        Ok(Array4::from_elem((1, 3, height, width), self.fill))
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
