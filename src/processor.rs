//! Inpainting processor: orchestration of the request pipeline
//!
//! [`InpaintProcessor`] owns the shared model backend and runs the
//! decode-independent part of a request: preprocess, forward pass,
//! postprocess. It is constructed once at process startup and injected into
//! the request handlers; the backend inside it is lazily initialized on the
//! first inference and reused read-only afterwards.
//!
//! Lazy initialization goes through a [`tokio::sync::OnceCell`], so
//! concurrent first requests trigger exactly one checkpoint fetch and model
//! load, and all callers observe the same completed handle. A failed
//! initialization is not sticky: the next request retries the fetch.
//!
//! Model loading and the forward pass are CPU-bound synchronous work and run
//! on the blocking thread pool, so async workers stay free to serve other
//! requests while an inference is in flight.

use crate::backends::OnnxBackend;
use crate::codec;
use crate::config::InpaintConfig;
use crate::download::ModelDownloader;
use crate::error::{InpaintError, Result};
use crate::inference::InpaintBackend;
use crate::models::ModelSource;
use crate::postprocess;
use crate::preprocess;
use image::{DynamicImage, RgbImage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OnceCell;

/// Factory trait for creating inference backends
///
/// Lets tests inject a mock backend while the server uses ONNX Runtime.
pub trait BackendFactory: Send + Sync {
    /// Create an uninitialized backend instance
    ///
    /// # Errors
    /// - Backend construction failures
    fn create_backend(&self) -> Result<Box<dyn InpaintBackend>>;
}

/// Default factory producing ONNX Runtime backends
#[derive(Debug)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self) -> Result<Box<dyn InpaintBackend>> {
        Ok(Box::new(OnnxBackend::new()))
    }
}

/// Shared, process-wide inpainting service
pub struct InpaintProcessor {
    config: InpaintConfig,
    factory: Box<dyn BackendFactory>,
    backend: OnceCell<Arc<Mutex<Box<dyn InpaintBackend>>>>,
}

impl InpaintProcessor {
    /// Create a processor using the ONNX Runtime backend
    #[must_use]
    pub fn new(config: InpaintConfig) -> Self {
        Self::with_factory(config, Box::new(DefaultBackendFactory))
    }

    /// Create a processor with a custom backend factory
    #[must_use]
    pub fn with_factory(config: InpaintConfig, factory: Box<dyn BackendFactory>) -> Self {
        Self {
            config,
            factory,
            backend: OnceCell::new(),
        }
    }

    /// Processor configuration
    #[must_use]
    pub fn config(&self) -> &InpaintConfig {
        &self.config
    }

    /// Whether the model has been loaded
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.backend.initialized()
    }

    /// Ensure the model is fetched and loaded, without running inference
    ///
    /// Used by the server's preload step; otherwise the first request pays
    /// the load cost.
    ///
    /// # Errors
    /// - Checkpoint download or load failures
    pub async fn ensure_loaded(&self) -> Result<()> {
        self.backend_cell().await.map(|_| ())
    }

    async fn backend_cell(&self) -> Result<&Arc<Mutex<Box<dyn InpaintBackend>>>> {
        self.backend
            .get_or_try_init(|| async {
                let model_path = self.resolve_model_path().await?;
                let mut backend = self.factory.create_backend()?;
                let config = self.config.clone();
                let model_name = self.config.model_spec.source.display_name();
                // Reading the checkpoint and building the session take disk
                // and CPU time; keep them off the async workers.
                let backend = tokio::task::spawn_blocking(move || {
                    if let Some(load_time) = backend.initialize(&model_path, &config)? {
                        tracing::info!(
                            model = %model_name,
                            "backend initialized in {:.0}ms",
                            load_time.as_secs_f64() * 1000.0
                        );
                    }
                    Ok::<_, InpaintError>(backend)
                })
                .await
                .map_err(|e| InpaintError::internal(format!("model load task failed: {e}")))??;
                Ok(Arc::new(Mutex::new(backend)))
            })
            .await
    }

    /// Resolve the model spec to a local checkpoint path, downloading the
    /// checkpoint on first use for remote specs
    async fn resolve_model_path(&self) -> Result<PathBuf> {
        match &self.config.model_spec.source {
            ModelSource::External(path) => Ok(path.clone()),
            ModelSource::Remote { url, file_name } => {
                ModelDownloader::new()?.ensure_checkpoint(url, file_name).await
            },
        }
    }

    /// Inpaint a decoded image with a decoded mask
    ///
    /// White mask pixels mark the region to regenerate; black pixels are
    /// preserved. A mask with different dimensions than the image is resized
    /// before use.
    ///
    /// # Errors
    /// - Model fetch/load failures on the first call
    /// - Inference failures
    pub async fn inpaint_image(
        &self,
        image: &DynamicImage,
        mask: &DynamicImage,
    ) -> Result<RgbImage> {
        let start = Instant::now();

        let rgb = codec::to_color_array(image);
        let mask = codec::to_mask_array(mask);
        let prepared = preprocess::prepare(&rgb, &mask)?;

        let backend = Arc::clone(self.backend_cell().await?);
        let preprocess::PreparedInput {
            image_tensor,
            mask_tensor,
            dilated_mask,
            ..
        } = prepared;
        // The forward pass is a single blocking synchronous call; it runs on
        // the blocking pool so async workers stay free, and the session lock
        // serializes concurrent requests through it.
        let output = tokio::task::spawn_blocking(move || {
            let mut backend = backend
                .lock()
                .map_err(|_| InpaintError::internal("inference backend lock poisoned"))?;
            backend.infer(&image_tensor, &mask_tensor)
        })
        .await
        .map_err(|e| InpaintError::internal(format!("inference task failed: {e}")))??;

        let result = postprocess::composite(&output, &rgb, &dilated_mask)?;

        tracing::info!(
            width = rgb.width(),
            height = rgb.height(),
            "inpaint completed in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(result)
    }

    /// Full request pipeline: decode data URIs, inpaint, re-encode
    ///
    /// # Errors
    /// - [`crate::error::InpaintError::InvalidInput`] for malformed inputs
    /// - Any inference-path failure from [`Self::inpaint_image`]
    pub async fn inpaint_data_uri(&self, image: &str, mask: &str) -> Result<String> {
        let image = codec::decode_image(image)?;
        let mask = codec::decode_image(mask)?;

        let result = self.inpaint_image(&image, &mask).await?;

        codec::encode_image(
            &DynamicImage::ImageRgb8(result),
            self.config.output_format.to_image_format(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockInpaintBackend;
    use crate::models::ModelSpec;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct MockFactory {
        fill: f32,
        init_delay: Duration,
        infer_delay: Duration,
        init_count: Arc<AtomicUsize>,
    }

    impl MockFactory {
        fn new(fill: f32) -> Self {
            Self {
                fill,
                init_delay: Duration::ZERO,
                infer_delay: Duration::ZERO,
                init_count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl BackendFactory for MockFactory {
        fn create_backend(&self) -> crate::error::Result<Box<dyn InpaintBackend>> {
            Ok(Box::new(
                MockInpaintBackend::new(self.fill)
                    .with_init_delay(self.init_delay)
                    .with_infer_delay(self.infer_delay)
                    .with_counter(Arc::clone(&self.init_count)),
            ))
        }
    }

    fn mock_processor(fill: f32) -> (InpaintProcessor, Arc<AtomicUsize>) {
        let factory = MockFactory::new(fill);
        let counter = Arc::clone(&factory.init_count);
        let config = InpaintConfig::builder()
            .model_spec(ModelSpec::external("/unused/mock.onnx"))
            .build()
            .unwrap();
        (InpaintProcessor::with_factory(config, Box::new(factory)), counter)
    }

    fn gray_image_with_center_mask() -> (DynamicImage, DynamicImage) {
        let image = RgbImage::from_pixel(16, 16, Rgb([100, 100, 100]));
        let mut mask = GrayImage::new(16, 16);
        for y in 6..10 {
            for x in 6..10 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        (DynamicImage::ImageRgb8(image), DynamicImage::ImageLuma8(mask))
    }

    #[tokio::test]
    async fn test_solid_gray_center_square_scenario() {
        let (processor, _) = mock_processor(0.5);
        let (image, mask) = gray_image_with_center_mask();

        let result = processor.inpaint_image(&image, &mask).await.unwrap();
        assert_eq!(result.dimensions(), (16, 16));

        // The 4x4 square dilated by 2 spans at most x,y in [4, 11]; corners
        // are definitely outside and must equal the input exactly.
        assert_eq!(result.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(result.get_pixel(15, 15), &Rgb([100, 100, 100]));
        assert_eq!(result.get_pixel(2, 8), &Rgb([100, 100, 100]));

        // Inside the original square the model fill wins (0.5 * 255 -> 128)
        assert_eq!(result.get_pixel(8, 8), &Rgb([128, 128, 128]));
    }

    #[tokio::test]
    async fn test_mismatched_mask_dimensions_are_resized() {
        let (processor, _) = mock_processor(0.0);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([10, 20, 30])));
        let mask = DynamicImage::ImageLuma8(GrayImage::new(8, 8));

        let result = processor.inpaint_image(&image, &mask).await.unwrap();
        assert_eq!(result.dimensions(), (32, 24));
        // Empty mask: output is the input, untouched
        assert_eq!(result.get_pixel(31, 23), &Rgb([10, 20, 30]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_first_requests_initialize_once() {
        let factory = MockFactory {
            fill: 0.5,
            init_delay: Duration::from_millis(50),
            infer_delay: Duration::ZERO,
            init_count: Arc::new(AtomicUsize::new(0)),
        };
        let counter = Arc::clone(&factory.init_count);
        let config = InpaintConfig::builder()
            .model_spec(ModelSpec::external("/unused/mock.onnx"))
            .build()
            .unwrap();
        let processor = Arc::new(InpaintProcessor::with_factory(config, Box::new(factory)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let processor = Arc::clone(&processor);
            handles.push(tokio::spawn(async move {
                let (image, mask) = gray_image_with_center_mask();
                processor.inpaint_image(&image, &mask).await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.dimensions(), (16, 16));
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(processor.is_loaded());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_slow_inference_does_not_starve_async_tasks() {
        let factory = MockFactory {
            fill: 0.5,
            init_delay: Duration::ZERO,
            infer_delay: Duration::from_millis(500),
            init_count: Arc::new(AtomicUsize::new(0)),
        };
        let config = InpaintConfig::builder()
            .model_spec(ModelSpec::external("/unused/mock.onnx"))
            .build()
            .unwrap();
        let processor = Arc::new(InpaintProcessor::with_factory(config, Box::new(factory)));

        let start = Instant::now();
        let inpaint = tokio::spawn({
            let processor = Arc::clone(&processor);
            async move {
                let (image, mask) = gray_image_with_center_mask();
                processor.inpaint_image(&image, &mask).await
            }
        });

        // Let the request enter its forward pass, then check that the lone
        // runtime worker still makes progress while inference runs. With the
        // forward pass on the worker thread this heartbeat could only
        // complete after the full inference delay.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(
            start.elapsed() < Duration::from_millis(400),
            "runtime worker was starved during inference"
        );

        let result = inpaint.await.unwrap().unwrap();
        assert_eq!(result.dimensions(), (16, 16));
    }

    #[tokio::test]
    async fn test_configured_output_format_is_respected() {
        let config = InpaintConfig::builder()
            .model_spec(ModelSpec::external("/unused/mock.onnx"))
            .output_format(crate::config::OutputFormat::Jpeg)
            .build()
            .unwrap();
        let processor = InpaintProcessor::with_factory(config, Box::new(MockFactory::new(0.5)));

        let (image, mask) = gray_image_with_center_mask();
        let image_uri = codec::encode_image(&image, image::ImageFormat::Png).unwrap();
        let mask_uri = codec::encode_image(&mask, image::ImageFormat::Png).unwrap();

        let result = processor.inpaint_data_uri(&image_uri, &mask_uri).await.unwrap();
        assert!(result.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_data_uri_pipeline_round_trip() {
        let (processor, _) = mock_processor(0.5);
        let (image, mask) = gray_image_with_center_mask();

        let image_uri = codec::encode_image(&image, image::ImageFormat::Png).unwrap();
        let mask_uri = codec::encode_image(&mask, image::ImageFormat::Png).unwrap();

        let result = processor.inpaint_data_uri(&image_uri, &mask_uri).await.unwrap();
        assert!(result.starts_with("data:image/png;base64,"));

        let decoded = codec::decode_image(&result).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
    }

    #[tokio::test]
    async fn test_data_uri_pipeline_rejects_bad_input() {
        let (processor, counter) = mock_processor(0.5);

        let err = processor
            .inpaint_data_uri("data:video/mp4;base64,AAAA", "AAAA")
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        // Decoding fails before the backend is ever touched
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let (processor, counter) = mock_processor(0.5);
        assert!(!processor.is_loaded());

        processor.ensure_loaded().await.unwrap();
        processor.ensure_loaded().await.unwrap();

        assert!(processor.is_loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
