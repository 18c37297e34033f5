//! HTTP server exposing the inpainting service
//!
//! One POST route does the work; the rest is service metadata. Requests are
//! handled independently and statelessly, the only shared state being the
//! read-only model handle inside [`InpaintProcessor`]. Error mapping follows
//! the service contract: malformed client input becomes 400, everything else
//! (model fetch, inference, shape mismatches) becomes 500. No retries.

use crate::config::{InpaintConfig, OutputFormat};
use crate::error::InpaintError;
use crate::models::{ModelSpec, DEFAULT_MODEL_FILE, DEFAULT_MODEL_URL};
use crate::processor::InpaintProcessor;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Service name reported by the metadata endpoints
pub const SERVICE_NAME: &str = "lama-inpaint";

/// Request bodies can carry two base64 images; keep headroom for large photos
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(name = SERVICE_NAME, version, about = "Object removal service backed by a LaMa inpainting model")]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Model repository URL to fetch the checkpoint from
    #[arg(long, default_value = DEFAULT_MODEL_URL)]
    pub model_url: String,

    /// Checkpoint file name within the repository
    #[arg(long, default_value = DEFAULT_MODEL_FILE)]
    pub model_file: String,

    /// Use a local checkpoint file instead of downloading
    #[arg(long, conflicts_with = "model_url")]
    pub model_path: Option<PathBuf>,

    /// Image format for encoded results
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    pub output_format: OutputFormat,

    /// Fetch and load the model before accepting requests
    #[arg(long)]
    pub preload: bool,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ServerArgs {
    fn model_spec(&self) -> ModelSpec {
        match &self.model_path {
            Some(path) => ModelSpec::external(path.clone()),
            None => ModelSpec::remote(self.model_url.clone(), self.model_file.clone()),
        }
    }

    fn log_filter(&self) -> String {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("lama_inpaint={level},ort=off")
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    processor: Arc<InpaintProcessor>,
}

impl AppState {
    /// Wrap a processor for injection into the router
    #[must_use]
    pub fn new(processor: Arc<InpaintProcessor>) -> Self {
        Self { processor }
    }
}

#[derive(Debug, Deserialize)]
pub struct InpaintRequest {
    /// Base64 or data-URI encoded input image
    pub image: String,
    /// Base64 or data-URI encoded mask; white marks pixels to regenerate
    pub mask: String,
}

#[derive(Debug, Serialize)]
pub struct InpaintResponse {
    /// Data-URI encoded result image
    pub result: String,
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/inpaint", post(inpaint))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": format!("Welcome to the {SERVICE_NAME} API"),
        "health": "/health",
        "inpaint": "/api/v1/inpaint",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

/// Inpaint an image using the supplied mask
///
/// White mask pixels (255) mark regions to remove and regenerate, black
/// pixels (0) are preserved unchanged.
async fn inpaint(
    State(state): State<AppState>,
    Json(request): Json<InpaintRequest>,
) -> Result<Json<InpaintResponse>, (StatusCode, String)> {
    let result = state
        .processor
        .inpaint_data_uri(&request.image, &request.mask)
        .await
        .map_err(|e| {
            error!("inpaint request failed: {e}");
            error_response(&e)
        })?;

    Ok(Json(InpaintResponse { result }))
}

/// Map a pipeline error onto the HTTP contract
fn error_response(err: &InpaintError) -> (StatusCode, String) {
    match err {
        InpaintError::InvalidInput(msg) => {
            (StatusCode::BAD_REQUEST, format!("Invalid image data: {msg}"))
        },
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Inpainting failed: {other}"),
        ),
    }
}

/// Server entry point: parse args, set up tracing, serve
///
/// # Errors
/// - Model preload failures when `--preload` is set
/// - Socket bind or serve failures
pub async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = InpaintConfig::builder()
        .model_spec(args.model_spec())
        .output_format(args.output_format)
        .build()?;
    info!(model = %config.model_spec.source.display_name(), "starting {SERVICE_NAME}");

    let processor = Arc::new(InpaintProcessor::new(config));

    if args.preload {
        info!("preloading model before serving");
        processor.ensure_loaded().await?;
    }

    let app = router(AppState::new(processor));
    let addr = format!("{}:{}", args.host, args.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("server listening on http://{addr}");
    info!("  GET  /                - Service metadata");
    info!("  GET  /health          - Health check");
    info!("  POST /api/v1/inpaint  - Inpaint an image");

    axum::serve(listener, app).await?;
    Ok(())
}
