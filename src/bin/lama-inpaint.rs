//! LaMa Inpainting Service binary
//!
//! Serves the inpainting HTTP API. See `--help` for model and bind options.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lama_inpaint::server::main().await
}
