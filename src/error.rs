//! Error types for inpainting operations

use thiserror::Error;

/// Result type alias for inpainting operations
pub type Result<T> = std::result::Result<T, InpaintError>;

/// Error types for inpainting operations
///
/// The variants map directly onto the service's HTTP error contract:
/// [`InpaintError::InvalidInput`] is a client error (400), everything else is
/// a server-side failure (500). See [`crate::server`] for the mapping.
#[derive(Error, Debug)]
pub enum InpaintError {
    /// Malformed client input (bad data URI, undecodable bytes)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image format or processing errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Model download, loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Backend inference errors (shape mismatch, runtime failure)
    #[error("Inference error: {0}")]
    Inference(String),

    /// Pre/postprocessing errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InpaintError {
    /// Create a new invalid input error (maps to HTTP 400)
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a model error from a network failure during checkpoint download
    pub fn network_error<E: std::fmt::Display>(context: &str, error: E) -> Self {
        Self::Model(format!("{context}: {error}"))
    }

    /// Create a file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path.as_ref().display(), error),
        ))
    }

    /// Whether this error was caused by malformed client input
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
