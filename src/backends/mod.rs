//! Backend implementations for inpainting inference
//!
//! - ONNX Runtime backend (CPU execution)
//! - Mock backend for deterministic tests

pub mod onnx;

pub mod test_utils;

pub use self::onnx::OnnxBackend;
