//! Engine traits and the shared backend error.
//!
//! Two seams live here:
//!
//! - [`PixelEngine`]: the per-request capability the pipeline's execute pass
//!   drives, one method per [`Operation`](super::Operation). The local
//!   [`Canvas`](super::rust_backend::Canvas) implements it.
//! - [`ImageBackend`]: what the service talks to: identify a source and
//!   render a compiled request. [`RustBackend`](super::RustBackend) decodes
//!   the master and drives a `Canvas`; [`RemoteBackend`](super::RemoteBackend)
//!   forwards the raw request segments to another IIIF server.

use crate::geometry::{PixelBox, Size};
use crate::pipeline::{CompiledRequest, Rendered};
use crate::request::{FormatSpec, SizeTarget};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source not found: {0}")]
    NotFound(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Remote request failed: {0}")]
    Http(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel operations on one in-flight image.
///
/// Calls arrive strictly in pipeline order: crop, resize, flip, rotate,
/// recolor, encode. Errors are the implementation's own and pass through
/// the pipeline untouched.
pub trait PixelEngine {
    type Error;

    fn crop(&mut self, region: PixelBox) -> Result<(), Self::Error>;

    /// Crop to a square of `edge` pixels; the anchor is the engine's choice.
    fn square_crop(&mut self, edge: u32) -> Result<(), Self::Error>;

    fn resize(&mut self, target: SizeTarget) -> Result<(), Self::Error>;

    /// Mirror horizontally.
    fn flip(&mut self) -> Result<(), Self::Error>;

    /// Rotate clockwise, growing the canvas to hold the rotated image.
    fn rotate(&mut self, degrees: u16) -> Result<(), Self::Error>;

    fn gamma(&mut self, exponent: f32) -> Result<(), Self::Error>;

    fn grayscale(&mut self) -> Result<(), Self::Error>;

    /// Map every pixel to black or white around `level`.
    fn threshold(&mut self, level: u8) -> Result<(), Self::Error>;

    fn encode(&mut self, format: &FormatSpec) -> Result<Vec<u8>, Self::Error>;
}

/// Source lookup plus rendering, independent of where pixels are processed.
pub trait ImageBackend: Sync {
    /// Natural dimensions of the source.
    fn identify(&self, identifier: &str) -> Result<Size, BackendError>;

    /// Produce the derivative described by `request`.
    fn render(&self, identifier: &str, request: &CompiledRequest)
    -> Result<Rendered, BackendError>;
}
