//! Pixel work behind the request compiler.
//!
//! | Concern | Where |
//! |---|---|
//! | **Operations** | [`Operation`]: what the compiler asks for |
//! | **Engine seam** | [`PixelEngine`] (per image) and [`ImageBackend`] (per source) |
//! | **Local** | [`RustBackend`] + [`Canvas`]: `image`, `imageproc`, `webp` |
//! | **Remote** | [`RemoteBackend`]: forwards segments over HTTP with `reqwest` |
//!
//! The module is split into:
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: the two traits plus [`BackendError`]
//! - **Rust backend** / **Remote backend**: the two implementations

pub mod backend;
mod params;
pub mod remote_backend;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, PixelEngine};
pub use params::Operation;
pub use remote_backend::RemoteBackend;
pub use rust_backend::{Canvas, RustBackend};
