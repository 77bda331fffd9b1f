//! # IIIF Derive
//!
//! Derived images (crops, resizes, rotations, recolored and re-encoded
//! variants) of archival master files, addressed with the IIIF Image API 2.1
//! URL grammar:
//!
//! ```text
//! {identifier}/{region}/{size}/{rotation}/{quality}.{format}
//! ```
//!
//! # Architecture: Compile, Then Execute
//!
//! A request is handled in two passes over the same five stages:
//!
//! ```text
//! 1. Compile   segments + source size + tier  →  CompiledRequest   (pure, no I/O)
//! 2. Execute   CompiledRequest + PixelEngine  →  encoded bytes     (pixel work)
//! ```
//!
//! The split exists so that:
//!
//! - every malformed or unsupported request is refused before a master file
//!   is decoded;
//! - the numeric rules (rounding, clamping order, aspect tie-breaks) are unit
//!   testable against a recording engine, with no images involved;
//! - the same compiled request can run locally or be forwarded to another
//!   IIIF server unchanged.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | `Size`, `PixelBox`, `TierCap` |
//! | [`request`] | The five segment resolvers, the tier cap policy, `RequestSegments` |
//! | [`pipeline`] | `compile` and `CompiledRequest::execute` |
//! | [`imaging`] | `Operation`, the `PixelEngine` / `ImageBackend` seams, local and remote backends |
//! | [`info`] | IIIF 2.1 `info.json` documents |
//! | [`service`] | Tier lookup + identify + compile + render behind one façade |
//! | [`config`] | `iiif.toml` loading, validation, merging |
//! | [`batch`] | Request lists rendered in parallel |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Tiers Cap Only "Give Me Everything"
//!
//! An access tier limits the longest edge of `full`/`max` requests (and of
//! explicit sizes that resolve to the working size). An explicit smaller
//! size is never capped; it is already within what the caller asked for.
//! The cap is measured against the region's output, not the source.
//!
//! ## Pure-Rust Imaging
//!
//! The local engine uses the `image` crate for decode, resize (Lanczos3) and
//! most encoders, `imageproc` for arbitrary-angle rotation, and `webp` for
//! lossy WebP. No ImageMagick, no libvips.

pub mod batch;
pub mod config;
pub mod geometry;
pub mod imaging;
pub mod info;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod service;
