//! Local pixel engine: master files on disk, processed in pure Rust
//! apart from `libwebp`, which the `webp` crate builds and links in.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate decoders |
//! | Crop / square crop | `DynamicImage::crop_imm` (square is centered) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Flip | `DynamicImage::fliph` |
//! | Rotate 90/180/270 | `DynamicImage::rotate90` etc. (lossless) |
//! | Rotate other angles | `imageproc::geometric_transformations::rotate_about_center` on a grown canvas |
//! | Gamma / grayscale / threshold | per-pixel lookup on `image` buffers |
//! | Encode JPEG, PNG, TIFF | `image::codecs::*` |
//! | Encode WebP (lossy) | `webp::Encoder` |

use super::backend::{BackendError, ImageBackend, PixelEngine};
use crate::geometry::{PixelBox, Size};
use crate::pipeline::{CompiledRequest, Rendered};
use crate::request::{FormatSpec, SizeTarget};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Extensions tried, in order, when an identifier has no file of its own.
const MASTER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    MASTER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Master file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Background for corners exposed by arbitrary-angle rotation.
const ROTATION_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Backend that serves masters from a directory tree.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone)]
pub struct RustBackend {
    root: PathBuf,
}

impl RustBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an identifier to a master file under the root.
    ///
    /// The identifier itself is tried first, then with each supported
    /// extension appended. Identifiers that would escape the root are
    /// rejected as not found.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(identifier);
        let escapes = identifier.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(BackendError::NotFound(identifier.to_string()));
        }

        let direct = self.root.join(relative);
        if direct.is_file() {
            return Ok(direct);
        }
        supported_input_extensions()
            .iter()
            .map(|ext| self.root.join(format!("{identifier}.{ext}")))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| BackendError::NotFound(identifier.to_string()))
    }
}

/// Load and decode a master from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, identifier: &str) -> Result<Size, BackendError> {
        let path = self.resolve(identifier)?;
        let (width, height) = image::image_dimensions(&path)
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Size::new(width, height))
    }

    fn render(
        &self,
        identifier: &str,
        request: &CompiledRequest,
    ) -> Result<Rendered, BackendError> {
        let path = self.resolve(identifier)?;
        let mut canvas = Canvas::new(load_image(&path)?);
        request.execute(&mut canvas)
    }
}

/// One decoded image moving through the execute pass.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: DynamicImage,
    /// Exponent the pixels were linearized with, pending re-encoding.
    linear_gamma: Option<f32>,
}

impl Canvas {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            linear_gamma: None,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

/// Lookup table for `v ↦ 255 · (v / 255)^exponent`.
fn gamma_table(exponent: f32) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (value, slot) in table.iter_mut().enumerate() {
        let normalized = value as f32 / 255.0;
        *slot = (normalized.powf(exponent) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    table
}

/// Bounding box of a `size` image rotated by `degrees`.
fn rotated_bounds(size: Size, degrees: u16) -> Size {
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    Size::new(
        (w * cos.abs() + h * sin.abs()).round().max(1.0) as u32,
        (w * sin.abs() + h * cos.abs()).round().max(1.0) as u32,
    )
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

impl PixelEngine for Canvas {
    type Error = BackendError;

    fn crop(&mut self, region: PixelBox) -> Result<(), BackendError> {
        self.image = self
            .image
            .crop_imm(region.left, region.top, region.width, region.height);
        Ok(())
    }

    fn square_crop(&mut self, edge: u32) -> Result<(), BackendError> {
        let left = self.image.width().saturating_sub(edge) / 2;
        let top = self.image.height().saturating_sub(edge) / 2;
        self.image = self.image.crop_imm(left, top, edge, edge);
        Ok(())
    }

    fn resize(&mut self, target: SizeTarget) -> Result<(), BackendError> {
        // Targets arrive aspect-resolved, so every fit mode is an exact resize.
        self.image = self
            .image
            .resize_exact(target.width, target.height, FilterType::Lanczos3);
        Ok(())
    }

    fn flip(&mut self) -> Result<(), BackendError> {
        self.image = self.image.fliph();
        Ok(())
    }

    fn rotate(&mut self, degrees: u16) -> Result<(), BackendError> {
        self.image = match degrees % 360 {
            0 => return Ok(()),
            90 => self.image.rotate90(),
            180 => self.image.rotate180(),
            270 => self.image.rotate270(),
            other => {
                let source = self.image.to_rgba8();
                let bounds = rotated_bounds(self.size(), other);
                let mut grown = RgbaImage::from_pixel(bounds.width, bounds.height, ROTATION_BACKGROUND);
                let x = (i64::from(bounds.width) - i64::from(source.width())) / 2;
                let y = (i64::from(bounds.height) - i64::from(source.height())) / 2;
                image::imageops::overlay(&mut grown, &source, x, y);
                DynamicImage::ImageRgba8(rotate_about_center(
                    &grown,
                    f32::from(other).to_radians(),
                    Interpolation::Bilinear,
                    ROTATION_BACKGROUND,
                ))
            }
        };
        Ok(())
    }

    fn gamma(&mut self, exponent: f32) -> Result<(), BackendError> {
        if exponent <= 0.0 {
            return Err(BackendError::ProcessingFailed(format!(
                "gamma exponent {exponent} must be positive"
            )));
        }
        let table = gamma_table(exponent);
        let mut rgba = self.image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            for channel in &mut pixel.0[..3] {
                *channel = table[usize::from(*channel)];
            }
        }
        self.image = DynamicImage::ImageRgba8(rgba);
        self.linear_gamma = Some(exponent);
        Ok(())
    }

    fn grayscale(&mut self) -> Result<(), BackendError> {
        let mut luma = self.image.to_luma_alpha8();
        if let Some(exponent) = self.linear_gamma.take() {
            let table = gamma_table(1.0 / exponent);
            for pixel in luma.pixels_mut() {
                pixel.0[0] = table[usize::from(pixel.0[0])];
            }
        }
        self.image = DynamicImage::ImageLumaA8(luma);
        Ok(())
    }

    fn threshold(&mut self, level: u8) -> Result<(), BackendError> {
        let mut luma = self.image.to_luma8();
        for pixel in luma.pixels_mut() {
            pixel.0[0] = if pixel.0[0] >= level { 255 } else { 0 };
        }
        self.image = DynamicImage::ImageLuma8(luma);
        Ok(())
    }

    fn encode(&mut self, format: &FormatSpec) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        let encode_err = |e: image::ImageError| BackendError::Encode(e.to_string());

        match *format {
            FormatSpec::Jpeg { quality, .. } => {
                // JPEG has no alpha channel; the image crate only writes baseline.
                let opaque = if self.image.color().has_color() {
                    DynamicImage::ImageRgb8(self.image.to_rgb8())
                } else {
                    DynamicImage::ImageLuma8(self.image.to_luma8())
                };
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                opaque.write_with_encoder(encoder).map_err(encode_err)?;
            }
            FormatSpec::Png {
                compression_level, ..
            } => {
                let encoder = PngEncoder::new_with_quality(
                    &mut buf,
                    png_compression(compression_level),
                    PngFilter::Adaptive,
                );
                self.image.write_with_encoder(encoder).map_err(encode_err)?;
            }
            FormatSpec::Webp { quality } => {
                let rgba = self.image.to_rgba8();
                // Edges over 16383 px are refused by libwebp.
                let encoded =
                    webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                        .encode_simple(false, f32::from(quality))
                        .map_err(|e| BackendError::Encode(format!("webp: {e:?}")))?;
                buf.extend_from_slice(&encoded);
            }
            FormatSpec::Tiff { .. } => {
                // The TIFF encoder has no gray+alpha layout.
                let tiff = match (self.image.color().has_color(), self.image.color().has_alpha()) {
                    (false, _) => DynamicImage::ImageLuma8(self.image.to_luma8()),
                    (true, false) => DynamicImage::ImageRgb8(self.image.to_rgb8()),
                    (true, true) => DynamicImage::ImageRgba8(self.image.to_rgba8()),
                };
                tiff.write_to(&mut Cursor::new(&mut buf), ImageFormat::Tiff)
                    .map_err(encode_err)?;
            }
            FormatSpec::Unsupported { format } => {
                return Err(BackendError::Encode(format!(
                    "no encoder for {format:?}"
                )));
            }
        }
        Ok(buf)
    }
}
