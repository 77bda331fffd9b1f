//! Format segment: output codec and its fixed encode profile.
//!
//! | Token | Codec | Profile |
//! |---|---|---|
//! | `jpg` | JPEG | quality 80, baseline |
//! | `png` | PNG | compression level 6, non-interlaced |
//! | `webp` | WebP | quality 80 |
//! | `tif` | TIFF | quality 80 |
//! | `gif`, `jp2`, `pdf` | none | recognized, not implemented |

use super::RequestError;
use crate::imaging::Operation;
use serde::Serialize;

/// Lossy quality used by every codec that takes one.
pub const ENCODE_QUALITY: u8 = 80;

/// zlib level used for PNG output.
pub const PNG_COMPRESSION_LEVEL: u8 = 6;

/// Codecs this crate can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    Jpeg,
    Png,
    Webp,
    Tiff,
}

impl Codec {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    /// The request token (and file extension) for this codec.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Tiff => "tif",
        }
    }
}

/// Formats the grammar knows but no encoder backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedFormat {
    Gif,
    Jp2,
    Pdf,
}

/// A codec together with its encode profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "codec", rename_all = "snake_case")]
pub enum FormatSpec {
    Jpeg { quality: u8, progressive: bool },
    Png { compression_level: u8, progressive: bool },
    Webp { quality: u8 },
    Tiff { quality: u8 },
    Unsupported { format: UnsupportedFormat },
}

impl FormatSpec {
    /// Look up a format token. `None` means the token is not part of the
    /// grammar at all.
    pub fn from_token(token: &str) -> Option<Self> {
        let spec = match token {
            "jpg" => Self::Jpeg {
                quality: ENCODE_QUALITY,
                progressive: false,
            },
            "png" => Self::Png {
                compression_level: PNG_COMPRESSION_LEVEL,
                progressive: false,
            },
            "webp" => Self::Webp {
                quality: ENCODE_QUALITY,
            },
            "tif" => Self::Tiff {
                quality: ENCODE_QUALITY,
            },
            "gif" => Self::Unsupported {
                format: UnsupportedFormat::Gif,
            },
            "jp2" => Self::Unsupported {
                format: UnsupportedFormat::Jp2,
            },
            "pdf" => Self::Unsupported {
                format: UnsupportedFormat::Pdf,
            },
            _ => return None,
        };
        Some(spec)
    }

    /// The codec to encode with, or `None` for unsupported formats.
    pub fn codec(&self) -> Option<Codec> {
        match self {
            Self::Jpeg { .. } => Some(Codec::Jpeg),
            Self::Png { .. } => Some(Codec::Png),
            Self::Webp { .. } => Some(Codec::Webp),
            Self::Tiff { .. } => Some(Codec::Tiff),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.codec().map(Codec::content_type)
    }
}

/// Format stage of a compiled request. Always holds an encodable spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatRequest {
    pub codec: Codec,
    pub spec: FormatSpec,
}

impl FormatRequest {
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let spec = FormatSpec::from_token(raw)
            .ok_or_else(|| RequestError::malformed(format!("invalid format '{raw}'")))?;
        match spec.codec() {
            Some(codec) => Ok(Self { codec, spec }),
            None => Err(RequestError::NotImplemented(format!(
                "format '{raw}' is not supported"
            ))),
        }
    }

    /// The final encode always runs.
    pub fn requires_processing(&self) -> bool {
        true
    }

    pub fn describe(&self) -> Vec<Operation> {
        vec![Operation::Encode(self.spec)]
    }
}
