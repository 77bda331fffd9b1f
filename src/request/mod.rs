//! The five IIIF request segments and their resolvers.
//!
//! A derivative request path has the shape
//! `{region}/{size}/{rotation}/{quality}.{format}`. Each segment has its own
//! resolver module:
//!
//! | Segment | Module | Touches working size |
//! |---|---|---|
//! | region | [`region`] | yes |
//! | size | [`size`] | yes (and reads the tier cap) |
//! | rotation | [`rotation`] | no |
//! | quality | [`quality`] | no |
//! | format | [`format`] | no |
//!
//! [`tier`] holds the cap policy consumed by the size resolver. Ordering and
//! execution live in [`crate::pipeline`].

pub mod format;
pub mod quality;
pub mod region;
pub mod rotation;
pub mod size;
pub mod tier;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use format::{Codec, FormatRequest, FormatSpec};
pub use quality::{QualityRequest, QualitySpec};
pub use region::{RegionRequest, RegionSpec};
pub use rotation::{RotationRequest, RotationSpec};
pub use size::{Fit, SizeRequest, SizeTarget};

/// The two ways a request can be refused before any pixel work happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Unparseable or out-of-range segment.
    #[error("Malformed request: {0}")]
    Malformed(String),
    /// Recognized by the grammar but no encoder exists for it.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl RequestError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Whether the boundary should answer with a client error (as opposed to
    /// an "unsupported" response).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// The five raw segments exactly as received from the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSegments {
    pub region: String,
    pub size: String,
    pub rotation: String,
    pub quality: String,
    pub format: String,
}

impl RequestSegments {
    pub fn new(
        region: impl Into<String>,
        size: impl Into<String>,
        rotation: impl Into<String>,
        quality: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            size: size.into(),
            rotation: rotation.into(),
            quality: quality.into(),
            format: format.into(),
        }
    }

    /// Split `region/size/rotation/quality.format` into its segments.
    ///
    /// A single leading `/` is tolerated. The last part is split at its final
    /// `.`, so `default.jpg` yields quality `default` and format `jpg`.
    pub fn from_path(path: &str) -> Result<Self, RequestError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let parts: Vec<&str> = path.split('/').collect();
        let [region, size, rotation, last] = parts.as_slice() else {
            return Err(RequestError::malformed(format!(
                "expected region/size/rotation/quality.format, got '{path}'"
            )));
        };
        let Some((quality, format)) = last.rsplit_once('.') else {
            return Err(RequestError::malformed(format!(
                "missing format extension in '{last}'"
            )));
        };
        Ok(Self::new(*region, *size, *rotation, quality, format))
    }

    /// Render back into the path form accepted by [`Self::from_path`].
    pub fn to_path(&self) -> String {
        format!(
            "{}/{}/{}/{}.{}",
            self.region, self.size, self.rotation, self.quality, self.format
        )
    }
}

/// Round `value * numerator / denominator` half away from zero.
///
/// Multiplication happens before division so integer inputs stay exact.
pub(crate) fn scale(value: f64, numerator: f64, denominator: f64) -> u32 {
    (value * numerator / denominator).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_request_path() {
        let segments = RequestSegments::from_path("pct:10,10,50,50/!200,200/!90/gray.png").unwrap();
        assert_eq!(segments.region, "pct:10,10,50,50");
        assert_eq!(segments.size, "!200,200");
        assert_eq!(segments.rotation, "!90");
        assert_eq!(segments.quality, "gray");
        assert_eq!(segments.format, "png");
    }

    #[test]
    fn path_roundtrips_through_to_path() {
        let path = "0,0,10,10/50,/0/default.jpg";
        assert_eq!(RequestSegments::from_path(path).unwrap().to_path(), path);
    }

    #[test]
    fn leading_slash_is_tolerated() {
        let segments = RequestSegments::from_path("/full/max/0/default.jpg").unwrap();
        assert_eq!(segments.region, "full");
    }

    #[test]
    fn last_dot_separates_format() {
        let segments = RequestSegments::from_path("full/max/0/a.b.tif").unwrap();
        assert_eq!(segments.quality, "a.b");
        assert_eq!(segments.format, "tif");
    }

    #[test]
    fn wrong_part_count_is_malformed() {
        let err = RequestSegments::from_path("full/max/default.jpg").unwrap_err();
        assert!(err.is_client_error());
        assert!(RequestSegments::from_path("full/max/0/default.jpg/extra").is_err());
    }

    #[test]
    fn missing_extension_is_malformed() {
        let err = RequestSegments::from_path("full/max/0/default").unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn not_implemented_is_not_a_client_error() {
        assert!(!RequestError::NotImplemented("gif".into()).is_client_error());
    }

    #[test]
    fn scale_rounds_half_up() {
        assert_eq!(scale(100.0, 1.0, 8.0), 13); // 12.5
        assert_eq!(scale(200.0, 22.1, 100.0), 44);
    }
}
