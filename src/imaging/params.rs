//! Operation descriptions handed to a pixel engine.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the request compiler (which decides the operations) and
//! a [`PixelEngine`] (which does the actual pixel work). This separation keeps
//! the compiler free of I/O and lets tests swap in a recording engine.
//!
//! | Operation | Issued by | Engine call |
//! |---|---|---|
//! | `Crop` | region box | [`PixelEngine::crop`] |
//! | `SquareCrop` | region `square` | [`PixelEngine::square_crop`] |
//! | `Resize` | size | [`PixelEngine::resize`] |
//! | `Flip` | rotation `!` | [`PixelEngine::flip`] |
//! | `Rotate` | rotation degrees | [`PixelEngine::rotate`] |
//! | `Gamma`, `Grayscale` | quality `gray` | [`PixelEngine::gamma`], [`PixelEngine::grayscale`] |
//! | `Threshold` | quality `bitonal` | [`PixelEngine::threshold`] |
//! | `Encode` | format | [`PixelEngine::encode`] |

use super::backend::PixelEngine;
use crate::geometry::PixelBox;
use crate::request::{FormatSpec, SizeTarget};
use serde::Serialize;

/// One engine call, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Crop(PixelBox),
    /// Square of `edge` pixels anchored by the engine.
    SquareCrop { edge: u32 },
    Resize(SizeTarget),
    /// Horizontal mirror.
    Flip,
    /// Clockwise rotation, canvas grown to fit.
    Rotate { degrees: u16 },
    Gamma { exponent: f32 },
    Grayscale,
    Threshold { level: u8 },
    Encode(FormatSpec),
}

impl Operation {
    /// Issue this operation to `engine`.
    ///
    /// Returns the encoded buffer for [`Operation::Encode`], `None` otherwise.
    pub fn apply_to<E: PixelEngine + ?Sized>(
        &self,
        engine: &mut E,
    ) -> Result<Option<Vec<u8>>, E::Error> {
        match *self {
            Self::Crop(region) => engine.crop(region)?,
            Self::SquareCrop { edge } => engine.square_crop(edge)?,
            Self::Resize(target) => engine.resize(target)?,
            Self::Flip => engine.flip()?,
            Self::Rotate { degrees } => engine.rotate(degrees)?,
            Self::Gamma { exponent } => engine.gamma(exponent)?,
            Self::Grayscale => engine.grayscale()?,
            Self::Threshold { level } => engine.threshold(level)?,
            Self::Encode(format) => return engine.encode(&format).map(Some),
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Fit;

    #[test]
    fn serializes_with_op_tag() {
        let json = serde_json::to_value(Operation::Crop(PixelBox::new(1, 2, 3, 4))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "crop", "left": 1, "top": 2, "width": 3, "height": 4})
        );

        let json = serde_json::to_value(Operation::Resize(SizeTarget {
            width: 10,
            height: 20,
            fit: Fit::Inside,
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "resize", "width": 10, "height": 20, "fit": "inside"})
        );
    }

    #[test]
    fn encode_carries_codec_profile() {
        let json = serde_json::to_value(Operation::Encode(FormatSpec::Jpeg {
            quality: 80,
            progressive: false,
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "encode", "codec": "jpeg", "quality": 80, "progressive": false})
        );
    }

    #[test]
    fn unit_operations_serialize_as_tag_only() {
        let json = serde_json::to_value(Operation::Flip).unwrap();
        assert_eq!(json, serde_json::json!({"op": "flip"}));
    }
}
