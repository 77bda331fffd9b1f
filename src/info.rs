//! IIIF Image API 2.1 `info.json` documents.
//!
//! The document advertises the source's natural size, a ladder of
//! pre-computed `sizes`, and a level-2 profile. When a tier constrains the
//! source, the profile also carries `maxWidth`/`maxHeight` so clients ask
//! for sizes the service will actually return.

use crate::geometry::{Size, TierCap};
use crate::request::Codec;
use crate::request::tier::cap;
use serde::Serialize;

pub const CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
pub const PROTOCOL: &str = "http://iiif.io/api/image";
pub const COMPLIANCE: &str = "http://iiif.io/api/image/2/level2.json";

/// Smallest edge a `sizes` entry may have.
pub const MIN_LADDER_EDGE: u32 = 64;

const QUALITIES: [&str; 4] = ["default", "color", "gray", "bitonal"];

const SUPPORTS: [&str; 11] = [
    "mirroring",
    "regionByPct",
    "regionByPx",
    "regionSquare",
    "rotationArbitrary",
    "rotationBy90s",
    "sizeByConfinedWh",
    "sizeByH",
    "sizeByPct",
    "sizeByW",
    "sizeByWh",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoDocument {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: String,
    pub protocol: &'static str,
    pub width: u32,
    pub height: u32,
    pub sizes: Vec<Size>,
    pub profile: (&'static str, ProfileDescription),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDescription {
    pub formats: Vec<&'static str>,
    pub qualities: Vec<&'static str>,
    pub supports: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

/// Build the document for `identifier` served under `base_uri`.
pub fn info_document(
    base_uri: &str,
    identifier: &str,
    source: Size,
    tier: Option<TierCap>,
) -> InfoDocument {
    let capped = tier.and_then(|t| cap(t, source));
    let largest = capped.unwrap_or(source);

    InfoDocument {
        context: CONTEXT,
        id: format!(
            "{}/{}",
            base_uri.trim_end_matches('/'),
            identifier.replace('/', "%2F")
        ),
        protocol: PROTOCOL,
        width: source.width,
        height: source.height,
        sizes: size_ladder(largest),
        profile: (
            COMPLIANCE,
            ProfileDescription {
                formats: [Codec::Jpeg, Codec::Png, Codec::Webp, Codec::Tiff]
                    .into_iter()
                    .map(Codec::extension)
                    .collect(),
                qualities: QUALITIES.to_vec(),
                supports: SUPPORTS.to_vec(),
                max_width: capped.map(|s| s.width),
                max_height: capped.map(|s| s.height),
            },
        ),
    }
}

/// Successive halvings of `largest`, smallest first.
///
/// Each step divides both edges by the next power of two (rounding up) and
/// the ladder stops before an entry whose short edge drops under
/// [`MIN_LADDER_EDGE`]. `largest` itself is always present.
pub fn size_ladder(largest: Size) -> Vec<Size> {
    let mut ladder = vec![largest];
    for shift in 1..u32::BITS {
        let factor = 1u32 << shift;
        let step = Size::new(
            largest.width.div_ceil(factor),
            largest.height.div_ceil(factor),
        );
        if step.shortest() < MIN_LADDER_EDGE {
            break;
        }
        ladder.push(step);
    }
    ladder.reverse();
    ladder
}
