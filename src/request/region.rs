//! Region segment: which part of the source to keep.
//!
//! Grammar, first match wins:
//!
//! | Form | Meaning |
//! |---|---|
//! | `full` | whole image |
//! | `square` | centered square of the shortest edge |
//! | `x,y,w,h` | absolute pixel box |
//! | `pct:x,y,w,h` | box as percentages of the current size |
//!
//! Boxes are clamped to the image: `left`/`top` never move, `width`/`height`
//! shrink to fit. A box that starts outside the image or ends up empty is
//! malformed. A box that still covers the whole image is classified full so
//! no crop is issued.

use super::RequestError;
use crate::geometry::{PixelBox, Size};
use crate::imaging::Operation;
use crate::pipeline::PipelineContext;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

/// Resolved region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionSpec {
    Full,
    /// Square crop with this edge length.
    Square { edge: u32 },
    Box(PixelBox),
}

/// Unclamped box in source coordinates, before bounds checks.
#[derive(Debug, Clone, Copy)]
struct RawBox {
    left: i64,
    top: i64,
    width: i64,
    height: i64,
}

enum Parsed {
    Full,
    Square,
    Boxed(RawBox),
}

type Handler = fn(&Captures<'_>, Size) -> Result<Parsed, RequestError>;

const NUMBER: &str = r"(\d+\.?\d*|\.\d+)";

static PATTERNS: LazyLock<Vec<(Regex, Handler)>> = LazyLock::new(|| {
    let pct = format!(r"^pct:{NUMBER},{NUMBER},{NUMBER},{NUMBER}$");
    vec![
        (literal("full"), full as Handler),
        (literal("square"), square as Handler),
        (
            Regex::new(r"^(\d+),(\d+),(\d+),(\d+)$").expect("pixel region pattern"),
            pixel_box as Handler,
        ),
        (
            Regex::new(&pct).expect("percent region pattern"),
            percent_box as Handler,
        ),
    ]
});

fn literal(word: &str) -> Regex {
    Regex::new(&format!("^{word}$")).expect("literal pattern")
}

fn full(_: &Captures<'_>, _: Size) -> Result<Parsed, RequestError> {
    Ok(Parsed::Full)
}

fn square(_: &Captures<'_>, _: Size) -> Result<Parsed, RequestError> {
    Ok(Parsed::Square)
}

fn integer(caps: &Captures<'_>, index: usize) -> Result<i64, RequestError> {
    caps[index]
        .parse()
        .map_err(|_| RequestError::malformed(format!("region value '{}' out of range", &caps[index])))
}

fn decimal(caps: &Captures<'_>, index: usize) -> Result<f64, RequestError> {
    caps[index]
        .parse()
        .map_err(|_| RequestError::malformed(format!("invalid region percentage '{}'", &caps[index])))
}

fn pixel_box(caps: &Captures<'_>, _: Size) -> Result<Parsed, RequestError> {
    Ok(Parsed::Boxed(RawBox {
        left: integer(caps, 1)?,
        top: integer(caps, 2)?,
        width: integer(caps, 3)?,
        height: integer(caps, 4)?,
    }))
}

fn percent_box(caps: &Captures<'_>, size: Size) -> Result<Parsed, RequestError> {
    let w = size.width as f64;
    let h = size.height as f64;
    let of = |extent: f64, pct: f64| (extent * pct / 100.0).round() as i64;
    Ok(Parsed::Boxed(RawBox {
        left: of(w, decimal(caps, 1)?),
        top: of(h, decimal(caps, 2)?),
        width: of(w, decimal(caps, 3)?),
        height: of(h, decimal(caps, 4)?),
    }))
}

/// Clamp a raw box into `size`, or reject it.
fn clamp(raw: RawBox, size: Size) -> Result<PixelBox, RequestError> {
    let max_w = i64::from(size.width);
    let max_h = i64::from(size.height);
    let left = raw.left.max(0);
    let top = raw.top.max(0);

    if left > max_w || top > max_h {
        return Err(RequestError::malformed(format!(
            "region origin {left},{top} lies outside {size}"
        )));
    }

    let width = raw.width.min(max_w - left);
    let height = raw.height.min(max_h - top);
    if width <= 0 || height <= 0 {
        return Err(RequestError::malformed("region has zero area"));
    }

    // All four values are bounded by the u32 size at this point.
    Ok(PixelBox::new(
        left as u32,
        top as u32,
        width as u32,
        height as u32,
    ))
}

/// Region stage of a compiled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRequest {
    pub spec: RegionSpec,
}

impl RegionRequest {
    /// Resolve `raw` against the working size, shrinking it to the region.
    pub fn parse(raw: &str, ctx: &mut PipelineContext) -> Result<Self, RequestError> {
        let size = ctx.size;
        let parsed = PATTERNS
            .iter()
            .find_map(|(pattern, handler)| pattern.captures(raw).map(|caps| handler(&caps, size)))
            .unwrap_or_else(|| Err(RequestError::malformed(format!("invalid region '{raw}'"))))?;

        let spec = match parsed {
            Parsed::Full => RegionSpec::Full,
            Parsed::Square if size.width == size.height => RegionSpec::Full,
            Parsed::Square => {
                let edge = size.shortest();
                ctx.size = Size::new(edge, edge);
                RegionSpec::Square { edge }
            }
            Parsed::Boxed(raw_box) => {
                let region = clamp(raw_box, size)?;
                if region.covers(size) {
                    RegionSpec::Full
                } else {
                    ctx.size = region.size();
                    RegionSpec::Box(region)
                }
            }
        };

        Ok(Self { spec })
    }

    pub fn requires_processing(&self) -> bool {
        self.spec != RegionSpec::Full
    }

    pub fn describe(&self) -> Vec<Operation> {
        match self.spec {
            RegionSpec::Full => Vec::new(),
            RegionSpec::Square { edge } => vec![Operation::SquareCrop { edge }],
            RegionSpec::Box(region) => vec![Operation::Crop(region)],
        }
    }
}
