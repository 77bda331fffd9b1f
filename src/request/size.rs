//! Size segment: the output dimensions and how to reach them.
//!
//! Resolution happens in two steps. The first matches the grammar and
//! records the requested edges plus whether the request amounts to "full
//! resolution" (`is_max`). The second resolves that against the working size
//! and the tier cap, and always runs, even for `max`, because a tier can turn
//! a full-resolution request into a downscale.

use super::tier::cap;
use super::{RequestError, scale};
use crate::geometry::Size;
use crate::imaging::Operation;
use crate::pipeline::PipelineContext;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

/// Resize strategy handed to the pixel engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    /// Force both dimensions, distorting aspect ratio if needed.
    Fill,
    /// Preserve aspect ratio, scaling to the one given dimension.
    Contain,
    /// Preserve aspect ratio without exceeding either bound.
    Inside,
}

/// Resolved output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeTarget {
    pub width: u32,
    pub height: u32,
    pub fit: Fit,
}

impl SizeTarget {
    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Output of the grammar step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Requested {
    width: Option<u32>,
    height: Option<u32>,
    best_fit: bool,
    is_max: bool,
}

type Handler = fn(&Captures<'_>, Size) -> Result<Requested, RequestError>;

static PATTERNS: LazyLock<Vec<(Regex, Handler)>> = LazyLock::new(|| {
    let table: [(&str, Handler); 6] = [
        (r"^(full|max)$", max),
        (r"^(\d+),$", width_only),
        (r"^,(\d+)$", height_only),
        (r"^pct:(\d+\.?\d*|\.\d+)$", percent),
        (r"^(\d+),(\d+)$", exact),
        (r"^!(\d+),(\d+)$", best_fit),
    ];
    table
        .into_iter()
        .map(|(pattern, handler)| (Regex::new(pattern).expect("size pattern"), handler))
        .collect()
});

fn edge(caps: &Captures<'_>, index: usize) -> Result<u32, RequestError> {
    let value: u32 = caps[index]
        .parse()
        .map_err(|_| RequestError::malformed(format!("size value '{}' out of range", &caps[index])))?;
    if value == 0 {
        return Err(RequestError::malformed("size dimensions must be non-zero"));
    }
    Ok(value)
}

fn max(_: &Captures<'_>, _: Size) -> Result<Requested, RequestError> {
    Ok(Requested {
        width: None,
        height: None,
        best_fit: false,
        is_max: true,
    })
}

fn width_only(caps: &Captures<'_>, current: Size) -> Result<Requested, RequestError> {
    let width = edge(caps, 1)?;
    Ok(Requested {
        width: Some(width),
        height: None,
        best_fit: false,
        is_max: width == current.width,
    })
}

fn height_only(caps: &Captures<'_>, current: Size) -> Result<Requested, RequestError> {
    let height = edge(caps, 1)?;
    Ok(Requested {
        width: None,
        height: Some(height),
        best_fit: false,
        is_max: height == current.height,
    })
}

fn percent(caps: &Captures<'_>, current: Size) -> Result<Requested, RequestError> {
    let pct: f64 = caps[1]
        .parse()
        .map_err(|_| RequestError::malformed(format!("invalid size percentage '{}'", &caps[1])))?;
    let width = scale(current.width as f64, pct, 100.0);
    if width == 0 {
        return Err(RequestError::malformed("size percentage resolves to zero width"));
    }
    Ok(Requested {
        width: Some(width),
        height: None,
        best_fit: false,
        is_max: width == current.width,
    })
}

fn exact(caps: &Captures<'_>, current: Size) -> Result<Requested, RequestError> {
    let width = edge(caps, 1)?;
    let height = edge(caps, 2)?;
    Ok(Requested {
        width: Some(width),
        height: Some(height),
        best_fit: false,
        is_max: width == current.width && height == current.height,
    })
}

fn best_fit(caps: &Captures<'_>, current: Size) -> Result<Requested, RequestError> {
    let width = edge(caps, 1)?;
    let height = edge(caps, 2)?;
    // Only the longer axis of the current size decides "full resolution".
    let is_max = if current.is_landscape() {
        width == current.width
    } else {
        height == current.height
    };
    Ok(Requested {
        width: Some(width),
        height: Some(height),
        best_fit: true,
        is_max,
    })
}

/// Scale `current` so one edge hits the request; never collapses to zero.
fn proportional(value: u32, numerator: u32, denominator: u32) -> u32 {
    scale(value as f64, numerator as f64, denominator as f64).max(1)
}

fn explicit_target(requested: Requested, current: Size) -> Result<SizeTarget, RequestError> {
    let target = match (requested.width, requested.height) {
        (Some(width), Some(height)) if requested.best_fit => {
            let by_width = proportional(current.height, width, current.width);
            if by_width <= height {
                SizeTarget {
                    width,
                    height: by_width,
                    fit: Fit::Inside,
                }
            } else {
                SizeTarget {
                    width: proportional(current.width, height, current.height),
                    height,
                    fit: Fit::Inside,
                }
            }
        }
        (Some(width), Some(height)) => SizeTarget {
            width,
            height,
            fit: Fit::Fill,
        },
        (Some(width), None) => SizeTarget {
            width,
            height: proportional(current.height, width, current.width),
            fit: Fit::Contain,
        },
        (None, Some(height)) => SizeTarget {
            width: proportional(current.width, height, current.height),
            height,
            fit: Fit::Contain,
        },
        (None, None) => {
            return Err(RequestError::malformed("size request names no dimension"));
        }
    };
    Ok(target)
}

/// Size stage of a compiled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRequest {
    pub target: SizeTarget,
    /// Still full resolution after the tier was applied.
    pub is_max: bool,
}

impl SizeRequest {
    /// Resolve `raw` against the working size and tier, then set the working
    /// size to the result.
    pub fn parse(raw: &str, ctx: &mut PipelineContext) -> Result<Self, RequestError> {
        let current = ctx.size;
        let requested = PATTERNS
            .iter()
            .find_map(|(pattern, handler)| {
                pattern.captures(raw).map(|caps| handler(&caps, current))
            })
            .unwrap_or_else(|| Err(RequestError::malformed(format!("invalid size '{raw}'"))))?;

        let resolved = if requested.is_max {
            match ctx.tier.and_then(|tier| cap(tier, current)) {
                Some(capped) => Self {
                    target: SizeTarget {
                        width: capped.width,
                        height: capped.height,
                        fit: Fit::Inside,
                    },
                    is_max: false,
                },
                None => Self {
                    target: SizeTarget {
                        width: current.width,
                        height: current.height,
                        fit: Fit::Fill,
                    },
                    is_max: true,
                },
            }
        } else {
            Self {
                target: explicit_target(requested, current)?,
                is_max: false,
            }
        };

        ctx.size = resolved.target.size();
        Ok(resolved)
    }

    pub fn requires_processing(&self) -> bool {
        !self.is_max
    }

    pub fn describe(&self) -> Vec<Operation> {
        if self.requires_processing() {
            vec![Operation::Resize(self.target)]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TierCap;

    fn resolve(raw: &str, width: u32, height: u32, tier: Option<u32>) -> (SizeRequest, Size) {
        let mut ctx = PipelineContext::new(Size::new(width, height), tier.map(TierCap::new));
        let request = SizeRequest::parse(raw, &mut ctx).unwrap();
        (request, ctx.size)
    }

    fn fails(raw: &str, width: u32, height: u32) -> RequestError {
        let mut ctx = PipelineContext::new(Size::new(width, height), None);
        SizeRequest::parse(raw, &mut ctx).unwrap_err()
    }

    #[test]
    fn max_and_full_keep_size() {
        for raw in ["max", "full"] {
            let (request, size) = resolve(raw, 200, 100, None);
            assert!(request.is_max);
            assert!(!request.requires_processing());
            assert!(request.describe().is_empty());
            assert_eq!(size, Size::new(200, 100));
        }
    }

    #[test]
    fn width_only_scales_height() {
        let (request, size) = resolve("50,", 200, 100, None);
        assert_eq!(
            request.target,
            SizeTarget {
                width: 50,
                height: 25,
                fit: Fit::Contain
            }
        );
        assert!(request.requires_processing());
        assert_eq!(size, Size::new(50, 25));
    }

    #[test]
    fn height_only_scales_width() {
        let (request, _) = resolve(",40", 300, 200, None);
        assert_eq!(
            request.target,
            SizeTarget {
                width: 60,
                height: 40,
                fit: Fit::Contain
            }
        );
    }

    #[test]
    fn percent_scales_both_edges() {
        let (request, size) = resolve("pct:25", 200, 100, None);
        assert_eq!(request.target.fit, Fit::Contain);
        assert_eq!(size, Size::new(50, 25));
    }

    #[test]
    fn percent_of_hundred_is_max() {
        let (request, size) = resolve("pct:100", 200, 100, None);
        assert!(request.is_max);
        assert_eq!(size, Size::new(200, 100));
    }

    #[test]
    fn exact_dimensions_fill() {
        let (request, size) = resolve("30,70", 200, 100, None);
        assert_eq!(
            request.target,
            SizeTarget {
                width: 30,
                height: 70,
                fit: Fit::Fill
            }
        );
        assert_eq!(size, Size::new(30, 70));
    }

    #[test]
    fn best_fit_picks_width_candidate_on_landscape() {
        let (request, size) = resolve("!50,50", 200, 100, None);
        assert_eq!(
            request.target,
            SizeTarget {
                width: 50,
                height: 25,
                fit: Fit::Inside
            }
        );
        assert_eq!(size, Size::new(50, 25));
    }

    #[test]
    fn best_fit_picks_height_candidate_on_portrait() {
        let (request, _) = resolve("!50,50", 100, 200, None);
        assert_eq!(
            request.target,
            SizeTarget {
                width: 25,
                height: 50,
                fit: Fit::Inside
            }
        );
    }

    #[test]
    fn best_fit_max_follows_the_longer_axis() {
        let (request, _) = resolve("!200,500", 200, 100, None);
        assert!(request.is_max);

        let (request, _) = resolve("!500,100", 200, 100, None);
        assert!(!request.is_max);

        let (request, _) = resolve("!80,100", 50, 100, None);
        assert!(request.is_max);
    }

    #[test]
    fn resolving_own_output_is_max() {
        let (first, size) = resolve("120,45", 640, 480, None);
        assert!(first.requires_processing());
        let (again, resized) = resolve("120,45", size.width, size.height, None);
        assert!(again.is_max);
        assert!(!again.requires_processing());
        assert_eq!(resized, size);
    }

    #[test]
    fn tier_caps_max_requests() {
        let (request, size) = resolve("max", 4000, 3000, Some(1000));
        assert!(!request.is_max);
        assert!(request.requires_processing());
        assert_eq!(
            request.target,
            SizeTarget {
                width: 1000,
                height: 750,
                fit: Fit::Inside
            }
        );
        assert_eq!(size, Size::new(1000, 750));
    }

    #[test]
    fn tier_larger_than_image_changes_nothing() {
        let (request, size) = resolve("full", 800, 600, Some(800));
        assert!(request.is_max);
        assert_eq!(size, Size::new(800, 600));
    }

    #[test]
    fn tier_applies_to_explicit_full_resolution_requests() {
        let (request, size) = resolve("4000,", 4000, 3000, Some(1000));
        assert!(request.requires_processing());
        assert_eq!(size, Size::new(1000, 750));
    }

    #[test]
    fn tier_leaves_explicit_downscales_alone() {
        let (request, size) = resolve("2000,", 4000, 3000, Some(1000));
        assert_eq!(request.target.fit, Fit::Contain);
        assert_eq!(size, Size::new(2000, 1500));
    }

    #[test]
    fn computed_edge_never_collapses_to_zero() {
        let (_, size) = resolve("10,", 10_000, 1, None);
        assert_eq!(size, Size::new(10, 1));
    }

    #[test]
    fn zero_dimensions_are_malformed() {
        for raw in ["0,", ",0", "0,10", "10,0", "!0,10", "pct:0", "pct:0.1"] {
            assert!(
                matches!(fails(raw, 200, 100), RequestError::Malformed(_)),
                "expected '{raw}' to be malformed"
            );
        }
    }

    #[test]
    fn syntax_errors_are_malformed() {
        for raw in ["", ",", "MAX", "10", "!10,", "-10,", "10,10,10", "pct:", "pct:abc", "!pct:50"] {
            assert!(
                matches!(fails(raw, 200, 100), RequestError::Malformed(_)),
                "expected '{raw}' to be malformed"
            );
        }
    }
}
