//! Access-tier size cap policy.
//!
//! Pure function, no I/O.

use super::scale;
use crate::geometry::{Size, TierCap};

/// Scale `size` down so its longer edge fits the tier.
///
/// Returns `None` when both edges already fit (no cap needed). Otherwise the
/// longer edge becomes exactly `tier.max_size` and the shorter edge is scaled
/// proportionally and rounded, never below 1.
///
/// ```
/// # use iiif_derive::geometry::{Size, TierCap};
/// # use iiif_derive::request::tier::cap;
/// assert_eq!(cap(TierCap::new(100), Size::new(400, 300)), Some(Size::new(100, 75)));
/// assert_eq!(cap(TierCap::new(500), Size::new(400, 300)), None);
/// ```
pub fn cap(tier: TierCap, size: Size) -> Option<Size> {
    let edge = tier.max_size;
    let Size { width, height } = size;

    if width <= edge && height <= edge {
        return None;
    }

    let capped = if width > height {
        Size::new(edge, scale(height as f64, edge as f64, width as f64).max(1))
    } else if height > width {
        Size::new(scale(width as f64, edge as f64, height as f64).max(1), edge)
    } else {
        Size::new(edge, edge)
    };
    Some(capped)
}
