//! Plain geometry values shared by every pipeline stage.
//!
//! These types carry no behavior beyond trivial accessors. They are
//! serialized into `plan` output and info documents, so field names are the
//! stable wire names.

use serde::{Deserialize, Serialize};

/// Working dimensions of an image at some point in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the shorter edge.
    pub fn shortest(self) -> u32 {
        self.width.min(self.height)
    }

    /// Length of the longer edge.
    pub fn longest(self) -> u32 {
        self.width.max(self.height)
    }

    /// Landscape or square (width is the longer or equal axis).
    pub fn is_landscape(self) -> bool {
        self.width >= self.height
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An absolute pixel rectangle inside the working [`Size`] it was computed
/// against.
///
/// Invariant once produced by the region resolver: `left + width <= W`,
/// `top + height <= H`, `width > 0`, `height > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// True when the box covers the whole of `within`.
    pub fn covers(self, within: Size) -> bool {
        self.left == 0 && self.top == 0 && self.size() == within
    }
}

/// Longest edge permitted for an access tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCap {
    pub max_size: u32,
}

impl TierCap {
    pub fn new(max_size: u32) -> Self {
        Self { max_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_edges() {
        let size = Size::new(300, 200);
        assert_eq!(size.shortest(), 200);
        assert_eq!(size.longest(), 300);
        assert!(size.is_landscape());
        assert!(!Size::new(200, 300).is_landscape());
        assert!(Size::new(50, 50).is_landscape());
    }

    #[test]
    fn box_covers_only_exact_full_frame() {
        let frame = Size::new(200, 100);
        assert!(PixelBox::new(0, 0, 200, 100).covers(frame));
        assert!(!PixelBox::new(1, 0, 199, 100).covers(frame));
        assert!(!PixelBox::new(0, 0, 200, 99).covers(frame));
    }

    #[test]
    fn size_display() {
        assert_eq!(Size::new(640, 480).to_string(), "640x480");
    }
}
