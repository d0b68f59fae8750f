//! CSS Box Model geometry.
//!
//! [CSS 2.1 § 8 Box model](https://www.w3.org/TR/CSS21/box.html)

use serde::{Deserialize, Serialize};

/// A rectangle positioned in 2D space.
///
/// [§ 8.1 Box dimensions](https://www.w3.org/TR/CSS21/box.html#box-dimensions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    /// Horizontal position of the top-left corner.
    pub x: f32,
    /// Vertical position of the top-left corner.
    pub y: f32,
    /// Width of the rectangle.
    pub width: f32,
    /// Height of the rectangle.
    pub height: f32,
}

impl Rect {
    /// Right edge (`x + width`).
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Edge sizes for padding, border, or margin.
///
/// [§ 8.1 Box dimensions](https://www.w3.org/TR/CSS21/box.html#box-dimensions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSizes {
    /// Top edge size.
    pub top: f32,
    /// Right edge size.
    pub right: f32,
    /// Bottom edge size.
    pub bottom: f32,
    /// Left edge size.
    pub left: f32,
}

impl EdgeSizes {
    /// All four edges set to zero.
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    /// The same size on every edge.
    #[must_use]
    pub const fn uniform(size: f32) -> Self {
        Self {
            top: size,
            right: size,
            bottom: size,
            left: size,
        }
    }

    /// `left + right`
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// `top + bottom`
    #[must_use]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// [§ 10.1 Definition of "containing block"](https://www.w3.org/TR/CSS21/visudet.html#containing-block-details)
///
/// "The position and size of an element's box(es) are sometimes calculated
/// relative to a certain rectangle, called the containing block of the
/// element."
///
/// A read-only view used for percentage resolution. For absolutely
/// positioned boxes this is a synthetic block built from the padding box of
/// the nearest positioned ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainingBlock {
    /// Width available to children.
    pub width: f32,
    /// Height available to children.
    pub height: f32,
    /// The height depends on content, so percentage heights compute to
    /// `auto` ([§ 10.5](https://www.w3.org/TR/CSS21/visudet.html#the-height-property)).
    pub height_is_auto: bool,
}

impl ContainingBlock {
    /// Create a containing block of the given definite size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            height_is_auto: false,
        }
    }

    /// A containing block whose height is not known before layout.
    #[must_use]
    pub const fn with_auto_height(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            height_is_auto: true,
        }
    }
}

/// Tolerance used when comparing resolved lengths.
pub const EPSILON: f32 = 0.01;

/// `true` when two lengths are equal within [`EPSILON`].
#[must_use]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}
