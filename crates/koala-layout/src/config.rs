//! Engine configuration.

use serde::Deserialize;

use crate::geometry::ContainingBlock;

/// Settings that stay fixed for the lifetime of a [`crate::LayoutEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of the viewport, which is the initial containing block.
    pub viewport_width: f32,
    /// Height of the viewport.
    pub viewport_height: f32,
    /// 'font-size' of anonymous text when no element supplies one.
    pub default_font_size: f32,
    /// Used value of `line-height: normal`, as a multiple of 'font-size'.
    pub line_height_ratio: f32,
    /// 'border-spacing' of tables that do not set one.
    pub border_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 816.0,
            viewport_height: 1056.0,
            default_font_size: 16.0,
            line_height_ratio: 1.2,
            border_spacing: 2.0,
        }
    }
}

impl LayoutConfig {
    /// [§ 10.1](https://www.w3.org/TR/CSS21/visudet.html#containing-block-details)
    ///
    /// "The containing block in which the root element lives is a
    /// rectangle called the initial containing block. For continuous
    /// media, it has the dimensions of the viewport."
    #[must_use]
    pub const fn viewport(&self) -> ContainingBlock {
        ContainingBlock::new(self.viewport_width, self.viewport_height)
    }
}
