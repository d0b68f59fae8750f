//! Computed and auto value types for layout.
//!
//! [§ 6.1.2 Computed values](https://www.w3.org/TR/CSS21/cascade.html#computed-value)

use serde::{Deserialize, Serialize};

/// A computed length: absolute pixels or a percentage of the containing
/// block that can only be resolved during layout.
///
/// [§ 4.3.3 Percentages](https://www.w3.org/TR/CSS21/syndata.html#percentage-units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Length {
    /// Absolute length in CSS pixels.
    Px(f32),
    /// Percentage, written in scenes as `{"percent": 50}`.
    Percent {
        /// The percentage value (50 means 50%).
        percent: f32,
    },
}

impl Default for Length {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl Length {
    /// Percentage length.
    #[must_use]
    pub const fn percent(percent: f32) -> Self {
        Self::Percent { percent }
    }

    /// Resolve against `basis`, the dimension percentages refer to.
    #[must_use]
    pub fn resolve(self, basis: f32) -> f32 {
        match self {
            Self::Px(px) => px,
            Self::Percent { percent } => basis * percent / 100.0,
        }
    }

    /// `true` for percentages.
    #[must_use]
    pub const fn is_percentage(self) -> bool {
        matches!(self, Self::Percent { .. })
    }
}

/// A computed `<length> | <percentage> | auto`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthOrAuto {
    /// The keyword `auto`.
    #[default]
    Auto,
    /// A length or percentage.
    #[serde(untagged)]
    Length(Length),
}

impl LengthOrAuto {
    /// Pixel length.
    #[must_use]
    pub const fn px(px: f32) -> Self {
        Self::Length(Length::Px(px))
    }

    /// Percentage length.
    #[must_use]
    pub const fn percent(percent: f32) -> Self {
        Self::Length(Length::percent(percent))
    }

    /// Resolve against `basis`, keeping `auto`.
    #[must_use]
    pub fn resolve(self, basis: f32) -> AutoOr {
        match self {
            Self::Auto => AutoOr::Auto,
            Self::Length(length) => AutoOr::Length(length.resolve(basis)),
        }
    }

    /// `true` for `auto`.
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// [§ 4.4 Automatic values](https://www.w3.org/TR/CSS2/cascade.html#value-def-auto)
///
/// "Some properties can take the keyword 'auto' as a value. This keyword
/// means the user agent should compute the value based on other
/// properties."
///
/// A resolved value that is either a definite pixel length or still `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AutoOr {
    /// Not yet determined; solved by the constraint equations.
    #[default]
    Auto,
    /// A definite length in pixels.
    Length(f32),
}

impl AutoOr {
    /// `true` for `auto`.
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    /// The length, or `default` when `auto`.
    #[must_use]
    pub const fn to_px_or(self, default: f32) -> f32 {
        match self {
            Self::Auto => default,
            Self::Length(px) => px,
        }
    }

    /// The length, or `None` when `auto`.
    #[must_use]
    pub const fn length(self) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Length(px) => Some(px),
        }
    }
}

/// Margin edges that may individually be `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AutoEdgeSizes {
    /// Top edge.
    pub top: AutoOr,
    /// Right edge.
    pub right: AutoOr,
    /// Bottom edge.
    pub bottom: AutoOr,
    /// Left edge.
    pub left: AutoOr,
}
