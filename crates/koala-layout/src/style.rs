//! Style inputs for layout.
//!
//! Selector matching and the cascade happen elsewhere. Layout receives a
//! [`ComputedStyle`] per element, in which every value is either absolute
//! or a percentage, and resolves it against the viewport and the
//! containing block into a [`ResolvedStyle`] during each pass.
//!
//! [§ 6.1 Specified, computed, and actual values](https://www.w3.org/TR/CSS21/cascade.html#value-stages)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::box_tree::BoxId;
use crate::content::NodeId;
use crate::flags::LayoutFlags;
use crate::float::{ClearSide, FloatSide};
use crate::geometry::{ContainingBlock, EdgeSizes};
use crate::positioned::PositionType;
use crate::stacking::{StackingContextId, ZIndex};
use crate::values::{AutoEdgeSizes, AutoOr, Length, LengthOrAuto};

/// [§ 9.2.4 The 'display' property](https://www.w3.org/TR/CSS21/visuren.html#display-prop)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Display {
    /// "This value causes an element to generate one or more inline boxes."
    #[default]
    Inline,
    /// "This value causes an element to generate a block box."
    Block,
    /// "This value causes an element to generate an inline-level block
    /// container."
    InlineBlock,
    /// "This value causes an element to generate a principal block box and
    /// a marker box."
    ListItem,
    /// A block-level table.
    Table,
    /// A table row.
    TableRow,
    /// A table cell.
    TableCell,
    /// "This value causes an element to not appear in the formatting
    /// structure."
    None,
}

impl Display {
    /// Block-level values, before blockification.
    #[must_use]
    pub const fn is_block_level(self) -> bool {
        matches!(self, Self::Block | Self::ListItem | Self::Table)
    }

    /// Inline-level values.
    #[must_use]
    pub const fn is_inline_level(self) -> bool {
        matches!(self, Self::Inline | Self::InlineBlock)
    }

    /// [§ 9.7 Relationships between 'display', 'position', and 'float'](https://www.w3.org/TR/CSS21/visuren.html#dis-pos-flo)
    ///
    /// "Otherwise, if 'position' has the value 'absolute' or 'fixed', the
    /// box is absolutely positioned, ... and the display is set according
    /// to the table below."
    #[must_use]
    pub const fn blockified(self) -> Self {
        match self {
            Self::Inline | Self::InlineBlock | Self::TableRow | Self::TableCell => Self::Block,
            other => other,
        }
    }
}

/// [§ 11.1.1 Overflow](https://www.w3.org/TR/CSS21/visufx.html#overflow)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Overflow {
    /// "Content is not clipped."
    #[default]
    Visible,
    /// "Content is clipped and no scrolling user interface should be
    /// provided."
    Hidden,
    /// "Content is clipped and ... a scrolling mechanism is provided."
    Scroll,
    /// "The behavior of the 'auto' value is user agent-dependent."
    Auto,
}

/// [§ 11.2 Visibility](https://www.w3.org/TR/CSS21/visufx.html#visibility)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Visibility {
    /// "The generated box is visible."
    #[default]
    Visible,
    /// "The generated box is invisible (fully transparent), but still
    /// affects layout."
    Hidden,
    /// Same as `hidden` outside tables.
    Collapse,
}

/// [§ 16.2 Alignment: the 'text-align' property](https://www.w3.org/TR/CSS21/text.html#alignment-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    /// Lines start at the left edge.
    #[default]
    Left,
    /// Lines end at the right edge.
    Right,
    /// Lines are centered.
    Center,
    /// Laid out as `left`; inter-word stretching is not applied.
    Justify,
}

/// [§ 16.6 White space: the 'white-space' property](https://www.w3.org/TR/CSS21/text.html#white-space-prop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhiteSpace {
    /// Collapse white space, wrap lines.
    #[default]
    Normal,
    /// Preserve white space, break only at newlines.
    Pre,
    /// Collapse white space, never wrap.
    Nowrap,
    /// Preserve white space, wrap lines.
    PreWrap,
    /// Collapse spaces but keep newlines, wrap lines.
    PreLine,
}

impl WhiteSpace {
    /// Lines may wrap at soft break opportunities.
    #[must_use]
    pub const fn wraps(self) -> bool {
        matches!(self, Self::Normal | Self::PreWrap | Self::PreLine)
    }

    /// Runs of spaces are kept as they are.
    #[must_use]
    pub const fn preserves_spaces(self) -> bool {
        matches!(self, Self::Pre | Self::PreWrap)
    }

    /// Newlines force a line break.
    #[must_use]
    pub const fn preserves_newlines(self) -> bool {
        matches!(self, Self::Pre | Self::PreWrap | Self::PreLine)
    }
}

/// [§ 9.10 Text direction](https://www.w3.org/TR/CSS21/visuren.html#direction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Left-to-right.
    #[default]
    Ltr,
    /// Right-to-left. Laid out as `ltr`.
    Rtl,
}

/// [§ 14.2.1 'background-attachment'](https://www.w3.org/TR/CSS21/colors.html#propdef-background-attachment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundAttachment {
    /// "The background is fixed with regard to the element itself."
    #[default]
    Scroll,
    /// "The background is fixed with regard to the viewport."
    Fixed,
}

/// Intrinsic dimensions of a replaced element's content.
///
/// [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS21/visudet.html#inline-replaced-width)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntrinsicSize {
    /// Intrinsic width in pixels.
    pub width: f32,
    /// Intrinsic height in pixels.
    pub height: f32,
}

/// Four values, one per side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SidesRepr<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de> + Copy + Default"))]
pub struct Sides<T> {
    /// Top side.
    pub top: T,
    /// Right side.
    pub right: T,
    /// Bottom side.
    pub bottom: T,
    /// Left side.
    pub left: T,
}

impl<T: Copy> Sides<T> {
    /// The same value on every side.
    #[must_use]
    pub const fn all(value: T) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Scene shorthand: a bare value applies to all four sides.
#[derive(Deserialize)]
#[serde(untagged)]
enum SidesRepr<T> {
    All(T),
    Each {
        #[serde(default)]
        top: T,
        #[serde(default)]
        right: T,
        #[serde(default)]
        bottom: T,
        #[serde(default)]
        left: T,
    },
}

impl<T: Copy> From<SidesRepr<T>> for Sides<T> {
    fn from(repr: SidesRepr<T>) -> Self {
        match repr {
            SidesRepr::All(value) => Self::all(value),
            SidesRepr::Each {
                top,
                right,
                bottom,
                left,
            } => Self {
                top,
                right,
                bottom,
                left,
            },
        }
    }
}

/// Computed values of every property layout reads.
///
/// Colors are packed `0xRRGGBBAA`; `0` is transparent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    /// 'display'
    pub display: Display,
    /// 'position'
    pub position: PositionType,
    /// 'float'
    pub float: Option<FloatSide>,
    /// 'clear'
    pub clear: Option<ClearSide>,
    /// 'overflow'
    pub overflow: Overflow,
    /// 'visibility'
    pub visibility: Visibility,
    /// 'z-index'
    pub z_index: ZIndex,
    /// 'direction'
    pub direction: Direction,
    /// 'margin-*'
    pub margin: Sides<LengthOrAuto>,
    /// 'padding-*'
    pub padding: Sides<Length>,
    /// 'border-*-width', already zero for `border-style: none`.
    pub border_width: Sides<f32>,
    /// 'width'
    pub width: LengthOrAuto,
    /// 'height'
    pub height: LengthOrAuto,
    /// 'min-width'
    pub min_width: Length,
    /// 'max-width', `None` for `none`.
    pub max_width: Option<Length>,
    /// 'min-height'
    pub min_height: Length,
    /// 'max-height', `None` for `none`.
    pub max_height: Option<Length>,
    /// 'top', 'right', 'bottom', 'left'
    pub inset: Sides<LengthOrAuto>,
    /// 'text-align'
    pub text_align: TextAlign,
    /// 'white-space'
    pub white_space: WhiteSpace,
    /// 'font-size' in pixels.
    pub font_size: f32,
    /// 'line-height' in pixels, `None` for `normal`.
    pub line_height: Option<f32>,
    /// 'background-color'
    pub background_color: u32,
    /// 'background-image' URL.
    pub background_image: Option<String>,
    /// 'background-attachment'
    pub background_attachment: BackgroundAttachment,
    /// 'background-position' horizontal component.
    pub background_position_x: Length,
    /// 'background-position' vertical component.
    pub background_position_y: Length,
    /// 'border-spacing' for tables, `None` for the engine default.
    pub border_spacing: Option<f32>,
    /// Number of columns a table cell spans.
    pub column_span: u32,
    /// Intrinsic size when the element is replaced content.
    pub replaced: Option<IntrinsicSize>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Inline,
            position: PositionType::Static,
            float: None,
            clear: None,
            overflow: Overflow::Visible,
            visibility: Visibility::Visible,
            z_index: ZIndex::Auto,
            direction: Direction::Ltr,
            margin: Sides::all(LengthOrAuto::px(0.0)),
            padding: Sides::all(Length::Px(0.0)),
            border_width: Sides::all(0.0),
            width: LengthOrAuto::Auto,
            height: LengthOrAuto::Auto,
            min_width: Length::Px(0.0),
            max_width: None,
            min_height: Length::Px(0.0),
            max_height: None,
            inset: Sides::all(LengthOrAuto::Auto),
            text_align: TextAlign::Left,
            white_space: WhiteSpace::Normal,
            font_size: 16.0,
            line_height: None,
            background_color: 0,
            background_image: None,
            background_attachment: BackgroundAttachment::Scroll,
            background_position_x: Length::Px(0.0),
            background_position_y: Length::Px(0.0),
            border_spacing: None,
            column_span: 1,
            replaced: None,
        }
    }
}

impl ComputedStyle {
    /// A `display: block` style with everything else initial.
    #[must_use]
    pub fn block() -> Self {
        Self {
            display: Display::Block,
            ..Self::default()
        }
    }

    /// [§ 9.7](https://www.w3.org/TR/CSS21/visuren.html#dis-pos-flo) The
    /// display value after floats and absolutely positioned boxes are
    /// blockified.
    #[must_use]
    pub const fn used_display(&self) -> Display {
        if matches!(self.display, Display::None) {
            Display::None
        } else if self.is_absolutely_positioned() || self.float.is_some() {
            self.display.blockified()
        } else {
            self.display
        }
    }

    /// `position: absolute | fixed`
    #[must_use]
    pub const fn is_absolutely_positioned(&self) -> bool {
        matches!(self.position, PositionType::Absolute | PositionType::Fixed)
    }

    /// A float that is not absolutely positioned.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        self.float.is_some() && !self.is_absolutely_positioned()
    }

    /// Not `position: static`.
    #[must_use]
    pub const fn is_positioned(&self) -> bool {
        !matches!(self.position, PositionType::Static)
    }

    /// Content is clipped to the padding box.
    #[must_use]
    pub const fn is_clipped(&self) -> bool {
        !matches!(self.overflow, Overflow::Visible)
    }

    /// [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS21/visuren.html#block-formatting)
    ///
    /// "Floats, absolutely positioned elements, block containers (such as
    /// inline-blocks, table-cells, and table-captions) that are not block
    /// boxes, and block boxes with 'overflow' other than 'visible' ...
    /// establish new block formatting contexts for their contents."
    #[must_use]
    pub const fn establishes_formatting_context(&self) -> bool {
        self.is_float()
            || self.is_absolutely_positioned()
            || matches!(
                self.display,
                Display::InlineBlock | Display::TableCell | Display::Table
            )
            || self.is_clipped()
    }

    /// Used 'line-height' in pixels.
    #[must_use]
    pub fn used_line_height(&self, normal_ratio: f32) -> f32 {
        self.line_height.unwrap_or(self.font_size * normal_ratio)
    }
}

/// Values of a [`ComputedStyle`] resolved to pixels for one layout pass.
///
/// [§ 6.1.3 Used values](https://www.w3.org/TR/CSS21/cascade.html#used-value)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedStyle {
    /// Margins; `auto` survives until the width/height equations.
    pub margin: AutoEdgeSizes,
    /// Padding widths.
    pub padding: EdgeSizes,
    /// Border widths.
    pub border: EdgeSizes,
    /// 'width'
    pub width: AutoOr,
    /// 'height'
    pub height: AutoOr,
    /// 'min-width'
    pub min_width: f32,
    /// 'max-width'
    pub max_width: Option<f32>,
    /// 'min-height'
    pub min_height: f32,
    /// 'max-height'
    pub max_height: Option<f32>,
    /// 'top', 'right', 'bottom', 'left'
    pub inset: AutoEdgeSizes,
}

impl ResolvedStyle {
    /// [§ 10.2](https://www.w3.org/TR/CSS21/visudet.html#the-width-property)
    /// [§ 10.5](https://www.w3.org/TR/CSS21/visudet.html#the-height-property)
    ///
    /// Resolve `style` against the containing block. Horizontal and
    /// vertical margins and paddings refer to the containing block's width;
    /// heights refer to its height, and compute to `auto` when that height
    /// depends on content. Offsets refer to the matching dimension.
    #[must_use]
    pub fn resolve(style: &ComputedStyle, cb: ContainingBlock) -> Self {
        let w = cb.width;
        let h = cb.height;
        let height = match style.height {
            LengthOrAuto::Length(length) if length.is_percentage() && cb.height_is_auto => {
                AutoOr::Auto
            }
            other => other.resolve(h),
        };
        let max_height = style.max_height.and_then(|length| {
            if length.is_percentage() && cb.height_is_auto {
                None
            } else {
                Some(length.resolve(h))
            }
        });
        let min_height = if style.min_height.is_percentage() && cb.height_is_auto {
            0.0
        } else {
            style.min_height.resolve(h)
        };
        Self {
            margin: AutoEdgeSizes {
                top: style.margin.top.resolve(w),
                right: style.margin.right.resolve(w),
                bottom: style.margin.bottom.resolve(w),
                left: style.margin.left.resolve(w),
            },
            padding: EdgeSizes {
                top: style.padding.top.resolve(w).max(0.0),
                right: style.padding.right.resolve(w).max(0.0),
                bottom: style.padding.bottom.resolve(w).max(0.0),
                left: style.padding.left.resolve(w).max(0.0),
            },
            border: EdgeSizes {
                top: style.border_width.top.max(0.0),
                right: style.border_width.right.max(0.0),
                bottom: style.border_width.bottom.max(0.0),
                left: style.border_width.left.max(0.0),
            },
            width: style.width.resolve(w),
            height,
            min_width: style.min_width.resolve(w).max(0.0),
            max_width: style.max_width.map(|length| length.resolve(w).max(0.0)),
            min_height: min_height.max(0.0),
            max_height: max_height.map(|v| v.max(0.0)),
            inset: AutoEdgeSizes {
                top: style.inset.top.resolve(h),
                right: style.inset.right.resolve(w),
                bottom: style.inset.bottom.resolve(h),
                left: style.inset.left.resolve(w),
            },
        }
    }

    /// Used values of an anonymous box: no margins, borders or padding,
    /// and `auto` for everything else.
    #[must_use]
    pub fn anonymous() -> Self {
        let zero = AutoOr::Length(0.0);
        Self {
            margin: AutoEdgeSizes {
                top: zero,
                right: zero,
                bottom: zero,
                left: zero,
            },
            ..Self::default()
        }
    }

    /// The values that only move a box, never resize it.
    const fn without_inset(mut self) -> Self {
        self.inset = AutoEdgeSizes {
            top: AutoOr::Auto,
            right: AutoOr::Auto,
            bottom: AutoOr::Auto,
            left: AutoOr::Auto,
        };
        self
    }
}

/// Per-element style record with its box back-references.
#[derive(Debug, Clone)]
pub struct StyleEntry {
    /// The element's computed style.
    pub computed: ComputedStyle,
    /// Result of the last [`StyleMap::resolve`], if any.
    pub resolved: Option<ResolvedStyle>,
    /// Boxes generated for this element, in generation order.
    pub boxes: Vec<BoxId>,
    /// Stacking context the element's boxes paint in.
    pub stacking_context: Option<StackingContextId>,
}

/// Computed styles for every element, keyed by content node.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    entries: HashMap<NodeId, StyleEntry>,
}

impl StyleMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the computed style of `node`, keeping its box references.
    /// Returns the previous computed style.
    pub fn set(&mut self, node: NodeId, computed: ComputedStyle) -> Option<ComputedStyle> {
        match self.entries.get_mut(&node) {
            Some(entry) => Some(std::mem::replace(&mut entry.computed, computed)),
            None => {
                let _ = self.entries.insert(
                    node,
                    StyleEntry {
                        computed,
                        resolved: None,
                        boxes: Vec::new(),
                        stacking_context: None,
                    },
                );
                None
            }
        }
    }

    /// Drop the style of `node`.
    pub fn remove(&mut self, node: NodeId) -> Option<StyleEntry> {
        self.entries.remove(&node)
    }

    /// The record for `node`.
    #[must_use]
    pub fn entry(&self, node: NodeId) -> Option<&StyleEntry> {
        self.entries.get(&node)
    }

    /// Mutable record for `node`.
    pub fn entry_mut(&mut self, node: NodeId) -> Option<&mut StyleEntry> {
        self.entries.get_mut(&node)
    }

    /// Computed style of `node`.
    #[must_use]
    pub fn computed(&self, node: NodeId) -> Option<&ComputedStyle> {
        self.entries.get(&node).map(|e| &e.computed)
    }

    /// Last resolved style of `node`.
    #[must_use]
    pub fn resolved(&self, node: NodeId) -> Option<ResolvedStyle> {
        self.entries.get(&node).and_then(|e| e.resolved)
    }

    /// Resolve the style of `node` against `cb` and report what changed
    /// since the previous resolution: `NEED_REFLOW` when anything that
    /// affects size changed (and on first resolution), `NEED_REPOSITION`
    /// when only offsets changed, and nothing otherwise.
    pub fn resolve(&mut self, node: NodeId, cb: ContainingBlock) -> LayoutFlags {
        let Some(entry) = self.entries.get_mut(&node) else {
            return LayoutFlags::empty();
        };
        let next = ResolvedStyle::resolve(&entry.computed, cb);
        let flags = match entry.resolved {
            None => LayoutFlags::NEED_REFLOW,
            Some(prev) if prev.without_inset() != next.without_inset() => LayoutFlags::NEED_REFLOW,
            Some(prev) if prev.inset != next.inset => LayoutFlags::NEED_REPOSITION,
            Some(_) => LayoutFlags::empty(),
        };
        entry.resolved = Some(next);
        flags
    }

    /// The principal (first) box of `node`.
    #[must_use]
    pub fn get_box(&self, node: NodeId) -> Option<BoxId> {
        self.entries.get(&node).and_then(|e| e.boxes.first().copied())
    }

    /// The most recently generated box of `node`.
    #[must_use]
    pub fn last_box(&self, node: NodeId) -> Option<BoxId> {
        self.entries.get(&node).and_then(|e| e.boxes.last().copied())
    }

    /// Record that `id` was generated for `node`.
    pub fn add_box(&mut self, node: NodeId, id: BoxId) {
        if let Some(entry) = self.entries.get_mut(&node) {
            if !entry.boxes.contains(&id) {
                entry.boxes.push(id);
            }
        }
    }

    /// Clear the back-reference from `node` to `id`.
    pub fn remove_box(&mut self, node: NodeId, id: BoxId) {
        if let Some(entry) = self.entries.get_mut(&node) {
            entry.boxes.retain(|&b| b != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_width(style: &ComputedStyle, cb: f32) -> ResolvedStyle {
        ResolvedStyle::resolve(style, ContainingBlock::new(cb, 600.0))
    }

    #[test]
    fn percentages_follow_containing_block_width() {
        let style = ComputedStyle {
            width: LengthOrAuto::percent(50.0),
            margin: Sides::all(LengthOrAuto::percent(10.0)),
            ..ComputedStyle::block()
        };
        let resolved = resolve_width(&style, 800.0);
        assert_eq!(resolved.width.length(), Some(400.0));
        assert_eq!(
            resolved.margin.top.length(),
            Some(80.0),
            "vertical margins refer to the width"
        );
    }

    #[test]
    fn percentage_height_of_auto_height_block_is_auto() {
        let style = ComputedStyle {
            height: LengthOrAuto::percent(50.0),
            ..ComputedStyle::block()
        };
        let resolved = ResolvedStyle::resolve(&style, ContainingBlock::with_auto_height(800.0, 0.0));
        assert!(resolved.height.is_auto());
    }

    #[test]
    fn resolve_reports_changed_axes() {
        let mut styles = StyleMap::new();
        let node = NodeId(1);
        let _ = styles.set(node, ComputedStyle::block());
        let cb = ContainingBlock::new(800.0, 600.0);

        assert_eq!(styles.resolve(node, cb), LayoutFlags::NEED_REFLOW);
        assert!(styles.resolve(node, cb).is_empty(), "nothing changed");

        let mut moved = ComputedStyle::block();
        moved.inset.left = LengthOrAuto::px(10.0);
        let _ = styles.set(node, moved);
        assert_eq!(styles.resolve(node, cb), LayoutFlags::NEED_REPOSITION);

        assert_eq!(
            styles.resolve(node, ContainingBlock::new(400.0, 600.0)),
            LayoutFlags::empty(),
            "fixed lengths ignore the containing block"
        );

        let mut styled = styles.computed(node).cloned().unwrap();
        styled.width = LengthOrAuto::percent(50.0);
        let _ = styles.set(node, styled);
        assert_eq!(styles.resolve(node, cb), LayoutFlags::NEED_REFLOW);
    }

    #[test]
    fn sides_shorthand_in_scene_json() {
        let style: ComputedStyle =
            serde_json::from_str(r#"{"display":"block","margin":"auto","padding":{"left":4}}"#)
                .unwrap();
        assert_eq!(style.margin, Sides::all(LengthOrAuto::Auto));
        assert_eq!(style.padding.left, Length::Px(4.0));
        assert_eq!(style.padding.top, Length::Px(0.0));
    }
}
