//! Relative and absolute positioning.
//!
//! [§ 9.3 Positioning schemes](https://www.w3.org/TR/CSS21/visuren.html#positioning-scheme)
//! [§ 10.3.7 Absolutely positioned, non-replaced elements](https://www.w3.org/TR/CSS21/visudet.html#abs-non-replaced-width)
//! [§ 10.6.4 Absolutely positioned, non-replaced elements](https://www.w3.org/TR/CSS21/visudet.html#abs-non-replaced-height)
//!
//! Absolutely positioned boxes are placed after normal flow has been
//! resolved to absolute coordinates, in tree order, so the padding box of
//! every containing block and every static position is already known when
//! a box is placed.

use serde::{Deserialize, Serialize};

use crate::block::{WidthRule, replaced_size};
use crate::box_tree::{BoxId, LayoutBox};
use crate::flags::LayoutFlags;
use crate::geometry::ContainingBlock;
use crate::pass::LayoutPass;
use crate::style::ResolvedStyle;
use crate::values::{AutoEdgeSizes, AutoOr};

/// [§ 9.3.1 Choosing a positioning scheme: 'position' property](https://www.w3.org/TR/CSS21/visuren.html#choose-position)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PositionType {
    /// "The box is a normal box, laid out according to the normal flow."
    #[default]
    Static,
    /// "The box's position is calculated according to the normal flow.
    /// Then the box is offset relative to its normal position."
    Relative,
    /// "The box's position (and possibly size) is specified with the
    /// 'top', 'right', 'bottom', and 'left' properties."
    Absolute,
    /// "The box's position is calculated according to the 'absolute'
    /// model, but in addition, the box is fixed with respect to some
    /// reference."
    Fixed,
}

/// [§ 9.4.3 Relative positioning](https://www.w3.org/TR/CSS21/visuren.html#relative-positioning)
///
/// "If neither 'left' nor 'right' is 'auto', the position is
/// over-constrained, and one of them has to be ignored. If the 'direction'
/// property of the containing block is 'ltr', the value of 'left' wins and
/// 'right' becomes -'left'." The same holds for 'top' over 'bottom'.
#[must_use]
pub fn relative_offset(inset: &AutoEdgeSizes) -> (f32, f32) {
    let opposed = |start: AutoOr, end: AutoOr| match (start, end) {
        (AutoOr::Length(start), _) => start,
        (AutoOr::Auto, AutoOr::Length(end)) => -end,
        (AutoOr::Auto, AutoOr::Auto) => 0.0,
    };
    (
        opposed(inset.left, inset.right),
        opposed(inset.top, inset.bottom),
    )
}

/// One axis of the absolute positioning equation:
///
/// "'left' + 'margin-left' + 'border-left-width' + 'padding-left' +
/// 'width' + 'padding-right' + 'border-right-width' + 'margin-right' +
/// 'right' = width of containing block"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConstraint {
    /// Size of the containing block along the axis.
    pub containing: f32,
    /// 'left' or 'top'.
    pub start: AutoOr,
    /// 'right' or 'bottom'.
    pub end: AutoOr,
    /// 'width' or 'height'.
    pub size: AutoOr,
    /// 'margin-left' or 'margin-top'.
    pub margin_start: AutoOr,
    /// 'margin-right' or 'margin-bottom'.
    pub margin_end: AutoOr,
    /// Borders and padding along the axis.
    pub border_padding: f32,
    /// Distance of the static position from the containing block's start
    /// edge.
    pub static_position: f32,
    /// The horizontal axis, where negative centred margins give way to
    /// 'margin-right'.
    pub horizontal: bool,
}

/// Used values along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSolution {
    /// Used 'left' or 'top'.
    pub start: f32,
    /// Used content size.
    pub size: f32,
    /// Used start margin.
    pub margin_start: f32,
    /// Used end margin.
    pub margin_end: f32,
}

/// Solve one axis of an absolutely positioned box.
///
/// `auto_size` gives the used size when 'width' or 'height' is `auto`: it
/// receives the space left for the content and returns the shrink-to-fit
/// width or the content height.
#[must_use]
pub fn solve_axis(c: &AxisConstraint, auto_size: impl FnOnce(f32) -> f32) -> AxisSolution {
    let bp = c.border_padding;
    let cb = c.containing;

    if let (AutoOr::Length(start), AutoOr::Length(end), AutoOr::Length(size)) = (c.start, c.end, c.size) {
        // "If none of the three is 'auto': If both 'margin-left' and
        // 'margin-right' are 'auto', solve the equation under the extra
        // constraint that the two margins get equal values".
        let rest = cb - start - end - size - bp;
        let (margin_start, margin_end) = match (c.margin_start, c.margin_end) {
            (AutoOr::Auto, AutoOr::Auto) if c.horizontal && rest < 0.0 => (0.0, rest),
            (AutoOr::Auto, AutoOr::Auto) => (rest / 2.0, rest / 2.0),
            (AutoOr::Auto, AutoOr::Length(me)) => (rest - me, me),
            (AutoOr::Length(ms), AutoOr::Auto) => (ms, rest - ms),
            // Over-constrained: 'right' or 'bottom' is ignored.
            (AutoOr::Length(ms), AutoOr::Length(me)) => (ms, me),
        };
        return AxisSolution {
            start,
            size,
            margin_start,
            margin_end,
        };
    }

    // "Otherwise, set 'auto' values for 'margin-left' and 'margin-right' to
    // 0, and pick the one of the following six rules that applies."
    let margin_start = c.margin_start.to_px_or(0.0);
    let margin_end = c.margin_end.to_px_or(0.0);
    let margins = margin_start + margin_end;
    let solve = |fixed: f32| cb - fixed - margins - bp;

    let (start, size) = match (c.start, c.size, c.end) {
        // "If all three of 'left', 'width', and 'right' are 'auto': First
        // set any 'auto' values for 'margin-left' and 'margin-right' to 0.
        // Then ... set 'left' to the static position and apply rule number
        // three below."
        (AutoOr::Auto, AutoOr::Auto, AutoOr::Auto) => {
            let start = c.static_position;
            (start, auto_size(solve(start).max(0.0)))
        }
        // 1. "'left' and 'width' are 'auto' and 'right' is not 'auto', then
        // the width is shrink-to-fit. Then solve for 'left'"
        (AutoOr::Auto, AutoOr::Auto, AutoOr::Length(end)) => {
            let size = auto_size(solve(end).max(0.0));
            (solve(end) - size, size)
        }
        // 2. "'left' and 'right' are 'auto' and 'width' is not 'auto', then
        // ... set 'left' to the static position."
        (AutoOr::Auto, AutoOr::Length(size), AutoOr::Auto) => (c.static_position, size),
        // 3. "'width' and 'right' are 'auto' and 'left' is not 'auto', then
        // the width is shrink-to-fit."
        (AutoOr::Length(start), AutoOr::Auto, AutoOr::Auto) => {
            (start, auto_size(solve(start).max(0.0)))
        }
        // 4. "'left' is 'auto', 'width' and 'right' are not 'auto', then
        // solve for 'left'"
        (AutoOr::Auto, AutoOr::Length(size), AutoOr::Length(end)) => (solve(end) - size, size),
        // 5. "'width' is 'auto', 'left' and 'right' are not 'auto', then
        // solve for 'width'"
        (AutoOr::Length(start), AutoOr::Auto, AutoOr::Length(end)) => {
            (start, solve(start + end).max(0.0))
        }
        // 6. "'right' is 'auto', 'left' and 'width' are not 'auto', then
        // solve for 'right'"
        (AutoOr::Length(start), AutoOr::Length(size), AutoOr::Auto) => (start, size),
        // All three definite was handled above.
        (AutoOr::Length(start), AutoOr::Length(size), AutoOr::Length(_)) => (start, size),
    };
    AxisSolution {
        start,
        size: size.max(0.0),
        margin_start,
        margin_end,
    }
}

impl LayoutPass<'_> {
    /// Carry the relative offset of `id` onto its stacking context.
    pub(crate) fn update_relative_offset(&mut self, id: BoxId, resolved: &ResolvedStyle) {
        let Some(b) = self.tree.get(id) else {
            return;
        };
        if b.position != PositionType::Relative {
            return;
        }
        let Some(context) = b.stacking_context else {
            return;
        };
        let (dx, dy) = relative_offset(&resolved.inset);
        self.stacking.set_relative(context, dx, dy);
    }

    /// Place every absolutely positioned box under `id`, in tree order.
    pub(crate) fn place_absolutes(&mut self, id: BoxId) {
        for child in self.tree.children(id) {
            if self.tree.get(child).is_some_and(LayoutBox::is_absolutely_positioned) {
                self.place_absolute(child);
            }
            self.place_absolutes(child);
        }
    }

    /// [§ 10.1](https://www.w3.org/TR/CSS21/visudet.html#containing-block-details)
    ///
    /// "If the element has 'position: absolute', the containing block is
    /// established by the nearest ancestor with a 'position' of 'absolute',
    /// 'relative' or 'fixed' ... In the case that the ancestor is
    /// block-level, the containing block is formed by the padding edge of
    /// the ancestor. If there is no such ancestor, the containing block is
    /// the initial containing block."
    ///
    /// Returns the origin and size of the containing block of `id`.
    fn absolute_containing_block(&self, id: BoxId) -> (f32, f32, ContainingBlock) {
        let viewport = (0.0, 0.0, self.config.viewport());
        let Some(b) = self.tree.get(id) else {
            return viewport;
        };
        if b.position == PositionType::Fixed {
            return viewport;
        }
        let mut current = self.tree.containing_block_box(id);
        while let Some(p) = current {
            let Some(a) = self.tree.get(p) else {
                break;
            };
            if a.position != PositionType::Static {
                let x = a.x + a.margin.left + a.border.left;
                let y = a.y + a.margin.top + a.border.top;
                return (x, y, ContainingBlock::new(a.padding_width(), a.padding_height()));
            }
            current = self.tree.containing_block_box(p);
        }
        viewport
    }

    /// Size and place the absolutely positioned box `id`, then resolve the
    /// positions of its descendants.
    ///
    /// A clean box whose containing block did not change keeps its size
    /// and only has its offsets solved again.
    fn place_absolute(&mut self, id: BoxId) {
        let (cb_x, cb_y, cb) = self.absolute_containing_block(id);
        let resolved = self.resolve_box(id, cb);
        let Some(b) = self.tree.get(id) else {
            return;
        };
        let Some(data) = b.as_block() else {
            return;
        };
        let reuse = !b.flags.intersects(LayoutFlags::RELAYOUT)
            && data.absolute_block == cb
            && data.resolved_width.is_some();
        let (static_x, static_y) = (data.static_x, data.static_y);
        let replaced = b
            .node
            .and_then(|n| self.styles.computed(n))
            .and_then(|style| style.replaced)
            .map(|size| replaced_size(size, resolved.width, resolved.height));
        let (width, height) = (b.width, b.height);

        // STEP 1: Horizontal axis, laying the box out at the solved width.
        let bp_h = resolved.border.horizontal() + resolved.padding.horizontal();
        let size = if reuse {
            AutoOr::Length(width)
        } else if let Some((w, _)) = replaced {
            AutoOr::Length(w)
        } else {
            resolved.width.length().map_or(AutoOr::Auto, |w| {
                let w = resolved.max_width.map_or(w, |max| w.min(max));
                AutoOr::Length(w.max(resolved.min_width))
            })
        };
        let horizontal = AxisConstraint {
            containing: cb.width,
            start: resolved.inset.left,
            end: resolved.inset.right,
            size,
            margin_start: resolved.margin.left,
            margin_end: resolved.margin.right,
            border_padding: bp_h,
            static_position: static_x - cb_x,
            horizontal: true,
        };
        let mut shrunk = false;
        let h = solve_axis(&horizontal, |available| {
            shrunk = true;
            self.layout_independent(id, cb, WidthRule::Within(available));
            self.tree.get(id).map_or(0.0, |b| b.width)
        });
        if reuse {
            self.count_skipped(id);
        } else if !shrunk {
            self.layout_independent(id, cb, WidthRule::Fixed(h.size + bp_h));
        }

        // STEP 2: Vertical axis, from the height layout produced.
        let height = if reuse {
            height
        } else {
            self.tree.get(id).map_or(0.0, |b| b.height)
        };
        let bp_v = resolved.border.vertical() + resolved.padding.vertical();
        let vertical = AxisConstraint {
            containing: cb.height,
            start: resolved.inset.top,
            end: resolved.inset.bottom,
            size: if reuse || replaced.is_some() || !resolved.height.is_auto() {
                AutoOr::Length(height)
            } else {
                AutoOr::Auto
            },
            margin_start: resolved.margin.top,
            margin_end: resolved.margin.bottom,
            border_padding: bp_v,
            static_position: static_y - cb_y,
            horizontal: false,
        };
        let v = solve_axis(&vertical, |_| height);

        // STEP 3: Offsets from the static position.
        if let Some(b) = self.tree.get_mut(id) {
            b.margin.left = h.margin_start;
            b.margin.right = h.margin_end;
            b.margin.top = v.margin_start;
            b.margin.bottom = v.margin_end;
            b.height = v.size;
            b.offset_h = cb_x + h.start - static_x;
            b.offset_v = cb_y + v.start - static_y;
            b.clearance = None;
        }
        if let Some(data) = self.tree.block_mut(id) {
            data.absolute_block = cb;
        }
        self.update_background(id);
        self.resolve_xy(id, static_x, static_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: AutoOr, size: AutoOr, end: AutoOr) -> AxisConstraint {
        AxisConstraint {
            containing: 500.0,
            start,
            end,
            size,
            margin_start: AutoOr::Length(0.0),
            margin_end: AutoOr::Length(0.0),
            border_padding: 0.0,
            static_position: 40.0,
            horizontal: true,
        }
    }

    const AUTO: AutoOr = AutoOr::Auto;

    fn px(v: f32) -> AutoOr {
        AutoOr::Length(v)
    }

    #[test]
    fn all_auto_uses_static_position_and_shrinks() {
        let solved = solve_axis(&axis(AUTO, AUTO, AUTO), |available| {
            assert_eq!(available, 460.0);
            100.0
        });
        assert_eq!(solved.start, 40.0);
        assert_eq!(solved.size, 100.0);
    }

    #[test]
    fn right_anchored_shrink_to_fit_solves_left() {
        let solved = solve_axis(&axis(AUTO, AUTO, px(50.0)), |_| 120.0);
        assert_eq!(solved.start, 330.0);
    }

    #[test]
    fn left_and_right_stretch_the_width() {
        let solved = solve_axis(&axis(px(10.0), AUTO, px(20.0)), |_| unreachable!());
        assert_eq!(solved.size, 470.0);
    }

    #[test]
    fn definite_width_without_offsets_sits_at_static_position() {
        let solved = solve_axis(&axis(AUTO, px(100.0), AUTO), |_| unreachable!());
        assert_eq!(solved.start, 40.0);
    }

    #[test]
    fn auto_margins_centre_when_everything_is_definite() {
        let mut c = axis(px(0.0), px(100.0), px(0.0));
        c.margin_start = AUTO;
        c.margin_end = AUTO;
        let solved = solve_axis(&c, |_| unreachable!());
        assert_eq!(solved.margin_start, 200.0);
        assert_eq!(solved.margin_end, 200.0);
    }

    #[test]
    fn over_constrained_ignores_the_end_offset() {
        let solved = solve_axis(&axis(px(10.0), px(100.0), px(10.0)), |_| unreachable!());
        assert_eq!(solved.start, 10.0);
        assert_eq!(solved.size, 100.0);
    }

    #[test]
    fn relative_offsets_prefer_left_and_top() {
        let inset = AutoEdgeSizes {
            top: AUTO,
            right: px(5.0),
            bottom: px(7.0),
            left: px(3.0),
        };
        assert_eq!(relative_offset(&inset), (3.0, -7.0));
    }

    #[test]
    fn position_parses_lowercase() {
        let position: PositionType = serde_json::from_str("\"fixed\"").unwrap();
        assert_eq!(position, PositionType::Fixed);
        assert_eq!(PositionType::default(), PositionType::Static);
    }
}
