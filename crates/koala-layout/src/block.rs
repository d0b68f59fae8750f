//! Block layout: width and height resolution, normal flow, shrink-to-fit.
//!
//! [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS21/visuren.html#block-formatting)
//! [§ 10.3 Calculating widths and margins](https://www.w3.org/TR/CSS21/visudet.html#Computing_widths_and_margins)
//! [§ 10.6 Calculating heights and margins](https://www.w3.org/TR/CSS21/visudet.html#Computing_heights_and_margins)
//!
//! Blocks come in two flavours. A block in normal flow that is not a flow
//! root shares the formatting context of its parent: its margins join the
//! parent's collapsing chain and its lines are narrowed by floats placed
//! anywhere in the same flow root. A flow root (the root element, floats,
//! inline-blocks, table cells, absolutely positioned boxes, blocks that
//! clip) lays its content out in a private [`FormattingContext`].

use crate::box_tree::{BlockVariant, BoxId, BoxKind};
use crate::flags::LayoutFlags;
use crate::float::{ClearSide, FloatSide};
use crate::formatting_context::{FormattingContext, SavedGeometry, SavedState};
use crate::geometry::{ContainingBlock, EPSILON, approx_eq};
use crate::inline::line_shift;
use crate::margin::MarginSlot;
use crate::pass::LayoutPass;
use crate::style::{IntrinsicSize, ResolvedStyle, TextAlign};
use crate::values::AutoOr;

/// How the width of a flow root laid out outside normal flow is found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WidthRule {
    /// [§ 10.3.3](https://www.w3.org/TR/CSS21/visudet.html#blockwidth) The
    /// block width equation over the containing block width.
    Equation,
    /// [§ 10.3.5](https://www.w3.org/TR/CSS21/visudet.html#float-width)
    /// Auto margins are zero and an auto width shrinks to fit.
    ShrinkToFit,
    /// Shrink-to-fit within the given content width (absolutely
    /// positioned boxes, whose offsets take part of the containing block).
    Within(f32),
    /// The border-box width is imposed from outside (table cells).
    Fixed(f32),
}

/// Inputs of the horizontal box model equation.
///
/// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS21/visudet.html#blockwidth)
///
/// "'margin-left' + 'border-left-width' + 'padding-left' + 'width' +
/// 'padding-right' + 'border-right-width' + 'margin-right' = width of
/// containing block"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthConstraint {
    /// Width of the containing block, less any float edges.
    pub available: f32,
    /// 'margin-left'
    pub margin_left: AutoOr,
    /// 'margin-right'
    pub margin_right: AutoOr,
    /// 'width'
    pub width: AutoOr,
    /// Horizontal borders and padding.
    pub border_padding: f32,
    /// 'min-width'
    pub min_width: f32,
    /// 'max-width'
    pub max_width: Option<f32>,
}

/// Used values solved from a [`WidthConstraint`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsedWidth {
    /// Used 'margin-left'.
    pub margin_left: f32,
    /// Used 'width'.
    pub width: f32,
    /// Used 'margin-right'.
    pub margin_right: f32,
}

impl UsedWidth {
    /// Width of the margin box.
    #[must_use]
    pub fn total(&self, border_padding: f32) -> f32 {
        self.margin_left + border_padding + self.width + self.margin_right
    }
}

/// Solve the horizontal box model equation, then apply 'max-width' and
/// 'min-width'.
///
/// [§ 10.4 Minimum and maximum widths](https://www.w3.org/TR/CSS21/visudet.html#min-max-widths)
///
/// "1. The tentative used width is calculated (without 'min-width' and
/// 'max-width') following the rules under "Calculating widths and margins"
/// above.
/// 2. If the tentative used width is greater than 'max-width', the rules
/// above are applied again, but this time using the computed value of
/// 'max-width' as the computed value for 'width'.
/// 3. If the resulting width is smaller than 'min-width', the rules above
/// are applied again, but this time using the value of 'min-width' as the
/// computed value for 'width'."
#[must_use]
pub fn solve_block_width(c: &WidthConstraint) -> UsedWidth {
    let mut used = solve_width_equation(c, c.width);
    if let Some(max) = c.max_width {
        if used.width > max {
            used = solve_width_equation(c, AutoOr::Length(max));
        }
    }
    if used.width < c.min_width {
        used = solve_width_equation(c, AutoOr::Length(c.min_width));
    }
    used
}

fn solve_width_equation(c: &WidthConstraint, width: AutoOr) -> UsedWidth {
    let avail = c.available;
    let bp = c.border_padding;
    let mut margin_left = c.margin_left;
    let mut margin_right = c.margin_right;

    let Some(width) = width.length() else {
        // "If 'width' is set to 'auto', any other 'auto' values become '0'
        // and 'width' follows from the resulting equality."
        let ml = margin_left.to_px_or(0.0);
        let mut mr = margin_right.to_px_or(0.0);
        let mut w = avail - ml - mr - bp;
        if w < 0.0 {
            // Negative widths are clamped; the trailing margin takes the
            // difference.
            w = 0.0;
            mr = avail - ml - bp;
        }
        return UsedWidth {
            margin_left: ml,
            width: w,
            margin_right: mr,
        };
    };

    // "If 'width' is not 'auto' and 'border-left-width' + 'padding-left' +
    // 'width' + 'padding-right' + 'border-right-width' (plus any of
    // 'margin-left' or 'margin-right' that are not 'auto') is larger than
    // the width of the containing block, then any 'auto' values for
    // 'margin-left' or 'margin-right' are, for the following rules,
    // treated as zero."
    if bp + width + margin_left.to_px_or(0.0) + margin_right.to_px_or(0.0) > avail {
        if margin_left.is_auto() {
            margin_left = AutoOr::Length(0.0);
        }
        if margin_right.is_auto() {
            margin_right = AutoOr::Length(0.0);
        }
    }

    let rest = avail - width - bp;
    let (ml, mr) = match (margin_left, margin_right) {
        // "If both 'margin-left' and 'margin-right' are 'auto', their used
        // values are equal."
        (AutoOr::Auto, AutoOr::Auto) if rest < 0.0 => (0.0, rest),
        (AutoOr::Auto, AutoOr::Auto) => (rest / 2.0, rest / 2.0),
        // "If there is exactly one value specified as 'auto', its used
        // value follows from the equality."
        (AutoOr::Auto, AutoOr::Length(mr)) => (rest - mr, mr),
        (AutoOr::Length(ml), AutoOr::Auto) => (ml, rest - ml),
        // "If all of the above have a computed value other than 'auto',
        // the values are said to be "over-constrained" ... the specified
        // value of 'margin-right' is ignored and the value is calculated
        // so as to make the equality true."
        (AutoOr::Length(ml), AutoOr::Length(_)) => (ml, rest - ml),
    };
    UsedWidth {
        margin_left: ml,
        width,
        margin_right: mr,
    }
}

/// [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS21/visudet.html#inline-replaced-width)
/// [§ 10.6.2 Inline replaced elements](https://www.w3.org/TR/CSS21/visudet.html#inline-replaced-height)
///
/// Used size of replaced content: the specified dimensions, completed from
/// the intrinsic ratio when only one is given, or the intrinsic size.
#[must_use]
pub fn replaced_size(intrinsic: IntrinsicSize, width: AutoOr, height: AutoOr) -> (f32, f32) {
    match (width.length(), height.length()) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if intrinsic.width > 0.0 => (w, w * intrinsic.height / intrinsic.width),
        (Some(w), None) => (w, intrinsic.height),
        (None, Some(h)) if intrinsic.height > 0.0 => (h * intrinsic.width / intrinsic.height, h),
        (None, Some(h)) => (intrinsic.width, h),
        (None, None) => (intrinsic.width, intrinsic.height),
    }
}

/// [§ 10.7 Minimum and maximum heights](https://www.w3.org/TR/CSS21/visudet.html#min-max-heights)
fn clamp_height(height: f32, resolved: &ResolvedStyle) -> f32 {
    let height = resolved.max_height.map_or(height, |max| height.min(max));
    height.max(resolved.min_height).max(0.0)
}

fn clamp_width(width: f32, resolved: &ResolvedStyle) -> f32 {
    let width = resolved.max_width.map_or(width, |max| width.min(max));
    width.max(resolved.min_width).max(0.0)
}

fn width_constraint(resolved: &ResolvedStyle, available: f32, width: AutoOr) -> WidthConstraint {
    WidthConstraint {
        available,
        margin_left: resolved.margin.left,
        margin_right: resolved.margin.right,
        width,
        border_padding: resolved.border.horizontal() + resolved.padding.horizontal(),
        min_width: resolved.min_width,
        max_width: resolved.max_width,
    }
}

impl LayoutPass<'_> {
    /// Lay out the root block against the initial containing block.
    pub(crate) fn layout_root(&mut self, root: BoxId) {
        let viewport = self.config.viewport();
        self.layout_independent(root, viewport, WidthRule::Equation);
    }

    /// Used size of `id` when it is replaced content.
    fn replaced_dimensions(&self, id: BoxId, resolved: &ResolvedStyle) -> Option<(f32, f32)> {
        let node = self.tree.get(id)?.node?;
        let intrinsic = self.styles.computed(node)?.replaced?;
        Some(replaced_size(intrinsic, resolved.width, resolved.height))
    }

    fn apply_box_edges(&mut self, id: BoxId, resolved: &ResolvedStyle) {
        if let Some(b) = self.tree.get_mut(id) {
            b.border = resolved.border;
            b.padding = resolved.padding;
        }
    }

    fn take_context(&mut self, id: BoxId) -> FormattingContext {
        let mut ctx = self
            .tree
            .block_mut(id)
            .and_then(|data| data.formatting_context.take())
            .unwrap_or_default();
        ctx.reset_flow();
        ctx
    }

    fn put_context(&mut self, id: BoxId, ctx: FormattingContext) {
        if let Some(data) = self.tree.block_mut(id) {
            data.formatting_context = Some(ctx);
        }
    }

    /// Lay out a flow root that is not in normal flow: the root, a float,
    /// an inline-block, a table cell or an absolutely positioned box.
    ///
    /// The block is skipped when it is clean and was last laid out against
    /// the same width.
    pub(crate) fn layout_independent(&mut self, id: BoxId, cb: ContainingBlock, rule: WidthRule) {
        let resolved = self.resolve_box(id, cb);
        let key = match rule {
            WidthRule::Fixed(width) | WidthRule::Within(width) => width,
            WidthRule::Equation | WidthRule::ShrinkToFit => cb.width,
        };
        let Some(b) = self.tree.get(id) else {
            return;
        };
        let clean = !b.flags.intersects(LayoutFlags::RELAYOUT);
        let same_width = b
            .as_block()
            .and_then(|data| data.resolved_width)
            .is_some_and(|width| approx_eq(width, key));
        if clean && same_width {
            if b.flags.contains(LayoutFlags::NEED_REPOSITION) {
                self.update_relative_offset(id, &resolved);
            }
            self.count_skipped(id);
            return;
        }
        let is_table = b
            .as_block()
            .is_some_and(|data| matches!(data.variant, BlockVariant::TableWrapper(_)));

        self.apply_box_edges(id, &resolved);
        let bp = resolved.border.horizontal() + resolved.padding.horizontal();
        let replaced = self.replaced_dimensions(id, &resolved);

        // STEP 1: Horizontal dimensions.
        let mut shrink = false;
        let used = match rule {
            WidthRule::Equation => {
                let width = replaced.map_or(resolved.width, |(w, _)| AutoOr::Length(w));
                solve_block_width(&width_constraint(&resolved, cb.width, width))
            }
            WidthRule::Fixed(border_box) => UsedWidth {
                margin_left: 0.0,
                width: (border_box - bp).max(0.0),
                margin_right: 0.0,
            },
            WidthRule::ShrinkToFit | WidthRule::Within(_) => {
                let margin_left = resolved.margin.left.to_px_or(0.0);
                let margin_right = resolved.margin.right.to_px_or(0.0);
                let width = match (replaced, resolved.width.length()) {
                    (Some((w, _)), _) => w,
                    (None, Some(w)) => clamp_width(w, &resolved),
                    (None, None) => {
                        shrink = !is_table;
                        match rule {
                            WidthRule::Within(available) => available.max(0.0),
                            _ => (cb.width - margin_left - margin_right - bp).max(0.0),
                        }
                    }
                };
                UsedWidth {
                    margin_left,
                    width,
                    margin_right,
                }
            }
        };
        if let Some(b) = self.tree.get_mut(id) {
            b.margin.left = used.margin_left;
            b.margin.right = used.margin_right;
            b.margin.top = resolved.margin.top.to_px_or(0.0);
            b.margin.bottom = resolved.margin.bottom.to_px_or(0.0);
            b.width = used.width;
            b.clearance = None;
        }

        // STEP 2: Contents, in a private formatting context.
        let mut ctx = self.take_context(id);
        ctx.line_width = used.width;
        let child_cb = self.child_containing_block(id, &resolved);
        let _ = self.layout_contents(id, &mut ctx, child_cb);

        // STEP 3: Shrink-to-fit.
        //
        // [§ 10.3.5](https://www.w3.org/TR/CSS21/visudet.html#float-width)
        // "the shrink-to-fit width is: min(max(preferred minimum width,
        // available width), preferred width)."
        if shrink {
            let available = used.width;
            let preferred = self.preferred_content_width(id);
            let minimum = self.tree.block(id).map_or(0.0, |data| data.mcw);
            let fitted = clamp_width(preferred.min(available.max(minimum)), &resolved);
            if fitted > available + EPSILON {
                if let Some(b) = self.tree.get_mut(id) {
                    b.width = fitted;
                }
                ctx.reset_flow();
                ctx.line_width = fitted;
                let child_cb = self.child_containing_block(id, &resolved);
                let _ = self.layout_contents(id, &mut ctx, child_cb);
            } else if fitted < available - EPSILON {
                self.fit(id, fitted);
            }
        }

        // STEP 4: Height.
        //
        // [§ 10.6.7 'Auto' heights for block formatting context roots](https://www.w3.org/TR/CSS21/visudet.html#root-height)
        // "In addition, if the element has any floating descendants whose
        // bottom margin edge is below the element's bottom content edge,
        // then the height is increased to include those edges."
        let _ = ctx.fix_margin();
        let content = self.content_height(id);
        let floats_below = ctx.clear(ClearSide::Both);
        let height = self.used_height(&resolved, replaced, content + floats_below);
        self.put_context(id, ctx);
        if let Some(b) = self.tree.get_mut(id) {
            b.height = height;
        }
        if let Some(data) = self.tree.block_mut(id) {
            data.resolved_width = Some(key);
        }
        self.finish_block(id, &resolved);
        self.count_laid_out();
    }

    /// Lay out the in-flow block `id` inside the formatting context `ctx`.
    ///
    /// Returns `false` when the block is anonymous and turned out to
    /// generate nothing; its margin collapsing has been undone and the
    /// caller drops it.
    pub(crate) fn layout_in_flow(&mut self, id: BoxId, ctx: &mut FormattingContext, cb: ContainingBlock) -> bool {
        let resolved = self.resolve_box(id, cb);
        let entry = ctx.key();
        let Some(b) = self.tree.get(id) else {
            return false;
        };
        let flags = b.flags;
        if !flags.intersects(LayoutFlags::RELAYOUT) {
            if let Some(saved) = ctx.saved(id).filter(|s| s.entry == entry).cloned() {
                self.restore_saved(id, ctx, &saved);
                if flags.contains(LayoutFlags::NEED_REPOSITION) {
                    self.update_relative_offset(id, &resolved);
                }
                self.count_skipped(id);
                return true;
            }
        }
        let consumed_start = ctx.consumed;
        let flow_root = b.is_flow_root();
        let anonymous = b.is_anonymous();
        let clear = b.as_block().and_then(|data| data.clear);
        let replaced = self.replaced_dimensions(id, &resolved);
        self.apply_box_edges(id, &resolved);

        let margin_top = resolved.margin.top.to_px_or(0.0);
        let margin_bottom = resolved.margin.bottom.to_px_or(0.0);
        let top_edge = resolved.border.top + resolved.padding.top;
        let bottom_edge = resolved.border.bottom + resolved.padding.bottom;
        let bp = resolved.border.horizontal() + resolved.padding.horizontal();

        // STEP 1: Clearance.
        //
        // [§ 9.5.2](https://www.w3.org/TR/CSS21/visuren.html#flow-control)
        // "Computing the clearance of an element on which 'clear' is set is
        // done by first determining the hypothetical position of the
        // element's top border edge ... If this hypothetical position of
        // the element's top border edge is not past the relevant floats,
        // then clearance is introduced".
        let mut clearance = None;
        if let Some(side) = clear.filter(|&side| ctx.clear_conflicts(Some(side))) {
            let floats_bottom = ctx.clear_distance(side);
            let above = ctx.chain.value();
            let mut hypothetical = ctx.chain.margin;
            hypothetical.adjoin(margin_top);
            if hypothetical.value() < floats_bottom {
                let _ = ctx.fix_margin();
                let amount = floats_bottom - above - margin_top;
                ctx.update_remaining_height(amount + margin_top);
                clearance = Some(amount);
            }
        }
        let snapshot = if clearance.is_none() {
            Some(ctx.chain.collapse_margin_top(self.tree, id, margin_top))
        } else {
            if let Some(b) = self.tree.get_mut(id) {
                b.margin.top = margin_top;
            }
            None
        };

        // STEP 2: Horizontal dimensions.
        let width = replaced.map_or(resolved.width, |(w, _)| AutoOr::Length(w));
        let mut offset_h = 0.0;
        let used = if flow_root {
            // [§ 9.5](https://www.w3.org/TR/CSS21/visuren.html#floats) "The
            // border box of ... an element in the normal flow that
            // establishes a new block formatting context ... must not
            // overlap the margin box of any floats in the same block
            // formatting context as the element itself."
            let _ = ctx.fix_margin();
            loop {
                let left = ctx.left_edge();
                let right = ctx.right_edge();
                let available = (cb.width - left - right).max(0.0);
                let used = solve_block_width(&width_constraint(&resolved, available, width));
                let fits = used.margin_left.max(0.0) + bp + used.width <= available + EPSILON;
                if fits || width.is_auto() || !ctx.has_floats() {
                    offset_h = left;
                    break used;
                }
                let moved = ctx.shift_down();
                clearance = Some(clearance.unwrap_or(0.0) + moved);
            }
        } else {
            solve_block_width(&width_constraint(&resolved, cb.width, width))
        };
        if let Some(b) = self.tree.get_mut(id) {
            b.margin.left = used.margin_left;
            b.margin.right = used.margin_right;
            b.width = used.width;
            b.offset_h = offset_h;
            b.clearance = clearance;
        }

        // STEP 3: Contents and height.
        let child_cb = self.child_containing_block(id, &resolved);
        let height = if flow_root {
            let mut own = self.take_context(id);
            own.line_width = used.width;
            let _ = self.layout_contents(id, &mut own, child_cb);
            let _ = own.fix_margin();
            let floats_below = own.clear(ClearSide::Both);
            let height = self.used_height(&resolved, replaced, self.content_height(id) + floats_below);
            self.put_context(id, own);
            ctx.update_remaining_height(top_edge + height + bottom_edge);
            ctx.chain.adjoin(self.tree, MarginSlot::bottom(id), margin_bottom);
            height
        } else {
            let blank_left = used.margin_left + resolved.border.left + resolved.padding.left;
            let blank_right = used.margin_right + resolved.border.right + resolved.padding.right;
            ctx.update_blanks(blank_left, blank_right);
            if top_edge > 0.0 {
                ctx.consume(top_edge);
            }
            let content_start = ctx.consumed;
            let outer_width = ctx.line_width;
            ctx.line_width = used.width;
            let produced = self.layout_contents(id, ctx, child_cb);
            ctx.line_width = outer_width;

            let kept_consumed = self.tree.block(id).is_some_and(|data| data.consumed > 0.0);
            if anonymous && !produced && !kept_consumed {
                ctx.restore_blanks(blank_left, blank_right);
                if let Some(snapshot) = snapshot {
                    ctx.chain.undo_collapse_margin_top(self.tree, snapshot);
                }
                return false;
            }

            // [§ 8.3.1](https://www.w3.org/TR/CSS21/box.html#collapsing-margins)
            // "bottom margin of a last in-flow child and bottom margin of
            // its parent if the parent has 'auto' computed height" adjoin
            // when "no line boxes, no clearance, no padding and no border
            // separate them".
            let separated = bottom_edge > 0.0
                || !resolved.height.is_auto()
                || replaced.is_some()
                || resolved.min_height > 0.0;
            let height = if separated {
                let _ = ctx.fix_margin();
                let height = self.used_height(&resolved, replaced, self.content_height(id));
                let used_height = ctx.consumed - content_start;
                if !approx_eq(height, used_height) {
                    ctx.update_remaining_height(height - used_height);
                }
                if bottom_edge > 0.0 {
                    ctx.consume(bottom_edge);
                }
                ctx.chain.adjoin(self.tree, MarginSlot::bottom(id), margin_bottom);
                height
            } else {
                ctx.chain.adjoin(self.tree, MarginSlot::bottom(id), margin_bottom);
                self.used_height(&resolved, None, self.content_height(id))
            };
            ctx.restore_blanks(blank_left, blank_right);
            height
        };
        if let Some(b) = self.tree.get_mut(id) {
            b.height = height;
        }
        self.finish_block(id, &resolved);

        // STEP 4: Remember what the block did to the context.
        let exit = ctx.key();
        let owner_margin = entry.chain.owner.and_then(|slot| slot.get(self.tree));
        let Some(b) = self.tree.get(id) else {
            return true;
        };
        let geometry = SavedGeometry {
            margin: b.margin,
            width: b.width,
            height: b.height,
            clearance: b.clearance,
            mcw: b.as_block().map_or(0.0, |data| data.mcw),
            offset_h: b.offset_h,
        };
        let next = b.next_sibling;
        let changed = ctx.save_context(
            id,
            SavedState {
                entry,
                exit,
                consumed: ctx.consumed - consumed_start,
                owner_margin,
                geometry,
            },
        );
        if changed {
            if let Some(next) = next.and_then(|n| self.tree.get_mut(n)) {
                next.flags |= LayoutFlags::NEED_REFLOW;
            }
        }
        self.count_laid_out();
        true
    }

    /// Reuse the geometry `id` had on the last pass and replay its effect
    /// on the formatting context.
    fn restore_saved(&mut self, id: BoxId, ctx: &mut FormattingContext, saved: &SavedState) {
        let geometry = saved.geometry;
        if let Some(b) = self.tree.get_mut(id) {
            b.margin = geometry.margin;
            b.width = geometry.width;
            b.height = geometry.height;
            b.clearance = geometry.clearance;
            b.offset_h = geometry.offset_h;
        }
        if let Some(data) = self.tree.block_mut(id) {
            data.mcw = geometry.mcw;
        }
        ctx.restore(&saved.exit);
        ctx.consumed += saved.consumed;
        if let (Some(slot), Some(value)) = (saved.entry.chain.owner, saved.owner_margin) {
            slot.set(self.tree, value);
        }
    }

    /// Lay out what is inside `id`: table rows, inline content or block
    /// children. Returns `true` when the block has children afterwards.
    pub(crate) fn layout_contents(&mut self, id: BoxId, ctx: &mut FormattingContext, cb: ContainingBlock) -> bool {
        let Some(data) = self.tree.block(id) else {
            return false;
        };
        if matches!(data.variant, BlockVariant::TableWrapper(_)) {
            self.layout_table(id);
        } else if data.has_inline() {
            return self.layout_inline(id, ctx);
        } else {
            self.layout_block_children(id, ctx, cb);
        }
        self.tree.get(id).is_some_and(|b| b.first_child.is_some())
    }

    fn layout_block_children(&mut self, id: BoxId, ctx: &mut FormattingContext, cb: ContainingBlock) {
        let mut mcw = 0.0_f32;
        for child in self.tree.children(id) {
            ctx.line_width = cb.width;
            if !self.layout_in_flow(child, ctx, cb) {
                log::debug!("drop empty anonymous block {child}");
                self.destroy_box(child);
                continue;
            }
            let Some(c) = self.tree.get(child) else {
                continue;
            };
            let child_mcw = c.as_block().map_or(0.0, |data| data.mcw);
            mcw = mcw.max(child_mcw + self.intrinsic_blank(child));
        }
        ctx.line_width = cb.width;
        if let Some(data) = self.tree.block_mut(id) {
            data.mcw = mcw;
        }
    }

    fn used_height(&self, resolved: &ResolvedStyle, replaced: Option<(f32, f32)>, content: f32) -> f32 {
        let height = match replaced {
            Some((_, height)) => height,
            None => resolved.height.length().unwrap_or(content),
        };
        clamp_height(height, resolved)
    }

    fn finish_block(&mut self, id: BoxId, resolved: &ResolvedStyle) {
        self.update_background(id);
        self.update_relative_offset(id, resolved);
    }

    /// Horizontal margins, borders and padding of `id`, counting `auto`
    /// margins as zero.
    fn intrinsic_blank(&self, id: BoxId) -> f32 {
        let Some(b) = self.tree.get(id) else {
            return 0.0;
        };
        let margins = b
            .node
            .and_then(|n| self.styles.resolved(n))
            .map_or(0.0, |r| r.margin.left.to_px_or(0.0) + r.margin.right.to_px_or(0.0));
        margins + b.border.horizontal() + b.padding.horizontal()
    }

    /// Width of the content of `id` laid out without breaking lines beyond
    /// what its current layout already broke.
    fn preferred_content_width(&self, id: BoxId) -> f32 {
        self.tree
            .children(id)
            .into_iter()
            .map(|child| self.shrink_to(child))
            .fold(0.0, f32::max)
    }

    /// Preferred margin-box width of `id`.
    ///
    /// Line boxes contribute their content and floats, inline boxes their
    /// own width. Blocks with a definite or intrinsic width keep it;
    /// others take the widest child plus their own edges.
    #[must_use]
    pub(crate) fn shrink_to(&self, id: BoxId) -> f32 {
        let Some(b) = self.tree.get(id) else {
            return 0.0;
        };
        match &b.kind {
            BoxKind::Line(line) => line.content_width + line.float_width,
            BoxKind::Inline(_) => b.total_width(),
            BoxKind::Block(data) => {
                let definite = b
                    .node
                    .and_then(|n| self.styles.resolved(n))
                    .is_some_and(|r| !r.width.is_auto());
                if definite || data.intrinsic || matches!(data.variant, BlockVariant::TableWrapper(_)) {
                    b.width + self.intrinsic_blank(id)
                } else {
                    self.preferred_content_width(id) + self.intrinsic_blank(id)
                }
            }
        }
    }

    /// Narrow `id` to the content width `width` after shrink-to-fit,
    /// re-solving the widths of its children top-down. Lines keep their
    /// breaks; their alignment and right floats follow the new width.
    pub(crate) fn fit(&mut self, id: BoxId, width: f32) {
        let Some(b) = self.tree.get_mut(id) else {
            return;
        };
        let old = b.width;
        b.width = width;
        let align = b.as_block().map(|data| data.text_align);
        let is_table = b
            .as_block()
            .is_some_and(|data| matches!(data.variant, BlockVariant::TableWrapper(_)));
        if is_table {
            return;
        }
        for child in self.tree.children(id) {
            let Some(c) = self.tree.get(child) else {
                continue;
            };
            match &c.kind {
                BoxKind::Line(_) => {
                    self.fit_line(child, width, old - width, align.unwrap_or_default());
                }
                BoxKind::Block(_) => {
                    let resolved = c
                        .node
                        .and_then(|n| self.styles.resolved(n))
                        .unwrap_or_else(ResolvedStyle::anonymous);
                    let specified = if c.as_block().is_some_and(|data| data.intrinsic) {
                        AutoOr::Length(c.width)
                    } else {
                        resolved.width
                    };
                    let used = solve_block_width(&width_constraint(&resolved, width, specified));
                    let child_width = c.width;
                    if let Some(c) = self.tree.get_mut(child) {
                        c.margin.left = used.margin_left;
                        c.margin.right = used.margin_right;
                    }
                    if !approx_eq(used.width, child_width) {
                        self.fit(child, used.width);
                    }
                }
                BoxKind::Inline(_) => {}
            }
        }
    }

    fn fit_line(&mut self, line: BoxId, width: f32, narrowed: f32, align: TextAlign) {
        let mut right_floats = Vec::new();
        if let Some(l) = self.tree.get_mut(line) {
            l.width = (width - l.margin.left - l.margin.right).max(0.0);
            let line_width = l.width;
            if let BoxKind::Line(data) = &mut l.kind {
                data.shift = line_shift(align, line_width, data.content_width);
            }
        }
        for child in self.tree.children(line) {
            let is_right = self
                .tree
                .block(child)
                .is_some_and(|data| data.float == Some(FloatSide::Right));
            if is_right {
                right_floats.push(child);
            }
        }
        for float in right_floats {
            if let Some(f) = self.tree.get_mut(float) {
                f.offset_h -= narrowed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(width: AutoOr, ml: AutoOr, mr: AutoOr) -> WidthConstraint {
        WidthConstraint {
            available: 800.0,
            margin_left: ml,
            margin_right: mr,
            width,
            border_padding: 0.0,
            min_width: 0.0,
            max_width: None,
        }
    }

    const AUTO: AutoOr = AutoOr::Auto;

    fn px(v: f32) -> AutoOr {
        AutoOr::Length(v)
    }

    #[test]
    fn auto_width_takes_the_containing_block() {
        let used = solve_block_width(&constraint(AUTO, AUTO, AUTO));
        assert_eq!(
            used,
            UsedWidth {
                margin_left: 0.0,
                width: 800.0,
                margin_right: 0.0
            }
        );
    }

    #[test]
    fn auto_margins_center() {
        let used = solve_block_width(&constraint(px(200.0), AUTO, AUTO));
        assert_eq!(used.margin_left, 300.0);
        assert_eq!(used.margin_right, 300.0);
    }

    #[test]
    fn too_wide_box_with_auto_margins_overflows_right() {
        let used = solve_block_width(&constraint(px(1000.0), AUTO, AUTO));
        assert_eq!(used.margin_left, 0.0);
        assert_eq!(used.margin_right, -200.0);
    }

    #[test]
    fn one_auto_margin_follows_from_the_equation() {
        let used = solve_block_width(&constraint(px(200.0), AUTO, px(100.0)));
        assert_eq!(used.margin_left, 500.0);
    }

    #[test]
    fn over_constrained_margin_right_absorbs() {
        let used = solve_block_width(&constraint(px(200.0), px(100.0), px(100.0)));
        assert_eq!(used.margin_left, 100.0);
        assert_eq!(used.margin_right, 500.0);
    }

    #[test]
    fn negative_auto_width_clamps_to_zero() {
        let mut c = constraint(AUTO, px(500.0), px(500.0));
        c.border_padding = 10.0;
        let used = solve_block_width(&c);
        assert_eq!(used.width, 0.0);
        assert_eq!(used.margin_right, 290.0);
    }

    #[test]
    fn min_and_max_width_resolve_again() {
        let mut c = constraint(AUTO, AUTO, AUTO);
        c.max_width = Some(300.0);
        let used = solve_block_width(&c);
        assert_eq!(used.width, 300.0);
        assert_eq!(used.margin_left, 250.0);
        assert_eq!(used.margin_right, 250.0);

        let mut c = constraint(px(100.0), AUTO, AUTO);
        c.min_width = 400.0;
        let used = solve_block_width(&c);
        assert_eq!(used.width, 400.0);
        assert_eq!(used.margin_left, 200.0);
    }

    #[test]
    fn replaced_size_keeps_the_ratio() {
        let intrinsic = IntrinsicSize {
            width: 200.0,
            height: 100.0,
        };
        assert_eq!(replaced_size(intrinsic, AUTO, AUTO), (200.0, 100.0));
        assert_eq!(replaced_size(intrinsic, px(100.0), AUTO), (100.0, 50.0));
        assert_eq!(replaced_size(intrinsic, AUTO, px(50.0)), (100.0, 50.0));
    }
}
