//! CSS Float Layout.
//!
//! [§ 9.5 Floats](https://www.w3.org/TR/CSS21/visuren.html#floats)
//!
//! "A float is a box that is shifted to the left or right on the current line.
//! The most interesting characteristic of a float is that content may flow along
//! its side (or be prohibited from doing so by the 'clear' property)."
//!
//! Floats are met in document order while a block's inline content is laid
//! out. A float that fits is placed on the current line at once. One that
//! does not fit, or that must clear an earlier float, waits in the
//! formatting context's queue and is retried when the line closes. Nothing
//! ever overtakes a waiting float.

use serde::{Deserialize, Serialize};

use crate::block::WidthRule;
use crate::box_tree::{BoxId, BoxKind, LayoutBox};
use crate::formatting_context::FormattingContext;
use crate::geometry::ContainingBlock;
use crate::pass::LayoutPass;

/// [§ 9.5.1 Positioning the float: the 'float' property](https://www.w3.org/TR/CSS21/visuren.html#float-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FloatSide {
    /// "The element generates a block box that is floated to the left."
    Left,
    /// "The element generates a block box that is floated to the right."
    Right,
}

/// [§ 9.5.2 Controlling flow next to floats: the 'clear' property](https://www.w3.org/TR/CSS21/visuren.html#flow-control)
///
/// "This property indicates which sides of an element's box(es) may not
/// be adjacent to an earlier floating box."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClearSide {
    /// "Requires that the top border edge of the box be below the bottom
    /// outer edge of any left-floating boxes."
    Left,
    /// "Requires that the top border edge of the box be below the bottom
    /// outer edge of any right-floating boxes."
    Right,
    /// "Requires that the top border edge of the box be below the bottom
    /// outer edge of any right-floating and left-floating boxes."
    Both,
}

/// A placed float that still narrows lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatEntry {
    /// The float.
    pub id: BoxId,
    /// Distance of the float's outer edge from the flow root's content
    /// edge on the float's side.
    pub edge: f32,
    /// Height of the float still below the current position.
    pub remaining: f32,
}

/// A float of effective width `width` does not fit in `leftover`.
///
/// A zero-width float does not fit a zero-width line either, so it moves
/// down with the rest instead of sticking to the first band.
fn too_wide(leftover: f32, width: f32) -> bool {
    leftover < width || (leftover == 0.0 && width == 0.0)
}

impl LayoutPass<'_> {
    /// Lay out the float `id` met in the inline content of `block`, and
    /// place it on the current line if nothing forbids it.
    pub(crate) fn layout_float(&mut self, block: BoxId, ctx: &mut FormattingContext, id: BoxId) {
        let cb = ContainingBlock::with_auto_height(ctx.line_width, 0.0);
        self.layout_independent(id, cb, WidthRule::ShrinkToFit);
        let Some(b) = self.tree.get(id) else {
            return;
        };
        let width = b.effective_total_width();
        let clear = b.as_block().and_then(|data| data.clear);
        if let Some(data) = self.tree.block_mut(block) {
            data.mcw = data.mcw.max(width);
        }

        // STEP 1: Decide whether the float must wait.
        //
        // "The outer top of a floating box may not be higher than the outer
        // top of any block or floated box generated by an element earlier
        // in the source document."
        let leftover = if ctx.line_box.is_some() {
            ctx.leftover
        } else {
            ctx.available_width()
        };
        let must_wait = !ctx.queue.is_empty()
            || ctx.clear_conflicts(clear)
            || (too_wide(leftover, width) && (ctx.line_has_content() || ctx.has_floats()));
        if must_wait {
            ctx.queue.push_back(id);
            return;
        }

        // STEP 2: Place it beside the content already on the line.
        let _ = self.ensure_line_box(block, ctx, true);
        self.place_float(ctx, id);
    }

    /// [§ 9.5.1](https://www.w3.org/TR/CSS21/visuren.html#float-position)
    ///
    /// "The left outer edge of a left-floating box may not be to the left
    /// of the left edge of its containing block. ... If the current box is
    /// left-floating, and there are any left-floating boxes generated by
    /// elements earlier in the source document, then for each such earlier
    /// box, either the left outer edge of the current box must be to the
    /// right of the right outer edge of the earlier box, or its top must
    /// be lower than the bottom of the earlier box."
    ///
    /// Attach `id` to the current line box, against the float edge of its
    /// side, and narrow the line.
    pub(crate) fn place_float(&mut self, ctx: &mut FormattingContext, id: BoxId) {
        let Some(line) = ctx.line_box else {
            return;
        };
        let Some(b) = self.tree.get(id) else {
            return;
        };
        let Some(side) = b.as_block().and_then(|data| data.float) else {
            return;
        };
        let total_width = b.total_width();
        let effective = b.effective_total_width();
        let height = b.total_height() + b.clearance_or_zero();
        let offset_h = match side {
            FloatSide::Left => ctx.left_edge(),
            FloatSide::Right => ctx.line_width - ctx.right_edge() - total_width,
        };
        if effective > 0.0 {
            let edge = ctx.float_origin(side) + total_width;
            ctx.push_float(side, id, edge, height);
            ctx.leftover -= total_width;
        }
        if let Some(b) = self.tree.get_mut(id) {
            b.offset_h = offset_h;
            b.offset_v = 0.0;
        }
        self.tree.append_child(line, id);
        if let Some(BoxKind::Line(data)) = self.tree.get_mut(line).map(|l| &mut l.kind) {
            data.float_width += effective;
        }
        ctx.line_has_floats = true;
    }

    /// Move waiting floats to the accepted list, in order, while they fit
    /// beside the floats already there.
    pub(crate) fn accept_floats(&self, ctx: &mut FormattingContext) {
        while let Some(&id) = ctx.queue.front() {
            let Some(b) = self.tree.get(id) else {
                let _ = ctx.queue.pop_front();
                continue;
            };
            let clear = b.as_block().and_then(|data| data.clear);
            if ctx.clear_conflicts(clear) {
                break;
            }
            let width = b.effective_total_width();
            if too_wide(self.accepted_leftover(ctx), width)
                && (ctx.has_floats() || !ctx.accepted.is_empty())
            {
                break;
            }
            let _ = ctx.queue.pop_front();
            ctx.accepted.push(id);
        }
    }

    /// Width left for the next line after the accepted floats.
    fn accepted_leftover(&self, ctx: &FormattingContext) -> f32 {
        let taken: f32 = ctx
            .accepted
            .iter()
            .filter_map(|&id| self.tree.get(id))
            .map(LayoutBox::effective_total_width)
            .sum();
        ctx.available_width() - taken
    }

    /// [§ 9.5.2](https://www.w3.org/TR/CSS21/visuren.html#flow-control)
    ///
    /// Place every float still waiting once the inline content of `block`
    /// is exhausted, moving down past float bands as needed. The distance
    /// moved becomes clearance of the line box holding the floats.
    pub(crate) fn layout_remaining_floats(&mut self, block: BoxId, ctx: &mut FormattingContext) {
        self.accept_floats(ctx);
        if ctx.queue.is_empty() && ctx.accepted.is_empty() {
            return;
        }
        let _ = ctx.fix_margin();
        while let Some(&id) = ctx.queue.front() {
            let Some(b) = self.tree.get(id) else {
                let _ = ctx.queue.pop_front();
                continue;
            };
            let clear = b.as_block().and_then(|data| data.clear);
            let width = b.effective_total_width();
            let conflicts = ctx.clear_conflicts(clear);
            let blocked = conflicts
                || (too_wide(self.accepted_leftover(ctx), width)
                    && (ctx.has_floats() || !ctx.accepted.is_empty()));
            if !blocked {
                let _ = ctx.queue.pop_front();
                ctx.accepted.push(id);
                continue;
            }
            if !ctx.accepted.is_empty() {
                self.flush_float_line(block, ctx);
                continue;
            }
            let moved = match clear {
                Some(side) if conflicts => ctx.clear(side),
                _ => ctx.shift_down(),
            };
            if moved <= 0.0 {
                // Nothing left to move past: the float goes here.
                let _ = ctx.queue.pop_front();
                ctx.accepted.push(id);
                continue;
            }
            ctx.line_clearance += moved;
            if let Some(data) = self.tree.block_mut(block) {
                data.consumed += moved;
            }
        }
        if !ctx.accepted.is_empty() {
            self.flush_float_line(block, ctx);
        }
    }

    /// Put the accepted floats on an empty line box of their own.
    fn flush_float_line(&mut self, block: BoxId, ctx: &mut FormattingContext) {
        let _ = self.ensure_line_box(block, ctx, true);
        self.next_line(block, ctx);
    }
}
