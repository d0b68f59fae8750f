//! Absolute coordinates and scroll extents.
//!
//! Layout computes every box's offsets relative to the box that contains
//! it. Once a pass is done, [`LayoutPass::resolve_xy`] turns them into
//! canvas coordinates top-down, and [`LayoutPass::update_scroll_sizes`]
//! measures how far content reaches inside each clipping block.
//!
//! `x` and `y` are the top-left corner of the margin box. Relative
//! positioning is not folded in; painting adds the offset of the box's
//! stacking context.

use crate::box_tree::{BlockVariant, BoxId, BoxKind};
use crate::pass::LayoutPass;
use crate::style::ComputedStyle;

/// How the children of a box are positioned.
enum Children {
    /// One below the other from the content edge; all at the top in a row.
    Stacked { row: bool, content_x: f32, content_y: f32 },
    /// Along a line box, from where its aligned content starts.
    Inline { start: f32 },
    /// At the origin of an inline box wrapping an inline-block.
    Wrapped,
}

impl LayoutPass<'_> {
    /// Position `id` with its subtree, `left` and `top` being the content
    /// edge of the box it is laid out in.
    pub(crate) fn resolve_xy(&mut self, id: BoxId, left: f32, top: f32) {
        let Some(b) = self.tree.get_mut(id) else {
            return;
        };
        b.x = left + b.offset_h;
        b.y = top + b.offset_v + b.clearance_or_zero();
        let (x, y) = (b.x, b.y);
        let children = match &b.kind {
            BoxKind::Block(data) => Children::Stacked {
                row: matches!(data.variant, BlockVariant::TableRow),
                content_x: x + b.margin.left + b.border.left + b.padding.left,
                content_y: y + b.margin.top + b.border.top + b.padding.top,
            },
            BoxKind::Line(line) => Children::Inline {
                start: x + b.margin.left + line.shift,
            },
            BoxKind::Inline(_) => Children::Wrapped,
        };
        match children {
            Children::Stacked {
                row,
                content_x,
                content_y,
            } => {
                let mut cursor = content_y;
                for child in self.tree.children(id) {
                    let step = self
                        .tree
                        .get(child)
                        .map_or(0.0, |c| c.total_height() + c.clearance_or_zero());
                    self.resolve_xy(child, content_x, if row { content_y } else { cursor });
                    if !row {
                        cursor += step;
                    }
                }
            }
            Children::Inline { start } => {
                for child in self.tree.children(id) {
                    let Some(c) = self.tree.get(child) else {
                        continue;
                    };
                    if c.is_absolutely_positioned() {
                        self.record_static_position(child, id, start, left);
                    } else if c.is_block() {
                        // Floats hang off the line they were placed on.
                        self.resolve_xy(child, left, y);
                    } else {
                        self.resolve_xy(child, start, y);
                    }
                }
            }
            Children::Wrapped => {
                for child in self.tree.children(id) {
                    self.resolve_xy(child, x, y);
                }
            }
        }
    }

    /// [§ 10.3.7](https://www.w3.org/TR/CSS21/visudet.html#abs-non-replaced-width)
    /// "the static position for 'left' is the distance from the left edge
    /// of the containing block to the left margin edge of a hypothetical
    /// box that would have been the first box of the element if its
    /// 'position' property had been 'static' and 'float' had been 'none'."
    ///
    /// A box that was block-level and followed content on its line would
    /// have started the next line.
    fn record_static_position(&mut self, id: BoxId, line: BoxId, line_start: f32, content_left: f32) {
        let Some(l) = self.tree.get(line) else {
            return;
        };
        let (line_y, line_height) = (l.y, l.height);
        if let Some(data) = self.tree.block_mut(id) {
            if data.static_after_line {
                data.static_x = content_left;
                data.static_y = line_y + line_height;
            } else {
                data.static_x = line_start + data.inline_x;
                data.static_y = line_y;
            }
        }
    }

    /// `id` clips its content: the root, or a block with 'overflow' other
    /// than 'visible'.
    fn clips(&self, id: BoxId) -> bool {
        if self.tree.root() == Some(id) {
            return true;
        }
        self.tree
            .get(id)
            .filter(|b| b.is_block())
            .and_then(|b| b.node)
            .and_then(|n| self.styles.computed(n))
            .is_some_and(ComputedStyle::is_clipped)
    }

    /// [§ 11.1.1 Overflow: the 'overflow' property](https://www.w3.org/TR/CSS21/visufx.html#overflow)
    ///
    /// Record on every box its clip box, and on every clip box the extent
    /// of the content it clips, starting from its own padding box.
    pub(crate) fn update_scroll_sizes(&mut self, id: BoxId, clip: Option<BoxId>) {
        let clip_origin = clip.and_then(|c| self.tree.get(c)).map(|c| {
            (
                c.x + c.margin.left + c.border.left,
                c.y + c.margin.top + c.border.top,
            )
        });
        let clips = self.clips(id);
        let Some(b) = self.tree.get_mut(id) else {
            return;
        };
        b.clip_box = clip;
        let right = b.x + b.total_width();
        let bottom = b.y + b.total_height();
        if clips {
            let (w, h) = (b.padding_width(), b.padding_height());
            if let Some(data) = b.as_block_mut() {
                data.scroll_width = w;
                data.scroll_height = h;
            }
        }
        if let (Some(c), Some((origin_x, origin_y))) = (clip, clip_origin) {
            if let Some(data) = self.tree.block_mut(c) {
                data.scroll_width = data.scroll_width.max(right - origin_x);
                data.scroll_height = data.scroll_height.max(bottom - origin_y);
            }
        }
        let inner = if clips { Some(id) } else { clip };
        for child in self.tree.children(id) {
            self.update_scroll_sizes(child, inner);
        }
    }
}
