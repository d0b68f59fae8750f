//! Inline layout and the line box model.
//!
//! [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS21/visuren.html#inline-formatting)
//!
//! "In an inline formatting context, boxes are laid out horizontally, one
//! after the other, beginning at the top of a containing block. Horizontal
//! margins, borders, and padding are respected between these boxes."
//!
//! [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS21/visudet.html#line-height)
//!
//! A block with inline content keeps the list of content items it must
//! place ([`InlineItem`]) and regenerates its line boxes from it on every
//! pass that reaches it. Line boxes hold text fragments, wrappers around
//! inline-blocks, floats and placeholders of absolutely positioned boxes.

use crate::block::WidthRule;
use crate::box_tree::{BlockVariant, BoxId, BoxKind, InlineData, InlineItem, LayoutBox, LineData};
use crate::content::NodeId;
use crate::formatting_context::FormattingContext;
use crate::geometry::{ContainingBlock, EPSILON};
use crate::pass::LayoutPass;
use crate::style::{ComputedStyle, ResolvedStyle, TextAlign, WhiteSpace};

/// Font metrics interface for text measurement during layout.
///
/// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS21/visudet.html#line-height)
///
/// "CSS assumes that every font has font metrics that specify a
/// characteristic height above the baseline and a depth below it."
pub trait FontMetrics {
    /// Measure the total advance width of a text string at the given font size.
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    /// Height of the font above the baseline.
    fn ascent(&self, font_size: f32) -> f32;

    /// Depth of the font below the baseline.
    fn descent(&self, font_size: f32) -> f32;
}

/// Approximate font metrics using fixed ratios.
///
/// Without access to font data, every glyph advances by 0.6× the font
/// size, and the font's height splits 0.8 / 0.2 around the baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateFontMetrics;

impl FontMetrics for ApproximateFontMetrics {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        const CHAR_WIDTH_RATIO: f32 = 0.6;
        text.chars().count() as f32 * font_size * CHAR_WIDTH_RATIO
    }

    fn ascent(&self, font_size: f32) -> f32 {
        font_size * 0.8
    }

    fn descent(&self, font_size: f32) -> f32 {
        font_size * 0.2
    }
}

/// A piece of text between break opportunities.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    /// A run of white space. Collapsed to one space unless preserved.
    Space(String),
    /// A preserved line feed.
    Newline,
}

/// [§ 16.6.1 The 'white-space' processing model](https://www.w3.org/TR/CSS21/text.html#white-space-model)
fn tokenize(text: &str, white_space: WhiteSpace) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut space = String::new();
    let flush = |tokens: &mut Vec<Token>, word: &mut String, space: &mut String| {
        if !space.is_empty() {
            tokens.push(Token::Space(std::mem::take(space)));
        }
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };
    for c in text.chars() {
        if c == '\n' && white_space.preserves_newlines() {
            flush(&mut tokens, &mut word, &mut space);
            tokens.push(Token::Newline);
        } else if c.is_whitespace() {
            if !white_space.wraps() && white_space.preserves_spaces() {
                // `pre`: spaces are part of the unbreakable run.
                word.push(c);
                continue;
            }
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            if white_space.preserves_spaces() {
                space.push(c);
            } else if space.is_empty() {
                space.push(' ');
            }
        } else {
            if !space.is_empty() {
                tokens.push(Token::Space(std::mem::take(&mut space)));
            }
            word.push(c);
        }
    }
    flush(&mut tokens, &mut word, &mut space);
    tokens
}

/// Font parameters of a text run.
#[derive(Debug, Clone, Copy)]
struct TextFont {
    font_size: f32,
    line_height: f32,
    white_space: WhiteSpace,
}

/// [§ 16.2](https://www.w3.org/TR/CSS21/text.html#alignment-prop) Offset
/// of the line content from the line's left edge.
#[must_use]
pub fn line_shift(align: TextAlign, line_width: f32, content_width: f32) -> f32 {
    let free = (line_width - content_width).max(0.0);
    match align {
        TextAlign::Left | TextAlign::Justify => 0.0,
        TextAlign::Right => free,
        TextAlign::Center => free / 2.0,
    }
}

/// Move along the line by the margin, border and padding of an inline
/// element.
fn advance(ctx: &mut FormattingContext, width: f32) {
    ctx.x += width;
    ctx.leftover -= width;
    ctx.current_text = None;
}

impl LayoutPass<'_> {
    /// Lay out the inline content of `block` into fresh line boxes.
    ///
    /// Returns `true` when at least one line box was generated.
    pub(crate) fn layout_inline(&mut self, block: BoxId, ctx: &mut FormattingContext) -> bool {
        self.clear_line_boxes(block);
        ctx.line_box = None;
        ctx.x = 0.0;
        ctx.leftover = 0.0;
        ctx.at_line_head = true;
        ctx.line_has_floats = false;
        ctx.current_text = None;
        ctx.line_clearance = 0.0;

        let Some(data) = self.tree.block_mut(block) else {
            return false;
        };
        data.mcw = 0.0;
        data.consumed = 0.0;
        let items = data.inlines.clone();
        let block_font = TextFont {
            font_size: data.font_size,
            line_height: data.line_height,
            white_space: data.white_space,
        };

        let mut pending_space = false;
        for item in items {
            match item {
                InlineItem::Text(node) => {
                    pending_space = self.layout_text(block, ctx, node, block_font, pending_space);
                }
                InlineItem::Open(node) => {
                    let (left, _) = self.inline_edges(node, ctx.line_width);
                    if left != 0.0 {
                        let _ = self.ensure_line_box(block, ctx, true);
                        advance(ctx, left);
                    }
                }
                InlineItem::Close(node) => {
                    let (_, right) = self.inline_edges(node, ctx.line_width);
                    if right != 0.0 {
                        let _ = self.ensure_line_box(block, ctx, true);
                        advance(ctx, right);
                    }
                }
                InlineItem::Embedded(node) => {
                    let Some(id) = self.tree.block(block).and_then(|b| b.block_map.get(&node).copied())
                    else {
                        continue;
                    };
                    let Some(embedded) = self.tree.get(id) else {
                        continue;
                    };
                    if embedded.is_absolutely_positioned() {
                        self.place_absolute_placeholder(block, ctx, id);
                    } else if embedded.is_float() {
                        self.layout_float(block, ctx, id);
                    } else {
                        if pending_space {
                            self.place_space(block, ctx, block_font);
                            pending_space = false;
                        }
                        self.place_inline_block(block, ctx, id, block_font);
                    }
                }
            }
        }

        if ctx.line_box.is_some() {
            self.next_line(block, ctx);
        }
        self.layout_remaining_floats(block, ctx);
        self.tree.get(block).is_some_and(|b| b.first_child.is_some())
    }

    /// Destroy the line boxes of `block`, keeping the embedded boxes
    /// (floats, inline-blocks, absolutes) they contained.
    fn clear_line_boxes(&mut self, block: BoxId) {
        let embedded: Vec<BoxId> = self
            .tree
            .block(block)
            .map(|b| b.block_map.values().copied().collect())
            .unwrap_or_default();
        for line in self.tree.children(block) {
            for child in self.tree.children(line) {
                if embedded.contains(&child) {
                    self.tree.detach(child);
                    continue;
                }
                for inner in self.tree.children(child) {
                    if embedded.contains(&inner) {
                        self.tree.detach(inner);
                    }
                }
            }
            self.destroy_box(line);
        }
    }

    /// Horizontal margin, border and padding of an inline element.
    fn inline_edges(&self, node: NodeId, line_width: f32) -> (f32, f32) {
        let Some(style) = self.styles.computed(node) else {
            return (0.0, 0.0);
        };
        let resolved = ResolvedStyle::resolve(style, ContainingBlock::with_auto_height(line_width, 0.0));
        let left = resolved.margin.left.to_px_or(0.0) + resolved.border.left + resolved.padding.left;
        let right =
            resolved.margin.right.to_px_or(0.0) + resolved.border.right + resolved.padding.right;
        (left, right)
    }

    fn text_font(&self, node: NodeId, fallback: TextFont) -> TextFont {
        let style = self
            .content
            .parent(node)
            .and_then(|parent| self.styles.computed(parent));
        style.map_or(fallback, |style| TextFont {
            font_size: style.font_size,
            line_height: style.used_line_height(self.config.line_height_ratio),
            white_space: style.white_space,
        })
    }

    /// Break the text of `node` into words and place them. Returns whether
    /// a collapsible space is still waiting for the next word.
    fn layout_text(
        &mut self,
        block: BoxId,
        ctx: &mut FormattingContext,
        node: NodeId,
        fallback: TextFont,
        mut pending_space: bool,
    ) -> bool {
        let Some(text) = self.content.text(node) else {
            return pending_space;
        };
        let font = self.text_font(node, fallback);
        let wraps = font.white_space.wraps();
        let preserve = font.white_space.preserves_spaces();
        let mut mcw = 0.0_f32;

        for token in tokenize(text, font.white_space) {
            match token {
                Token::Word(word) => {
                    let width = self.metrics.text_width(&word, font.font_size);
                    mcw = mcw.max(width);
                    let space = if pending_space && ctx.line_has_content() {
                        self.metrics.text_width(" ", font.font_size)
                    } else {
                        0.0
                    };
                    self.make_room(block, ctx, space + width, wraps);
                    if space > 0.0 && ctx.line_has_content() {
                        self.append_text(block, ctx, Some(node), &format!(" {word}"), space + width, font);
                    } else {
                        self.append_text(block, ctx, Some(node), &word, width, font);
                    }
                    pending_space = false;
                }
                Token::Space(run) if preserve => {
                    let width = self.metrics.text_width(&run, font.font_size);
                    self.make_room(block, ctx, width, wraps);
                    self.append_text(block, ctx, Some(node), &run, width, font);
                }
                Token::Space(_) => pending_space = true,
                Token::Newline => {
                    let _ = self.ensure_line_box(block, ctx, true);
                    if !ctx.line_has_content() {
                        // An empty line still has the height of its strut.
                        self.append_text(block, ctx, Some(node), "", 0.0, font);
                    }
                    self.next_line(block, ctx);
                    pending_space = false;
                }
            }
        }
        if let Some(data) = self.tree.block_mut(block) {
            data.mcw = data.mcw.max(mcw);
        }
        pending_space
    }

    fn place_space(&mut self, block: BoxId, ctx: &mut FormattingContext, font: TextFont) {
        if !ctx.line_has_content() {
            return;
        }
        let width = self.metrics.text_width(" ", font.font_size);
        self.make_room(block, ctx, width, font.white_space.wraps());
        if ctx.line_has_content() {
            self.append_text(block, ctx, None, " ", width, font);
        }
    }

    /// Open lines until `width` fits on the current one, or no float band
    /// is left to move past.
    ///
    /// [§ 9.5](https://www.w3.org/TR/CSS21/visuren.html#floats) "If a
    /// shortened line box is too small to contain any content, then the
    /// line box is shifted downward (and its width recomputed) until either
    /// some content fits or there are no more floats present."
    fn make_room(&mut self, block: BoxId, ctx: &mut FormattingContext, width: f32, wraps: bool) {
        let _ = self.ensure_line_box(block, ctx, true);
        while wraps && ctx.leftover < width - EPSILON {
            if ctx.line_has_content() || ctx.line_has_floats {
                self.next_line(block, ctx);
                let _ = self.ensure_line_box(block, ctx, true);
            } else if ctx.has_floats() {
                self.shift_down_line_box(block, ctx);
            } else {
                break;
            }
        }
    }

    fn append_text(
        &mut self,
        block: BoxId,
        ctx: &mut FormattingContext,
        node: Option<NodeId>,
        text: &str,
        width: f32,
        font: TextFont,
    ) {
        let Some(line) = self.ensure_line_box(block, ctx, true) else {
            return;
        };
        let merge = match (ctx.current_text, node) {
            (Some((fragment, current)), Some(node)) if current == node => {
                (self.tree.parent(fragment) == Some(line)).then_some(fragment)
            }
            _ => None,
        };
        if let Some(fragment) = merge {
            if let Some(b) = self.tree.get_mut(fragment) {
                b.width += width;
                if let BoxKind::Inline(InlineData {
                    text: Some(existing),
                    ..
                }) = &mut b.kind
                {
                    existing.push_str(text);
                }
            }
        } else {
            let ascent = self.metrics.ascent(font.font_size);
            let descent = self.metrics.descent(font.font_size);
            let half_leading = (font.line_height - (ascent + descent)) / 2.0;
            let mut fragment = LayoutBox::new(
                BoxKind::Inline(InlineData {
                    text: Some(text.to_owned()),
                    baseline: half_leading + ascent,
                    font_size: font.font_size,
                }),
                node,
            );
            fragment.style = node.and_then(|n| self.content.parent(n));
            fragment.width = width;
            fragment.height = font.line_height;
            fragment.offset_h = ctx.x;
            let id = self.tree.alloc(fragment);
            self.tree.append_child(line, id);
            ctx.current_text = node.map(|n| (id, n));
        }
        ctx.x += width;
        ctx.leftover -= width;
        ctx.at_line_head = false;
    }

    /// The line box being filled, created on demand. A new line fixes the
    /// margins above it when `fix` is set, receives the floats accepted
    /// at the end of the previous line and any pending clearance.
    pub(crate) fn ensure_line_box(
        &mut self,
        block: BoxId,
        ctx: &mut FormattingContext,
        fix: bool,
    ) -> Option<BoxId> {
        if let Some(line) = ctx.line_box {
            return Some(line);
        }
        if fix {
            let _ = ctx.fix_margin();
        }
        let mut line = LayoutBox::new(BoxKind::Line(LineData::default()), None);
        line.style = self.tree.get(block).and_then(|b| b.style);
        if ctx.line_clearance > 0.0 {
            line.clearance = Some(ctx.line_clearance);
            ctx.line_clearance = 0.0;
        }
        let id = self.tree.alloc(line);
        self.tree.append_child(block, id);
        ctx.line_box = Some(id);
        ctx.x = 0.0;
        ctx.at_line_head = true;
        ctx.line_has_floats = false;
        ctx.current_text = None;
        ctx.leftover = ctx.available_width();
        for float in std::mem::take(&mut ctx.accepted) {
            self.place_float(ctx, float);
        }
        Some(id)
    }

    /// Close the current line box: align its content vertically on a
    /// common baseline, size it, commit its height, and accept queued
    /// floats for the next line.
    ///
    /// [§ 10.8](https://www.w3.org/TR/CSS21/visudet.html#line-height)
    /// "The line box height is the distance between the uppermost box top
    /// and the lowermost box bottom."
    pub(crate) fn next_line(&mut self, block: BoxId, ctx: &mut FormattingContext) {
        let Some(line) = ctx.line_box.take() else {
            return;
        };
        let mut baseline = 0.0_f32;
        let mut below = 0.0_f32;
        let mut aligned = Vec::new();
        for child in self.tree.children(line) {
            let Some(c) = self.tree.get(child) else {
                continue;
            };
            if let BoxKind::Inline(data) = &c.kind {
                baseline = baseline.max(data.baseline);
                below = below.max(c.total_height() - data.baseline);
                aligned.push((child, data.baseline));
            }
        }
        for (child, child_baseline) in aligned {
            if let Some(c) = self.tree.get_mut(child) {
                c.offset_v = baseline - child_baseline;
            }
        }
        let height = baseline + below;
        let left = ctx.left_edge();
        let right = ctx.right_edge();
        let width = (ctx.line_width - left - right).max(0.0);
        let align = self
            .tree
            .block(block)
            .map_or(TextAlign::Left, |b| b.text_align);
        if let Some(l) = self.tree.get_mut(line) {
            l.margin.left = left;
            l.margin.right = right;
            l.width = width;
            l.height = height;
            if let BoxKind::Line(data) = &mut l.kind {
                data.baseline = baseline;
                data.content_width = ctx.x;
                data.shift = line_shift(align, width, ctx.x);
            }
        }
        if height > 0.0 {
            ctx.consume(height);
        }
        ctx.x = 0.0;
        ctx.at_line_head = true;
        ctx.line_has_floats = false;
        ctx.current_text = None;
        self.accept_floats(ctx);
    }

    /// Move the empty current line below the float that ends first.
    fn shift_down_line_box(&mut self, block: BoxId, ctx: &mut FormattingContext) {
        let Some(line) = ctx.line_box else {
            return;
        };
        let height = ctx.shift_down();
        if height <= 0.0 {
            return;
        }
        if let Some(l) = self.tree.get_mut(line) {
            l.clearance = Some(l.clearance_or_zero() + height);
        }
        if let Some(data) = self.tree.block_mut(block) {
            data.consumed += height;
        }
        ctx.leftover = ctx.available_width() - ctx.x;
    }

    /// [§ 10.3.9 'Inline-block', non-replaced elements in normal flow](https://www.w3.org/TR/CSS21/visudet.html#inlineblock-width)
    ///
    /// Lay out an inline-block (or inline replaced element) as an
    /// independent flow root and place it on the line as one unbreakable
    /// piece, wrapped in an inline box that carries its baseline.
    fn place_inline_block(&mut self, block: BoxId, ctx: &mut FormattingContext, id: BoxId, font: TextFont) {
        let cb = ContainingBlock::with_auto_height(ctx.line_width, 0.0);
        self.layout_independent(id, cb, WidthRule::ShrinkToFit);
        let Some(b) = self.tree.get(id) else {
            return;
        };
        let width = b.total_width();
        let height = b.total_height();
        let baseline = self.baseline_of(id).unwrap_or(height);
        if let Some(data) = self.tree.block_mut(block) {
            data.mcw = data.mcw.max(width);
        }
        self.make_room(block, ctx, width, font.white_space.wraps());
        let Some(line) = self.ensure_line_box(block, ctx, true) else {
            return;
        };
        let mut wrapper = LayoutBox::new(
            BoxKind::Inline(InlineData {
                text: None,
                baseline,
                font_size: font.font_size,
            }),
            None,
        );
        wrapper.style = self.tree.get(id).and_then(|b| b.node);
        wrapper.width = width;
        wrapper.height = height;
        wrapper.offset_h = ctx.x;
        let wrapper = self.tree.alloc(wrapper);
        self.tree.append_child(line, wrapper);
        self.tree.append_child(wrapper, id);
        if let Some(b) = self.tree.get_mut(id) {
            b.offset_h = 0.0;
            b.offset_v = 0.0;
        }
        ctx.x += width;
        ctx.leftover -= width;
        ctx.at_line_head = false;
        ctx.current_text = None;
    }

    /// Put the placeholder of an absolutely positioned box on the current
    /// line. Its static position is resolved from the line later.
    fn place_absolute_placeholder(&mut self, block: BoxId, ctx: &mut FormattingContext, id: BoxId) {
        let Some(line) = self.ensure_line_box(block, ctx, false) else {
            return;
        };
        let after_line = ctx.line_has_content();
        if let Some(data) = self.tree.block_mut(id) {
            data.inline_x = ctx.x;
            data.static_after_line = data.originally_block && after_line;
        }
        self.tree.append_child(line, id);
    }

    /// [§ 10.8.1](https://www.w3.org/TR/CSS21/visudet.html#leading) Distance
    /// from the top margin edge of `id` to its baseline: the baseline of its
    /// last in-flow line box, or of a table's first row. `None` when the
    /// box has no line box or clips its content, in which case the bottom
    /// margin edge serves as the baseline.
    #[must_use]
    pub(crate) fn baseline_of(&self, id: BoxId) -> Option<f32> {
        let b = self.tree.get(id)?;
        let data = b.as_block()?;
        if b.node
            .and_then(|n| self.styles.computed(n))
            .is_some_and(ComputedStyle::is_clipped)
        {
            return None;
        }
        if let BlockVariant::TableWrapper(table) = &data.variant {
            return Some(b.blank_top() + table.baseline);
        }
        let mut y = b.blank_top();
        let mut last = None;
        for child in self.tree.children(id) {
            let Some(c) = self.tree.get(child) else {
                continue;
            };
            let top = y + c.clearance_or_zero();
            match &c.kind {
                BoxKind::Line(line) if c.height > 0.0 => last = Some(top + line.baseline),
                BoxKind::Block(_) if c.is_in_flow() => {
                    if let Some(inner) = self.baseline_of(child) {
                        last = Some(top + inner);
                    }
                }
                _ => {}
            }
            y = top + c.total_height();
        }
        last
    }
}
