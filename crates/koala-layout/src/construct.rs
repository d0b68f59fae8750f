//! Box generation.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS21/visuren.html#box-gen)
//!
//! Every element that generates a box gets one principal block box or
//! contributes inline items to the block that contains it. Elements that
//! are inline-level but laid out as blocks (floats, absolutely positioned
//! boxes, inline-blocks, inline replaced elements) get a block box that is
//! *embedded*: it is kept in the block map of the block whose inline
//! content refers to it, and attached to a line box during layout.
//!
//! [§ 9.2.1.1 Anonymous block boxes](https://www.w3.org/TR/CSS21/visuren.html#anonymous-block-level)
//!
//! "if a block container box has a block-level box inside it, then we
//! force it to have only block-level boxes inside it." Runs of inline
//! content next to block-level siblings are wrapped in anonymous blocks.

use koala_common::warning::warn_once;

use crate::box_tree::{BlockVariant, BoxId, CellData, InlineItem, LayoutBox, TableData};
use crate::content::NodeId;
use crate::flags::LayoutFlags;
use crate::pass::LayoutPass;
use crate::stacking::StackingContextId;
use crate::style::{ComputedStyle, Direction, Display};

/// Content flattened for box generation.
enum Segment {
    /// Inline content, with the box of an embedded element.
    Item(InlineItem, Option<BoxId>),
    /// A block-level element.
    Block(NodeId),
}

/// The inline items and embedded boxes of one run.
type Run = Vec<(InlineItem, Option<BoxId>)>;

impl LayoutPass<'_> {
    /// Generate the box tree, or regenerate the parts flagged
    /// `NEED_EXPANSION`.
    pub(crate) fn build(&mut self) {
        match self.tree.root() {
            Some(root)
                if self
                    .tree
                    .get(root)
                    .is_some_and(|b| b.flags.contains(LayoutFlags::NEED_EXPANSION)) =>
            {
                self.destroy_box(root);
                self.create_root();
            }
            Some(root) => self.expand_dirty(root),
            None => self.create_root(),
        }
    }

    fn computed_or_default(&self, node: NodeId) -> ComputedStyle {
        self.styles.computed(node).cloned().unwrap_or_default()
    }

    fn create_root(&mut self) {
        let Some(node) = self.content.root_element() else {
            log::debug!("no root element, nothing to lay out");
            return;
        };
        let style = self.computed_or_default(node);
        if style.display == Display::None {
            return;
        }
        // [§ 9.7] "Otherwise, if the element is the root element, 'display'
        // is set according to the table above".
        let variant = if style.display == Display::Table {
            self.table_variant(&style)
        } else {
            BlockVariant::Plain
        };
        let root_context = self.stacking.root();
        let id = self.new_block_box(node, &style, variant, root_context);
        if let Some(data) = self.tree.block_mut(id) {
            data.flow_root = true;
            data.display = Display::Block;
        }
        self.tree.set_root(Some(id));
        self.expand_box(id, node);
        log::trace!("generated {} boxes", self.tree.len());
    }

    fn table_variant(&self, style: &ComputedStyle) -> BlockVariant {
        BlockVariant::TableWrapper(TableData {
            spacing: style.border_spacing.unwrap_or(self.config.border_spacing),
            ..TableData::default()
        })
    }

    /// The stacking context boxes of `node` paint in: its own when it is
    /// positioned, else `parent`.
    fn context_for(&mut self, node: NodeId, style: &ComputedStyle, parent: StackingContextId) -> StackingContextId {
        if !style.is_positioned() {
            return parent;
        }
        let existing = self
            .styles
            .entry(node)
            .and_then(|entry| entry.stacking_context)
            .filter(|&ctx| self.stacking.contains(ctx));
        if let Some(ctx) = existing {
            return ctx;
        }
        let ctx = self.stacking.create(parent, style.z_index, node);
        if let Some(entry) = self.styles.entry_mut(node) {
            entry.stacking_context = Some(ctx);
        }
        ctx
    }

    /// Allocate the principal block box of `node`.
    fn new_block_box(
        &mut self,
        node: NodeId,
        style: &ComputedStyle,
        variant: BlockVariant,
        parent_context: StackingContextId,
    ) -> BoxId {
        if style.direction == Direction::Rtl {
            let _ = warn_once("Layout", "direction: rtl is laid out left-to-right");
        }
        if style.display == Display::ListItem {
            let _ = warn_once("Layout", "list markers are not generated");
        }
        let context = self.context_for(node, style, parent_context);
        let is_cell = matches!(variant, BlockVariant::TableCell(_));
        let mut b = LayoutBox::block(variant, Some(node));
        b.position = style.position;
        b.visibility = style.visibility;
        b.stacking_context = Some(context);
        if let Some(data) = b.as_block_mut() {
            data.display = style.used_display();
            data.flow_root = style.establishes_formatting_context() || is_cell;
            data.float = if style.is_float() { style.float } else { None };
            data.clear = style.clear;
            data.text_align = style.text_align;
            data.white_space = style.white_space;
            data.font_size = style.font_size;
            data.line_height = style.used_line_height(self.config.line_height_ratio);
            data.intrinsic = style.replaced.is_some();
            data.originally_block = style.display.is_block_level();
        }
        let id = self.tree.alloc(b);
        self.styles.add_box(node, id);
        self.stacking.add_box(context, id);
        id
    }

    /// Allocate an anonymous block inside `parent`, inheriting its text
    /// properties.
    fn new_anonymous_block(&mut self, parent: BoxId, variant: BlockVariant) -> BoxId {
        let is_cell = matches!(variant, BlockVariant::TableCell(_));
        let mut b = LayoutBox::block(variant, None);
        if let Some(p) = self.tree.get(parent) {
            b.style = p.style;
            b.stacking_context = p.stacking_context;
            b.visibility = p.visibility;
        }
        if let (Some(data), Some(inherited)) = (b.as_block_mut(), self.tree.block(parent)) {
            data.text_align = inherited.text_align;
            data.white_space = inherited.white_space;
            data.font_size = inherited.font_size;
            data.line_height = inherited.line_height;
            data.flow_root = is_cell;
        } else if let Some(data) = b.as_block_mut() {
            data.font_size = self.config.default_font_size;
            data.line_height = self.config.default_font_size * self.config.line_height_ratio;
            data.flow_root = is_cell;
        }
        let context = b.stacking_context;
        let id = self.tree.alloc(b);
        if let Some(context) = context {
            self.stacking.add_box(context, id);
        }
        id
    }

    /// Generate what goes inside the block box `id` of `node`.
    fn expand_box(&mut self, id: BoxId, node: NodeId) {
        let Some(data) = self.tree.block(id) else {
            return;
        };
        if matches!(data.variant, BlockVariant::TableWrapper(_)) {
            self.expand_table(id, node);
        } else if !data.intrinsic {
            let content = self.content;
            self.expand_children(id, content.children(node));
        }
    }

    /// Generate the children of the block `block` from the content nodes
    /// `nodes`.
    fn expand_children(&mut self, block: BoxId, nodes: &[NodeId]) {
        let context = self
            .tree
            .get(block)
            .and_then(|b| b.stacking_context)
            .unwrap_or_else(|| self.stacking.root());
        let mut segments = Vec::new();
        self.flatten(nodes, context, &mut segments);

        if !segments.iter().any(|s| matches!(s, Segment::Block(_))) {
            let run = segments
                .into_iter()
                .filter_map(|s| match s {
                    Segment::Item(item, embedded) => Some((item, embedded)),
                    Segment::Block(_) => None,
                })
                .collect();
            self.adopt_run(block, run);
            return;
        }
        let mut run = Vec::new();
        for segment in segments {
            match segment {
                Segment::Item(item, embedded) => run.push((item, embedded)),
                Segment::Block(node) => {
                    self.flush_run(block, &mut run);
                    self.append_block_child(block, node, context);
                }
            }
        }
        self.flush_run(block, &mut run);
    }

    /// Turn `nodes` into inline items and block-level elements, creating
    /// the boxes of embedded elements on the way.
    fn flatten(&mut self, nodes: &[NodeId], context: StackingContextId, out: &mut Vec<Segment>) {
        let content = self.content;
        for &node in nodes {
            if content.text(node).is_some() {
                out.push(Segment::Item(InlineItem::Text(node), None));
                continue;
            }
            if !content.is_element(node) {
                continue;
            }
            let style = self.computed_or_default(node);
            let display = style.used_display();
            if display == Display::None {
                continue;
            }
            let embedded = style.is_float()
                || style.is_absolutely_positioned()
                || display == Display::InlineBlock
                || (display == Display::Inline && style.replaced.is_some());
            if embedded {
                let variant = if display == Display::Table {
                    self.table_variant(&style)
                } else {
                    BlockVariant::Plain
                };
                let id = self.new_block_box(node, &style, variant, context);
                self.expand_box(id, node);
                out.push(Segment::Item(InlineItem::Embedded(node), Some(id)));
            } else if display == Display::Inline {
                // Inline elements generate no box of their own; only their
                // edges take part in line layout.
                out.push(Segment::Item(InlineItem::Open(node), None));
                let inner = self.context_for(node, &style, context);
                self.flatten(content.children(node), inner, out);
                out.push(Segment::Item(InlineItem::Close(node), None));
            } else {
                if matches!(display, Display::TableRow | Display::TableCell) {
                    let _ = warn_once("Layout", "table rows and cells outside a table are laid out as blocks");
                }
                out.push(Segment::Block(node));
            }
        }
    }

    /// Append the principal box of the block-level `node` to `block`.
    fn append_block_child(&mut self, block: BoxId, node: NodeId, context: StackingContextId) {
        let style = self.computed_or_default(node);
        let variant = if style.display == Display::Table {
            self.table_variant(&style)
        } else {
            BlockVariant::Plain
        };
        let id = self.new_block_box(node, &style, variant, context);
        if let Some(data) = self.tree.block_mut(id) {
            if matches!(data.display, Display::TableRow | Display::TableCell) {
                data.display = Display::Block;
            }
        }
        self.tree.append_child(block, id);
        self.expand_box(id, node);
    }

    /// Wrap the run in an anonymous block appended to `block`, unless it is
    /// only collapsible white space.
    fn flush_run(&mut self, block: BoxId, run: &mut Run) {
        if run.is_empty() {
            return;
        }
        let items = std::mem::take(run);
        if self.is_blank_run(block, &items) {
            return;
        }
        let anonymous = self.new_anonymous_block(block, BlockVariant::Plain);
        self.tree.append_child(block, anonymous);
        self.adopt_run(anonymous, items);
    }

    fn is_blank_run(&self, block: BoxId, items: &Run) -> bool {
        let collapses = self
            .tree
            .block(block)
            .is_none_or(|data| !data.white_space.preserves_newlines());
        collapses
            && items.iter().all(|(item, _)| match item {
                InlineItem::Text(node) => self
                    .content
                    .text(*node)
                    .is_none_or(|text| text.chars().all(char::is_whitespace)),
                _ => false,
            })
    }

    /// Make the items inline content of `block`, after what it already has.
    fn adopt_run(&mut self, block: BoxId, items: Run) {
        for (item, embedded) in items {
            if let (InlineItem::Embedded(node), Some(id)) = (item, embedded) {
                if let Some(data) = self.tree.block_mut(id) {
                    data.owner = Some(block);
                }
                if let Some(data) = self.tree.block_mut(block) {
                    let _ = data.block_map.insert(node, id);
                }
            }
            if let Some(data) = self.tree.block_mut(block) {
                data.inlines.push(item);
            }
        }
    }

    /// [§ 17.2.1 Anonymous table objects](https://www.w3.org/TR/CSS21/tables.html#anonymous-boxes)
    ///
    /// Rows of the table element `node`; consecutive children that are not
    /// rows share an anonymous row.
    fn expand_table(&mut self, table: BoxId, node: NodeId) {
        let content = self.content;
        let mut pending = Vec::new();
        for &child in content.children(node) {
            if self.is_blank_node(child) {
                continue;
            }
            let style = self.computed_or_default(child);
            match style.display {
                Display::None => {}
                Display::TableRow if content.is_element(child) => {
                    self.flush_anonymous_row(table, &mut pending);
                    let context = self.box_context(table);
                    let row = self.new_block_box(child, &style, BlockVariant::TableRow, context);
                    self.tree.append_child(table, row);
                    self.expand_row(row, content.children(child));
                }
                _ => pending.push(child),
            }
        }
        self.flush_anonymous_row(table, &mut pending);
    }

    fn box_context(&self, id: BoxId) -> StackingContextId {
        self.tree
            .get(id)
            .and_then(|b| b.stacking_context)
            .unwrap_or_else(|| self.stacking.root())
    }

    fn is_blank_node(&self, node: NodeId) -> bool {
        self.content
            .text(node)
            .is_some_and(|text| text.chars().all(char::is_whitespace))
    }

    fn flush_anonymous_row(&mut self, table: BoxId, pending: &mut Vec<NodeId>) {
        if pending.is_empty() {
            return;
        }
        let nodes = std::mem::take(pending);
        let row = self.new_anonymous_block(table, BlockVariant::TableRow);
        self.tree.append_child(table, row);
        self.expand_row(row, &nodes);
    }

    /// Cells of a row. Consecutive children that are not cells share an
    /// anonymous cell.
    fn expand_row(&mut self, row: BoxId, nodes: &[NodeId]) {
        let content = self.content;
        let mut column = 0;
        let mut pending = Vec::new();
        for &child in nodes {
            if self.is_blank_node(child) {
                continue;
            }
            let style = self.computed_or_default(child);
            match style.display {
                Display::None => {}
                Display::TableCell if content.is_element(child) => {
                    column = self.flush_anonymous_cell(row, column, &mut pending);
                    let span = usize::try_from(style.column_span.max(1)).unwrap_or(1);
                    let cell_data = CellData {
                        column,
                        span,
                        ..CellData::default()
                    };
                    let context = self.box_context(row);
                    let cell = self.new_block_box(child, &style, BlockVariant::TableCell(cell_data), context);
                    self.tree.append_child(row, cell);
                    self.expand_children(cell, content.children(child));
                    column += span;
                }
                _ => pending.push(child),
            }
        }
        let _ = self.flush_anonymous_cell(row, column, &mut pending);
    }

    fn flush_anonymous_cell(&mut self, row: BoxId, column: usize, pending: &mut Vec<NodeId>) -> usize {
        if pending.is_empty() {
            return column;
        }
        let nodes = std::mem::take(pending);
        let cell_data = CellData {
            column,
            span: 1,
            ..CellData::default()
        };
        let cell = self.new_anonymous_block(row, BlockVariant::TableCell(cell_data));
        self.tree.append_child(row, cell);
        self.expand_children(cell, &nodes);
        column + 1
    }

    /// Regenerate the blocks flagged `NEED_EXPANSION` under `id`.
    fn expand_dirty(&mut self, id: BoxId) {
        let Some(b) = self.tree.get(id) else {
            return;
        };
        if b.flags.contains(LayoutFlags::NEED_EXPANSION) {
            self.reexpand(id);
            return;
        }
        // Anonymous blocks do not record the flag; look through them.
        if !b.flags.contains(LayoutFlags::NEED_CHILD_EXPANSION) && !b.is_anonymous() {
            return;
        }
        let mut next: Vec<BoxId> = self
            .tree
            .children(id)
            .into_iter()
            .filter(|&c| self.tree.get(c).is_some_and(LayoutBox::is_block))
            .collect();
        if let Some(data) = self.tree.block(id) {
            next.extend(data.block_map.values().copied());
        }
        for child in next {
            self.expand_dirty(child);
        }
    }

    /// Throw away the children of the block `id` and generate them again.
    /// A row regenerates its whole table, which numbers the columns.
    fn reexpand(&mut self, id: BoxId) {
        let mut target = id;
        while let Some(data) = self.tree.block(target) {
            if !matches!(data.variant, BlockVariant::TableRow) {
                break;
            }
            match self.tree.parent(target) {
                Some(parent) => target = parent,
                None => break,
            }
        }
        let Some(node) = self.tree.get(target).and_then(|b| b.node) else {
            return;
        };
        log::debug!("regenerate boxes of {target}");
        let embedded: Vec<BoxId> = self
            .tree
            .block(target)
            .map(|data| data.block_map.values().copied().collect())
            .unwrap_or_default();
        for e in embedded {
            self.destroy_box(e);
        }
        self.destroy_children(target);
        if let Some(data) = self.tree.block_mut(target) {
            data.inlines.clear();
            data.block_map.clear();
            data.formatting_context = None;
            data.resolved_width = None;
        }
        self.expand_box(target, node);
        self.tree.set_flags(target, LayoutFlags::NEED_REFLOW);
    }

    /// Fold `child`, just appended to the element of `container`, into
    /// the existing boxes. Inline content joins the inline content of the
    /// container, or the anonymous block that ends it. Returns `false`
    /// when the container must be regenerated instead.
    pub(crate) fn append_to_container(&mut self, container: BoxId, child: NodeId) -> bool {
        let Some(b) = self.tree.get(container) else {
            return false;
        };
        let Some(data) = b.as_block() else {
            return false;
        };
        if !matches!(data.variant, BlockVariant::Plain) || data.intrinsic {
            return false;
        }
        let has_inline = data.has_inline();
        let last_child = b.last_child;
        let has_block_children = !has_inline && last_child.is_some();
        let context = self.box_context(container);

        if self.is_block_level(child) {
            if has_inline {
                return false;
            }
            self.append_block_child(container, child, context);
            self.tree.set_flags(container, LayoutFlags::NEED_REFLOW);
            return true;
        }
        if self.contains_block_level(child) {
            return false;
        }
        let mut segments = Vec::new();
        self.flatten(&[child], context, &mut segments);
        let mut run: Run = segments
            .into_iter()
            .filter_map(|s| match s {
                Segment::Item(item, embedded) => Some((item, embedded)),
                Segment::Block(_) => None,
            })
            .collect();
        if !has_block_children {
            self.adopt_run(container, run);
            self.tree.set_flags(container, LayoutFlags::NEED_REFLOW);
            return true;
        }
        let reusable = last_child.filter(|&last| {
            self.tree.get(last).is_some_and(|l| {
                l.is_anonymous() && l.as_block().is_some_and(|d| matches!(d.variant, BlockVariant::Plain))
            })
        });
        match reusable {
            Some(anonymous) => {
                log::trace!("append {child} to anonymous {anonymous}");
                self.adopt_run(anonymous, run);
                self.tree.set_flags(anonymous, LayoutFlags::NEED_REFLOW);
            }
            None => {
                self.flush_run(container, &mut run);
                self.tree.set_flags(container, LayoutFlags::NEED_REFLOW);
            }
        }
        true
    }

    fn is_block_level(&self, node: NodeId) -> bool {
        if !self.content.is_element(node) {
            return false;
        }
        let style = self.styles.computed(node);
        style.is_some_and(|s| {
            !s.is_float() && !s.is_absolutely_positioned() && s.used_display().is_block_level()
        })
    }

    /// An inline element of `node`'s subtree holds a block-level element.
    fn contains_block_level(&self, node: NodeId) -> bool {
        let inline = self
            .styles
            .computed(node)
            .is_none_or(|s| s.used_display() == Display::Inline && s.replaced.is_none());
        inline
            && self.content.is_element(node)
            && self
                .content
                .children(node)
                .iter()
                .any(|&c| self.is_block_level(c) || self.contains_block_level(c))
    }
}
