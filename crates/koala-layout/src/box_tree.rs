//! The box tree.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS21/visuren.html#box-gen)
//!
//! Boxes live in an arena and refer to each other through [`BoxId`]
//! handles. A handle carries a generation, so a handle kept past the
//! destruction of its box (for example by an image request that completes
//! late) resolves to nothing instead of to whatever box reused the slot.
//!
//! The parent owns its children structurally: `first_child`/`last_child`
//! and the doubly-linked sibling chain are the only ownership edges. Style,
//! stacking context and clip box references are plain non-owning handles.

use std::collections::BTreeMap;

use crate::background::Background;
use crate::content::NodeId;
use crate::flags::LayoutFlags;
use crate::float::{ClearSide, FloatSide};
use crate::formatting_context::FormattingContext;
use crate::geometry::{ContainingBlock, EdgeSizes};
use crate::positioned::PositionType;
use crate::stacking::StackingContextId;
use crate::style::{Display, StyleMap, TextAlign, Visibility, WhiteSpace};

/// Stable handle to a box in a [`BoxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for BoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "box{}", self.index)
    }
}

/// [§ 9.2.1 Block-level elements and block boxes](https://www.w3.org/TR/CSS21/visuren.html#block-boxes)
/// [§ 9.2.2 Inline-level elements and inline boxes](https://www.w3.org/TR/CSS21/visuren.html#inline-boxes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum BoxType {
    /// Participates in a block formatting context.
    #[strum(to_string = "block-level box")]
    BlockLevel,
    /// Participates in an inline formatting context.
    #[strum(to_string = "inline-level box")]
    InlineLevel,
    /// A line box.
    #[strum(to_string = "line box")]
    Line,
}

/// A content node that must be placed into inline flow, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineItem {
    /// A text node.
    Text(NodeId),
    /// Start of an inline element: its left margin, border and padding.
    Open(NodeId),
    /// End of an inline element: its right margin, border and padding.
    Close(NodeId),
    /// A float, absolutely positioned box, inline-block or inline replaced
    /// element, whose box is found in the block map.
    Embedded(NodeId),
}

/// Which block container a block box is.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockVariant {
    /// A block box, inline-block, float or absolutely positioned box.
    Plain,
    /// The wrapper box of a table; its children are rows.
    TableWrapper(TableData),
    /// A table row; its children are cells.
    TableRow,
    /// A table cell.
    TableCell(CellData),
}

/// Column geometry of a laid out table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    /// Used width of every column.
    pub column_widths: Vec<f32>,
    /// Spacing between cells and around the grid.
    pub spacing: f32,
    /// Distance from the wrapper's top margin edge to the first row's
    /// baseline.
    pub baseline: f32,
}

/// Position of a cell in its table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    /// First column the cell occupies.
    pub column: usize,
    /// Number of columns the cell spans.
    pub span: usize,
    /// Border-box width handed down by the table, if determined.
    pub fixed_width: Option<f32>,
    /// Minimum and preferred border-box widths from the last measure.
    pub measured: Option<(f32, f32)>,
}

/// Layout state of a block container.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct BlockData {
    /// Block container kind.
    pub variant: BlockVariant,
    /// Used 'display' value.
    pub display: Display,
    /// Private formatting context, present only on flow roots between
    /// passes.
    pub formatting_context: Option<FormattingContext>,
    /// The block establishes a new block formatting context.
    pub flow_root: bool,
    /// 'float'
    pub float: Option<FloatSide>,
    /// 'clear'
    pub clear: Option<ClearSide>,
    /// 'text-align'
    pub text_align: TextAlign,
    /// 'white-space'
    pub white_space: WhiteSpace,
    /// 'font-size' in pixels.
    pub font_size: f32,
    /// Used 'line-height' in pixels.
    pub line_height: f32,
    /// Content to place into inline flow, in document order.
    pub inlines: Vec<InlineItem>,
    /// Boxes of embedded content (floats, absolutes, inline-blocks), by
    /// the node that generated them.
    pub block_map: BTreeMap<NodeId, BoxId>,
    /// Block whose block map holds this box, for embedded boxes.
    pub owner: Option<BoxId>,
    /// Maximum content width: the widest unbreakable piece of content.
    pub mcw: f32,
    /// Height consumed by clearing floats inside this block's lines.
    pub consumed: f32,
    /// Replaced content: the width is not solved for.
    pub intrinsic: bool,
    /// For absolutely positioned boxes: horizontal position within the line
    /// box the placeholder was put on.
    pub inline_x: f32,
    /// For absolutely positioned boxes: where the box would have been in
    /// normal flow.
    pub static_x: f32,
    /// See [`BlockData::static_x`].
    pub static_y: f32,
    /// For absolutely positioned boxes: the box was block-level before
    /// blockification.
    pub originally_block: bool,
    /// For absolutely positioned boxes: the static position is the start
    /// of the line after the placeholder's line.
    pub static_after_line: bool,
    /// For absolutely positioned boxes: the synthetic containing block.
    pub absolute_block: ContainingBlock,
    /// Width the block resolved to before shrink-to-fit on its last pass.
    pub resolved_width: Option<f32>,
    /// Horizontal extent of the content this block clips.
    pub scroll_width: f32,
    /// Vertical extent of the content this block clips.
    pub scroll_height: f32,
}

impl BlockData {
    /// A plain block with initial values.
    #[must_use]
    pub fn new(variant: BlockVariant) -> Self {
        Self {
            variant,
            display: Display::Block,
            formatting_context: None,
            flow_root: false,
            float: None,
            clear: None,
            text_align: TextAlign::Left,
            white_space: WhiteSpace::Normal,
            font_size: 16.0,
            line_height: 19.2,
            inlines: Vec::new(),
            block_map: BTreeMap::new(),
            owner: None,
            mcw: 0.0,
            consumed: 0.0,
            intrinsic: false,
            inline_x: 0.0,
            static_x: 0.0,
            static_y: 0.0,
            originally_block: false,
            static_after_line: false,
            absolute_block: ContainingBlock::default(),
            resolved_width: None,
            scroll_width: 0.0,
            scroll_height: 0.0,
        }
    }

    /// `true` when the block holds inline content and no block children.
    #[must_use]
    pub fn has_inline(&self) -> bool {
        !self.inlines.is_empty()
    }

    /// `true` for table cells.
    #[must_use]
    pub const fn is_table_cell(&self) -> bool {
        matches!(self.variant, BlockVariant::TableCell(_))
    }
}

/// Layout state of a line box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineData {
    /// Distance from the top of the line box to its baseline.
    pub baseline: f32,
    /// Width taken by inline content.
    pub content_width: f32,
    /// Width taken by floats placed on this line.
    pub float_width: f32,
    /// Horizontal shift of the content applied by 'text-align'.
    pub shift: f32,
}

/// Layout state of an inline box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineData {
    /// Text of this fragment, or `None` when the box wraps an atomic
    /// inline (inline-block, replaced element).
    pub text: Option<String>,
    /// Distance from the top of the margin box to the baseline.
    pub baseline: f32,
    /// 'font-size' of the text in pixels.
    pub font_size: f32,
}

/// The closed set of box kinds.
#[derive(Debug, Clone)]
pub enum BoxKind {
    /// A block container.
    Block(Box<BlockData>),
    /// A line box.
    Line(LineData),
    /// An inline box or text fragment.
    Inline(InlineData),
}

/// One rendering box.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Node that generated the box, `None` for anonymous boxes.
    pub node: Option<NodeId>,
    /// Element whose style applies. Anonymous blocks use the style of the
    /// block they sit in for inherited properties only.
    pub style: Option<NodeId>,
    /// Parent box.
    pub parent: Option<BoxId>,
    /// First child box.
    pub first_child: Option<BoxId>,
    /// Last child box.
    pub last_child: Option<BoxId>,
    /// Previous sibling.
    pub prev_sibling: Option<BoxId>,
    /// Next sibling.
    pub next_sibling: Option<BoxId>,
    /// Number of children.
    pub child_count: usize,
    /// Used margins. Collapsed margins are stored on a single box of each
    /// adjoining set; the others read zero.
    pub margin: EdgeSizes,
    /// Used border widths.
    pub border: EdgeSizes,
    /// Used padding.
    pub padding: EdgeSizes,
    /// Content width.
    pub width: f32,
    /// Content height.
    pub height: f32,
    /// Horizontal offset from the position given by normal flow.
    pub offset_h: f32,
    /// Vertical offset from the position given by normal flow.
    pub offset_v: f32,
    /// [§ 9.5.2](https://www.w3.org/TR/CSS21/visuren.html#flow-control)
    /// Clearance above the top border edge; `None` when the box has none.
    /// Clearance can be negative.
    pub clearance: Option<f32>,
    /// 'position'
    pub position: PositionType,
    /// 'visibility'
    pub visibility: Visibility,
    /// Stacking context the box paints in.
    pub stacking_context: Option<StackingContextId>,
    /// Resolved x of the margin box's left edge, excluding relative offsets.
    pub x: f32,
    /// Resolved y of the margin box's top edge, excluding relative offsets.
    pub y: f32,
    /// Nearest ancestor block that clips this box.
    pub clip_box: Option<BoxId>,
    /// Background parameters.
    pub background: Background,
    /// Dirty flags.
    pub flags: LayoutFlags,
    /// Kind-specific state.
    pub kind: BoxKind,
}

impl LayoutBox {
    /// A detached box of the given kind.
    #[must_use]
    pub fn new(kind: BoxKind, node: Option<NodeId>) -> Self {
        Self {
            node,
            style: node,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            child_count: 0,
            margin: EdgeSizes::ZERO,
            border: EdgeSizes::ZERO,
            padding: EdgeSizes::ZERO,
            width: 0.0,
            height: 0.0,
            offset_h: 0.0,
            offset_v: 0.0,
            clearance: None,
            position: PositionType::Static,
            visibility: Visibility::Visible,
            stacking_context: None,
            x: 0.0,
            y: 0.0,
            clip_box: None,
            background: Background::default(),
            flags: LayoutFlags::NEED_REFLOW,
            kind,
        }
    }

    /// A detached block box.
    #[must_use]
    pub fn block(variant: BlockVariant, node: Option<NodeId>) -> Self {
        Self::new(BoxKind::Block(Box::new(BlockData::new(variant))), node)
    }

    /// Block-level, inline-level or line box.
    #[must_use]
    pub fn box_type(&self) -> BoxType {
        match &self.kind {
            BoxKind::Block(block) if block.display.is_inline_level() => BoxType::InlineLevel,
            BoxKind::Block(_) => BoxType::BlockLevel,
            BoxKind::Line(_) => BoxType::Line,
            BoxKind::Inline(_) => BoxType::InlineLevel,
        }
    }

    /// The box was generated without an element of its own.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.node.is_none()
    }

    /// Block state, for block containers.
    #[must_use]
    pub fn as_block(&self) -> Option<&BlockData> {
        match &self.kind {
            BoxKind::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Mutable block state, for block containers.
    pub fn as_block_mut(&mut self) -> Option<&mut BlockData> {
        match &mut self.kind {
            BoxKind::Block(block) => Some(block),
            _ => None,
        }
    }

    /// `true` for block containers.
    #[must_use]
    pub const fn is_block(&self) -> bool {
        matches!(self.kind, BoxKind::Block(_))
    }

    /// `true` for line boxes.
    #[must_use]
    pub const fn is_line(&self) -> bool {
        matches!(self.kind, BoxKind::Line(_))
    }

    /// `position: absolute | fixed`
    #[must_use]
    pub const fn is_absolutely_positioned(&self) -> bool {
        matches!(self.position, PositionType::Absolute | PositionType::Fixed)
    }

    /// A floating block.
    #[must_use]
    pub fn is_float(&self) -> bool {
        !self.is_absolutely_positioned() && self.as_block().is_some_and(|b| b.float.is_some())
    }

    /// Takes part in normal flow.
    #[must_use]
    pub fn is_in_flow(&self) -> bool {
        !self.is_absolutely_positioned() && !self.is_float()
    }

    /// The block establishes a new block formatting context.
    #[must_use]
    pub fn is_flow_root(&self) -> bool {
        self.as_block().is_some_and(|b| b.flow_root)
    }

    /// Clearance, or zero.
    #[must_use]
    pub fn clearance_or_zero(&self) -> f32 {
        self.clearance.unwrap_or(0.0)
    }

    /// Margin, border and padding left of the content.
    #[must_use]
    pub fn blank_left(&self) -> f32 {
        self.margin.left + self.border.left + self.padding.left
    }

    /// Margin, border and padding right of the content.
    #[must_use]
    pub fn blank_right(&self) -> f32 {
        self.margin.right + self.border.right + self.padding.right
    }

    /// Margin, border and padding above the content.
    #[must_use]
    pub fn blank_top(&self) -> f32 {
        self.margin.top + self.border.top + self.padding.top
    }

    /// Margin, border and padding below the content.
    #[must_use]
    pub fn blank_bottom(&self) -> f32 {
        self.margin.bottom + self.border.bottom + self.padding.bottom
    }

    /// Width of the margin box.
    #[must_use]
    pub fn total_width(&self) -> f32 {
        self.blank_left() + self.width + self.blank_right()
    }

    /// Height of the margin box.
    #[must_use]
    pub fn total_height(&self) -> f32 {
        self.blank_top() + self.height + self.blank_bottom()
    }

    /// Width of the border box.
    #[must_use]
    pub fn border_width(&self) -> f32 {
        self.border.horizontal() + self.padding.horizontal() + self.width
    }

    /// Height of the border box.
    #[must_use]
    pub fn border_height(&self) -> f32 {
        self.border.vertical() + self.padding.vertical() + self.height
    }

    /// Width of the padding box.
    #[must_use]
    pub fn padding_width(&self) -> f32 {
        self.padding.horizontal() + self.width
    }

    /// Height of the padding box.
    #[must_use]
    pub fn padding_height(&self) -> f32 {
        self.padding.vertical() + self.height
    }

    /// [§ 9.5](https://www.w3.org/TR/CSS21/visuren.html#floats) Width a
    /// float takes from the line: zero when the float has no height, since
    /// it then occupies no vertical band at all.
    #[must_use]
    pub fn effective_total_width(&self) -> f32 {
        if self.total_height() + self.clearance_or_zero() <= 0.0 {
            0.0
        } else {
            self.total_width()
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<LayoutBox>,
}

/// Arena holding every box of a view.
#[derive(Debug, Clone, Default)]
pub struct BoxTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<BoxId>,
    live: usize,
}

impl BoxTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The root block, if generated.
    #[must_use]
    pub const fn root(&self) -> Option<BoxId> {
        self.root
    }

    /// Set the root block.
    pub const fn set_root(&mut self, root: Option<BoxId>) {
        self.root = root;
    }

    /// Number of live boxes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// `true` when no box is alive.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Move `layout_box` into the arena.
    pub fn alloc(&mut self, layout_box: LayoutBox) -> BoxId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(layout_box);
            return BoxId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entry: Some(layout_box),
        });
        BoxId {
            index,
            generation: 0,
        }
    }

    /// The box behind `id`, unless it has been destroyed.
    #[must_use]
    pub fn get(&self, id: BoxId) -> Option<&LayoutBox> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Mutable access to the box behind `id`.
    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut LayoutBox> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// `true` while the box behind `id` is alive.
    #[must_use]
    pub fn contains(&self, id: BoxId) -> bool {
        self.get(id).is_some()
    }

    /// Block state of `id`.
    #[must_use]
    pub fn block(&self, id: BoxId) -> Option<&BlockData> {
        self.get(id).and_then(LayoutBox::as_block)
    }

    /// Mutable block state of `id`.
    pub fn block_mut(&mut self, id: BoxId) -> Option<&mut BlockData> {
        self.get_mut(id).and_then(LayoutBox::as_block_mut)
    }

    /// Children of `id` in order.
    #[must_use]
    pub fn children(&self, id: BoxId) -> Vec<BoxId> {
        let mut out = Vec::new();
        let mut child = self.get(id).and_then(|b| b.first_child);
        while let Some(c) = child {
            out.push(c);
            child = self.get(c).and_then(|b| b.next_sibling);
        }
        out
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.get(id).and_then(|b| b.parent)
    }

    /// Parent, or the owning block for a detached embedded box.
    #[must_use]
    pub fn flag_parent(&self, id: BoxId) -> Option<BoxId> {
        let b = self.get(id)?;
        b.parent.or_else(|| b.as_block().and_then(|block| block.owner))
    }

    /// Nearest ancestor that is a block container.
    #[must_use]
    pub fn containing_block_box(&self, id: BoxId) -> Option<BoxId> {
        let mut current = self.flag_parent(id);
        while let Some(p) = current {
            if self.get(p).is_some_and(LayoutBox::is_block) {
                return Some(p);
            }
            current = self.flag_parent(p);
        }
        None
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// `child` must be detached.
    pub fn append_child(&mut self, parent: BoxId, child: BoxId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference`, or at the end for
    /// `None`. A `reference` that is not a child of `parent` appends.
    pub fn insert_before(&mut self, parent: BoxId, child: BoxId, reference: Option<BoxId>) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        let reference = reference.filter(|r| self.parent(*r) == Some(parent));
        let prev = match reference {
            Some(r) => self.get(r).and_then(|b| b.prev_sibling),
            None => self.get(parent).and_then(|b| b.last_child),
        };
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = prev;
            c.next_sibling = reference;
        }
        match prev {
            Some(p) => {
                if let Some(p) = self.get_mut(p) {
                    p.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
        match reference {
            Some(r) => {
                if let Some(r) = self.get_mut(r) {
                    r.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = Some(child);
                }
            }
        }
        if let Some(p) = self.get_mut(parent) {
            p.child_count += 1;
        }
    }

    /// Unlink `child` from `parent`. Returns `false` when `child` is not a
    /// child of `parent`. The box stays allocated.
    pub fn remove_child(&mut self, parent: BoxId, child: BoxId) -> bool {
        let Some(c) = self.get(child) else {
            return false;
        };
        if c.parent != Some(parent) {
            return false;
        }
        let (prev, next) = (c.prev_sibling, c.next_sibling);
        match prev {
            Some(p) => {
                if let Some(p) = self.get_mut(p) {
                    p.next_sibling = next;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(n) = self.get_mut(n) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
        if let Some(p) = self.get_mut(parent) {
            p.child_count = p.child_count.saturating_sub(1);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
            c.prev_sibling = None;
            c.next_sibling = None;
        }
        true
    }

    /// Unlink `id` from its parent, if any.
    pub fn detach(&mut self, id: BoxId) {
        if let Some(parent) = self.parent(id) {
            let _ = self.remove_child(parent, id);
        }
    }

    /// Destroy every descendant of `id`, including the boxes in the block
    /// maps of destroyed blocks, and clear their style back-references.
    /// Returns the destroyed boxes so the caller can release what they
    /// hold (image requests, stacking context membership).
    pub fn remove_descendants(&mut self, id: BoxId, styles: &mut StyleMap) -> Vec<(BoxId, LayoutBox)> {
        let mut destroyed = Vec::new();
        for child in self.children(id) {
            let _ = self.remove_child(id, child);
            self.destroy_subtree(child, styles, &mut destroyed);
        }
        destroyed
    }

    /// Destroy `id` and everything below it.
    pub fn destroy(&mut self, id: BoxId, styles: &mut StyleMap) -> Vec<(BoxId, LayoutBox)> {
        self.detach(id);
        let mut destroyed = Vec::new();
        self.destroy_subtree(id, styles, &mut destroyed);
        if self.root == Some(id) {
            self.root = None;
        }
        destroyed
    }

    fn destroy_subtree(
        &mut self,
        id: BoxId,
        styles: &mut StyleMap,
        destroyed: &mut Vec<(BoxId, LayoutBox)>,
    ) {
        let embedded: Vec<BoxId> = self
            .block(id)
            .map(|b| b.block_map.values().copied().collect())
            .unwrap_or_default();
        for child in self.children(id) {
            self.destroy_subtree(child, styles, destroyed);
        }
        for e in embedded {
            if self.contains(e) {
                self.detach(e);
                self.destroy_subtree(e, styles, destroyed);
            }
        }
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        if let Some(layout_box) = slot.entry.take() {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            self.live -= 1;
            if let Some(node) = layout_box.node {
                styles.remove_box(node, id);
            }
            destroyed.push((id, layout_box));
        }
    }

    /// OR `flags` into `id` and mark its block ancestors with the
    /// derived flag, stopping at the first ancestor that already has it.
    /// Anonymous blocks never record `NEED_CHILD_EXPANSION`: they are
    /// regenerated with their parent.
    pub fn set_flags(&mut self, id: BoxId, flags: LayoutFlags) {
        let Some(b) = self.get_mut(id) else {
            return;
        };
        b.flags |= flags;
        let derived = flags.derived();
        if derived.is_empty() {
            return;
        }
        let mut current = self.flag_parent(id);
        while let Some(p) = current {
            if let Some(pb) = self.get_mut(p) {
                if pb.is_block() {
                    if pb.flags.contains(derived) {
                        break;
                    }
                    pb.flags |= derived;
                    if pb.is_anonymous() {
                        pb.flags.remove(LayoutFlags::NEED_CHILD_EXPANSION);
                    }
                }
            }
            current = self.flag_parent(p);
        }
    }

    /// Clear `flags` from `id` and every descendant, including embedded
    /// boxes not currently attached to a line.
    pub fn clear_flags(&mut self, id: BoxId, flags: LayoutFlags) {
        let embedded: Vec<BoxId> = self
            .block(id)
            .map(|b| b.block_map.values().copied().collect())
            .unwrap_or_default();
        if let Some(b) = self.get_mut(id) {
            b.flags.remove(flags);
        }
        for child in self.children(id) {
            self.clear_flags(child, flags);
        }
        for e in embedded {
            if self.parent(e).is_none() {
                self.clear_flags(e, flags);
            }
        }
    }

    /// OR of the flags of `id` and all of its descendants.
    #[must_use]
    pub fn gather_flags(&self, id: BoxId) -> LayoutFlags {
        let own = self.get(id).map_or(LayoutFlags::empty(), |b| b.flags);
        self.children(id)
            .into_iter()
            .fold(own, |acc, child| acc | self.gather_flags(child))
    }

    /// Iterate over `id` and its descendants in tree order.
    #[must_use]
    pub fn descendants(&self, id: BoxId) -> Vec<BoxId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            for child in self.children(current).into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}
