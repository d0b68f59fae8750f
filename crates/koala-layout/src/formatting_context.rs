//! Block formatting context state.
//!
//! [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS21/visuren.html#block-formatting)
//!
//! "In a block formatting context, boxes are laid out one after the other,
//! vertically, beginning at the top of a containing block."
//!
//! A [`FormattingContext`] is owned by its flow root between passes and
//! lent by `&mut` to every box laid out inside it. There is no explicit
//! vertical cursor. Instead each active float records how much of its
//! height is still below the point reached so far, and every piece of
//! vertical space that layout commits (a border, a line box, a fixed
//! margin) is subtracted from those remaining heights. A float whose
//! remaining height reaches zero no longer narrows the lines.

use std::collections::{HashMap, VecDeque};

use crate::box_tree::BoxId;
use crate::float::{ClearSide, FloatEntry, FloatSide};
use crate::geometry::{EPSILON, EdgeSizes};
use crate::margin::MarginChain;

/// Everything about a context that a box entering or leaving it can
/// observe. Two equal keys mean the box would be laid out identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextKey {
    /// Width of the block being filled.
    pub line_width: f32,
    /// Active left floats.
    pub left: Vec<FloatEntry>,
    /// Active right floats.
    pub right: Vec<FloatEntry>,
    /// Margins adjoining the current position.
    pub chain: MarginChain,
    /// Accumulated left blank of enclosing non-root blocks.
    pub blank_left: f32,
    /// Accumulated right blank of enclosing non-root blocks.
    pub blank_right: f32,
}

/// Geometry a skipped box gets back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SavedGeometry {
    /// Used margins, including collapsed values.
    pub margin: EdgeSizes,
    /// Content width.
    pub width: f32,
    /// Content height.
    pub height: f32,
    /// Clearance.
    pub clearance: Option<f32>,
    /// Maximum content width.
    pub mcw: f32,
    /// Horizontal flow offset.
    pub offset_h: f32,
}

/// What a box did to the context on its last pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedState {
    /// State the box saw on entry.
    pub entry: ContextKey,
    /// State the box left behind.
    pub exit: ContextKey,
    /// Vertical space the box committed.
    pub consumed: f32,
    /// Value left on the margin that owned the collapsing chain on entry.
    pub owner_margin: Option<f32>,
    /// The box's own geometry.
    pub geometry: SavedGeometry,
}

/// Per-flow-root layout state.
#[derive(Debug, Clone, Default)]
pub struct FormattingContext {
    /// The line box being filled.
    pub line_box: Option<BoxId>,
    /// Width of the block whose lines are being filled.
    pub line_width: f32,
    /// Position reached on the current line.
    pub x: f32,
    /// Width left on the current line.
    pub leftover: f32,
    /// No content has been placed on the current line yet.
    pub at_line_head: bool,
    /// A float was placed on the current line.
    pub line_has_floats: bool,
    /// Current text fragment, so consecutive words share one inline box.
    pub current_text: Option<(BoxId, crate::content::NodeId)>,
    /// Clearance the next line box starts with.
    pub line_clearance: f32,
    /// Active left floats.
    pub left: Vec<FloatEntry>,
    /// Active right floats.
    pub right: Vec<FloatEntry>,
    /// Floats waiting for room, in arrival order.
    pub queue: VecDeque<BoxId>,
    /// Floats accepted for the next line box.
    pub accepted: Vec<BoxId>,
    /// Margins adjoining the current position.
    pub chain: MarginChain,
    /// Left blank of the enclosing blocks that share this context.
    pub blank_left: f32,
    /// Right blank of the enclosing blocks that share this context.
    pub blank_right: f32,
    /// Total vertical space committed since the context was reset.
    pub consumed: f32,
    saved: HashMap<BoxId, SavedState>,
}

impl FormattingContext {
    /// A fresh context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything but the saved states, at the start of a pass over
    /// the flow root.
    pub fn reset_flow(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        *self = Self {
            saved,
            ..Self::default()
        };
    }

    /// Distance the left floats reach into the current block's content.
    #[must_use]
    pub fn left_edge(&self) -> f32 {
        self.left
            .iter()
            .map(|f| f.edge)
            .fold(0.0_f32, f32::max)
            .sub_blank(self.blank_left)
    }

    /// Distance the right floats reach into the current block's content.
    #[must_use]
    pub fn right_edge(&self) -> f32 {
        self.right
            .iter()
            .map(|f| f.edge)
            .fold(0.0_f32, f32::max)
            .sub_blank(self.blank_right)
    }

    /// Width between the float edges of the current block.
    #[must_use]
    pub fn available_width(&self) -> f32 {
        (self.line_width - self.left_edge() - self.right_edge()).max(0.0)
    }

    /// At least one left float is active.
    #[must_use]
    pub fn has_left(&self) -> bool {
        !self.left.is_empty()
    }

    /// At least one right float is active.
    #[must_use]
    pub fn has_right(&self) -> bool {
        !self.right.is_empty()
    }

    /// At least one float is active.
    #[must_use]
    pub fn has_floats(&self) -> bool {
        self.has_left() || self.has_right()
    }

    /// Something was placed on the current line.
    #[must_use]
    pub fn line_has_content(&self) -> bool {
        !self.at_line_head || self.x > 0.0
    }

    /// Register a float on `side`, reaching `edge` from the flow root's
    /// content edge, with `height` still to be passed.
    pub fn push_float(&mut self, side: FloatSide, id: BoxId, edge: f32, height: f32) {
        if height <= EPSILON {
            return;
        }
        let entry = FloatEntry {
            id,
            edge,
            remaining: height,
        };
        match side {
            FloatSide::Left => self.left.push(entry),
            FloatSide::Right => self.right.push(entry),
        }
    }

    /// Edge a float placed now on `side` starts from, in flow root space.
    #[must_use]
    pub fn float_origin(&self, side: FloatSide) -> f32 {
        match side {
            FloatSide::Left => self.blank_left + self.left_edge(),
            FloatSide::Right => self.blank_right + self.right_edge(),
        }
    }

    /// Move `height` further down: every active float has that much less
    /// height left beside the content, and floats that end expire.
    pub fn update_remaining_height(&mut self, height: f32) {
        if height == 0.0 {
            return;
        }
        self.consumed += height;
        for list in [&mut self.left, &mut self.right] {
            for entry in list.iter_mut() {
                entry.remaining -= height;
            }
            list.retain(|entry| entry.remaining > EPSILON);
        }
    }

    /// Commit the margins adjoining the current position, then `height`.
    pub fn consume(&mut self, height: f32) {
        let _ = self.fix_margin();
        self.update_remaining_height(height);
    }

    /// Commit the margins adjoining the current position and return their
    /// collapsed value.
    pub fn fix_margin(&mut self) -> f32 {
        let value = self.chain.value();
        self.chain = MarginChain::default();
        self.update_remaining_height(value);
        value
    }

    /// Height needed to pass the float that ends first, without moving.
    #[must_use]
    pub fn next_float_end(&self) -> f32 {
        self.left
            .iter()
            .chain(&self.right)
            .map(|f| f.remaining)
            .fold(f32::INFINITY, f32::min)
    }

    /// Move down past the float that ends first. Returns the distance
    /// moved, zero when no float is active.
    pub fn shift_down(&mut self) -> f32 {
        if !self.has_floats() {
            return 0.0;
        }
        let height = self.next_float_end();
        self.update_remaining_height(height);
        height
    }

    /// Height needed to pass every float on the `clear` sides.
    #[must_use]
    pub fn clear_distance(&self, clear: ClearSide) -> f32 {
        let lists: &[&Vec<FloatEntry>] = match clear {
            ClearSide::Left => &[&self.left],
            ClearSide::Right => &[&self.right],
            ClearSide::Both => &[&self.left, &self.right],
        };
        lists
            .iter()
            .copied()
            .flatten()
            .map(|f| f.remaining)
            .fold(0.0_f32, f32::max)
    }

    /// Move down past every float on the `clear` sides. Returns the
    /// distance moved.
    pub fn clear(&mut self, clear: ClearSide) -> f32 {
        let height = self.clear_distance(clear);
        if height > 0.0 {
            self.update_remaining_height(height);
        }
        height
    }

    /// `clear` forbids placing next to a float that is active now.
    #[must_use]
    pub fn clear_conflicts(&self, clear: Option<ClearSide>) -> bool {
        match clear {
            None => false,
            Some(ClearSide::Left) => self.has_left(),
            Some(ClearSide::Right) => self.has_right(),
            Some(ClearSide::Both) => self.has_floats(),
        }
    }

    /// Enter a block that shares this context.
    pub fn update_blanks(&mut self, left: f32, right: f32) {
        self.blank_left += left;
        self.blank_right += right;
    }

    /// Leave a block entered with [`FormattingContext::update_blanks`].
    pub fn restore_blanks(&mut self, left: f32, right: f32) {
        self.blank_left -= left;
        self.blank_right -= right;
    }

    /// The observable state, for snapshot comparison.
    #[must_use]
    pub fn key(&self) -> ContextKey {
        ContextKey {
            line_width: self.line_width,
            left: self.left.clone(),
            right: self.right.clone(),
            chain: self.chain,
            blank_left: self.blank_left,
            blank_right: self.blank_right,
        }
    }

    /// Put back an observable state captured by [`FormattingContext::key`].
    pub fn restore(&mut self, key: &ContextKey) {
        self.line_width = key.line_width;
        self.left.clone_from(&key.left);
        self.right.clone_from(&key.right);
        self.chain = key.chain;
        self.blank_left = key.blank_left;
        self.blank_right = key.blank_right;
    }

    /// What `id` did on its last pass.
    #[must_use]
    pub fn saved(&self, id: BoxId) -> Option<&SavedState> {
        self.saved.get(&id)
    }

    /// Remember what `id` did, returning `true` when its effect on the
    /// context differs from the previous pass.
    pub fn save_context(&mut self, id: BoxId, state: SavedState) -> bool {
        let changed = self.saved.get(&id).is_none_or(|prev| prev.exit != state.exit);
        let _ = self.saved.insert(id, state);
        changed
    }

    /// Drop the saved state of a destroyed box.
    pub fn forget(&mut self, id: BoxId) {
        let _ = self.saved.remove(&id);
    }
}

trait SubBlank {
    fn sub_blank(self, blank: f32) -> f32;
}

impl SubBlank for f32 {
    fn sub_blank(self, blank: f32) -> f32 {
        (self - blank).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_tree::{BlockVariant, BoxTree, LayoutBox};

    fn ids(n: usize) -> Vec<BoxId> {
        let mut tree = BoxTree::new();
        (0..n)
            .map(|_| tree.alloc(LayoutBox::block(BlockVariant::Plain, None)))
            .collect()
    }

    #[test]
    fn floats_expire_as_height_is_consumed() {
        let id = ids(2);
        let mut ctx = FormattingContext::new();
        ctx.line_width = 300.0;
        ctx.push_float(FloatSide::Left, id[0], 100.0, 40.0);
        ctx.push_float(FloatSide::Right, id[1], 50.0, 10.0);
        assert_eq!(ctx.available_width(), 150.0);

        ctx.update_remaining_height(10.0);
        assert!(!ctx.has_right(), "right float ended");
        assert_eq!(ctx.available_width(), 200.0);

        assert_eq!(ctx.shift_down(), 30.0);
        assert!(!ctx.has_floats());
        assert_eq!(ctx.shift_down(), 0.0);
    }

    #[test]
    fn clear_moves_past_the_lowest_float_on_its_side() {
        let id = ids(2);
        let mut ctx = FormattingContext::new();
        ctx.push_float(FloatSide::Left, id[0], 100.0, 40.0);
        ctx.push_float(FloatSide::Right, id[1], 50.0, 60.0);
        assert_eq!(ctx.clear_distance(ClearSide::Left), 40.0);
        assert_eq!(ctx.clear(ClearSide::Both), 60.0);
        assert!(!ctx.has_floats());
    }

    #[test]
    fn blanks_shift_float_edges_into_nested_blocks() {
        let id = ids(1);
        let mut ctx = FormattingContext::new();
        ctx.push_float(FloatSide::Left, id[0], 100.0, 40.0);
        ctx.update_blanks(30.0, 0.0);
        assert_eq!(ctx.left_edge(), 70.0);
        ctx.update_blanks(90.0, 0.0);
        assert_eq!(ctx.left_edge(), 0.0, "block starts right of the float");
        ctx.restore_blanks(120.0, 0.0);
        assert_eq!(ctx.left_edge(), 100.0);
    }

    #[test]
    fn zero_height_floats_are_not_tracked() {
        let id = ids(1);
        let mut ctx = FormattingContext::new();
        ctx.push_float(FloatSide::Left, id[0], 100.0, 0.0);
        assert!(!ctx.has_floats());
    }

    #[test]
    fn reset_keeps_saved_states() {
        let id = ids(1);
        let mut ctx = FormattingContext::new();
        assert!(ctx.save_context(id[0], SavedState::default()));
        assert!(!ctx.save_context(id[0], SavedState::default()), "unchanged");
        ctx.x = 12.0;
        ctx.reset_flow();
        assert_eq!(ctx.x, 0.0);
        assert!(ctx.saved(id[0]).is_some());
    }
}
