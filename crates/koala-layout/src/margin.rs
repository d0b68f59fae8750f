//! Collapsing margins.
//!
//! [§ 8.3.1 Collapsing margins](https://www.w3.org/TR/CSS21/box.html#collapsing-margins)
//!
//! "In CSS, the adjoining margins of two or more boxes (which might or
//! might not be siblings) can combine to form a single margin. Margins
//! that combine this way are said to collapse, and the resulting combined
//! margin is called a collapsed margin."
//!
//! The margins adjoining the current position form a [`MarginChain`]. The
//! collapsed value of the whole chain is stored on exactly one margin of
//! one box, the chain's *owner*; every other margin in the chain reads
//! zero. Because the owner always sits physically above the margins that
//! join later (an earlier sibling's bottom, or an ancestor's top), the
//! vertical positions that fall out of stacking margin boxes are the
//! collapsed ones.

use crate::box_tree::{BoxId, BoxTree};

/// Running collapsed value of a set of adjoining margins.
///
/// "When two or more margins collapse, the resulting margin width is the
/// maximum of the collapsing margins' widths. In the case of negative
/// margins, the maximum of the absolute values of the negative adjoining
/// margins is deducted from the maximum of the positive adjoining margins.
/// If there are no positive margins, the maximum of the absolute values of
/// the adjoining margins is deducted from zero."
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollapsedMargin {
    positive: f32,
    negative: f32,
}

impl CollapsedMargin {
    /// A set holding the single margin `value`.
    #[must_use]
    pub fn new(value: f32) -> Self {
        let mut margin = Self::default();
        margin.adjoin(value);
        margin
    }

    /// Add one more margin to the set.
    pub fn adjoin(&mut self, value: f32) {
        if value >= 0.0 {
            self.positive = self.positive.max(value);
        } else {
            self.negative = self.negative.min(value);
        }
    }

    /// The collapsed margin width.
    #[must_use]
    pub fn value(self) -> f32 {
        self.positive + self.negative
    }
}

/// Which margin of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginSide {
    /// 'margin-top'
    Top,
    /// 'margin-bottom'
    Bottom,
}

/// One vertical margin of one box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginSlot {
    /// The box.
    pub id: BoxId,
    /// Its top or bottom margin.
    pub side: MarginSide,
}

impl MarginSlot {
    /// The top margin of `id`.
    #[must_use]
    pub const fn top(id: BoxId) -> Self {
        Self {
            id,
            side: MarginSide::Top,
        }
    }

    /// The bottom margin of `id`.
    #[must_use]
    pub const fn bottom(id: BoxId) -> Self {
        Self {
            id,
            side: MarginSide::Bottom,
        }
    }

    /// Used value currently stored in the slot.
    #[must_use]
    pub fn get(self, tree: &BoxTree) -> Option<f32> {
        let b = tree.get(self.id)?;
        Some(match self.side {
            MarginSide::Top => b.margin.top,
            MarginSide::Bottom => b.margin.bottom,
        })
    }

    /// Store `value` in the slot.
    pub fn set(self, tree: &mut BoxTree, value: f32) {
        if let Some(b) = tree.get_mut(self.id) {
            match self.side {
                MarginSide::Top => b.margin.top = value,
                MarginSide::Bottom => b.margin.bottom = value,
            }
        }
    }
}

/// The margins adjoining the current position of a formatting context,
/// not yet committed as vertical space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarginChain {
    /// Collapsed value of the chain.
    pub margin: CollapsedMargin,
    /// Margin holding the collapsed value.
    pub owner: Option<MarginSlot>,
}

/// State to go back to when a box turns out to generate nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginSnapshot {
    chain: MarginChain,
    owner_margin: Option<f32>,
}

impl MarginChain {
    /// Collapsed value of the chain.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.margin.value()
    }

    /// `true` when no margin adjoins the current position.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.owner.is_none()
    }

    /// Collapse the margin in `slot`, of used value `value`, into the chain.
    ///
    /// The slot reads zero afterwards unless it becomes the owner. A top
    /// margin always leaves the owner in place: the owner is above it. A
    /// bottom margin keeps an owner that is the top margin of the same box
    /// or of an ancestor (the box collapses through), and otherwise takes
    /// the collapsed value over from the previous owner.
    pub fn adjoin(&mut self, tree: &mut BoxTree, slot: MarginSlot, value: f32) {
        slot.set(tree, 0.0);
        self.margin.adjoin(value);
        let keep_owner = match (self.owner, slot.side) {
            (None, _) => false,
            (Some(_), MarginSide::Top) => true,
            (Some(owner), MarginSide::Bottom) => {
                owner.side == MarginSide::Top && is_inclusive_ancestor(tree, owner.id, slot.id)
            }
        };
        if !keep_owner {
            if let Some(previous) = self.owner {
                previous.set(tree, 0.0);
            }
            self.owner = Some(slot);
        }
        if let Some(owner) = self.owner {
            owner.set(tree, self.margin.value());
        }
    }

    /// [§ 8.3.1](https://www.w3.org/TR/CSS21/box.html#collapsing-margins)
    ///
    /// Collapse the top margin of `id` into the chain and return what is
    /// needed to take it back out.
    pub fn collapse_margin_top(&mut self, tree: &mut BoxTree, id: BoxId, value: f32) -> MarginSnapshot {
        let snapshot = MarginSnapshot {
            chain: *self,
            owner_margin: self.owner.and_then(|owner| owner.get(tree)),
        };
        self.adjoin(tree, MarginSlot::top(id), value);
        snapshot
    }

    /// Take back a [`MarginChain::collapse_margin_top`] for a box that is
    /// about to be dropped.
    pub fn undo_collapse_margin_top(&mut self, tree: &mut BoxTree, snapshot: MarginSnapshot) {
        *self = snapshot.chain;
        if let (Some(owner), Some(value)) = (self.owner, snapshot.owner_margin) {
            owner.set(tree, value);
        }
    }
}

fn is_inclusive_ancestor(tree: &BoxTree, ancestor: BoxId, id: BoxId) -> bool {
    let mut current = Some(id);
    while let Some(b) = current {
        if b == ancestor {
            return true;
        }
        current = tree.parent(b);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_tree::{BlockVariant, LayoutBox};

    fn tree_with(n: usize) -> (BoxTree, Vec<BoxId>) {
        let mut tree = BoxTree::new();
        let ids = (0..n)
            .map(|_| tree.alloc(LayoutBox::block(BlockVariant::Plain, None)))
            .collect();
        (tree, ids)
    }

    #[test]
    fn collapsed_value_mixes_signs() {
        let mut m = CollapsedMargin::new(20.0);
        m.adjoin(10.0);
        assert_eq!(m.value(), 20.0);
        m.adjoin(-5.0);
        m.adjoin(-8.0);
        assert_eq!(m.value(), 12.0);
        assert_eq!(CollapsedMargin::new(-4.0).value(), -4.0);
    }

    #[test]
    fn sibling_margins_end_up_on_the_upper_box() {
        let (mut tree, ids) = tree_with(2);
        let mut chain = MarginChain::default();
        chain.adjoin(&mut tree, MarginSlot::bottom(ids[0]), 10.0);
        let _ = chain.collapse_margin_top(&mut tree, ids[1], 20.0);
        assert_eq!(tree.get(ids[0]).unwrap().margin.bottom, 20.0);
        assert_eq!(tree.get(ids[1]).unwrap().margin.top, 0.0);
        assert_eq!(chain.value(), 20.0);
    }

    #[test]
    fn parent_bottom_takes_over_from_last_child() {
        let (mut tree, ids) = tree_with(2);
        let (parent, child) = (ids[0], ids[1]);
        tree.append_child(parent, child);
        let mut chain = MarginChain::default();
        chain.adjoin(&mut tree, MarginSlot::bottom(child), 15.0);
        chain.adjoin(&mut tree, MarginSlot::bottom(parent), 5.0);
        assert_eq!(tree.get(child).unwrap().margin.bottom, 0.0);
        assert_eq!(tree.get(parent).unwrap().margin.bottom, 15.0);
    }

    #[test]
    fn collapsing_through_keeps_the_ancestor_top() {
        let (mut tree, ids) = tree_with(2);
        let (parent, empty) = (ids[0], ids[1]);
        tree.append_child(parent, empty);
        let mut chain = MarginChain::default();
        let _ = chain.collapse_margin_top(&mut tree, parent, 4.0);
        let _ = chain.collapse_margin_top(&mut tree, empty, 9.0);
        chain.adjoin(&mut tree, MarginSlot::bottom(empty), 6.0);
        assert_eq!(chain.owner, Some(MarginSlot::top(parent)));
        assert_eq!(tree.get(parent).unwrap().margin.top, 9.0);
    }

    #[test]
    fn undo_restores_the_owner() {
        let (mut tree, ids) = tree_with(2);
        let mut chain = MarginChain::default();
        chain.adjoin(&mut tree, MarginSlot::bottom(ids[0]), 10.0);
        let snapshot = chain.collapse_margin_top(&mut tree, ids[1], 30.0);
        assert_eq!(tree.get(ids[0]).unwrap().margin.bottom, 30.0);
        chain.undo_collapse_margin_top(&mut tree, snapshot);
        assert_eq!(tree.get(ids[0]).unwrap().margin.bottom, 10.0);
        assert_eq!(chain.value(), 10.0);
    }

    #[test]
    fn collapsed_margin_sums_extremes() {
        let mut m = CollapsedMargin::new(10.0);
        m.adjoin(30.0);
        m.adjoin(-5.0);
        assert_eq!(m.value(), 25.0);
    }
}
