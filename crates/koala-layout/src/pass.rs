//! State shared by every step of one layout pass.
//!
//! A [`LayoutPass`] borrows everything the engine owns for the duration of
//! one top-level layout and carries the algorithms as methods, split over
//! the modules that implement them (`block`, `inline`, `float`, `table`,
//! `positioned`, `placement`).

use crate::background::ImageRequests;
use crate::box_tree::{BoxId, BoxTree, LayoutBox};
use crate::config::LayoutConfig;
use crate::content::ContentTree;
use crate::geometry::ContainingBlock;
use crate::inline::FontMetrics;
use crate::stacking::StackingTree;
use crate::style::{ResolvedStyle, StyleMap};

/// Work counters of the last layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
    /// Blocks whose layout ran.
    pub blocks_laid_out: usize,
    /// Blocks whose previous geometry was reused.
    pub blocks_skipped: usize,
}

/// Borrowed engine state for one pass.
pub(crate) struct LayoutPass<'a> {
    pub tree: &'a mut BoxTree,
    pub styles: &'a mut StyleMap,
    pub content: &'a ContentTree,
    pub stacking: &'a mut StackingTree,
    pub images: &'a mut ImageRequests,
    pub metrics: &'a dyn FontMetrics,
    pub config: &'a LayoutConfig,
    pub stats: &'a mut LayoutStats,
}

impl LayoutPass<'_> {
    /// Resolve the style of `id` against `cb`, folding what changed into
    /// the box's flags. Anonymous boxes resolve to all zeros.
    pub(crate) fn resolve_box(&mut self, id: BoxId, cb: ContainingBlock) -> ResolvedStyle {
        let Some(node) = self.tree.get(id).and_then(|b| b.node) else {
            return ResolvedStyle::anonymous();
        };
        let changed = self.styles.resolve(node, cb);
        if let Some(b) = self.tree.get_mut(id) {
            b.flags |= changed;
        }
        self.styles
            .resolved(node)
            .unwrap_or_else(ResolvedStyle::anonymous)
    }

    /// Destroy `id` with its subtree and release what the boxes held.
    pub(crate) fn destroy_box(&mut self, id: BoxId) {
        let destroyed = self.tree.destroy(id, self.styles);
        self.release(destroyed);
    }

    /// Destroy the children of `id`.
    pub(crate) fn destroy_children(&mut self, id: BoxId) {
        let destroyed = self.tree.remove_descendants(id, self.styles);
        self.release(destroyed);
    }

    fn release(&mut self, destroyed: Vec<(BoxId, LayoutBox)>) {
        for (id, b) in destroyed {
            if let Some(request) = b.background.request {
                self.images.detach(request);
            }
            if let Some(context) = b.stacking_context {
                self.stacking.remove_box(context, id);
            }
        }
    }

    /// Height of the content of `id`: its children stacked one after the
    /// other, each with its margin box and clearance.
    #[must_use]
    pub(crate) fn content_height(&self, id: BoxId) -> f32 {
        self.tree
            .children(id)
            .into_iter()
            .filter_map(|child| self.tree.get(child))
            .map(|c| c.total_height() + c.clearance_or_zero())
            .sum()
    }

    /// The containing block `id` forms for its children.
    #[must_use]
    pub(crate) fn child_containing_block(&self, id: BoxId, resolved: &ResolvedStyle) -> ContainingBlock {
        let width = self.tree.get(id).map_or(0.0, |b| b.width);
        match resolved.height.length() {
            Some(height) => ContainingBlock::new(width, height.max(0.0)),
            None => ContainingBlock::with_auto_height(width, 0.0),
        }
    }

    /// Count a block whose layout ran.
    pub(crate) fn count_laid_out(&mut self) {
        self.stats.blocks_laid_out += 1;
    }

    /// Count a block whose previous geometry was reused.
    pub(crate) fn count_skipped(&mut self, id: BoxId) {
        log::debug!("skip reflow for {id}");
        self.stats.blocks_skipped += 1;
    }
}
