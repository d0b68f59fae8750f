//! The layout engine.
//!
//! [`LayoutEngine`] owns the inputs of layout (content tree and computed
//! styles) and its outputs (box tree, stacking contexts, background image
//! requests). Mutations mark the affected boxes dirty; the next
//! [`LayoutEngine::tick`] lays out only what they reach.

use koala_common::image::ImageSource;

use crate::background::ImageRequests;
use crate::box_tree::{BoxId, BoxTree, InlineItem, LayoutBox};
use crate::config::LayoutConfig;
use crate::content::{ContentTree, NodeId};
use crate::error::{LayoutError, Result};
use crate::flags::LayoutFlags;
use crate::inline::{ApproximateFontMetrics, FontMetrics};
use crate::pass::{LayoutPass, LayoutStats};
use crate::stacking::{StackingContextId, StackingTree};
use crate::style::{ComputedStyle, StyleMap};

/// Incremental layout of one document.
pub struct LayoutEngine {
    content: ContentTree,
    styles: StyleMap,
    tree: BoxTree,
    stacking: StackingTree,
    images: ImageRequests,
    metrics: Box<dyn FontMetrics>,
    config: LayoutConfig,
    stats: LayoutStats,
    /// Boxes must be generated from scratch on the next pass.
    rebuild: bool,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("config", &self.config)
            .field("boxes", &self.tree.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Properties whose change alters which boxes an element generates, or
/// the text properties its anonymous boxes inherit.
fn generates_different_boxes(old: &ComputedStyle, new: &ComputedStyle) -> bool {
    old.display != new.display
        || old.position != new.position
        || old.float != new.float
        || old.z_index != new.z_index
        || old.replaced.is_some() != new.replaced.is_some()
        || old.overflow != new.overflow
        || old.column_span != new.column_span
        || old.border_spacing != new.border_spacing
        || old.text_align != new.text_align
        || old.white_space != new.white_space
        || old.font_size != new.font_size
        || old.line_height != new.line_height
        || old.direction != new.direction
}

impl LayoutEngine {
    /// An engine for an empty document, requesting images through
    /// `images`.
    #[must_use]
    pub fn new(config: LayoutConfig, images: Box<dyn ImageSource>) -> Self {
        Self {
            content: ContentTree::new(),
            styles: StyleMap::new(),
            tree: BoxTree::new(),
            stacking: StackingTree::new(),
            images: ImageRequests::new(images),
            metrics: Box::new(ApproximateFontMetrics),
            config,
            stats: LayoutStats::default(),
            rebuild: true,
        }
    }

    /// Measure text with `metrics` instead of the approximate metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Box<dyn FontMetrics>) -> Self {
        self.metrics = metrics;
        self.rebuild = true;
        self
    }

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The content tree.
    #[must_use]
    pub const fn content(&self) -> &ContentTree {
        &self.content
    }

    /// The box tree as of the last pass.
    #[must_use]
    pub const fn tree(&self) -> &BoxTree {
        &self.tree
    }

    /// The stacking contexts.
    #[must_use]
    pub const fn stacking(&self) -> &StackingTree {
        &self.stacking
    }

    /// Computed and resolved styles.
    #[must_use]
    pub const fn styles(&self) -> &StyleMap {
        &self.styles
    }

    /// Work counters of the last pass.
    #[must_use]
    pub const fn stats(&self) -> LayoutStats {
        self.stats
    }

    /// Background image requests still in flight.
    #[must_use]
    pub const fn load_delay_count(&self) -> usize {
        self.images.load_delay_count()
    }

    /// The root box, if any was generated.
    #[must_use]
    pub const fn root_box(&self) -> Option<BoxId> {
        self.tree.root()
    }

    /// Look up a box by handle.
    ///
    /// # Errors
    ///
    /// [`LayoutError::StaleBox`] when the box was destroyed.
    pub fn get_box(&self, id: BoxId) -> Result<&LayoutBox> {
        self.tree.get(id).ok_or(LayoutError::StaleBox(id))
    }

    /// The principal box of `node`.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownNode`] when `node` generated no box.
    pub fn box_of(&self, node: NodeId) -> Result<&LayoutBox> {
        self.styles
            .get_box(node)
            .and_then(|id| self.tree.get(id))
            .ok_or(LayoutError::UnknownNode(node))
    }

    /// Where painting puts the margin box of `id`: its position with the
    /// relative offsets of every enclosing stacking context.
    ///
    /// # Errors
    ///
    /// [`LayoutError::StaleBox`] when the box was destroyed.
    pub fn paint_origin(&self, id: BoxId) -> Result<(f32, f32)> {
        let b = self.get_box(id)?;
        let (dx, dy) = b
            .stacking_context
            .map_or((0.0, 0.0), |ctx| self.stacking.paint_offset(ctx));
        Ok((b.x + dx, b.y + dy))
    }

    /// Stacking contexts in painting order.
    #[must_use]
    pub fn paint_order(&self) -> Vec<StackingContextId> {
        self.stacking.paint_order()
    }

    /// Add an element with its computed style. It stays detached until
    /// [`LayoutEngine::append_content`] inserts it.
    pub fn create_element(&mut self, tag: impl Into<String>, style: ComputedStyle) -> NodeId {
        let node = self.content.create_element(tag);
        let _ = self.styles.set(node, style);
        node
    }

    /// Add a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.content.create_text(text)
    }

    /// Something must be laid out on the next tick.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        if self.rebuild {
            return self.content.root_element().is_some() || self.tree.root().is_some();
        }
        self.tree.root().and_then(|root| self.tree.get(root)).is_some_and(|b| {
            b.flags.intersects(
                LayoutFlags::ANY_REFLOW | LayoutFlags::NEED_EXPANSION | LayoutFlags::NEED_CHILD_EXPANSION,
            )
        })
    }

    /// One turn of the event loop: apply delivered image completions, then
    /// lay out if anything is dirty. Returns whether a pass ran.
    pub fn tick(&mut self) -> bool {
        let delivered = self.images.deliver(&mut self.tree);
        if delivered > 0 {
            log::trace!("{delivered} image completions applied");
        }
        if !self.is_dirty() {
            return false;
        }
        self.layout();
        true
    }

    /// Run one full layout pass now.
    pub fn layout(&mut self) {
        self.stats = LayoutStats::default();
        if self.rebuild {
            if let Some(root) = self.tree.root() {
                self.tree.set_flags(root, LayoutFlags::NEED_EXPANSION);
            }
            self.rebuild = false;
        }
        let mut pass = LayoutPass {
            tree: &mut self.tree,
            styles: &mut self.styles,
            content: &self.content,
            stacking: &mut self.stacking,
            images: &mut self.images,
            metrics: self.metrics.as_ref(),
            config: &self.config,
            stats: &mut self.stats,
        };
        pass.build();
        let Some(root) = pass.tree.root() else {
            return;
        };
        pass.layout_root(root);
        pass.resolve_xy(root, 0.0, 0.0);
        pass.place_absolutes(root);
        pass.update_scroll_sizes(root, None);
        pass.tree.clear_flags(root, LayoutFlags::all());
        log::debug!(
            "layout pass: {} blocks laid out, {} skipped",
            self.stats.blocks_laid_out,
            self.stats.blocks_skipped
        );
        #[cfg(feature = "layout-trace")]
        log::trace!("box tree after layout:\n{}", self.dump());
    }

    /// Replace the computed style of `node` and mark what the change
    /// affects.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownNode`] when `node` is not an element.
    pub fn set_style(&mut self, node: NodeId, style: ComputedStyle) -> Result<()> {
        if !self.content.is_element(node) {
            return Err(LayoutError::UnknownNode(node));
        }
        let Some(previous) = self.styles.set(node, style.clone()) else {
            self.mark_expansion(node);
            return Ok(());
        };
        if previous == style {
            return Ok(());
        }
        if generates_different_boxes(&previous, &style) {
            if previous.position != style.position || previous.z_index != style.z_index {
                self.drop_contexts(node);
            }
            self.mark_expansion(node);
            return Ok(());
        }
        let inset_only = ComputedStyle {
            inset: previous.inset,
            ..style
        } == previous;
        let flag = if inset_only {
            LayoutFlags::NEED_REPOSITION
        } else {
            LayoutFlags::NEED_REFLOW
        };
        let boxes = self
            .styles
            .entry(node)
            .map(|entry| entry.boxes.clone())
            .unwrap_or_default();
        if boxes.is_empty() {
            // An inline element: the blocks holding its content reflow.
            let owners = self.inline_owners(node, InlineItem::Open(node));
            if owners.is_empty() {
                self.mark_expansion(node);
            }
            for owner in owners {
                self.tree.set_flags(owner, LayoutFlags::NEED_REFLOW);
            }
        } else {
            for id in boxes {
                self.tree.set_flags(id, flag);
            }
        }
        Ok(())
    }

    /// Replace the data of the text node `node`.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownNode`] when `node` is not a text node.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<()> {
        if !self.content.set_text(node, text) {
            return Err(LayoutError::UnknownNode(node));
        }
        let owners = self.inline_owners(node, InlineItem::Text(node));
        if owners.is_empty() {
            self.mark_expansion(node);
        }
        for owner in owners {
            self.tree.set_flags(owner, LayoutFlags::NEED_REFLOW);
        }
        Ok(())
    }

    /// Append `child` to `parent` in the content tree.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownNode`] when either node does not exist, and
    /// [`LayoutError::MissingStyle`] when an element in `child`'s subtree
    /// has no computed style.
    pub fn append_content(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.content.get(parent).is_none() {
            return Err(LayoutError::UnknownNode(parent));
        }
        if self.content.get(child).is_none() {
            return Err(LayoutError::UnknownNode(child));
        }
        self.check_styles(child)?;
        self.content.append_child(parent, child);
        if parent == NodeId::ROOT {
            self.rebuild = true;
            return Ok(());
        }
        let container = self.styles.get_box(parent).filter(|&id| {
            self.tree
                .get(id)
                .is_some_and(|b| !b.flags.contains(LayoutFlags::NEED_EXPANSION))
        });
        let appended = container.is_some_and(|container| {
            let mut pass = LayoutPass {
                tree: &mut self.tree,
                styles: &mut self.styles,
                content: &self.content,
                stacking: &mut self.stacking,
                images: &mut self.images,
                metrics: self.metrics.as_ref(),
                config: &self.config,
                stats: &mut self.stats,
            };
            pass.append_to_container(container, child)
        });
        if !appended {
            self.mark_expansion(child);
        }
        Ok(())
    }

    fn check_styles(&self, node: NodeId) -> Result<()> {
        if self.content.is_element(node) && self.styles.computed(node).is_none() {
            return Err(LayoutError::MissingStyle(node));
        }
        for &child in self.content.children(node) {
            self.check_styles(child)?;
        }
        Ok(())
    }

    /// Remove `node` with its subtree from the content tree.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownNode`] when `node` is not attached.
    pub fn remove_content(&mut self, node: NodeId) -> Result<()> {
        if self.content.parent(node).is_none() {
            return Err(LayoutError::UnknownNode(node));
        }
        // Mark before detaching: the container is found through the parent.
        self.mark_expansion(node);
        self.drop_contexts(node);
        self.content.detach(node);
        self.forget_styles(node);
        Ok(())
    }

    fn forget_styles(&mut self, node: NodeId) {
        let children = self.content.children(node).to_vec();
        let _ = self.styles.remove(node);
        for child in children {
            self.forget_styles(child);
        }
    }

    /// Remove the stacking contexts of the elements of `node`'s subtree.
    fn drop_contexts(&mut self, node: NodeId) {
        if let Some(entry) = self.styles.entry_mut(node) {
            if let Some(context) = entry.stacking_context.take() {
                self.stacking.remove(context);
            }
        }
        let children = self.content.children(node).to_vec();
        for child in children {
            self.drop_contexts(child);
        }
    }

    /// Nearest inclusive ancestor element of `node` that has a box, with
    /// that box.
    fn container_of(&self, node: NodeId) -> Option<BoxId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(id) = self.styles.get_box(n).filter(|&id| self.tree.contains(id)) {
                return Some(id);
            }
            current = self.content.parent(n);
        }
        None
    }

    /// Regenerate the boxes of the element containing `node`.
    fn mark_expansion(&mut self, node: NodeId) {
        let parent = self.content.parent(node);
        let container = parent.and_then(|p| self.container_of(p));
        match container {
            Some(id) => {
                log::trace!("{node} changed structure, regenerate {id}");
                self.tree.set_flags(id, LayoutFlags::NEED_EXPANSION);
            }
            None => self.rebuild = true,
        }
    }

    /// Blocks whose inline content lists `item`: the block of the nearest
    /// ancestor with a box, or its anonymous children.
    fn inline_owners(&self, node: NodeId, item: InlineItem) -> Vec<BoxId> {
        let Some(container) = self.content.parent(node).and_then(|p| self.container_of(p)) else {
            return Vec::new();
        };
        let mut candidates = vec![container];
        candidates.extend(
            self.tree
                .children(container)
                .into_iter()
                .filter(|&c| self.tree.get(c).is_some_and(LayoutBox::is_anonymous)),
        );
        candidates
            .into_iter()
            .filter(|&id| self.tree.block(id).is_some_and(|data| data.inlines.contains(&item)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use koala_common::image::StaticImageSource;

    use super::*;
    use crate::style::Display;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig::default(), Box::new(StaticImageSource::new()))
    }

    #[test]
    fn missing_style_is_rejected() {
        let mut engine = engine();
        let orphan = engine.content.create_element("div");
        assert!(matches!(
            engine.append_content(NodeId::ROOT, orphan),
            Err(LayoutError::MissingStyle(_))
        ));
    }

    #[test]
    fn empty_document_lays_out_nothing() {
        let mut engine = engine();
        assert!(!engine.tick());
        assert!(engine.root_box().is_none());
    }

    #[test]
    fn display_change_regenerates_the_container() {
        let mut engine = engine();
        let root = engine.create_element("html", ComputedStyle::block());
        engine.append_content(NodeId::ROOT, root).unwrap();
        let child = engine.create_element("p", ComputedStyle::block());
        engine.append_content(root, child).unwrap();
        assert!(engine.tick());
        let before = engine.box_of(child).map(|b| b.height).unwrap();
        assert_eq!(before, 0.0);

        let hidden = ComputedStyle {
            display: Display::None,
            ..ComputedStyle::block()
        };
        engine.set_style(child, hidden).unwrap();
        assert!(engine.is_dirty());
        assert!(engine.tick());
        assert!(engine.box_of(child).is_err());
    }

    #[test]
    fn style_change_that_changes_nothing_stays_clean() {
        let mut engine = engine();
        let root = engine.create_element("html", ComputedStyle::block());
        engine.append_content(NodeId::ROOT, root).unwrap();
        assert!(engine.tick());
        engine.set_style(root, ComputedStyle::block()).unwrap();
        assert!(!engine.is_dirty());
    }
}
