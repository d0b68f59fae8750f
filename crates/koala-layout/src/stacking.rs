//! Stacking contexts.
//!
//! [§ 9.9.1 Specifying the stack level: the 'z-index' property](https://www.w3.org/TR/CSS21/visuren.html#z-index)
//!
//! "The order in which the rendering tree is painted onto the canvas is
//! described in terms of stacking contexts. Stacking contexts can contain
//! further stacking contexts."
//!
//! Every positioned element gets a context here. One with `z-index: auto`
//! does not stack its positioned descendants: they are ordered in the
//! nearest ancestor context with an integer z-index (the *stacking
//! parent*). All contexts still form a tree through their plain parent,
//! which is what relative offsets accumulate along.

use serde::{Deserialize, Serialize};

use crate::box_tree::BoxId;
use crate::content::NodeId;

/// 'z-index'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZIndex {
    /// "The stack level of the generated box in the current stacking
    /// context is 0. The box does not establish a new stacking context."
    #[default]
    Auto,
    /// "This integer is the stack level of the generated box in the current
    /// stacking context. The box also establishes a new stacking context."
    #[serde(untagged)]
    Index(i32),
}

impl ZIndex {
    /// Stack level within the parent context.
    #[must_use]
    pub const fn level(self) -> i32 {
        match self {
            Self::Auto => 0,
            Self::Index(z) => z,
        }
    }
}

/// Handle of a context in a [`StackingTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackingContextId(usize);

#[derive(Debug, Clone)]
struct StackingContext {
    parent: Option<StackingContextId>,
    stacking_parent: Option<StackingContextId>,
    z: ZIndex,
    /// Creation order, for ties in stack level.
    order: usize,
    boxes: Vec<BoxId>,
    relative_x: f32,
    relative_y: f32,
    node: Option<NodeId>,
}

/// Arena of stacking contexts rooted at the root element's context.
#[derive(Debug, Clone)]
pub struct StackingTree {
    contexts: Vec<Option<StackingContext>>,
    next_order: usize,
}

impl Default for StackingTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StackingTree {
    /// A tree holding only the root context.
    #[must_use]
    pub fn new() -> Self {
        let root = StackingContext {
            parent: None,
            stacking_parent: None,
            z: ZIndex::Index(0),
            order: 0,
            boxes: Vec::new(),
            relative_x: 0.0,
            relative_y: 0.0,
            node: None,
        };
        Self {
            contexts: vec![Some(root)],
            next_order: 1,
        }
    }

    /// The root context.
    #[must_use]
    pub const fn root(&self) -> StackingContextId {
        StackingContextId(0)
    }

    fn get(&self, id: StackingContextId) -> Option<&StackingContext> {
        self.contexts.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: StackingContextId) -> Option<&mut StackingContext> {
        self.contexts.get_mut(id.0).and_then(Option::as_mut)
    }

    /// `true` when `id` has not been removed.
    #[must_use]
    pub fn contains(&self, id: StackingContextId) -> bool {
        self.get(id).is_some()
    }

    /// Create a context for the positioned element `node`, nested in
    /// `parent`.
    pub fn create(&mut self, parent: StackingContextId, z: ZIndex, node: NodeId) -> StackingContextId {
        let parent = if self.contains(parent) { parent } else { self.root() };
        let mut stacking_parent = Some(parent);
        while let Some(p) = stacking_parent {
            match self.get(p) {
                Some(ctx) if ctx.z == ZIndex::Auto => stacking_parent = ctx.parent,
                _ => break,
            }
        }
        let id = StackingContextId(self.contexts.len());
        self.contexts.push(Some(StackingContext {
            parent: Some(parent),
            stacking_parent,
            z,
            order: self.next_order,
            boxes: Vec::new(),
            relative_x: 0.0,
            relative_y: 0.0,
            node: Some(node),
        }));
        self.next_order += 1;
        id
    }

    /// Drop the context `id`. Contexts nested in it move to its parent.
    pub fn remove(&mut self, id: StackingContextId) {
        if id == self.root() {
            return;
        }
        let Some(removed) = self.contexts.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for ctx in self.contexts.iter_mut().flatten() {
            if ctx.parent == Some(id) {
                ctx.parent = removed.parent;
            }
            if ctx.stacking_parent == Some(id) {
                ctx.stacking_parent = removed.stacking_parent;
            }
        }
    }

    /// Register `b` as painting in `id`.
    pub fn add_box(&mut self, id: StackingContextId, b: BoxId) {
        if let Some(ctx) = self.get_mut(id) {
            if !ctx.boxes.contains(&b) {
                ctx.boxes.push(b);
            }
        }
    }

    /// Forget `b`.
    pub fn remove_box(&mut self, id: StackingContextId, b: BoxId) {
        if let Some(ctx) = self.get_mut(id) {
            ctx.boxes.retain(|&other| other != b);
        }
    }

    /// Boxes painting in `id`, in registration order.
    #[must_use]
    pub fn boxes(&self, id: StackingContextId) -> &[BoxId] {
        self.get(id).map_or(&[], |ctx| ctx.boxes.as_slice())
    }

    /// Element the context was created for.
    #[must_use]
    pub fn node(&self, id: StackingContextId) -> Option<NodeId> {
        self.get(id).and_then(|ctx| ctx.node)
    }

    /// 'z-index' of `id`.
    #[must_use]
    pub fn z_index(&self, id: StackingContextId) -> ZIndex {
        self.get(id).map_or(ZIndex::Auto, |ctx| ctx.z)
    }

    /// Context that orders `id` among its siblings.
    #[must_use]
    pub fn stacking_parent(&self, id: StackingContextId) -> Option<StackingContextId> {
        self.get(id).and_then(|ctx| ctx.stacking_parent)
    }

    /// Set the relative position offset carried by `id`.
    pub fn set_relative(&mut self, id: StackingContextId, x: f32, y: f32) {
        if let Some(ctx) = self.get_mut(id) {
            ctx.relative_x = x;
            ctx.relative_y = y;
        }
    }

    /// Sum of the relative offsets of `id` and every enclosing context.
    #[must_use]
    pub fn paint_offset(&self, id: StackingContextId) -> (f32, f32) {
        let mut offset = (0.0, 0.0);
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(ctx) = self.get(c) else {
                break;
            };
            offset.0 += ctx.relative_x;
            offset.1 += ctx.relative_y;
            current = ctx.parent;
        }
        offset
    }

    /// [Appendix E. Elaborate description of Stacking Contexts](https://www.w3.org/TR/CSS21/zindex.html)
    ///
    /// Contexts in painting order: for each context, its stacked children
    /// with negative levels, the context itself, then children with zero or
    /// `auto` level and those with positive levels. Equal levels paint in
    /// creation order.
    #[must_use]
    pub fn paint_order(&self) -> Vec<StackingContextId> {
        let mut out = Vec::new();
        self.paint_into(self.root(), &mut out);
        out
    }

    fn paint_into(&self, id: StackingContextId, out: &mut Vec<StackingContextId>) {
        let mut children: Vec<(i32, usize, StackingContextId)> = self
            .contexts
            .iter()
            .enumerate()
            .filter_map(|(index, ctx)| {
                let ctx = ctx.as_ref()?;
                (ctx.stacking_parent == Some(id) && index != id.0)
                    .then_some((ctx.z.level(), ctx.order, StackingContextId(index)))
            })
            .collect();
        children.sort_by_key(|&(level, order, _)| (level, order));
        let (negative, rest): (Vec<_>, Vec<_>) = children.into_iter().partition(|&(level, ..)| level < 0);
        for (.., child) in negative {
            self.paint_into(child, out);
        }
        out.push(id);
        for (.., child) in rest {
            self.paint_into(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_index_parses_auto_or_integer() {
        let auto: ZIndex = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(auto, ZIndex::Auto);
        let index: ZIndex = serde_json::from_str("-3").unwrap();
        assert_eq!(index, ZIndex::Index(-3));
    }

    #[test]
    fn paint_order_sorts_by_level_then_creation() {
        let mut tree = StackingTree::new();
        let root = tree.root();
        let a = tree.create(root, ZIndex::Index(2), NodeId(1));
        let b = tree.create(root, ZIndex::Index(-1), NodeId(2));
        let c = tree.create(root, ZIndex::Auto, NodeId(3));
        let d = tree.create(root, ZIndex::Index(2), NodeId(4));
        assert_eq!(tree.paint_order(), vec![b, root, c, a, d]);
    }

    #[test]
    fn auto_contexts_do_not_stack_their_descendants() {
        let mut tree = StackingTree::new();
        let root = tree.root();
        let auto = tree.create(root, ZIndex::Auto, NodeId(1));
        let inner = tree.create(auto, ZIndex::Index(-1), NodeId(2));
        assert_eq!(tree.stacking_parent(inner), Some(root));
        assert_eq!(tree.paint_order(), vec![inner, root, auto]);
    }

    #[test]
    fn relative_offsets_accumulate() {
        let mut tree = StackingTree::new();
        let root = tree.root();
        let outer = tree.create(root, ZIndex::Auto, NodeId(1));
        let inner = tree.create(outer, ZIndex::Index(1), NodeId(2));
        tree.set_relative(outer, 10.0, 5.0);
        tree.set_relative(inner, 1.0, 1.0);
        assert_eq!(tree.paint_offset(inner), (11.0, 6.0));

        tree.remove(outer);
        assert_eq!(tree.paint_offset(inner), (1.0, 1.0));
        assert!(!tree.contains(outer));
    }
}
