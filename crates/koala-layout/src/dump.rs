//! Textual box tree dump.
//!
//! One entry per box, indented by depth: its type and element, then its
//! geometry. Edges and extras that are all zero are left out.

use std::fmt::Write;

use crate::box_tree::{BoxId, BoxKind};
use crate::engine::LayoutEngine;
use crate::geometry::EdgeSizes;

fn is_zero(edges: &EdgeSizes) -> bool {
    edges.top == 0.0 && edges.right == 0.0 && edges.bottom == 0.0 && edges.left == 0.0
}

fn write_edges(out: &mut String, indent: &str, name: &str, edges: &EdgeSizes) {
    if !is_zero(edges) {
        let _ = writeln!(
            out,
            "{indent}  {name}: t={:.1} r={:.1} b={:.1} l={:.1}",
            edges.top, edges.right, edges.bottom, edges.left
        );
    }
}

impl LayoutEngine {
    /// The box tree as text, from the root box down.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root_box() {
            self.dump_box(&mut out, root, 0);
        }
        out
    }

    fn box_name(&self, id: BoxId) -> String {
        let Some(b) = self.tree().get(id) else {
            return String::from("?");
        };
        let element = b.node.map(|node| {
            self.content()
                .tag(node)
                .map_or_else(|| format!("{node}"), |tag| format!("<{tag}> ({node})"))
        });
        match &b.kind {
            BoxKind::Inline(inline) => match &inline.text {
                Some(text) => {
                    let preview: String = text.chars().take(30).collect();
                    let suffix = if text.chars().count() > 30 { "..." } else { "" };
                    format!("Text(\"{}{suffix}\")", preview.replace('\n', "\\n"))
                }
                None => element.unwrap_or_else(|| String::from("InlineBox")),
            },
            _ => element.unwrap_or_else(|| String::from("Anonymous")),
        }
    }

    fn dump_box(&self, out: &mut String, id: BoxId, depth: usize) {
        let Some(b) = self.tree().get(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let kind = match &b.kind {
            BoxKind::Block(data) => format!("{} {}", b.box_type(), data.display),
            _ => b.box_type().to_string(),
        };
        let _ = writeln!(out, "{indent}[{}] {kind} {id}", self.box_name(id));
        let _ = writeln!(
            out,
            "{indent}  x={:.1} y={:.1} w={:.1} h={:.1}",
            b.x, b.y, b.width, b.height
        );
        // Only clipping blocks record a scroll size.
        if let Some(data) = b.as_block().filter(|d| d.scroll_width > 0.0 || d.scroll_height > 0.0) {
            let _ = writeln!(
                out,
                "{indent}  scroll: w={:.1} h={:.1}",
                data.scroll_width, data.scroll_height
            );
        }
        if let Some(clearance) = b.clearance {
            let _ = writeln!(out, "{indent}  clearance: {clearance:.1}");
        }
        write_edges(out, &indent, "margin", &b.margin);
        write_edges(out, &indent, "padding", &b.padding);
        write_edges(out, &indent, "border", &b.border);
        if b.background.color != 0 {
            let _ = writeln!(out, "{indent}  background: #{:08x}", b.background.color);
        }
        let mut children = self.tree().children(id);
        if let Some(data) = b.as_block() {
            // Embedded boxes not attached to any line.
            children.extend(
                data.block_map
                    .values()
                    .copied()
                    .filter(|&e| self.tree().parent(e).is_none()),
            );
        }
        for child in children {
            self.dump_box(out, child, depth + 1);
        }
    }
}
