//! Integration tests for block width resolution and margin collapsing.

use koala_layout::{ComputedStyle, EdgeSizes, LayoutBox, LengthOrAuto, LoadedScene, Scene, SceneNode, Sides};

/// Helper: load a scene with an 800px wide viewport and lay it out once.
fn layout(root: SceneNode) -> LoadedScene {
    let mut scene = Scene::new(root);
    scene.config.viewport_width = 800.0;
    let mut loaded = scene.load().expect("scene should load");
    assert!(loaded.engine.tick(), "first tick lays out");
    loaded
}

fn block(name: &str, style: ComputedStyle, children: Vec<SceneNode>) -> SceneNode {
    SceneNode::element("div", style, children).named(name)
}

fn html(children: Vec<SceneNode>) -> SceneNode {
    SceneNode::element("html", ComputedStyle::block(), children)
}

fn get<'a>(loaded: &'a LoadedScene, name: &str) -> &'a LayoutBox {
    let node = loaded.node(name).expect("named element");
    loaded.engine.box_of(node).expect("element has a box")
}

fn margins(top: f32, bottom: f32) -> Sides<LengthOrAuto> {
    Sides {
        top: LengthOrAuto::px(top),
        right: LengthOrAuto::px(0.0),
        bottom: LengthOrAuto::px(bottom),
        left: LengthOrAuto::px(0.0),
    }
}

// ---------------------------------------------------------------------------
// Horizontal dimensions
//
// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS21/visudet.html#blockwidth)
// ---------------------------------------------------------------------------

/// "If 'width' is set to 'auto', any other 'auto' values become '0' and
/// 'width' follows from the resulting equality."
#[test]
fn auto_width_with_auto_margins_fills_the_containing_block() {
    let style = ComputedStyle {
        margin: Sides {
            left: LengthOrAuto::Auto,
            right: LengthOrAuto::Auto,
            ..margins(0.0, 0.0)
        },
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("a", style, vec![])]));
    let a = get(&loaded, "a");
    assert_eq!(a.width, 800.0);
    assert_eq!(a.margin.left, 0.0);
    assert_eq!(a.margin.right, 0.0);
}

/// "If both 'margin-left' and 'margin-right' are 'auto', their used values
/// are equal. This horizontally centers the element with respect to the
/// edges of the containing block."
#[test]
fn definite_width_with_auto_margins_is_centered() {
    let style = ComputedStyle {
        width: LengthOrAuto::px(200.0),
        margin: Sides {
            left: LengthOrAuto::Auto,
            right: LengthOrAuto::Auto,
            ..margins(0.0, 0.0)
        },
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("a", style, vec![])]));
    let a = get(&loaded, "a");
    assert_eq!(a.margin.left, 300.0);
    assert_eq!(a.margin.right, 300.0);
    assert_eq!(a.x, 0.0);
}

#[test]
fn padding_and_border_come_out_of_the_auto_width() {
    let style = ComputedStyle {
        padding: Sides::all(koala_layout::Length::Px(10.0)),
        border_width: Sides::all(5.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("a", style, vec![])]));
    let a = get(&loaded, "a");
    assert_eq!(a.width, 770.0);
    assert_eq!(a.padding, EdgeSizes::uniform(10.0));
    assert_eq!(a.border, EdgeSizes::uniform(5.0));
    assert_eq!(a.total_width(), 800.0);
}

#[test]
fn percentage_width_resolves_against_the_parent() {
    let outer = ComputedStyle {
        width: LengthOrAuto::px(400.0),
        ..ComputedStyle::block()
    };
    let inner = ComputedStyle {
        width: LengthOrAuto::percent(25.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("outer", outer, vec![block("inner", inner, vec![])])]));
    assert_eq!(get(&loaded, "inner").width, 100.0);
    // Over-constrained: margin-right absorbs the rest.
    assert_eq!(get(&loaded, "inner").margin.right, 300.0);
}

// ---------------------------------------------------------------------------
// Margin collapsing
//
// [§ 8.3.1 Collapsing margins](https://www.w3.org/TR/CSS21/box.html#collapsing-margins)
//
// "When two or more margins collapse, the resulting margin width is the
// maximum of the collapsing margins' widths."
// ---------------------------------------------------------------------------

/// Distance from the bottom border edge of `a` to the top border edge of `b`.
fn gap(a: &LayoutBox, b: &LayoutBox) -> f32 {
    let a_bottom = a.y + a.margin.top + a.border_height();
    let b_top = b.y + b.margin.top;
    b_top - a_bottom
}

#[test]
fn sibling_margins_collapse_to_the_larger() {
    let first = ComputedStyle {
        height: LengthOrAuto::px(50.0),
        margin: margins(0.0, 30.0),
        ..ComputedStyle::block()
    };
    let second = ComputedStyle {
        height: LengthOrAuto::px(50.0),
        margin: margins(10.0, 0.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("a", first, vec![]), block("b", second, vec![])]));
    assert!((gap(get(&loaded, "a"), get(&loaded, "b")) - 30.0).abs() < 0.01);
}

#[test]
fn sibling_margins_collapse_when_the_second_is_larger() {
    let first = ComputedStyle {
        height: LengthOrAuto::px(20.0),
        margin: margins(0.0, 10.0),
        ..ComputedStyle::block()
    };
    let second = ComputedStyle {
        height: LengthOrAuto::px(20.0),
        margin: margins(20.0, 0.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("a", first, vec![]), block("b", second, vec![])]));
    assert!((gap(get(&loaded, "a"), get(&loaded, "b")) - 20.0).abs() < 0.01);
}

#[test]
fn border_separates_parent_and_child_margins() {
    let parent = ComputedStyle {
        border_width: Sides::all(1.0),
        ..ComputedStyle::block()
    };
    let child = ComputedStyle {
        height: LengthOrAuto::px(10.0),
        margin: margins(20.0, 0.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("parent", parent, vec![block("child", child, vec![])])]));
    let parent = get(&loaded, "parent");
    let child = get(&loaded, "child");
    // The child's margin stays inside the parent's border.
    let parent_content_top = parent.y + parent.margin.top + parent.border.top;
    assert!((child.y + child.margin.top - parent_content_top - 20.0).abs() < 0.01);
    assert!((parent.height - 30.0).abs() < 0.01);
}

#[test]
fn empty_block_margins_collapse_through() {
    let first = ComputedStyle {
        height: LengthOrAuto::px(10.0),
        margin: margins(0.0, 10.0),
        ..ComputedStyle::block()
    };
    let empty = ComputedStyle {
        margin: margins(25.0, 5.0),
        ..ComputedStyle::block()
    };
    let last = ComputedStyle {
        height: LengthOrAuto::px(10.0),
        margin: margins(15.0, 0.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![
        block("a", first, vec![]),
        block("empty", empty, vec![]),
        block("b", last, vec![]),
    ]));
    assert!((gap(get(&loaded, "a"), get(&loaded, "b")) - 25.0).abs() < 0.01);
}

// ---------------------------------------------------------------------------
// Heights
// ---------------------------------------------------------------------------

#[test]
fn auto_height_wraps_the_line_boxes() {
    let loaded = layout(html(vec![block(
        "p",
        ComputedStyle::block(),
        vec![SceneNode::text("hello world")],
    )]));
    // One line of 16px text at line-height: normal (1.2).
    assert!((get(&loaded, "p").height - 19.2).abs() < 0.01);
}

#[test]
fn min_height_raises_an_auto_height() {
    let style = ComputedStyle {
        min_height: koala_layout::Length::Px(40.0),
        ..ComputedStyle::block()
    };
    let loaded = layout(html(vec![block("a", style, vec![SceneNode::text("x")])]));
    assert_eq!(get(&loaded, "a").height, 40.0);
}

#[test]
fn text_next_to_a_block_gets_an_anonymous_wrapper() {
    let loaded = layout(html(vec![
        SceneNode::text("before"),
        block("a", ComputedStyle::block(), vec![]),
    ]));
    let root = loaded.engine.root_box().expect("root box");
    let children = loaded.engine.tree().children(root);
    assert_eq!(children.len(), 2);
    let anonymous = loaded.engine.get_box(children[0]).unwrap();
    assert!(anonymous.is_anonymous());
    assert!((anonymous.height - 19.2).abs() < 0.01);
    assert!((get(&loaded, "a").y - 19.2).abs() < 0.01);
}

#[test]
fn whitespace_between_blocks_generates_nothing() {
    let loaded = layout(html(vec![
        block("a", ComputedStyle::block(), vec![]),
        SceneNode::text("\n   "),
        block("b", ComputedStyle::block(), vec![]),
    ]));
    let root = loaded.engine.root_box().expect("root box");
    assert_eq!(loaded.engine.tree().children(root).len(), 2);
}
