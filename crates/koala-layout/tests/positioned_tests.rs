//! Integration tests for relative, absolute and fixed positioning and for
//! stacking order.
//!
//! [§ 9.3 Positioning schemes](https://www.w3.org/TR/CSS21/visuren.html#positioning-scheme)

use koala_layout::{
    ComputedStyle, LayoutBox, LengthOrAuto, LoadedScene, PositionType, Scene, SceneNode, Sides, ZIndex,
};

fn layout(children: Vec<SceneNode>) -> LoadedScene {
    let mut scene = Scene::new(SceneNode::element("html", ComputedStyle::block(), children));
    scene.config.viewport_width = 800.0;
    scene.config.viewport_height = 600.0;
    let mut loaded = scene.load().expect("scene should load");
    let _ = loaded.engine.tick();
    loaded
}

fn get<'a>(loaded: &'a LoadedScene, name: &str) -> &'a LayoutBox {
    let node = loaded.node(name).expect("named element");
    loaded.engine.box_of(node).expect("element has a box")
}

/// `top right bottom left`, `None` for `auto`.
fn inset(top: Option<f32>, right: Option<f32>, bottom: Option<f32>, left: Option<f32>) -> Sides<LengthOrAuto> {
    let side = |v: Option<f32>| v.map_or(LengthOrAuto::Auto, LengthOrAuto::px);
    Sides {
        top: side(top),
        right: side(right),
        bottom: side(bottom),
        left: side(left),
    }
}

fn sized(position: PositionType, width: LengthOrAuto, height: f32) -> ComputedStyle {
    ComputedStyle {
        position,
        width,
        height: LengthOrAuto::px(height),
        ..ComputedStyle::block()
    }
}

fn container(children: Vec<SceneNode>) -> SceneNode {
    SceneNode::element(
        "div",
        sized(PositionType::Relative, LengthOrAuto::px(400.0), 100.0),
        children,
    )
    .named("container")
}

// ---------------------------------------------------------------------------
// Absolute positioning
//
// [§ 10.3.7](https://www.w3.org/TR/CSS21/visudet.html#abs-non-replaced-width)
// [§ 10.6.4](https://www.w3.org/TR/CSS21/visudet.html#abs-non-replaced-height)
// ---------------------------------------------------------------------------

#[test]
fn absolute_box_is_placed_from_its_positioned_ancestor() {
    let abs = ComputedStyle {
        inset: inset(Some(30.0), None, None, Some(20.0)),
        ..sized(PositionType::Absolute, LengthOrAuto::px(50.0), 40.0)
    };
    let loaded = layout(vec![
        SceneNode::element("div", sized(PositionType::Static, LengthOrAuto::Auto, 15.0), vec![]),
        container(vec![SceneNode::element("div", abs, vec![]).named("abs")]),
    ]);
    let abs = get(&loaded, "abs");
    let container = get(&loaded, "container");
    assert_eq!(container.y, 15.0);
    assert!((abs.x - 20.0).abs() < 0.01);
    assert!((abs.y - 45.0).abs() < 0.01, "top is measured from the container, got {}", abs.y);
    assert_eq!(abs.width, 50.0);
    assert_eq!(abs.height, 40.0);
}

/// "'left' and 'width' are 'auto' and 'right' is not 'auto', then the width
/// is shrink-to-fit. Then solve for 'left'". Here only 'left' is auto.
#[test]
fn right_and_bottom_anchor_against_the_far_edges() {
    let abs = ComputedStyle {
        inset: inset(None, Some(10.0), Some(10.0), None),
        ..sized(PositionType::Absolute, LengthOrAuto::px(50.0), 40.0)
    };
    let loaded = layout(vec![container(vec![SceneNode::element("div", abs, vec![]).named("abs")])]);
    let abs = get(&loaded, "abs");
    assert!((abs.x - 340.0).abs() < 0.01);
    assert!((abs.y - 50.0).abs() < 0.01);
}

#[test]
fn auto_width_between_left_and_right_follows_from_the_equation() {
    let abs = ComputedStyle {
        inset: inset(Some(0.0), Some(30.0), None, Some(20.0)),
        ..sized(PositionType::Absolute, LengthOrAuto::Auto, 10.0)
    };
    let loaded = layout(vec![container(vec![SceneNode::element("div", abs, vec![]).named("abs")])]);
    assert!((get(&loaded, "abs").width - 350.0).abs() < 0.01);
}

/// With every offset `auto` the box sits at its static position.
#[test]
fn all_auto_offsets_use_the_static_position() {
    let abs = sized(PositionType::Absolute, LengthOrAuto::px(10.0), 10.0);
    let loaded = layout(vec![
        SceneNode::element("div", sized(PositionType::Static, LengthOrAuto::Auto, 50.0), vec![]).named("first"),
        SceneNode::element("div", abs, vec![]).named("abs"),
        SceneNode::element("div", sized(PositionType::Static, LengthOrAuto::Auto, 20.0), vec![]).named("last"),
    ]);
    let abs = get(&loaded, "abs");
    assert!(abs.x.abs() < 0.01);
    assert!((abs.y - 50.0).abs() < 0.01, "static position follows the first block, got {}", abs.y);
    // Out of flow: the next block follows the first directly.
    assert!((get(&loaded, "last").y - 50.0).abs() < 0.01);
}

/// [§ 10.1](https://www.w3.org/TR/CSS21/visudet.html#containing-block-details)
/// "If the element has 'position: fixed', the containing block is
/// established by the viewport."
#[test]
fn fixed_box_ignores_positioned_ancestors() {
    let offset = inset(Some(7.0), None, None, Some(5.0));
    let abs = ComputedStyle {
        inset: offset,
        ..sized(PositionType::Absolute, LengthOrAuto::px(10.0), 10.0)
    };
    let fixed = ComputedStyle {
        inset: offset,
        ..sized(PositionType::Fixed, LengthOrAuto::px(10.0), 10.0)
    };
    let shifted = ComputedStyle {
        margin: Sides {
            left: LengthOrAuto::px(100.0),
            ..Sides::all(LengthOrAuto::px(0.0))
        },
        ..sized(PositionType::Relative, LengthOrAuto::px(200.0), 100.0)
    };
    let loaded = layout(vec![SceneNode::element(
        "div",
        shifted,
        vec![
            SceneNode::element("div", abs, vec![]).named("abs"),
            SceneNode::element("div", fixed, vec![]).named("fixed"),
        ],
    )]);
    assert!((get(&loaded, "abs").x - 105.0).abs() < 0.01);
    assert!((get(&loaded, "fixed").x - 5.0).abs() < 0.01);
    assert!((get(&loaded, "fixed").y - 7.0).abs() < 0.01);
}

// ---------------------------------------------------------------------------
// Relative positioning
//
// [§ 9.4.3](https://www.w3.org/TR/CSS21/visuren.html#relative-positioning)
// ---------------------------------------------------------------------------

/// "Once a box has been laid out according to the normal flow or floated,
/// it may be shifted relative to this position." The shift shows in the
/// paint origin; following boxes are not affected.
#[test]
fn relative_offset_moves_only_the_painted_box() {
    let relative = ComputedStyle {
        inset: inset(Some(5.0), None, None, Some(10.0)),
        ..sized(PositionType::Relative, LengthOrAuto::Auto, 20.0)
    };
    let loaded = layout(vec![
        SceneNode::element(
            "div",
            relative,
            vec![SceneNode::element("div", sized(PositionType::Static, LengthOrAuto::Auto, 10.0), vec![]).named("inner")],
        )
        .named("rel"),
        SceneNode::element("div", sized(PositionType::Static, LengthOrAuto::Auto, 10.0), vec![]).named("next"),
    ]);
    let rel = loaded.engine.styles().get_box(loaded.node("rel").unwrap()).unwrap();
    let inner = loaded.engine.styles().get_box(loaded.node("inner").unwrap()).unwrap();

    assert_eq!(get(&loaded, "rel").y, 0.0);
    assert_eq!(loaded.engine.paint_origin(rel).unwrap(), (10.0, 5.0));
    // Descendants move with it.
    assert_eq!(loaded.engine.paint_origin(inner).unwrap(), (10.0, 5.0));
    assert_eq!(get(&loaded, "next").y, 20.0);
}

/// "right: -left" when both are given.
#[test]
fn left_wins_over_right_when_both_are_set() {
    let relative = ComputedStyle {
        inset: inset(None, Some(30.0), None, Some(10.0)),
        ..sized(PositionType::Relative, LengthOrAuto::Auto, 20.0)
    };
    let loaded = layout(vec![SceneNode::element("div", relative, vec![]).named("rel")]);
    let rel = loaded.engine.styles().get_box(loaded.node("rel").unwrap()).unwrap();
    assert_eq!(loaded.engine.paint_origin(rel).unwrap().0, 10.0);
}

// ---------------------------------------------------------------------------
// Stacking
//
// [Appendix E](https://www.w3.org/TR/CSS21/zindex.html)
// ---------------------------------------------------------------------------

#[test]
fn paint_order_follows_stack_levels() {
    let layer = |z: ZIndex| ComputedStyle {
        z_index: z,
        ..sized(PositionType::Absolute, LengthOrAuto::px(10.0), 10.0)
    };
    let loaded = layout(vec![
        SceneNode::element("div", layer(ZIndex::Index(2)), vec![]).named("top"),
        SceneNode::element("div", layer(ZIndex::Index(-1)), vec![]).named("below"),
        SceneNode::element("div", layer(ZIndex::Auto), vec![]).named("auto"),
    ]);
    let stacking = loaded.engine.stacking();
    let order: Vec<_> = loaded
        .engine
        .paint_order()
        .into_iter()
        .map(|ctx| stacking.node(ctx))
        .collect();
    let named = |name: &str| Some(loaded.node(name).unwrap());
    assert_eq!(order, vec![named("below"), None, named("auto"), named("top")]);
}
