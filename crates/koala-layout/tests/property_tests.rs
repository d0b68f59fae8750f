//! Property tests for the width equations.

use koala_layout::{AutoOr, ComputedStyle, FloatSide, LengthOrAuto, Scene, SceneNode, WidthConstraint, solve_block_width};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

/// Small non-negative pixel value from a generated integer.
fn px(v: u16) -> f32 {
    f32::from(v % 2000) / 2.0
}

fn auto_or(v: Option<u16>) -> AutoOr {
    v.map_or(AutoOr::Auto, |v| AutoOr::Length(px(v)))
}

/// [§ 10.3.3](https://www.w3.org/TR/CSS21/visudet.html#blockwidth)
/// Whatever is auto or over-constrained, the used margins, borders,
/// padding and width add up to the containing block.
#[quickcheck]
fn used_widths_fill_the_containing_block(
    available: u16,
    margin_left: Option<u16>,
    margin_right: Option<u16>,
    width: Option<u16>,
    border_padding: u16,
    min_width: u16,
    max_width: Option<u16>,
) -> bool {
    let c = WidthConstraint {
        available: px(available),
        margin_left: auto_or(margin_left),
        margin_right: auto_or(margin_right),
        width: auto_or(width),
        border_padding: px(border_padding) / 4.0,
        min_width: px(min_width) / 4.0,
        max_width: max_width.map(px),
    };
    let used = solve_block_width(&c);
    (used.total(c.border_padding) - c.available).abs() < 0.01
}

/// 'min-width' wins over 'max-width' and over the equation.
#[quickcheck]
fn used_width_respects_min_width(available: u16, width: Option<u16>, min_width: u16, max_width: Option<u16>) -> bool {
    let c = WidthConstraint {
        available: px(available),
        margin_left: AutoOr::Length(0.0),
        margin_right: AutoOr::Auto,
        width: auto_or(width),
        border_padding: 0.0,
        min_width: px(min_width),
        max_width: max_width.map(px),
    };
    let used = solve_block_width(&c);
    used.width >= c.min_width && used.width >= 0.0
}

/// Width of a shrink-to-fit float holding `words` words, laid out in a
/// viewport `viewport` pixels wide.
fn float_width(words: usize, viewport: f32) -> f32 {
    let text = vec!["word"; words].join(" ");
    let style = ComputedStyle {
        float: Some(FloatSide::Left),
        width: LengthOrAuto::Auto,
        ..ComputedStyle::block()
    };
    let root = SceneNode::element(
        "html",
        ComputedStyle::block(),
        vec![SceneNode::element("div", style, vec![SceneNode::text(text)]).named("float")],
    );
    let mut scene = Scene::new(root);
    scene.config.viewport_width = viewport;
    let mut loaded = scene.load().expect("scene should load");
    let _ = loaded.engine.tick();
    let node = loaded.node("float").expect("named element");
    loaded.engine.box_of(node).expect("float has a box").width
}

/// [§ 10.3.5](https://www.w3.org/TR/CSS21/visudet.html#float-width)
/// "min(max(preferred minimum width, available width), preferred width)"
/// never shrinks as the available width grows.
#[quickcheck]
fn shrink_to_fit_grows_with_the_available_width(words: u8, narrow: u16, extra: u16) -> TestResult {
    let words = usize::from(words % 24) + 1;
    let narrow = f32::from(narrow % 600) + 20.0;
    let wide = narrow + f32::from(extra % 600);
    let (a, b) = (float_width(words, narrow), float_width(words, wide));
    if a <= b + 0.01 {
        TestResult::passed()
    } else {
        TestResult::error(format!("{words} words: {a} at {narrow}px but {b} at {wide}px"))
    }
}

/// Width of a shrink-to-fit float in an 800px viewport wrapped around a
/// single block child `child` pixels wide.
fn float_around(child: f32) -> f32 {
    let float = ComputedStyle {
        float: Some(FloatSide::Left),
        width: LengthOrAuto::Auto,
        ..ComputedStyle::block()
    };
    let inner = ComputedStyle {
        width: LengthOrAuto::px(child),
        height: LengthOrAuto::px(10.0),
        ..ComputedStyle::block()
    };
    let root = SceneNode::element(
        "html",
        ComputedStyle::block(),
        vec![SceneNode::element("div", float, vec![SceneNode::element("div", inner, vec![])]).named("float")],
    );
    let mut scene = Scene::new(root);
    scene.config.viewport_width = 800.0;
    let mut loaded = scene.load().expect("scene should load");
    let _ = loaded.engine.tick();
    let node = loaded.node("float").expect("named element");
    loaded.engine.box_of(node).expect("float has a box").width
}

/// [§ 10.3.5](https://www.w3.org/TR/CSS21/visudet.html#float-width)
/// At a fixed available width, a wider child never makes the float
/// narrower, and the float never outgrows the available width.
#[quickcheck]
fn shrink_to_fit_follows_the_content_up_to_the_available_width(smaller: u16, extra: u16) -> TestResult {
    let smaller = f32::from(smaller % 1200);
    let larger = smaller + f32::from(extra % 600);
    let (a, b) = (float_around(smaller), float_around(larger));
    if a > b + 0.01 {
        return TestResult::error(format!("{a} around {smaller}px but {b} around {larger}px"));
    }
    if b > 800.0 + 0.01 {
        return TestResult::error(format!("{b} around {larger}px overflows the 800px viewport"));
    }
    TestResult::passed()
}

#[test]
fn shrink_to_fit_tracks_a_fixed_width_child() {
    assert!((float_around(100.0) - 100.0).abs() < 0.01);
    assert!((float_around(300.0) - 300.0).abs() < 0.01);
    assert!((float_around(900.0) - 800.0).abs() < 0.01);
}
