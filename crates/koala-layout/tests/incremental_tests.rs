//! Integration tests for incremental reflow and the image-ready contract.

use koala_layout::{
    ComputedStyle, ImageState, Length, LengthOrAuto, LoadedScene, PositionType, Scene, SceneNode, Sides,
};
use koala_layout::scene::ImageFixture;

fn load(scene: Scene) -> LoadedScene {
    let mut loaded = scene.load().expect("scene should load");
    assert!(loaded.engine.tick(), "first tick lays out");
    loaded
}

fn sized(height: f32) -> ComputedStyle {
    ComputedStyle {
        height: LengthOrAuto::px(height),
        ..ComputedStyle::block()
    }
}

/// Three stacked blocks; the middle one is 50px wide and holds text.
fn three_blocks() -> Scene {
    let narrow = ComputedStyle {
        width: LengthOrAuto::px(50.0),
        ..ComputedStyle::block()
    };
    let mut scene = Scene::new(SceneNode::element(
        "html",
        ComputedStyle::block(),
        vec![
            SceneNode::element("div", sized(10.0), vec![]).named("a"),
            SceneNode::element("p", narrow, vec![SceneNode::text("aaaa")]).named("b"),
            SceneNode::element("div", sized(10.0), vec![]).named("c"),
        ],
    ));
    scene.config.viewport_width = 800.0;
    scene
}

fn y_of(loaded: &LoadedScene, name: &str) -> f32 {
    let node = loaded.node(name).expect("named element");
    loaded.engine.box_of(node).expect("element has a box").y
}

#[test]
fn a_clean_tree_does_no_work() {
    let mut loaded = load(three_blocks());
    assert!(loaded.engine.stats().blocks_laid_out > 0);
    assert!(!loaded.engine.is_dirty());
    assert!(!loaded.engine.tick(), "nothing changed");
}

#[test]
fn layout_twice_reuses_every_block() {
    let mut loaded = load(three_blocks());
    let before = loaded.engine.dump();
    loaded.engine.layout();
    let stats = loaded.engine.stats();
    assert_eq!(stats.blocks_laid_out, 0);
    assert!(stats.blocks_skipped > 0);
    assert_eq!(loaded.engine.dump(), before);
}

/// A paint-only change on a nested leaf reflows the leaf and the blocks
/// above it; every sibling along the way is reused.
#[test]
fn dirty_leaf_reflows_only_its_ancestors() {
    let mut scene = Scene::new(SceneNode::element(
        "html",
        ComputedStyle::block(),
        vec![
            SceneNode::element("div", sized(10.0), vec![]).named("a"),
            SceneNode::element(
                "div",
                ComputedStyle::block(),
                vec![
                    SceneNode::element("div", sized(10.0), vec![]).named("leaf"),
                    SceneNode::element("div", sized(10.0), vec![]).named("sibling"),
                ],
            )
            .named("b"),
            SceneNode::element("div", sized(10.0), vec![]).named("c"),
        ],
    ));
    scene.config.viewport_width = 800.0;
    let mut loaded = load(scene);
    let before = loaded.engine.dump();

    let leaf = loaded.node("leaf").unwrap();
    let repainted = ComputedStyle {
        background_color: 0x00ff_00ff,
        ..sized(10.0)
    };
    loaded.engine.set_style(leaf, repainted).unwrap();
    assert!(loaded.engine.tick());

    // html, b and the leaf; a, the sibling and c are reused.
    let stats = loaded.engine.stats();
    assert_eq!(stats.blocks_laid_out, 3);
    assert_eq!(stats.blocks_skipped, 3);
    assert_eq!(y_of(&loaded, "sibling"), 20.0);
    assert_eq!(y_of(&loaded, "c"), 30.0);
    assert_eq!(loaded.engine.dump(), before);
    // Opaque green, packed RRGGBBAA.
    assert_eq!(loaded.engine.box_of(leaf).unwrap().background.color, 0x00ff_00ff);
}

#[test]
fn text_change_reflows_its_block_and_moves_what_follows() {
    let mut loaded = load(three_blocks());
    let first_pass = loaded.engine.stats().blocks_laid_out;
    assert!((y_of(&loaded, "c") - (10.0 + 19.2)).abs() < 0.01);

    let b = loaded.node("b").unwrap();
    let text = loaded.engine.content().children(b)[0];
    // 38.4px per word at the approximate metrics: one word per line.
    loaded.engine.set_text(text, "aaaa aaaa aaaa").unwrap();
    assert!(loaded.engine.is_dirty());
    assert!(loaded.engine.tick());

    let stats = loaded.engine.stats();
    assert!(stats.blocks_skipped > 0, "the first block is reused");
    assert!(stats.blocks_laid_out < first_pass + stats.blocks_skipped);
    assert!((loaded.engine.box_of(b).unwrap().height - 3.0 * 19.2).abs() < 0.01);
    assert!((y_of(&loaded, "c") - (10.0 + 3.0 * 19.2)).abs() < 0.01);
    assert!(!loaded.engine.tick());
}

#[test]
fn height_change_moves_the_following_siblings() {
    let mut loaded = load(three_blocks());
    let a = loaded.node("a").unwrap();
    loaded.engine.set_style(a, sized(40.0)).unwrap();
    assert!(loaded.engine.tick());
    assert_eq!(y_of(&loaded, "b"), 40.0);
    assert!((y_of(&loaded, "c") - (40.0 + 19.2)).abs() < 0.01);
}

#[test]
fn removed_content_loses_its_boxes() {
    let mut loaded = load(three_blocks());
    let b = loaded.node("b").unwrap();
    loaded.engine.remove_content(b).unwrap();
    assert!(loaded.engine.tick());
    assert!(loaded.engine.box_of(b).is_err());
    assert_eq!(y_of(&loaded, "c"), 10.0);
}

#[test]
fn appended_content_is_laid_out_on_the_next_tick() {
    let mut loaded = load(three_blocks());
    let c = loaded.node("c").unwrap();
    let child = loaded.engine.create_element("div", sized(5.0));
    loaded.engine.append_content(c, child).unwrap();
    assert!(loaded.engine.tick());
    let added = loaded.engine.box_of(child).unwrap();
    assert_eq!(added.height, 5.0);
    assert_eq!(added.y, y_of(&loaded, "c"));
}

/// [§ 9.4.3 Relative positioning](https://www.w3.org/TR/CSS21/visuren.html#relative-positioning)
/// Moving a relatively positioned box leaves the flow where it was.
#[test]
fn offset_change_only_repositions() {
    let relative = |left: f32| ComputedStyle {
        position: PositionType::Relative,
        inset: Sides {
            top: LengthOrAuto::Auto,
            right: LengthOrAuto::Auto,
            bottom: LengthOrAuto::Auto,
            left: LengthOrAuto::px(left),
        },
        ..sized(10.0)
    };
    let mut scene = Scene::new(SceneNode::element(
        "html",
        ComputedStyle::block(),
        vec![
            SceneNode::element("div", relative(5.0), vec![]).named("r"),
            SceneNode::element("div", sized(10.0), vec![]).named("after"),
        ],
    ));
    scene.config.viewport_width = 800.0;
    let mut loaded = load(scene);
    let r = loaded.node("r").unwrap();
    loaded.engine.set_style(r, relative(30.0)).unwrap();
    assert!(loaded.engine.tick());
    let id = loaded.engine.styles().get_box(r).unwrap();
    assert_eq!(loaded.engine.paint_origin(id).unwrap(), (30.0, 0.0));
    assert_eq!(y_of(&loaded, "after"), 10.0);
}

// ---------------------------------------------------------------------------
// Background images
//
// [§ 14.2 The background](https://www.w3.org/TR/CSS21/colors.html#background)
// ---------------------------------------------------------------------------

fn with_background(url: &str) -> Scene {
    let style = ComputedStyle {
        width: LengthOrAuto::px(116.0),
        background_image: Some(url.to_owned()),
        background_position_x: Length::Percent { percent: 50.0 },
        ..sized(20.0)
    };
    let mut scene = Scene::new(SceneNode::element(
        "html",
        ComputedStyle::block(),
        vec![SceneNode::element("div", style, vec![]).named("bg")],
    ));
    let _ = scene
        .images
        .insert(String::from("tile.png"), ImageFixture { width: 16, height: 16 });
    scene
}

#[test]
fn image_completion_arrives_on_a_later_tick() {
    let mut loaded = load(with_background("tile.png"));
    let bg = loaded.node("bg").unwrap();
    assert_eq!(loaded.engine.load_delay_count(), 1);
    assert_eq!(loaded.engine.box_of(bg).unwrap().background.image, ImageState::Loading);

    assert!(loaded.engine.tick(), "completion reflows the owner");
    assert_eq!(loaded.engine.load_delay_count(), 0);
    let background = &loaded.engine.box_of(bg).unwrap().background;
    assert!(matches!(background.image, ImageState::Ready(size) if size.width == 16));
    assert_eq!(background.left, 50.0);
}

#[test]
fn failed_image_settles_without_reflow() {
    let mut loaded = load(with_background("missing.png"));
    let bg = loaded.node("bg").unwrap();
    assert!(!loaded.engine.tick());
    assert_eq!(loaded.engine.load_delay_count(), 0);
    assert_eq!(loaded.engine.box_of(bg).unwrap().background.image, ImageState::Failed);
}

#[test]
fn completion_for_a_removed_box_is_ignored() {
    let mut loaded = load(with_background("tile.png"));
    let bg = loaded.node("bg").unwrap();
    loaded.engine.remove_content(bg).unwrap();
    assert!(loaded.engine.tick());
    assert!(loaded.engine.box_of(bg).is_err());
    assert_eq!(loaded.engine.load_delay_count(), 0);
    assert!(!loaded.engine.tick());
}
