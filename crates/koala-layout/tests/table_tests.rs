//! Integration tests for automatic table layout.
//!
//! [§ 17.5.2.2 Automatic table layout](https://www.w3.org/TR/CSS21/tables.html#auto-table-layout)

use koala_layout::{BlockVariant, ComputedStyle, Display, LayoutBox, LengthOrAuto, LoadedScene, Scene, SceneNode};

const CHAR: f32 = 9.6;

fn layout(children: Vec<SceneNode>) -> LoadedScene {
    let mut scene = Scene::new(SceneNode::element("html", ComputedStyle::block(), children));
    scene.config.viewport_width = 800.0;
    let mut loaded = scene.load().expect("scene should load");
    let _ = loaded.engine.tick();
    loaded
}

fn get<'a>(loaded: &'a LoadedScene, name: &str) -> &'a LayoutBox {
    let node = loaded.node(name).expect("named element");
    loaded.engine.box_of(node).expect("element has a box")
}

fn styled(display: Display) -> ComputedStyle {
    ComputedStyle {
        display,
        ..ComputedStyle::default()
    }
}

fn table(children: Vec<SceneNode>) -> SceneNode {
    SceneNode::element("table", styled(Display::Table), children).named("table")
}

fn row(children: Vec<SceneNode>) -> SceneNode {
    SceneNode::element("tr", styled(Display::TableRow), children)
}

fn cell(name: &str, text: &str) -> SceneNode {
    SceneNode::element("td", styled(Display::TableCell), vec![SceneNode::text(text)]).named(name)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

#[test]
fn cells_sit_side_by_side_at_their_content_widths() {
    let loaded = layout(vec![table(vec![row(vec![cell("a", "aaaa"), cell("b", "bb")])])]);
    let (a, b) = (get(&loaded, "a"), get(&loaded, "b"));
    assert!(close(a.width, 4.0 * CHAR), "got {}", a.width);
    assert!(close(b.width, 2.0 * CHAR), "got {}", b.width);
    // Spacing of 2px before, between and after the cells.
    assert!(close(a.x, 2.0));
    assert!(close(b.x, 2.0 + 4.0 * CHAR + 2.0));
    assert!(close(a.y, b.y));

    let table = get(&loaded, "table");
    assert!(close(table.width, 6.0 * CHAR + 6.0), "auto tables shrink to their columns, got {}", table.width);
    assert!(close(table.height, 19.2 + 4.0));
}

#[test]
fn row_height_is_the_tallest_cell() {
    let tall = ComputedStyle {
        height: LengthOrAuto::px(50.0),
        ..styled(Display::TableCell)
    };
    let loaded = layout(vec![table(vec![row(vec![
        cell("short", "a"),
        SceneNode::element("td", tall, vec![]).named("tall"),
    ])])]);
    assert!(close(get(&loaded, "short").height, 50.0));
    assert!(close(get(&loaded, "tall").height, 50.0));
}

#[test]
fn rows_stack_with_spacing_between_them() {
    let loaded = layout(vec![table(vec![
        row(vec![cell("first", "a")]),
        row(vec![cell("second", "a")]),
    ])]);
    let (first, second) = (get(&loaded, "first"), get(&loaded, "second"));
    assert!(close(second.y - first.y, 19.2 + 2.0));
    assert!(close(get(&loaded, "table").height, 2.0 * 19.2 + 6.0));
}

/// A cell spanning two columns widens them evenly when it needs more room
/// than they provide.
#[test]
fn spanning_cell_widens_the_columns_it_covers() {
    let wide = ComputedStyle {
        column_span: 2,
        ..styled(Display::TableCell)
    };
    let loaded = layout(vec![table(vec![
        row(vec![SceneNode::element("td", wide, vec![SceneNode::text("aaaaaaaaaa")]).named("wide")]),
        row(vec![cell("left", "a"), cell("right", "a")]),
    ])]);
    let (left, right, wide) = (get(&loaded, "left"), get(&loaded, "right"), get(&loaded, "wide"));
    assert!(close(left.width, right.width));
    assert!(close(wide.width, left.width + right.width + 2.0));
    assert!(close(wide.width, 10.0 * CHAR));

    let table = loaded.engine.styles().get_box(loaded.node("table").unwrap()).unwrap();
    let columns = match &loaded.engine.tree().block(table).unwrap().variant {
        BlockVariant::TableWrapper(data) => data.column_widths.clone(),
        other => panic!("expected a table wrapper, got {other:?}"),
    };
    assert_eq!(columns.len(), 2);
}

/// "Document languages other than HTML may not contain all the elements in
/// the CSS 2.1 table model. In these cases, the "missing" elements must be
/// assumed in order for the table model to work."
#[test]
fn cells_without_a_row_get_an_anonymous_one() {
    let loaded = layout(vec![table(vec![cell("a", "a"), cell("b", "b")])]);
    let (a, b) = (get(&loaded, "a"), get(&loaded, "b"));
    assert!(close(a.y, b.y), "both cells share one row");
    assert!(b.x > a.x);

    let tree = loaded.engine.tree();
    let row = tree.parent(loaded.engine.styles().get_box(loaded.node("a").unwrap()).unwrap()).unwrap();
    assert!(tree.get(row).unwrap().is_anonymous());
}

#[test]
fn definite_table_width_is_shared_by_the_columns() {
    let fixed = ComputedStyle {
        width: LengthOrAuto::px(206.0),
        ..styled(Display::Table)
    };
    let loaded = layout(vec![
        SceneNode::element("table", fixed, vec![row(vec![cell("a", "a"), cell("b", "a")])]).named("table"),
    ]);
    assert!(close(get(&loaded, "table").width, 206.0));
    // Equal maximum widths: the extra is split evenly.
    assert!(close(get(&loaded, "a").width, 100.0));
    assert!(close(get(&loaded, "b").width, 100.0));
}
