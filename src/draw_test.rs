#![allow(clippy::float_cmp)]

use super::*;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn dragging(tool: DrawTool, at: Point) -> DrawGesture {
    match begin(tool, at) {
        DrawStart::Dragging(g) => g,
        other => panic!("expected a drag gesture, got {other:?}"),
    }
}

#[test]
fn tool_default_is_select() {
    assert_eq!(DrawTool::default(), DrawTool::Select);
    assert_eq!(DrawTool::Select.shape_kind(), None);
}

#[test]
fn select_tool_draws_nothing() {
    assert_eq!(begin(DrawTool::Select, pt(1.0, 1.0)), DrawStart::Nothing);
}

#[test]
fn text_tool_places_complete_shape() {
    let DrawStart::Placed(shape) = begin(DrawTool::Text, pt(5.0, 6.0)) else {
        panic!("text should be placed immediately");
    };
    assert_eq!(shape.kind, ShapeKind::Text);
    assert_eq!((shape.x, shape.y), (5.0, 6.0));
    assert_eq!((shape.width, shape.height), TEXT_DEFAULT_SIZE);
}

#[test]
fn rectangle_normalizes_negative_drag() {
    let mut g = dragging(DrawTool::Rectangle, pt(100.0, 100.0));
    assert_eq!((g.shape.width, g.shape.height), (0.0, 0.0));

    g.extend(pt(40.0, 160.0));
    assert_eq!((g.shape.x, g.shape.y), (40.0, 100.0));
    assert_eq!((g.shape.width, g.shape.height), (60.0, 60.0));
}

#[test]
fn circle_stays_round() {
    let mut g = dragging(DrawTool::Circle, pt(0.0, 0.0));
    g.extend(pt(30.0, -10.0));
    assert_eq!(g.shape.width, 30.0);
    assert_eq!(g.shape.height, 30.0);
    assert_eq!((g.shape.x, g.shape.y), (0.0, -30.0));
}

#[test]
fn line_records_endpoints() {
    let mut g = dragging(DrawTool::Line, pt(10.0, 20.0));
    g.extend(pt(5.0, 50.0));
    assert_eq!(g.shape.props["x1"], 10.0);
    assert_eq!(g.shape.props["y2"], 50.0);
    assert_eq!((g.shape.x, g.shape.y), (5.0, 20.0));
}

#[test]
fn gesture_keeps_id_across_steps() {
    let mut g = dragging(DrawTool::Triangle, pt(0.0, 0.0));
    let id = g.id().clone();
    g.extend(pt(10.0, 10.0));
    g.extend(pt(20.0, 5.0));
    assert_eq!(g.id(), &id);
}
