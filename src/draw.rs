//! Drawing tools and the in-progress draw gesture.
//!
//! A drawing tool turns canvas pointer-down into a provisional shape,
//! pointer-move into resizes of that shape from its anchor corner, and
//! pointer-up into a commit. The session owns the gesture and pushes each
//! step through the shape adapter.

use serde_json::json;

use crate::consts::TEXT_DEFAULT_SIZE;
use crate::shapes::{ObjectId, Shape, ShapeKind};
use crate::surface::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawTool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    Rectangle,
    Circle,
    Triangle,
    Line,
    /// Places a text box in one click.
    Text,
}

impl DrawTool {
    /// Shape kind this tool creates, or `None` for the selection tool.
    #[must_use]
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            Self::Select => None,
            Self::Rectangle => Some(ShapeKind::Rectangle),
            Self::Circle => Some(ShapeKind::Circle),
            Self::Triangle => Some(ShapeKind::Triangle),
            Self::Line => Some(ShapeKind::Line),
            Self::Text => Some(ShapeKind::Text),
        }
    }

    /// Whether this tool sizes its shape by dragging.
    #[must_use]
    pub fn is_dragged(self) -> bool {
        matches!(self, Self::Rectangle | Self::Circle | Self::Triangle | Self::Line)
    }
}

/// A shape being sized between canvas pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawGesture {
    /// Working copy of the shape, replaced wholesale on each step.
    pub shape: Shape,
    /// Canvas point where the drag started.
    pub anchor: Point,
}

impl DrawGesture {
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.shape.object_id
    }

    /// Resize the working shape so it spans from the anchor to `to`.
    pub fn extend(&mut self, to: Point) {
        resize_from_anchor(&mut self.shape, self.anchor, to);
    }
}

/// What a canvas pointer-down with `tool` produces.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawStart {
    /// Nothing to draw (selection tool).
    Nothing,
    /// A complete shape, committed immediately.
    Placed(Shape),
    /// A provisional shape that follows the pointer until release.
    Dragging(DrawGesture),
}

/// Start drawing with `tool` at `at`.
#[must_use]
pub fn begin(tool: DrawTool, at: Point) -> DrawStart {
    let Some(kind) = tool.shape_kind() else {
        return DrawStart::Nothing;
    };
    if !tool.is_dragged() {
        let (w, h) = TEXT_DEFAULT_SIZE;
        let shape = Shape::new(kind, at.x, at.y, w, h).with_props(json!({"text": "Tap to Type", "fill": "#aabbcc"}));
        return DrawStart::Placed(shape);
    }
    let mut shape = Shape::new(kind, at.x, at.y, 0.0, 0.0).with_props(default_props(kind));
    resize_from_anchor(&mut shape, at, at);
    DrawStart::Dragging(DrawGesture { shape, anchor: at })
}

fn resize_from_anchor(shape: &mut Shape, anchor: Point, to: Point) {
    let (dx, dy) = (to.x - anchor.x, to.y - anchor.y);
    match shape.kind {
        ShapeKind::Line => {
            shape.x = anchor.x.min(to.x);
            shape.y = anchor.y.min(to.y);
            shape.width = dx.abs();
            shape.height = dy.abs();
            if let Some(props) = shape.props.as_object_mut() {
                props.insert("x1".into(), json!(anchor.x));
                props.insert("y1".into(), json!(anchor.y));
                props.insert("x2".into(), json!(to.x));
                props.insert("y2".into(), json!(to.y));
            }
        }
        ShapeKind::Circle => {
            let diameter = dx.abs().max(dy.abs());
            shape.x = if dx < 0.0 { anchor.x - diameter } else { anchor.x };
            shape.y = if dy < 0.0 { anchor.y - diameter } else { anchor.y };
            shape.width = diameter;
            shape.height = diameter;
        }
        ShapeKind::Rectangle | ShapeKind::Triangle | ShapeKind::Text => {
            shape.x = anchor.x.min(to.x);
            shape.y = anchor.y.min(to.y);
            shape.width = dx.abs();
            shape.height = dy.abs();
        }
    }
}

fn default_props(kind: ShapeKind) -> serde_json::Value {
    match kind {
        ShapeKind::Line => json!({"stroke": "#aabbcc", "strokeWidth": 2}),
        _ => json!({"fill": "#aabbcc"}),
    }
}

#[cfg(test)]
#[path = "draw_test.rs"]
mod tests;
