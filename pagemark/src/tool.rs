//! Interaction modes and pointer routing.

use crate::model::StrokeKind;
use core::fmt;
use core::str::FromStr;
use kurbo::Point;

/// The active interaction mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Manipulate existing images through their handles.
    #[default]
    Select,
    /// Freehand ink.
    Draw,
    /// Freehand strokes in the background color.
    Erase,
    /// Place and edit text.
    Text,
    /// Place images.
    Image,
}

impl ToolMode {
    /// All modes, in toolbar order.
    pub const ALL: [Self; 5] = [
        Self::Select,
        Self::Draw,
        Self::Erase,
        Self::Text,
        Self::Image,
    ];

    /// The lowercase name of the mode.
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Draw => "draw",
            Self::Erase => "erase",
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    /// The kind of path this mode captures, if it captures any.
    pub fn stroke_kind(self) -> Option<StrokeKind> {
        match self {
            Self::Draw => Some(StrokeKind::Ink),
            Self::Erase => Some(StrokeKind::Erase),
            _ => None,
        }
    }

    /// Whether image move/resize/delete handles react to the pointer.
    pub fn exposes_image_handles(self) -> bool {
        matches!(self, Self::Select | Self::Image)
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tool name that does not match any mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool(pub String);

impl fmt::Display for UnknownTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tool: {}", self.0)
    }
}

impl std::error::Error for UnknownTool {}

impl FromStr for ToolMode {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// A pointer event in the viewport space of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// A button was pressed.
    Down(Point),
    /// The pointer moved.
    Move(Point),
    /// The button was released.
    Up(Point),
    /// The pointer left the page.
    Leave,
}

impl PointerEvent {
    /// The pointer position, if the event carries one.
    pub fn position(self) -> Option<Point> {
        match self {
            Self::Down(p) | Self::Move(p) | Self::Up(p) => Some(p),
            Self::Leave => None,
        }
    }
}

/// Which layer of a page handles a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The drawing capture surface.
    Capture,
    /// The overlay annotation layer.
    Overlay,
}

/// Decide which layer receives pointer input under `tool`.
///
/// Drag gestures in progress take precedence over this and are handled by
/// the editor before routing.
pub fn route(tool: ToolMode) -> Target {
    if tool.stroke_kind().is_some() {
        Target::Capture
    } else {
        Target::Overlay
    }
}
