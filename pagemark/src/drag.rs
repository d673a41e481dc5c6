//! Drag gestures on image annotations.

use crate::model::{AnnotationId, ImageGeometry};
use kurbo::Point;

/// What a drag does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Translate by the pointer delta.
    Move,
    /// Grow or shrink from the bottom-right corner by the pointer delta.
    Resize,
}

/// An error for a drag gesture that cannot start or continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureError {
    /// Another gesture is already in progress.
    Busy,
    /// No drag gesture is in progress.
    NoGesture,
    /// The target image does not exist on the page.
    UnknownTarget(AnnotationId),
}

impl core::fmt::Display for GestureError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "another gesture is in progress"),
            Self::NoGesture => write!(f, "no gesture is in progress"),
            Self::UnknownTarget(id) => write!(f, "image {id} does not exist"),
        }
    }
}

impl std::error::Error for GestureError {}

/// An in-progress move or resize of one image.
///
/// Geometry is always derived from the pointer delta since the start of the
/// gesture and the geometry at that moment, so intermediate updates never
/// accumulate rounding or clamping error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    page: usize,
    target: AnnotationId,
    kind: DragKind,
    origin: Point,
    start: ImageGeometry,
    min_size: f64,
}

impl DragSession {
    /// Begin a drag at pointer position `origin`.
    pub fn start(
        page: usize,
        target: AnnotationId,
        kind: DragKind,
        origin: Point,
        start: ImageGeometry,
        min_size: f64,
    ) -> Self {
        Self {
            page,
            target,
            kind,
            origin,
            start,
            min_size,
        }
    }

    /// The page the target lives on.
    pub fn page(&self) -> usize {
        self.page
    }

    /// The image being dragged.
    pub fn target(&self) -> AnnotationId {
        self.target
    }

    /// Move or resize.
    pub fn kind(&self) -> DragKind {
        self.kind
    }

    /// The geometry for the pointer at `pointer`.
    pub fn update(&self, pointer: Point) -> ImageGeometry {
        let delta = pointer - self.origin;
        match self.kind {
            DragKind::Move => ImageGeometry {
                position: self.start.position + delta,
                ..self.start
            },
            DragKind::Resize => ImageGeometry {
                width: self.start.width + delta.x,
                height: self.start.height + delta.y,
                ..self.start
            }
            .clamped(self.min_size),
        }
    }

    /// Finish the drag with the pointer at `pointer`.
    pub fn end(self, pointer: Point) -> ImageGeometry {
        self.update(pointer)
    }
}
