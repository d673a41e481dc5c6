//! Coordinate space mapping utilities.
//!
//! Document space is the page's native coordinate system: origin at the
//! bottom-left of the crop box, y-axis pointing up, measured in points. The
//! viewport is what the user sees: origin at the top-left, y-axis pointing
//! down, measured in pixels and scaled by the current zoom factor.
//!
//! Every mapping here has an exact algebraic inverse, so a point that goes
//! from viewport to document and back only differs by floating-point error.

use kurbo::{Point, Rect};

/// The clockwise rotation a viewer applies when displaying a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageRotation {
    /// Displayed as stored.
    #[default]
    None,
    /// Rotated by 90 degrees.
    Quarter,
    /// Rotated by 180 degrees.
    Half,
    /// Rotated by 270 degrees.
    ThreeQuarters,
}

impl PageRotation {
    /// Build a rotation from a `/Rotate` value.
    ///
    /// Values are normalized into `0..360`; anything that is not a multiple
    /// of 90 is treated as no rotation.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Self::Quarter,
            180 => Self::Half,
            270 => Self::ThreeQuarters,
            _ => Self::None,
        }
    }

    /// The rotation in degrees.
    pub fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Quarter => 90,
            Self::Half => 180,
            Self::ThreeQuarters => 270,
        }
    }

    /// Whether the displayed page has its width and height swapped.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Quarter | Self::ThreeQuarters)
    }
}

/// The visible region of a page in document space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// The page's crop box in document coordinates.
    pub crop_box: Rect,
    /// The display rotation of the page.
    pub rotation: PageRotation,
}

impl PageFrame {
    /// A frame for an unrotated page whose crop box starts at the origin.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            crop_box: Rect::new(0.0, 0.0, width, height),
            rotation: PageRotation::None,
        }
    }

    /// Replace the rotation of this frame.
    pub fn with_rotation(mut self, rotation: PageRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// The size of the page as displayed at scale 1.0.
    pub fn display_size(&self) -> (f64, f64) {
        let (w, h) = (self.crop_box.width(), self.crop_box.height());
        if self.rotation.swaps_axes() {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// The size in pixels of the page as displayed at `scale`.
    pub fn viewport_size(&self, scale: f64) -> (f64, f64) {
        let (w, h) = self.display_size();
        (w * scale, h * scale)
    }
}

/// Convert a viewport point to document space on an unrotated page whose
/// crop box starts at the origin.
///
/// `x' = x / scale`, `y' = page_height - y / scale`.
pub fn to_document_space(point: Point, page_height: f64, scale: f64) -> Point {
    Point::new(point.x / scale, page_height - point.y / scale)
}

/// The inverse of [`to_document_space`].
pub fn to_viewport_space(point: Point, page_height: f64, scale: f64) -> Point {
    Point::new(point.x * scale, (page_height - point.y) * scale)
}

/// Convert a viewport point to document space, honouring the crop box
/// origin and the page rotation.
pub fn viewport_to_document(point: Point, frame: &PageFrame, scale: f64) -> Point {
    let c = frame.crop_box;
    let x_pts = point.x / scale;
    let y_pts = point.y / scale;

    match frame.rotation {
        PageRotation::None => Point::new(c.x0 + x_pts, c.y1 - y_pts),
        PageRotation::Quarter => Point::new(c.x0 + y_pts, c.y0 + x_pts),
        PageRotation::Half => Point::new(c.x1 - x_pts, c.y0 + y_pts),
        PageRotation::ThreeQuarters => Point::new(c.x1 - y_pts, c.y1 - x_pts),
    }
}

/// The inverse of [`viewport_to_document`].
pub fn document_to_viewport(point: Point, frame: &PageFrame, scale: f64) -> Point {
    let c = frame.crop_box;

    let (x_pts, y_pts) = match frame.rotation {
        PageRotation::None => (point.x - c.x0, c.y1 - point.y),
        PageRotation::Quarter => (point.y - c.y0, point.x - c.x0),
        PageRotation::Half => (c.x1 - point.x, point.y - c.y0),
        PageRotation::ThreeQuarters => (c.y1 - point.y, c.x1 - point.x),
    };

    Point::new(x_pts * scale, y_pts * scale)
}

/// Convert a viewport rectangle to a document rectangle.
///
/// The result is normalized so that `x0 <= x1` and `y0 <= y1`.
pub fn viewport_rect_to_document(rect: Rect, frame: &PageFrame, scale: f64) -> Rect {
    let p0 = viewport_to_document(Point::new(rect.x0, rect.y0), frame, scale);
    let p1 = viewport_to_document(Point::new(rect.x1, rect.y1), frame, scale);
    Rect::from_points(p0, p1)
}
