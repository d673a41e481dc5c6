//! Annotation types.
//!
//! All geometry stored here is in viewport space at the session's current
//! zoom. Font sizes are the exception: they are in document points and are
//! scaled by the zoom when displayed.

use crate::settings::TextMetrics;
use kurbo::{Point, Rect, Size};
use pagemark_burn::{Color, EmbeddedImage, StandardFont};

/// The identifier of a text or image annotation, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub(crate) u64);

impl AnnotationId {
    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a freehand path adds ink or covers it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeKind {
    /// A regular stroke in the ambient stroke style.
    Ink,
    /// An opaque stroke in the page background color. It only hides what
    /// was drawn before it; earlier paths are kept.
    Erase,
}

/// Font, size and color of a line of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// The font.
    pub font: StandardFont,
    /// The font size in document points.
    pub font_size: f64,
    /// The fill color.
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: StandardFont::Helvetica,
            font_size: 16.0,
            color: Color::black(),
        }
    }
}

/// Color and width of freehand ink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    /// The stroke color.
    pub color: Color,
    /// The stroke width in viewport pixels.
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::black(),
            width: 2.0,
        }
    }
}

/// A committed freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct PathAnnotation {
    /// The captured points, in capture order. Never empty once committed.
    pub points: Vec<Point>,
    /// The stroke color.
    pub color: Color,
    /// The stroke width.
    pub width: f64,
    /// Ink or erase.
    pub kind: StrokeKind,
}

/// A committed line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnnotation {
    /// The annotation id.
    pub id: AnnotationId,
    /// The top-left corner of the text box.
    pub position: Point,
    /// The text. Never empty.
    pub text: String,
    /// The style captured when the annotation was created.
    pub style: TextStyle,
}

impl TextAnnotation {
    /// The approximate on-screen box of the text at `zoom`.
    pub fn bounds(&self, zoom: f64, metrics: &TextMetrics) -> Rect {
        text_box(self.position, &self.text, self.style.font_size * zoom, metrics)
    }
}

/// The approximate box of `text` with its top-left corner at `position`,
/// rendered at `display_size` pixels.
pub(crate) fn text_box(
    position: Point,
    text: &str,
    display_size: f64,
    metrics: &TextMetrics,
) -> Rect {
    let chars = text.chars().count() as f64;
    Rect::from_origin_size(
        position,
        Size::new(
            chars * display_size * metrics.char_width,
            display_size * metrics.line_height,
        ),
    )
}

/// Position and size of an image annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    /// The top-left corner.
    pub position: Point,
    /// The width.
    pub width: f64,
    /// The height.
    pub height: f64,
}

impl ImageGeometry {
    /// The covered rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, Size::new(self.width, self.height))
    }

    /// A copy with both sides raised to at least `min`.
    pub fn clamped(self, min: f64) -> Self {
        Self {
            width: self.width.max(min),
            height: self.height.max(min),
            ..self
        }
    }
}

/// A committed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnnotation {
    /// The annotation id.
    pub id: AnnotationId,
    /// The decoded image payload.
    pub image: EmbeddedImage,
    /// Where the image is placed, in viewport units at the current zoom.
    pub geometry: ImageGeometry,
}

/// A borrowed annotation of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Annotation<'a> {
    /// A freehand stroke.
    Path(&'a PathAnnotation),
    /// A line of text.
    Text(&'a TextAnnotation),
    /// An image.
    Image(&'a ImageAnnotation),
}

/// Everything annotated on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageAnnotations {
    pub(crate) paths: Vec<PathAnnotation>,
    pub(crate) texts: Vec<TextAnnotation>,
    pub(crate) images: Vec<ImageAnnotation>,
}

impl PageAnnotations {
    /// Freehand strokes in insertion order, which is also paint order.
    pub fn paths(&self) -> &[PathAnnotation] {
        &self.paths
    }

    /// Text annotations in insertion order.
    pub fn texts(&self) -> &[TextAnnotation] {
        &self.texts
    }

    /// Image annotations in insertion order.
    pub fn images(&self) -> &[ImageAnnotation] {
        &self.images
    }

    /// Look up a text annotation.
    pub fn text(&self, id: AnnotationId) -> Option<&TextAnnotation> {
        self.texts.iter().find(|t| t.id == id)
    }

    /// Look up an image annotation.
    pub fn image(&self, id: AnnotationId) -> Option<&ImageAnnotation> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Every annotation in paint order: paths, then images, then text.
    pub fn iter(&self) -> impl Iterator<Item = Annotation<'_>> {
        self.paths
            .iter()
            .map(Annotation::Path)
            .chain(self.images.iter().map(Annotation::Image))
            .chain(self.texts.iter().map(Annotation::Text))
    }

    /// The total number of annotations.
    pub fn len(&self) -> usize {
        self.paths.len() + self.texts.len() + self.images.len()
    }

    /// Whether the page has no annotations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        for path in &mut self.paths {
            for point in &mut path.points {
                *point = (point.to_vec2() * factor).to_point();
            }
            path.width *= factor;
        }
        for text in &mut self.texts {
            text.position = (text.position.to_vec2() * factor).to_point();
        }
        for image in &mut self.images {
            let g = image.geometry;
            image.geometry = ImageGeometry {
                position: (g.position.to_vec2() * factor).to_point(),
                width: g.width * factor,
                height: g.height * factor,
            };
        }
    }
}
