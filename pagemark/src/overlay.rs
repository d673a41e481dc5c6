//! The overlay annotation layer of a page.
//!
//! Text and image annotations are not rasterized. Instead, the layer
//! publishes a render model: a list of [`OverlayElement`]s in paint order
//! that the host turns into interactive widgets. The model is rebuilt
//! whenever the page's text or image collections or the open text editor
//! change, and it is what pointer input is hit-tested against.

use crate::model::*;
use crate::settings::EditorSettings;
use crate::store::is_blank;
use kurbo::{Point, Rect, Size, Vec2};

/// An affordance attached to an image annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// Top-left grip; dragging translates the image.
    Move,
    /// Bottom-right grip; dragging resizes the image.
    Resize,
    /// Top-right button; removes the image.
    Delete,
}

/// A handle and the square it occupies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleBox {
    /// The handle.
    pub handle: Handle,
    /// Its area in viewport space.
    pub bounds: Rect,
}

impl HandleBox {
    /// The handles of an image, in hit-test priority order.
    pub fn for_image(bounds: Rect, size: f64) -> [Self; 3] {
        let square = Size::new(size, size);
        let at = |p: Point| Rect::from_origin_size(p, square);

        [
            Self {
                handle: Handle::Delete,
                bounds: at(Point::new(bounds.x1 - size, bounds.y0)),
            },
            Self {
                handle: Handle::Resize,
                bounds: at(Point::new(bounds.x1 - size, bounds.y1 - size)),
            },
            Self {
                handle: Handle::Move,
                bounds: at(Point::new(bounds.x0, bounds.y0)),
            },
        ]
    }
}

/// One widget of the overlay render model.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayElement {
    /// A committed line of text.
    Text {
        /// The annotation id.
        id: AnnotationId,
        /// The approximate box used for hit-testing.
        bounds: Rect,
        /// The content.
        text: String,
        /// The annotation's style.
        style: TextStyle,
        /// The font size in viewport pixels.
        display_size: f64,
    },
    /// A placed image.
    Image {
        /// The annotation id.
        id: AnnotationId,
        /// The covered area.
        bounds: Rect,
        /// The move, resize and delete handles, shown on hover.
        handles: [HandleBox; 3],
    },
    /// The open text editor.
    Editor {
        /// The annotation being edited, if any.
        bound: Option<AnnotationId>,
        /// The approximate box of the editor.
        bounds: Rect,
        /// The current content.
        text: String,
        /// The style the text is shown in.
        style: TextStyle,
        /// The font size in viewport pixels.
        display_size: f64,
    },
}

impl OverlayElement {
    /// The area of the element.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Text { bounds, .. } | Self::Image { bounds, .. } | Self::Editor { bounds, .. } => {
                *bounds
            }
        }
    }
}

/// What a point on the overlay lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayHit {
    /// The body of a text annotation.
    Text(AnnotationId),
    /// The body of an image, outside of its handles.
    Image(AnnotationId),
    /// A handle of an image.
    Handle(AnnotationId, Handle),
    /// The open text editor.
    Editor,
}

/// The render model of one page's overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayLayer {
    elements: Vec<OverlayElement>,
}

impl OverlayLayer {
    /// Build the render model of a page.
    ///
    /// `editor` is only shown if it belongs to this page. A text annotation
    /// that is open in the editor is replaced by the editor element.
    pub fn build(
        page_index: usize,
        annotations: Option<&PageAnnotations>,
        editor: Option<&TextEditor>,
        ambient: &TextStyle,
        zoom: f64,
        settings: &EditorSettings,
    ) -> Self {
        let editor = editor.filter(|e| e.page == page_index);
        let editing = editor.and_then(|e| e.bound);
        let mut elements = Vec::new();

        if let Some(annotations) = annotations {
            for image in annotations.images() {
                let bounds = image.geometry.rect();
                elements.push(OverlayElement::Image {
                    id: image.id,
                    bounds,
                    handles: HandleBox::for_image(bounds, settings.handle_size),
                });
            }

            for text in annotations.texts() {
                if Some(text.id) == editing {
                    continue;
                }
                elements.push(OverlayElement::Text {
                    id: text.id,
                    bounds: text.bounds(zoom, &settings.text_metrics),
                    text: text.text.clone(),
                    style: text.style,
                    display_size: text.style.font_size * zoom,
                });
            }
        }

        if let Some(editor) = editor {
            let style = editor.style.unwrap_or(*ambient);
            let display_size = style.font_size * zoom;
            // Keep an empty editor clickable.
            let sizing = if editor.text.is_empty() {
                " "
            } else {
                editor.text.as_str()
            };
            elements.push(OverlayElement::Editor {
                bound: editor.bound,
                bounds: text_box(editor.position, sizing, display_size, &settings.text_metrics),
                text: editor.text.clone(),
                style,
                display_size,
            });
        }

        Self { elements }
    }

    /// The elements in paint order: images, then text, then the editor.
    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    /// Find the topmost element under `point`.
    ///
    /// Image handles are only considered when `handles_live` is set;
    /// otherwise they count as part of the image body.
    pub fn hit_test(&self, point: Point, handles_live: bool) -> Option<OverlayHit> {
        self.elements.iter().rev().find_map(|element| match element {
            OverlayElement::Editor { bounds, .. } => {
                bounds.contains(point).then_some(OverlayHit::Editor)
            }
            OverlayElement::Text { id, bounds, .. } => {
                bounds.contains(point).then_some(OverlayHit::Text(*id))
            }
            OverlayElement::Image {
                id,
                bounds,
                handles,
            } => {
                if handles_live
                    && let Some(h) = handles.iter().find(|h| h.bounds.contains(point))
                {
                    return Some(OverlayHit::Handle(*id, h.handle));
                }
                bounds.contains(point).then_some(OverlayHit::Image(*id))
            }
        })
    }
}

/// What resolving a text editor does to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    /// Create a new annotation from the editor content.
    Create,
    /// Replace the content of the bound annotation.
    Update(AnnotationId),
    /// Remove the bound annotation.
    Delete(AnnotationId),
    /// Drop the editor without touching the page.
    Discard,
}

/// The result of resolving a text editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new annotation was created.
    Created(AnnotationId),
    /// The bound annotation was updated.
    Updated(AnnotationId),
    /// The bound annotation was removed.
    Deleted(AnnotationId),
    /// Nothing changed.
    Discarded,
}

/// An open text editor.
///
/// At most one editor is open in a session. An unbound editor creates a new
/// annotation on commit and shows the ambient style until then; a bound
/// editor edits an existing annotation in that annotation's own style.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditor {
    page: usize,
    position: Point,
    text: String,
    bound: Option<AnnotationId>,
    style: Option<TextStyle>,
}

impl TextEditor {
    /// Open an empty editor for a new annotation.
    pub fn unbound(page: usize, position: Point) -> Self {
        Self {
            page,
            position,
            text: String::new(),
            bound: None,
            style: None,
        }
    }

    /// Open an editor on an existing annotation, pre-filled with its text.
    pub fn bound(page: usize, annotation: &TextAnnotation) -> Self {
        Self {
            page,
            position: annotation.position,
            text: annotation.text.clone(),
            bound: Some(annotation.id),
            style: Some(annotation.style),
        }
    }

    /// The page the editor is on.
    pub fn page(&self) -> usize {
        self.page
    }

    /// The top-left corner of the editor.
    pub fn position(&self) -> Point {
        self.position
    }

    /// The current content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The annotation being edited, if any.
    pub fn bound_to(&self) -> Option<AnnotationId> {
        self.bound
    }

    /// Replace the content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// What committing the editor would do.
    pub fn commit_action(&self) -> CommitAction {
        match (self.bound, is_blank(&self.text)) {
            (None, false) => CommitAction::Create,
            (None, true) => CommitAction::Discard,
            (Some(id), false) => CommitAction::Update(id),
            (Some(id), true) => CommitAction::Delete(id),
        }
    }

    pub(crate) fn rescale(&mut self, factor: f64) {
        self.position = (self.position.to_vec2() * factor).to_point();
    }
}

/// A pending image placement, waiting for the host to supply a file.
///
/// A request is only honoured if it is still the session's outstanding
/// request and the session generation has not changed since it was issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRequest {
    pub(crate) ticket: u64,
    pub(crate) page: usize,
    pub(crate) point: Point,
    pub(crate) generation: u64,
}

impl ImageRequest {
    pub(crate) fn new(ticket: u64, page: usize, point: Point, generation: u64) -> Self {
        Self {
            ticket,
            page,
            point,
            generation,
        }
    }

    /// A number identifying the request.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// The page the image goes on.
    pub fn page(&self) -> usize {
        self.page
    }

    /// The remembered click point in viewport space.
    pub fn point(&self) -> Point {
        self.point
    }

    /// The geometry of a `size` by `size` image centered on the click point.
    pub fn placement(&self, size: f64) -> ImageGeometry {
        ImageGeometry {
            position: self.point() - Vec2::new(size / 2.0, size / 2.0),
            width: size,
            height: size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations() -> PageAnnotations {
        PageAnnotations {
            paths: Vec::new(),
            texts: vec![TextAnnotation {
                id: AnnotationId(1),
                position: Point::new(100.0, 200.0),
                text: "Total: R$ 10,00".to_string(),
                style: TextStyle::default(),
            }],
            images: vec![ImageAnnotation {
                id: AnnotationId(2),
                image: crate::store::tests::png(10, 10),
                geometry: ImageGeometry {
                    position: Point::new(250.0, 250.0),
                    width: 100.0,
                    height: 100.0,
                },
            }],
        }
    }

    fn layer(editor: Option<&TextEditor>) -> OverlayLayer {
        OverlayLayer::build(
            0,
            Some(&annotations()),
            editor,
            &TextStyle::default(),
            1.0,
            &EditorSettings::default(),
        )
    }

    #[test]
    fn elements_are_in_paint_order() {
        let layer = layer(None);
        assert!(matches!(layer.elements()[0], OverlayElement::Image { .. }));
        assert!(matches!(layer.elements()[1], OverlayElement::Text { .. }));
    }

    #[test]
    fn text_box_is_hit_with_the_heuristic() {
        let layer = layer(None);
        // 15 chars * 16 * 0.6 = 144 wide, 16 * 1.2 = 19.2 tall.
        assert_eq!(
            layer.hit_test(Point::new(240.0, 215.0), true),
            Some(OverlayHit::Text(AnnotationId(1)))
        );
        assert_eq!(layer.hit_test(Point::new(250.0, 215.0), true), None);
        assert_eq!(layer.hit_test(Point::new(120.0, 225.0), true), None);
    }

    #[test]
    fn handles_take_priority_over_the_image_body() {
        let layer = layer(None);
        let id = AnnotationId(2);
        assert_eq!(
            layer.hit_test(Point::new(252.0, 252.0), true),
            Some(OverlayHit::Handle(id, Handle::Move))
        );
        assert_eq!(
            layer.hit_test(Point::new(345.0, 345.0), true),
            Some(OverlayHit::Handle(id, Handle::Resize))
        );
        assert_eq!(
            layer.hit_test(Point::new(345.0, 255.0), true),
            Some(OverlayHit::Handle(id, Handle::Delete))
        );
        assert_eq!(
            layer.hit_test(Point::new(300.0, 300.0), true),
            Some(OverlayHit::Image(id))
        );
        assert_eq!(
            layer.hit_test(Point::new(252.0, 252.0), false),
            Some(OverlayHit::Image(id))
        );
    }

    #[test]
    fn bound_editor_replaces_its_text() {
        let page = annotations();
        let editor = TextEditor::bound(0, &page.texts()[0]);
        let layer = layer(Some(&editor));

        assert_eq!(layer.elements().len(), 2);
        assert!(matches!(
            layer.elements()[1],
            OverlayElement::Editor {
                bound: Some(AnnotationId(1)),
                ..
            }
        ));
        assert_eq!(
            layer.hit_test(Point::new(110.0, 210.0), true),
            Some(OverlayHit::Editor)
        );
    }

    #[test]
    fn editors_on_other_pages_are_hidden() {
        let editor = TextEditor::unbound(3, Point::new(10.0, 10.0));
        let layer = layer(Some(&editor));
        assert!(
            !layer
                .elements()
                .iter()
                .any(|e| matches!(e, OverlayElement::Editor { .. }))
        );
    }

    #[test]
    fn commit_rules() {
        let mut editor = TextEditor::unbound(0, Point::ZERO);
        assert_eq!(editor.commit_action(), CommitAction::Discard);
        editor.set_text("hello");
        assert_eq!(editor.commit_action(), CommitAction::Create);

        let page = annotations();
        let mut editor = TextEditor::bound(0, &page.texts()[0]);
        assert_eq!(editor.text(), "Total: R$ 10,00");
        assert_eq!(
            editor.commit_action(),
            CommitAction::Update(AnnotationId(1))
        );
        editor.set_text("");
        assert_eq!(
            editor.commit_action(),
            CommitAction::Delete(AnnotationId(1))
        );
    }

    #[test]
    fn placement_is_centered_on_the_click() {
        let request = ImageRequest::new(1, 0, Point::new(300.0, 300.0), 0);
        let g = request.placement(100.0);
        assert_eq!(g.position, Point::new(250.0, 250.0));
        assert_eq!((g.width, g.height), (100.0, 100.0));
    }
}
