//! The editor: a session plus the per-page layers that display it.
//!
//! [`Editor`] owns the [`Session`] and keeps the capture surfaces and
//! overlay render models in sync with it. Every public mutation drains the
//! session's invalidations and repaints the affected layers before it
//! returns, so the layers never show stale state.

use crate::backdrop::{Backdrop, PageRasterizer, page_pixel_size, render_backdrop};
use crate::capture::{Brush, CaptureSurface, MountError};
use crate::drag::{DragKind, DragSession, GestureError};
use crate::export::{DocumentEncoder, ExportError, ExportedFile, PdfEncoder, export_document};
use crate::model::{AnnotationId, ImageGeometry, PageAnnotations, StrokeStyle, TextStyle};
use crate::overlay::*;
use crate::settings::EditorSettings;
use crate::store::{Invalidation, LoadError, Session, StoreError};
use crate::tool::{PointerEvent, Target, ToolMode, route};
use kurbo::Point;
use pagemark_burn::{EmbeddedImage, ImageError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How the editor reacted to a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerResponse {
    /// The event changed or may have changed state.
    Handled,
    /// The event had no effect.
    Ignored,
    /// The host should ask the user for an image file and answer with
    /// [`Editor::complete_image`] or [`Editor::cancel_image`].
    ImageRequested(ImageRequest),
}

/// An interactive annotation editor.
#[derive(Debug)]
pub struct Editor<E = PdfEncoder> {
    session: Session,
    encoder: E,
    surfaces: BTreeMap<usize, CaptureSurface>,
    overlays: Vec<OverlayLayer>,
    text_editor: Option<TextEditor>,
    drag: Option<DragSession>,
    pending_image: Option<ImageRequest>,
    next_ticket: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Editor {
    /// Create an editor that exports PDF.
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_encoder(settings, PdfEncoder)
    }
}

impl<E: DocumentEncoder> Editor<E> {
    /// Create an editor with a custom encoder.
    pub fn with_encoder(settings: EditorSettings, encoder: E) -> Self {
        Self {
            session: Session::new(settings),
            encoder,
            surfaces: BTreeMap::new(),
            overlays: Vec::new(),
            text_editor: None,
            drag: None,
            pending_image: None,
            next_ticket: 1,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The encoder used for exports.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Load a document, discarding the current session.
    pub fn load_document(
        &mut self,
        data: impl Into<Arc<[u8]>>,
        name: Option<&str>,
    ) -> Result<(), LoadError> {
        self.reset_layers();
        self.session.load_document(data, name)?;

        if let Err(e) = self.ensure_surface(0) {
            self.close_document();
            return Err(LoadError::Surface(e));
        }

        let count = self.session.page_count();
        self.overlays = vec![OverlayLayer::default(); count];
        self.flush();

        Ok(())
    }

    /// Drop the document and every annotation.
    pub fn close_document(&mut self) {
        self.reset_layers();
        self.session.close_document();
    }

    /// Switch tools. An open text editor is committed first, and a stroke
    /// still being captured is finished as if the pointer had been released.
    pub fn set_tool(&mut self, tool: ToolMode) {
        self.blur_text_editor();
        let capturing: Vec<usize> = self
            .surfaces
            .iter()
            .filter(|(_, surface)| surface.is_capturing())
            .map(|(&page_index, _)| page_index)
            .collect();
        for page_index in capturing {
            self.capture_release(page_index);
        }
        self.session.set_tool(tool);
    }

    /// Set the style of future text annotations.
    pub fn set_text_style(&mut self, style: TextStyle) {
        self.session.set_text_style(style);
        let unbound_page = self
            .text_editor
            .as_ref()
            .filter(|e| e.bound_to().is_none())
            .map(TextEditor::page);
        if let Some(page_index) = unbound_page {
            // The unbound editor previews the ambient style.
            self.session.invalidate(page_index, Invalidation::OVERLAY);
            self.flush();
        }
    }

    /// Set the style of future ink paths.
    pub fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.session.set_stroke_style(style);
    }

    /// Navigate to a page, mounting its capture surface if necessary.
    pub fn set_current_page(&mut self, page_index: usize) -> Result<(), StoreError> {
        self.session.set_current_page(page_index)?;
        if let Err(e) = self.ensure_surface(page_index) {
            log::warn!("page {page_index} has no drawing surface: {e}");
        }
        Ok(())
    }

    /// Change the zoom factor.
    ///
    /// Annotations keep their document position. Capture surfaces are
    /// recreated at the new size, an in-progress drag is cancelled and an
    /// outstanding image request becomes stale.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), StoreError> {
        let old = self.session.zoom();
        self.session.set_zoom(zoom)?;

        if let Some(editor) = &mut self.text_editor {
            editor.rescale(zoom / old);
        }
        self.drag = None;
        self.pending_image = None;

        let mounted: Vec<usize> = self.surfaces.keys().copied().collect();
        self.surfaces.clear();
        for page_index in mounted {
            if let Err(e) = self.ensure_surface(page_index) {
                log::warn!("page {page_index} has no drawing surface: {e}");
            }
        }
        self.flush();

        Ok(())
    }

    /// The capture surface of a page, if it has been mounted.
    pub fn surface(&self, page_index: usize) -> Option<&CaptureSurface> {
        self.surfaces.get(&page_index)
    }

    /// The overlay render model of a page.
    pub fn overlay(&self, page_index: usize) -> Option<&OverlayLayer> {
        self.overlays.get(page_index)
    }

    /// The open text editor.
    pub fn text_editor(&self) -> Option<&TextEditor> {
        self.text_editor.as_ref()
    }

    /// The drag gesture in progress.
    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// The outstanding image request.
    pub fn pending_image(&self) -> Option<&ImageRequest> {
        self.pending_image.as_ref()
    }

    /// Render the backdrop of a page at the current zoom.
    pub fn render_backdrop(
        &self,
        rasterizer: &impl PageRasterizer,
        page_index: usize,
    ) -> Option<Backdrop> {
        render_backdrop(&self.session, rasterizer, page_index)
    }

    /// Feed a pointer event on a page through the active tool.
    pub fn handle_pointer(&mut self, page_index: usize, event: PointerEvent) -> PointerResponse {
        if self.session.check_page(page_index).is_err() {
            return PointerResponse::Ignored;
        }

        if let Some(drag) = self.drag {
            if drag.page() != page_index {
                return PointerResponse::Ignored;
            }
            let result = match event {
                PointerEvent::Move(p) => self.update_drag(p),
                PointerEvent::Up(p) => self.end_drag(p),
                // A drag only ends on release.
                PointerEvent::Down(_) | PointerEvent::Leave => return PointerResponse::Ignored,
            };
            return match result {
                Ok(()) => PointerResponse::Handled,
                Err(_) => PointerResponse::Ignored,
            };
        }

        let tool = self.session.context().tool;
        match (route(tool), event) {
            (Target::Capture, PointerEvent::Down(p)) => self.capture_press(page_index, p),
            (Target::Capture, PointerEvent::Move(p)) => match self.surfaces.get_mut(&page_index) {
                Some(surface) if surface.is_capturing() => {
                    surface.pointer_move(p);
                    PointerResponse::Handled
                }
                _ => PointerResponse::Ignored,
            },
            (Target::Capture, PointerEvent::Up(_) | PointerEvent::Leave) => {
                self.capture_release(page_index)
            }
            (Target::Overlay, PointerEvent::Down(p)) => self.overlay_press(page_index, p, tool),
            (Target::Overlay, _) => PointerResponse::Ignored,
        }
    }

    fn capture_press(&mut self, page_index: usize, point: Point) -> PointerResponse {
        if self.surfaces.values().any(CaptureSurface::is_capturing) {
            return PointerResponse::Ignored;
        }
        let Some(brush) = Brush::for_context(self.session.context(), self.session.settings())
        else {
            return PointerResponse::Ignored;
        };

        self.blur_text_editor();
        if let Err(e) = self.ensure_surface(page_index) {
            log::warn!("cannot draw on page {page_index}: {e}");
            return PointerResponse::Ignored;
        }
        let Some(surface) = self.surfaces.get_mut(&page_index) else {
            return PointerResponse::Ignored;
        };

        surface.pointer_down(point, brush);
        PointerResponse::Handled
    }

    fn capture_release(&mut self, page_index: usize) -> PointerResponse {
        let Some(surface) = self.surfaces.get_mut(&page_index) else {
            return PointerResponse::Ignored;
        };
        let was_capturing = surface.is_capturing();

        if let Some(path) = surface.pointer_up() {
            log::debug!("committing path with {} point(s)", path.points.len());
            if let Err(e) = self.session.add_path(page_index, path) {
                log::warn!("failed to commit path: {e}");
            }
        }
        // Repaint even if nothing committed, to drop the live preview.
        self.session.invalidate(page_index, Invalidation::PATHS);
        self.flush();

        if was_capturing {
            PointerResponse::Handled
        } else {
            PointerResponse::Ignored
        }
    }

    fn overlay_press(&mut self, page_index: usize, point: Point, tool: ToolMode) -> PointerResponse {
        let hit = self
            .overlays
            .get(page_index)
            .and_then(|o| o.hit_test(point, tool.exposes_image_handles()));

        if hit == Some(OverlayHit::Editor) {
            return PointerResponse::Handled;
        }

        match (tool, hit) {
            (ToolMode::Text, _) => match self.open_text_at(page_index, point) {
                Ok(_) => PointerResponse::Handled,
                Err(_) => PointerResponse::Ignored,
            },
            (_, Some(OverlayHit::Handle(id, handle))) => {
                self.blur_text_editor();
                let result = match handle {
                    Handle::Move => self.begin_drag(page_index, id, DragKind::Move, point),
                    Handle::Resize => self.begin_drag(page_index, id, DragKind::Resize, point),
                    Handle::Delete => {
                        return match self.delete_image(page_index, id) {
                            Ok(()) => PointerResponse::Handled,
                            Err(_) => PointerResponse::Ignored,
                        };
                    }
                };
                match result {
                    Ok(()) => PointerResponse::Handled,
                    Err(e) => {
                        log::debug!("handle press ignored: {e}");
                        PointerResponse::Ignored
                    }
                }
            }
            (ToolMode::Image, _) => {
                self.blur_text_editor();
                match self.request_image(page_index, point) {
                    Ok(request) => PointerResponse::ImageRequested(request),
                    Err(_) => PointerResponse::Ignored,
                }
            }
            _ => {
                let had_editor = self.text_editor.is_some();
                self.blur_text_editor();
                if had_editor {
                    PointerResponse::Handled
                } else {
                    PointerResponse::Ignored
                }
            }
        }
    }

    /// Open a text editor at `point`.
    ///
    /// If the point is inside an existing text annotation, that annotation
    /// is opened for editing; otherwise an empty editor is opened. A
    /// previously open editor is committed first, and its outcome is
    /// returned.
    pub fn open_text_at(
        &mut self,
        page_index: usize,
        point: Point,
    ) -> Result<EditOutcome, StoreError> {
        self.session.check_page(page_index)?;
        let outcome = self.commit_text()?;

        let hit = self
            .overlays
            .get(page_index)
            .and_then(|o| o.hit_test(point, false));
        let existing = match hit {
            Some(OverlayHit::Text(id)) => self
                .session
                .page(page_index)
                .and_then(|page| page.text(id)),
            _ => None,
        };

        let editor = match existing {
            Some(annotation) => TextEditor::bound(page_index, annotation),
            None => TextEditor::unbound(page_index, point),
        };
        log::debug!(
            "opened text editor on page {page_index} (bound: {:?})",
            editor.bound_to()
        );
        self.text_editor = Some(editor);
        self.session.invalidate(page_index, Invalidation::OVERLAY);
        self.flush();

        Ok(outcome)
    }

    /// Replace the content of the open text editor.
    ///
    /// Returns `false` if no editor is open.
    pub fn edit_text(&mut self, text: &str) -> bool {
        let Some(editor) = &mut self.text_editor else {
            return false;
        };
        editor.set_text(text);
        let page_index = editor.page();
        self.session.invalidate(page_index, Invalidation::OVERLAY);
        self.flush();
        true
    }

    /// Resolve the open text editor (blur or Enter).
    ///
    /// Non-blank text creates or updates an annotation. Blank text deletes
    /// a bound annotation and discards an unbound editor. The style of a new
    /// annotation is the ambient style at this moment.
    pub fn commit_text(&mut self) -> Result<EditOutcome, StoreError> {
        let Some(editor) = self.text_editor.take() else {
            return Ok(EditOutcome::Discarded);
        };
        let page_index = editor.page();
        self.session.invalidate(page_index, Invalidation::OVERLAY);

        let outcome = match editor.commit_action() {
            CommitAction::Create => {
                let style = self.session.context().text_style;
                self.session
                    .add_text(page_index, editor.position(), editor.text(), style)
                    .map(|id| id.map_or(EditOutcome::Discarded, EditOutcome::Created))
            }
            CommitAction::Update(id) => self
                .session
                .update_text(page_index, id, editor.text())
                .map(|()| EditOutcome::Updated(id)),
            CommitAction::Delete(id) => self
                .session
                .delete_text(page_index, id)
                .map(|()| EditOutcome::Deleted(id)),
            CommitAction::Discard => Ok(EditOutcome::Discarded),
        };
        self.flush();

        outcome
    }

    /// The delete affordance of the open text editor.
    ///
    /// Closes the editor without applying its content; a bound annotation
    /// is removed.
    pub fn delete_edited_text(&mut self) -> Result<EditOutcome, StoreError> {
        let Some(editor) = self.text_editor.take() else {
            return Ok(EditOutcome::Discarded);
        };
        let page_index = editor.page();
        self.session.invalidate(page_index, Invalidation::OVERLAY);

        let outcome = match editor.bound_to() {
            Some(id) => self
                .session
                .delete_text(page_index, id)
                .map(|()| EditOutcome::Deleted(id)),
            None => Ok(EditOutcome::Discarded),
        };
        self.flush();

        outcome
    }

    /// Remember `point` for an image placement and issue a request for the
    /// host to fulfil. Any earlier request becomes stale.
    pub fn request_image(
        &mut self,
        page_index: usize,
        point: Point,
    ) -> Result<ImageRequest, StoreError> {
        self.session.check_page(page_index)?;

        let request = ImageRequest::new(
            self.next_ticket,
            page_index,
            point,
            self.session.generation(),
        );
        self.next_ticket += 1;
        self.pending_image = Some(request);
        log::debug!("image request {} on page {page_index}", request.ticket());

        Ok(request)
    }

    /// Answer an image request with the chosen file.
    ///
    /// Returns `Ok(None)` if the request is stale: it was cancelled, replaced
    /// by a newer one, or the document or zoom changed in the meantime. An
    /// undecodable file discards the request and is reported as an error.
    pub fn complete_image(
        &mut self,
        request: ImageRequest,
        data: impl Into<Arc<[u8]>>,
    ) -> Result<Option<AnnotationId>, ImageError> {
        if self.pending_image != Some(request) || request.generation != self.session.generation() {
            log::warn!("discarding result of stale image request {}", request.ticket());
            return Ok(None);
        }
        self.pending_image = None;

        let image = EmbeddedImage::decode(data)
            .inspect_err(|e| log::warn!("discarding undecodable image: {e}"))?;
        let geometry = request.placement(self.session.settings().default_image_size);

        match self.session.add_image(request.page(), image, geometry) {
            Ok(id) => {
                self.flush();
                Ok(Some(id))
            }
            Err(e) => {
                log::warn!("failed to place image: {e}");
                Ok(None)
            }
        }
    }

    /// The user dismissed the file chooser. Returns whether `request` was
    /// the outstanding request.
    pub fn cancel_image(&mut self, request: ImageRequest) -> bool {
        if self.pending_image == Some(request) {
            self.pending_image = None;
            true
        } else {
            false
        }
    }

    /// Remove an image. Removing a missing id is a no-op.
    pub fn delete_image(&mut self, page_index: usize, id: AnnotationId) -> Result<(), StoreError> {
        self.session.delete_image(page_index, id)?;
        if self.drag.is_some_and(|d| d.target() == id) {
            self.drag = None;
        }
        self.flush();
        Ok(())
    }

    /// Start moving or resizing an image.
    pub fn begin_drag(
        &mut self,
        page_index: usize,
        id: AnnotationId,
        kind: DragKind,
        pointer: Point,
    ) -> Result<(), GestureError> {
        if self.drag.is_some() || self.surfaces.values().any(CaptureSurface::is_capturing) {
            return Err(GestureError::Busy);
        }

        let geometry = self
            .session
            .page(page_index)
            .and_then(|page| page.image(id))
            .map(|image| image.geometry)
            .ok_or(GestureError::UnknownTarget(id))?;

        self.drag = Some(DragSession::start(
            page_index,
            id,
            kind,
            pointer,
            geometry,
            self.session.settings().min_image_size,
        ));
        log::debug!("{kind:?} drag of image {id} started");

        Ok(())
    }

    /// Continue the drag in progress.
    pub fn update_drag(&mut self, pointer: Point) -> Result<(), GestureError> {
        let drag = self.drag.ok_or(GestureError::NoGesture)?;
        self.apply_drag(&drag, drag.update(pointer))
    }

    /// Finish the drag in progress.
    pub fn end_drag(&mut self, pointer: Point) -> Result<(), GestureError> {
        let drag = self.drag.take().ok_or(GestureError::NoGesture)?;
        self.apply_drag(&drag, drag.end(pointer))
    }

    /// Abandon the drag in progress, leaving the image where the last
    /// update put it.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    fn apply_drag(
        &mut self,
        drag: &DragSession,
        geometry: ImageGeometry,
    ) -> Result<(), GestureError> {
        self.session
            .update_image(drag.page(), drag.target(), geometry)
            .map_err(|_| GestureError::UnknownTarget(drag.target()))?;
        self.flush();
        Ok(())
    }

    /// Burn every annotation into a new document.
    ///
    /// An open text editor is committed first. Annotation state is left as
    /// it is, whether or not the export succeeds.
    pub fn export_document(&mut self) -> Result<ExportedFile, ExportError> {
        self.blur_text_editor();
        export_document(&self.session, &mut self.encoder)
    }

    fn blur_text_editor(&mut self) {
        if let Err(e) = self.commit_text() {
            log::warn!("failed to commit text: {e}");
        }
    }

    /// Mount the capture surface of a page unless it already exists.
    fn ensure_surface(&mut self, page_index: usize) -> Result<(), MountError> {
        if self.surfaces.contains_key(&page_index) {
            return Ok(());
        }

        let (width, height) = page_pixel_size(&self.session, page_index).unwrap_or((0, 0));
        let mut surface = CaptureSurface::mount(width, height)?;
        if let Some(page) = self.session.page(page_index) {
            surface.replay(page.paths());
        }
        self.surfaces.insert(page_index, surface);

        Ok(())
    }

    fn reset_layers(&mut self) {
        self.surfaces.clear();
        self.overlays.clear();
        self.text_editor = None;
        self.drag = None;
        self.pending_image = None;
    }

    /// Repaint every layer the session has invalidated.
    fn flush(&mut self) {
        for (page_index, layers) in self.session.take_invalidations() {
            if layers.contains(Invalidation::PATHS)
                && let Some(surface) = self.surfaces.get_mut(&page_index)
            {
                surface.replay(
                    self.session
                        .page(page_index)
                        .map(PageAnnotations::paths)
                        .unwrap_or_default(),
                );
            }

            if layers.contains(Invalidation::OVERLAY)
                && let Some(overlay) = self.overlays.get_mut(page_index)
            {
                *overlay = OverlayLayer::build(
                    page_index,
                    self.session.page(page_index),
                    self.text_editor.as_ref(),
                    &self.session.context().text_style,
                    self.session.zoom(),
                    self.session.settings(),
                );
            }
        }
    }
}
