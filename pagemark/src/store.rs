//! The document session store.
//!
//! A [`Session`] is the single source of truth of an editing session: the
//! loaded document, navigation and zoom state, the ambient context and the
//! annotations of every page. All mutation is synchronous. Each mutation
//! records which layers of which page it invalidated, and the owner drains
//! those records with [`Session::take_invalidations`] to repaint before
//! returning control to the user.

use crate::capture::MountError;
use crate::model::*;
use crate::settings::EditorSettings;
use crate::tool::ToolMode;
use bitflags::bitflags;
use kurbo::Point;
use pagemark_burn::{BurnError, EmbeddedImage, PageFrame, read_page_frames};
use std::collections::BTreeMap;
use std::sync::Arc;

bitflags! {
    /// The layers of a page that need to be redrawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Invalidation: u8 {
        /// The capture surface, replayed from the page's paths.
        const PATHS = 1 << 0;
        /// The overlay render model, rebuilt from texts, images and the
        /// open text editor.
        const OVERLAY = 1 << 1;
    }
}

/// An error that occurred while loading a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The data is not a readable PDF. Encrypted documents that cannot be
    /// opened also end up here.
    Malformed,
    /// The document has no pages.
    NoPages,
    /// The drawing surface of the first page could not be created.
    Surface(MountError),
}

impl core::fmt::Display for LoadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "the document is malformed or unsupported"),
            Self::NoPages => write!(f, "the document has no pages"),
            Self::Surface(e) => write!(f, "failed to create drawing surface: {e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BurnError> for LoadError {
    fn from(e: BurnError) -> Self {
        match e {
            BurnError::NoPages => Self::NoPages,
            _ => Self::Malformed,
        }
    }
}

/// An error for a mutation that cannot be applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No document is loaded.
    NoDocument,
    /// The page index is outside of the document.
    PageOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of pages in the document.
        count: usize,
    },
    /// The zoom factor is not a positive, finite number.
    InvalidZoom,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoDocument => write!(f, "no document is loaded"),
            Self::PageOutOfRange { index, count } => {
                write!(f, "page {index} is out of range (document has {count} pages)")
            }
            Self::InvalidZoom => write!(f, "zoom must be a positive, finite number"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A loaded document.
///
/// The handle is read-only: edits live in the session's annotation state
/// until they are burned into a new document on export.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    data: Arc<[u8]>,
    frames: Vec<PageFrame>,
    name: Option<String>,
}

impl DocumentHandle {
    /// Decode `data` and read the geometry of every page.
    pub fn open(data: impl Into<Arc<[u8]>>, name: Option<&str>) -> Result<Self, LoadError> {
        let data = data.into();
        let frames = read_page_frames(&data)?;

        Ok(Self {
            data,
            frames,
            name: name.map(str::to_string),
        })
    }

    /// The original document bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The number of pages.
    pub fn page_count(&self) -> usize {
        self.frames.len()
    }

    /// The crop box and rotation of a page.
    pub fn frame(&self, page_index: usize) -> Option<&PageFrame> {
        self.frames.get(page_index)
    }

    /// The file name the document was loaded from, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Session-wide ambient state handed to the layers that create annotations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EditorContext {
    /// The active tool.
    pub tool: ToolMode,
    /// Style for new text annotations.
    pub text_style: TextStyle,
    /// Style for new ink paths.
    pub stroke_style: StrokeStyle,
}

/// The state of one editing session.
#[derive(Debug)]
pub struct Session {
    settings: EditorSettings,
    document: Option<DocumentHandle>,
    current_page: usize,
    zoom: f64,
    context: EditorContext,
    pages: BTreeMap<usize, PageAnnotations>,
    next_id: u64,
    generation: u64,
    dirty: BTreeMap<usize, Invalidation>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Session {
    /// Create an empty session.
    pub fn new(settings: EditorSettings) -> Self {
        let context = EditorContext {
            tool: ToolMode::default(),
            text_style: settings.text_style,
            stroke_style: settings.stroke_style,
        };

        Self {
            zoom: settings.initial_zoom,
            settings,
            document: None,
            current_page: 0,
            context,
            pages: BTreeMap::new(),
            next_id: 1,
            generation: 0,
            dirty: BTreeMap::new(),
        }
    }

    /// Load a document, replacing the current one.
    ///
    /// The previous session state is discarded first, so a failed load
    /// leaves the session without a document.
    pub fn load_document(
        &mut self,
        data: impl Into<Arc<[u8]>>,
        name: Option<&str>,
    ) -> Result<(), LoadError> {
        self.close_document();

        let document = DocumentHandle::open(data, name)?;
        log::info!("loaded document with {} page(s)", document.page_count());
        self.document = Some(document);

        Ok(())
    }

    /// Drop the document and every annotation.
    pub fn close_document(&mut self) {
        self.document = None;
        self.current_page = 0;
        self.zoom = self.settings.initial_zoom;
        self.pages.clear();
        self.dirty.clear();
        self.generation += 1;
    }

    /// The settings the session was created with.
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// The loaded document.
    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    /// The number of pages, or 0 without a document.
    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, DocumentHandle::page_count)
    }

    /// The frame of a page.
    pub fn frame(&self, page_index: usize) -> Option<&PageFrame> {
        self.document.as_ref()?.frame(page_index)
    }

    /// The page shown to the user.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// The current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// The ambient context.
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// A counter that changes whenever outstanding asynchronous results
    /// (such as image placements) become meaningless.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Switch tools. Every transition is allowed.
    pub fn set_tool(&mut self, tool: ToolMode) {
        log::debug!("tool: {} -> {tool}", self.context.tool);
        self.context.tool = tool;
    }

    /// Set the ambient text style. Existing annotations keep their own.
    pub fn set_text_style(&mut self, style: TextStyle) {
        self.context.text_style = style;
    }

    /// Set the ambient stroke style. Existing paths keep their own.
    pub fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.context.stroke_style = style;
    }

    /// Navigate to a page.
    pub fn set_current_page(&mut self, page_index: usize) -> Result<(), StoreError> {
        self.check_page(page_index)?;
        self.current_page = page_index;
        Ok(())
    }

    /// Change the zoom factor.
    ///
    /// Stored viewport geometry is rescaled by the ratio of the new to the
    /// old zoom, so annotations keep their document position. Image sizes are
    /// not clamped here; the minimum applies only when an image is placed or
    /// resized. Every page is invalidated and outstanding asynchronous
    /// results are made stale.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), StoreError> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(StoreError::InvalidZoom);
        }

        if zoom == self.zoom {
            return Ok(());
        }

        let factor = zoom / self.zoom;
        for page in self.pages.values_mut() {
            page.rescale(factor);
        }
        log::debug!("zoom: {} -> {zoom}", self.zoom);

        self.zoom = zoom;
        self.generation += 1;
        for index in 0..self.page_count() {
            self.invalidate(index, Invalidation::all());
        }

        Ok(())
    }

    /// The annotations of a page, if it has ever been mutated.
    pub fn page(&self, page_index: usize) -> Option<&PageAnnotations> {
        self.pages.get(&page_index)
    }

    /// Every page with annotation state, in page order.
    pub fn pages(&self) -> impl Iterator<Item = (usize, &PageAnnotations)> {
        self.pages.iter().map(|(index, page)| (*index, page))
    }

    /// The number of annotations across all pages.
    pub fn annotation_count(&self) -> usize {
        self.pages.values().map(PageAnnotations::len).sum()
    }

    /// Commit a freehand path. Paths without points are dropped.
    pub fn add_path(&mut self, page_index: usize, path: PathAnnotation) -> Result<(), StoreError> {
        if path.points.is_empty() {
            log::debug!("dropping empty path on page {page_index}");
            self.check_page(page_index)?;
            return Ok(());
        }

        self.page_mut(page_index)?.paths.push(path);
        self.invalidate(page_index, Invalidation::PATHS);

        Ok(())
    }

    /// Create a text annotation with the given style.
    ///
    /// Returns `None` and creates nothing if `text` is blank.
    pub fn add_text(
        &mut self,
        page_index: usize,
        position: Point,
        text: &str,
        style: TextStyle,
    ) -> Result<Option<AnnotationId>, StoreError> {
        if is_blank(text) {
            self.check_page(page_index)?;
            return Ok(None);
        }

        let id = self.alloc_id();
        self.page_mut(page_index)?.texts.push(TextAnnotation {
            id,
            position,
            text: text.to_string(),
            style,
        });
        self.invalidate(page_index, Invalidation::OVERLAY);
        log::debug!("added text {id} on page {page_index}");

        Ok(Some(id))
    }

    /// Replace the content of a text annotation.
    ///
    /// Blank text deletes the annotation. An unknown id is ignored.
    pub fn update_text(
        &mut self,
        page_index: usize,
        id: AnnotationId,
        text: &str,
    ) -> Result<(), StoreError> {
        if is_blank(text) {
            return self.delete_text(page_index, id);
        }

        self.check_page(page_index)?;
        let Some(annotation) = self
            .pages
            .get_mut(&page_index)
            .and_then(|page| page.texts.iter_mut().find(|t| t.id == id))
        else {
            return Ok(());
        };

        if annotation.text != text {
            annotation.text = text.to_string();
            self.invalidate(page_index, Invalidation::OVERLAY);
        }

        Ok(())
    }

    /// Remove a text annotation. Removing a missing id is a no-op.
    pub fn delete_text(&mut self, page_index: usize, id: AnnotationId) -> Result<(), StoreError> {
        self.check_page(page_index)?;
        let removed = self.pages.get_mut(&page_index).is_some_and(|page| {
            let before = page.texts.len();
            page.texts.retain(|t| t.id != id);
            page.texts.len() != before
        });

        if removed {
            self.invalidate(page_index, Invalidation::OVERLAY);
            log::debug!("deleted text {id} on page {page_index}");
        }

        Ok(())
    }

    /// Place an image. Both sides are raised to the minimum size.
    pub fn add_image(
        &mut self,
        page_index: usize,
        image: EmbeddedImage,
        geometry: ImageGeometry,
    ) -> Result<AnnotationId, StoreError> {
        let geometry = geometry.clamped(self.settings.min_image_size);
        let id = self.alloc_id();
        self.page_mut(page_index)?.images.push(ImageAnnotation {
            id,
            image,
            geometry,
        });
        self.invalidate(page_index, Invalidation::OVERLAY);
        log::debug!("added image {id} on page {page_index}");

        Ok(id)
    }

    /// Move or resize an image. Both sides are raised to the minimum size.
    /// An unknown id is ignored.
    pub fn update_image(
        &mut self,
        page_index: usize,
        id: AnnotationId,
        geometry: ImageGeometry,
    ) -> Result<(), StoreError> {
        self.check_page(page_index)?;
        let geometry = geometry.clamped(self.settings.min_image_size);
        let Some(annotation) = self
            .pages
            .get_mut(&page_index)
            .and_then(|page| page.images.iter_mut().find(|i| i.id == id))
        else {
            return Ok(());
        };

        if annotation.geometry != geometry {
            annotation.geometry = geometry;
            self.invalidate(page_index, Invalidation::OVERLAY);
        }

        Ok(())
    }

    /// Remove an image. Removing a missing id is a no-op.
    pub fn delete_image(&mut self, page_index: usize, id: AnnotationId) -> Result<(), StoreError> {
        self.check_page(page_index)?;
        let removed = self.pages.get_mut(&page_index).is_some_and(|page| {
            let before = page.images.len();
            page.images.retain(|i| i.id != id);
            page.images.len() != before
        });

        if removed {
            self.invalidate(page_index, Invalidation::OVERLAY);
            log::debug!("deleted image {id} on page {page_index}");
        }

        Ok(())
    }

    /// Drain the invalidations recorded since the last call, in page order.
    pub fn take_invalidations(&mut self) -> Vec<(usize, Invalidation)> {
        core::mem::take(&mut self.dirty).into_iter().collect()
    }

    pub(crate) fn invalidate(&mut self, page_index: usize, layers: Invalidation) {
        *self.dirty.entry(page_index).or_default() |= layers;
    }

    pub(crate) fn check_page(&self, page_index: usize) -> Result<(), StoreError> {
        let count = self
            .document
            .as_ref()
            .map(DocumentHandle::page_count)
            .ok_or(StoreError::NoDocument)?;

        if page_index < count {
            Ok(())
        } else {
            Err(StoreError::PageOutOfRange {
                index: page_index,
                count,
            })
        }
    }

    fn page_mut(&mut self, page_index: usize) -> Result<&mut PageAnnotations, StoreError> {
        self.check_page(page_index)?;
        Ok(self.pages.entry(page_index).or_default())
    }

    fn alloc_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Whether text counts as empty for the commit rules.
pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
