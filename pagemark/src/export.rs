//! Burning the session's annotations into a new document.

use crate::model::{Annotation, PageAnnotations};
use crate::store::{DocumentHandle, Session};
use kurbo::Point;
use pagemark_burn::{
    BurnError, DrawInstruction, ImageDraw, PageFrame, PageInstructions, PathDraw, TextDraw,
    burn_in, viewport_to_document,
};

/// Produces document bytes from the original document and per-page draw
/// instructions in document space.
pub trait DocumentEncoder {
    /// Encode a new document.
    fn encode(
        &mut self,
        document: &DocumentHandle,
        pages: &[PageInstructions],
    ) -> Result<Vec<u8>, BurnError>;
}

/// The PDF encoder, backed by [`pagemark_burn::burn_in`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfEncoder;

impl DocumentEncoder for PdfEncoder {
    fn encode(
        &mut self,
        document: &DocumentHandle,
        pages: &[PageInstructions],
    ) -> Result<Vec<u8>, BurnError> {
        burn_in(document.data(), pages)
    }
}

/// An error that occurred while exporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// No document is loaded.
    NoDocument,
    /// The encoder failed. Annotation state is unaffected.
    Encode(BurnError),
}

impl core::fmt::Display for ExportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoDocument => write!(f, "no document is loaded"),
            Self::Encode(e) => write!(f, "failed to encode document: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            Self::NoDocument => None,
        }
    }
}

impl From<BurnError> for ExportError {
    fn from(e: BurnError) -> Self {
        Self::Encode(e)
    }
}

/// An exported document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// The suggested file name, `<stem>-edited.pdf`.
    pub file_name: String,
    /// The document bytes.
    pub bytes: Vec<u8>,
}

/// The export file name for a document called `name`.
///
/// A trailing `.pdf` extension (in any case) is dropped from `name`; without
/// a usable name, `fallback` is used as the stem.
pub fn export_file_name(name: Option<&str>, fallback: &str) -> String {
    let stem = name
        .map(|n| {
            let n = n.trim();
            match n.len().checked_sub(4) {
                Some(split) if n.is_char_boundary(split) && n[split..].eq_ignore_ascii_case(".pdf") => {
                    &n[..split]
                }
                _ => n,
            }
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or(fallback);

    format!("{stem}-edited.pdf")
}

/// Convert one page's annotations to document-space draw instructions:
/// paths in insertion order, then images, then text.
pub fn page_instructions(
    page_index: usize,
    annotations: &PageAnnotations,
    frame: &PageFrame,
    zoom: f64,
) -> PageInstructions {
    let to_doc = |p: Point| viewport_to_document(p, frame, zoom);
    let mut page = PageInstructions::new(page_index);

    for annotation in annotations.iter() {
        let instruction = match annotation {
            Annotation::Path(path) => DrawInstruction::Path(PathDraw {
                points: path.points.iter().copied().map(to_doc).collect(),
                color: path.color,
                width: (path.width / zoom) as f32,
            }),
            Annotation::Image(image) => {
                let r = image.geometry.rect();
                DrawInstruction::Image(ImageDraw {
                    image: image.image.clone(),
                    bottom_left: to_doc(Point::new(r.x0, r.y1)),
                    bottom_right: to_doc(Point::new(r.x1, r.y1)),
                    top_left: to_doc(Point::new(r.x0, r.y0)),
                })
            }
            Annotation::Text(text) => DrawInstruction::Text(TextDraw {
                text: text.text.clone(),
                anchor: to_doc(text.position),
                font_size: text.style.font_size as f32,
                font: text.style.font,
                color: text.style.color,
            }),
        };
        page.push(instruction);
    }

    page
}

/// Convert the whole session to draw instructions, one entry per page with
/// annotations.
pub fn build_instructions(session: &Session) -> Vec<PageInstructions> {
    session
        .pages()
        .filter(|(_, page)| !page.is_empty())
        .filter_map(|(index, page)| {
            let frame = session.frame(index)?;
            Some(page_instructions(index, page, frame, session.zoom()))
        })
        .collect()
}

/// Export the session through `encoder`.
///
/// The session is only read; a failed export can simply be retried.
pub fn export_document(
    session: &Session,
    encoder: &mut impl DocumentEncoder,
) -> Result<ExportedFile, ExportError> {
    let document = session.document().ok_or(ExportError::NoDocument)?;
    let pages = build_instructions(session);
    let bytes = encoder.encode(document, &pages)?;
    let file_name = export_file_name(document.name(), &session.settings().export_stem);

    log::info!(
        "exported {} annotated page(s) as {file_name} ({} bytes)",
        pages.len(),
        bytes.len()
    );

    Ok(ExportedFile { file_name, bytes })
}
