//! The burn-in writer.
//!
//! Pages that carry overlay instructions are rebuilt: the original page is
//! extracted as a form XObject with `hayro-write`, and a new page with the
//! same crop box and rotation draws it followed by the overlay. Pages
//! without instructions are copied as they are. The result is a new,
//! standalone PDF whose annotated pages no longer contain anything editable.

use crate::content::{PAGE_XOBJECT, font_resource_name, generate_page_content, image_resource_name};
use crate::coord::{PageFrame, PageRotation};
use crate::embed::{ImageError, write_image_xobject};
use crate::types::*;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use hayro_syntax::Pdf;
use hayro_syntax::page::{Page, Rotation};
use kurbo::Rect;
use pdf_writer::{Chunk, Filter, Finish, Name, Ref};
use std::collections::BTreeMap;
use std::io::Write;

/// An error that occurred while burning overlays into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurnError {
    /// The original PDF could not be parsed.
    InvalidPdf,
    /// The original PDF has no pages.
    NoPages,
    /// An invalid page index was specified.
    InvalidPageIndex(usize),
    /// An image could not be embedded.
    Image(ImageError),
    /// An I/O error occurred while compressing a stream.
    IoError(String),
}

impl core::fmt::Display for BurnError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPdf => write!(f, "invalid PDF"),
            Self::NoPages => write!(f, "PDF has no pages"),
            Self::InvalidPageIndex(i) => write!(f, "invalid page index: {i}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::IoError(s) => write!(f, "I/O error: {s}"),
        }
    }
}

impl std::error::Error for BurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for BurnError {
    fn from(e: ImageError) -> Self {
        Self::Image(e)
    }
}

/// Deflate-compress data.
pub(crate) fn deflate_encode(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut e = ZlibEncoder::new(Vec::new(), Compression::new(6));
    e.write_all(data)?;
    e.finish()
}

/// A reference allocator that tracks the next available object number.
struct RefAllocator {
    next: i32,
}

impl RefAllocator {
    fn new(start: i32) -> Self {
        Self { next: start }
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next);
        self.next += 1;
        r
    }
}

fn page_frame(page: &Page<'_>) -> PageFrame {
    let crop = page.intersected_crop_box();
    let rotation = match page.rotation() {
        Rotation::None => PageRotation::None,
        Rotation::Horizontal => PageRotation::Quarter,
        Rotation::Flipped => PageRotation::Half,
        Rotation::FlippedHorizontal => PageRotation::ThreeQuarters,
    };

    PageFrame {
        crop_box: Rect::new(crop.x0, crop.y0, crop.x1, crop.y1),
        rotation,
    }
}

/// Read the frame (crop box and rotation) of every page of a PDF.
///
/// This is the decoding half of the document boundary: it validates that
/// the data is a readable PDF with at least one page.
pub fn read_page_frames(original_data: &[u8]) -> Result<Vec<PageFrame>, BurnError> {
    let pdf = Pdf::new(std::sync::Arc::new(original_data.to_vec())).map_err(|_| BurnError::InvalidPdf)?;
    let frames: Vec<PageFrame> = pdf.pages().iter().map(page_frame).collect();

    if frames.is_empty() {
        return Err(BurnError::NoPages);
    }

    Ok(frames)
}

/// Burn draw instructions into the pages of a PDF.
///
/// # Arguments
/// * `original_data`: the original PDF file bytes
/// * `pages`: per-page instructions in document space; several entries
///   for the same page are drawn in the order given
///
/// # Returns
/// Complete PDF bytes of the new document.
pub fn burn_in(original_data: &[u8], pages: &[PageInstructions]) -> Result<Vec<u8>, BurnError> {
    use hayro_write::ExtractionQuery;

    let pdf = Pdf::new(std::sync::Arc::new(original_data.to_vec())).map_err(|_| BurnError::InvalidPdf)?;
    let source_pages = pdf.pages();
    let num_pages = source_pages.len();

    if num_pages == 0 {
        return Err(BurnError::NoPages);
    }

    let mut overlays: BTreeMap<usize, Vec<&DrawInstruction>> = BTreeMap::new();
    for page in pages {
        if page.page_index >= num_pages {
            return Err(BurnError::InvalidPageIndex(page.page_index));
        }
        if !page.is_empty() {
            overlays
                .entry(page.page_index)
                .or_default()
                .extend(page.instructions.iter());
        }
    }

    let mut next_ref = Ref::new(1);
    let mut alloc = || {
        let r = next_ref;
        next_ref = Ref::new(next_ref.get() + 1);
        r
    };

    let catalog_ref = alloc();
    let page_tree_ref = alloc();

    // Annotated pages become XObjects to draw underneath the overlay;
    // everything else is copied as a regular page.
    let queries: Vec<ExtractionQuery> = (0..num_pages)
        .map(|idx| {
            if overlays.contains_key(&idx) {
                ExtractionQuery::new_xobject(idx)
            } else {
                ExtractionQuery::new_page(idx)
            }
        })
        .collect();

    let extracted = hayro_write::extract(
        &pdf,
        Box::new(|| {
            let r = next_ref;
            next_ref = Ref::new(next_ref.get() + 1);
            r
        }),
        &queries,
    )
    .map_err(|_| BurnError::InvalidPdf)?;

    let root_refs: Vec<Ref> = extracted
        .root_refs
        .iter()
        .map(|r| r.as_ref().map_err(|_| BurnError::InvalidPdf).copied())
        .collect::<Result<Vec<_>, _>>()?;

    let mut overlay_chunk = Chunk::new();
    let mut refs = RefAllocator::new(next_ref.get());
    let mut font_refs: BTreeMap<StandardFont, Ref> = BTreeMap::new();
    let mut page_refs = Vec::with_capacity(num_pages);

    for (idx, root_ref) in root_refs.iter().copied().enumerate() {
        let Some(instructions) = overlays.get(&idx) else {
            page_refs.push(root_ref);
            continue;
        };

        let frame = page_frame(&source_pages[idx]);
        let generated = generate_page_content(instructions, frame.rotation);

        for font in &generated.fonts {
            if !font_refs.contains_key(font) {
                let font_ref = refs.alloc();
                overlay_chunk
                    .type1_font(font_ref)
                    .base_font(Name(font.base_font()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                font_refs.insert(*font, font_ref);
            }
        }

        let mut image_refs = Vec::with_capacity(generated.images.len());
        for image in &generated.images {
            image_refs.push(write_image_xobject(
                &mut overlay_chunk,
                &mut || refs.alloc(),
                image,
            )?);
        }

        let content_ref = refs.alloc();
        let encoded =
            deflate_encode(&generated.content).map_err(|e| BurnError::IoError(e.to_string()))?;
        overlay_chunk
            .stream(content_ref, &encoded)
            .filter(Filter::FlateDecode);

        let page_ref = refs.alloc();
        let crop = frame.crop_box;
        let mut page = overlay_chunk.page(page_ref);
        page.parent(page_tree_ref);
        page.media_box(pdf_writer::Rect::new(
            crop.x0 as f32,
            crop.y0 as f32,
            crop.x1 as f32,
            crop.y1 as f32,
        ));
        if frame.rotation != PageRotation::None {
            page.rotate(frame.rotation.degrees());
        }
        page.contents(content_ref);

        let mut resources = page.resources();
        let mut x_objects = resources.x_objects();
        x_objects.pair(Name(PAGE_XOBJECT), root_ref);
        for (i, image_ref) in image_refs.iter().enumerate() {
            let name = image_resource_name(i);
            x_objects.pair(Name(name.as_bytes()), *image_ref);
        }
        x_objects.finish();

        if !generated.fonts.is_empty() {
            let mut fonts = resources.fonts();
            for font in &generated.fonts {
                fonts.pair(Name(font_resource_name(*font)), font_refs[font]);
            }
            fonts.finish();
        }
        resources.finish();
        page.finish();

        log::debug!(
            "burned {} instruction(s) into page {idx}",
            instructions.len()
        );
        page_refs.push(page_ref);
    }

    let mut out_pdf = pdf_writer::Pdf::new();
    out_pdf.catalog(catalog_ref).pages(page_tree_ref);

    let count = page_refs.len() as i32;
    out_pdf
        .pages(page_tree_ref)
        .kids(page_refs.iter().copied())
        .count(count);

    out_pdf.extend(&extracted.chunk);
    out_pdf.extend(&overlay_chunk);

    Ok(out_pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_round_trips_through_flate2() {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let data = b"q /Pg Do Q BT ET".repeat(10);
        let encoded = deflate_encode(&data).unwrap();
        let mut decoded = Vec::new();
        ZlibDecoder::new(encoded.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn ref_allocator_is_sequential() {
        let mut refs = RefAllocator::new(7);
        assert_eq!(refs.alloc(), Ref::new(7));
        assert_eq!(refs.alloc(), Ref::new(8));
    }

    #[test]
    fn garbage_is_not_a_pdf() {
        for data in [b"not a pdf".as_slice(), b"%PDF-1.7 garbage".as_slice()] {
            assert!(matches!(
                burn_in(data, &[]),
                Err(BurnError::InvalidPdf | BurnError::NoPages)
            ));
            assert!(matches!(
                read_page_frames(data),
                Err(BurnError::InvalidPdf | BurnError::NoPages)
            ));
        }
    }
}
