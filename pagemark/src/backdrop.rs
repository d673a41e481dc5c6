//! Rasterized page backdrops.

use crate::store::Session;

/// A rendered page in straight RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backdrop {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA bytes, row by row.
    pub rgba: Vec<u8>,
}

/// Renders document pages into backdrop images.
pub trait PageRasterizer {
    /// Render a page so that it is `target_width` pixels wide, preserving
    /// its aspect ratio. Returns `None` if the page cannot be rendered.
    fn rasterize(&self, page_index: usize, target_width: u32) -> Option<Backdrop>;
}

/// The pixel size of a page's layers at the session's zoom.
pub fn page_pixel_size(session: &Session, page_index: usize) -> Option<(u32, u32)> {
    let (w, h) = session.frame(page_index)?.viewport_size(session.zoom());
    Some((w.ceil() as u32, h.ceil() as u32))
}

/// Render the backdrop of a page at the session's zoom.
pub fn render_backdrop(
    session: &Session,
    rasterizer: &impl PageRasterizer,
    page_index: usize,
) -> Option<Backdrop> {
    let (width, _) = page_pixel_size(session, page_index)?;
    let backdrop = rasterizer.rasterize(page_index, width)?;

    if backdrop.rgba.len() != backdrop.width as usize * backdrop.height as usize * 4 {
        log::warn!("rasterizer returned a malformed backdrop for page {page_index}");
        return None;
    }

    Some(backdrop)
}
