//! Page backdrops rendered with hayro.

use hayro::RenderSettings;
use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use pagemark::{Backdrop, PageRasterizer};

/// Renders page backdrops with hayro.
#[derive(Default)]
pub struct HayroRasterizer {
    pdf: Option<Pdf>,
}

impl HayroRasterizer {
    /// Parse `data` for rendering. A document hayro cannot read renders no
    /// backdrops, which leaves the editor usable on a blank page.
    pub fn load(data: &[u8]) -> Self {
        let pdf = match Pdf::new(std::sync::Arc::new(data.to_vec())) {
            Ok(pdf) => Some(pdf),
            Err(_) => {
                log::warn!("failed to parse document for rendering");
                None
            }
        };

        Self { pdf }
    }
}

impl PageRasterizer for HayroRasterizer {
    fn rasterize(&self, page_index: usize, target_width: u32) -> Option<Backdrop> {
        let page = self.pdf.as_ref()?.pages().get(page_index)?;
        let (base_width, _) = page.render_dimensions();
        if base_width <= 0.0 {
            return None;
        }

        let scale = target_width as f32 / base_width;
        let render_settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            ..Default::default()
        };

        let pixmap = hayro::render(page, &InterpreterSettings::default(), &render_settings);
        let width = u32::from(pixmap.width());
        let height = u32::from(pixmap.height());
        let mut rgba: Vec<u8> = bytemuck::cast_vec(pixmap.take_unpremultiplied());
        flatten_onto_white(&mut rgba);

        Some(Backdrop {
            width,
            height,
            rgba,
        })
    }
}

/// Composite straight RGBA pixels onto an opaque white page.
pub(crate) fn flatten_onto_white(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let alpha = u16::from(px[3]);
        for c in &mut px[..3] {
            let blended = u16::from(*c) * alpha + 255 * (255 - alpha);
            *c = ((blended + 127) / 255) as u8;
        }
        px[3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_pixels_become_white() {
        let mut rgba = vec![0, 0, 0, 0, 10, 20, 30, 255, 0, 0, 0, 128];
        flatten_onto_white(&mut rgba);
        assert_eq!(rgba, vec![255, 255, 255, 255, 10, 20, 30, 255, 127, 127, 127, 255]);
    }

    #[test]
    fn unreadable_documents_render_nothing() {
        let rasterizer = HayroRasterizer::load(b"definitely not a pdf");
        assert!(rasterizer.rasterize(0, 100).is_none());
    }
}
