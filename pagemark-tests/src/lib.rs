/*!
Fixtures shared by the end-to-end tests: documents generated with
`pdf-writer`, encoded images and helpers that inspect an exported
document with `hayro-syntax`.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use hayro_syntax::Pdf;
use hayro_syntax::object::{Dict, Name};
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pdf_writer::{Finish, Rect, Ref};
use std::io::Cursor;

/// A document with `page_count` blank pages of the given size and rotation.
pub fn blank_pdf(page_count: usize, width: f32, height: f32, rotate: i32) -> Vec<u8> {
    let page_tree_id = Ref::new(2);
    let page_ids: Vec<Ref> = (0..page_count).map(|i| Ref::new(3 + i as i32)).collect();

    let mut pdf = pdf_writer::Pdf::new();
    pdf.catalog(Ref::new(1)).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_count as i32);

    for id in page_ids {
        let mut page = pdf.page(id);
        page.parent(page_tree_id);
        page.media_box(Rect::new(0.0, 0.0, width, height));
        if rotate != 0 {
            page.rotate(rotate);
        }
        page.resources();
        page.finish();
    }

    pdf.finish()
}

/// A solid PNG with an alpha channel.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 120, 220, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encoding a PNG in memory cannot fail");
    out.into_inner()
}

/// A solid JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([220, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg)
        .expect("encoding a JPEG in memory cannot fail");
    out.into_inner()
}

/// Parse an exported document.
pub fn parse(data: Vec<u8>) -> Pdf {
    Pdf::new(std::sync::Arc::new(data)).unwrap_or_else(|_| panic!("exported document should parse"))
}

/// The names of the overlay and image XObjects a page references.
pub fn xobject_names(pdf: &Pdf, page_index: usize) -> Vec<String> {
    let page = &pdf.pages()[page_index];
    let Some(x_objects) = page
        .raw()
        .get::<Dict<'_>>(b"Resources".as_ref())
        .and_then(|r| r.get::<Dict<'_>>(b"XObject".as_ref()))
    else {
        return Vec::new();
    };

    ["Pg", "Im0", "Im1", "Im2"]
        .into_iter()
        .filter(|key| x_objects.contains_key(key.as_bytes()))
        .map(str::to_string)
        .collect()
}

/// The `/BaseFont` of a font resource of a page.
pub fn base_font(pdf: &Pdf, page_index: usize, resource: &str) -> Option<String> {
    let page = &pdf.pages()[page_index];
    let font = page
        .raw()
        .get::<Dict<'_>>(b"Resources".as_ref())?
        .get::<Dict<'_>>(b"Font".as_ref())?
        .get::<Dict<'_>>(resource.as_bytes())?;
    let name = font.get::<Name>(b"BaseFont".as_ref())?;

    Some(String::from_utf8_lossy(name.as_ref()).into_owned())
}

/// The `/MediaBox` of a page.
pub fn media_box(pdf: &Pdf, page_index: usize) -> Option<[f32; 4]> {
    pdf.pages()[page_index]
        .raw()
        .get::<[f32; 4]>(b"MediaBox".as_ref())
}

/// The decoded content stream of a page, as text.
pub fn content_stream(pdf: &Pdf, page_index: usize) -> String {
    let stream = pdf.pages()[page_index].page_stream().unwrap_or_default();
    String::from_utf8_lossy(stream).into_owned()
}
