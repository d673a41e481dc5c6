//! Content stream generation for burned-in overlays.
//!
//! An annotated page is rebuilt as the original page (drawn as a form
//! XObject) followed by one content stream holding every overlay
//! instruction. These functions generate that stream and report which
//! resources it refers to.

use crate::coord::PageRotation;
use crate::embed::EmbeddedImage;
use crate::types::*;
use kurbo::{Point, Vec2};
use pdf_writer::types::{LineCapStyle, LineJoinStyle};
use pdf_writer::{Content, Name, Str};
use std::collections::BTreeSet;

/// The resource name under which the original page is drawn.
pub(crate) const PAGE_XOBJECT: &[u8] = b"Pg";

/// The resource name of a standard font.
pub(crate) fn font_resource_name(font: StandardFont) -> &'static [u8] {
    match font {
        StandardFont::Helvetica => b"Helv",
        StandardFont::TimesRoman => b"TiRo",
        StandardFont::Courier => b"Cour",
    }
}

/// The resource name of the `index`-th image on a page.
pub(crate) fn image_resource_name(index: usize) -> String {
    format!("Im{index}")
}

/// A generated page content stream and the resources it uses.
pub(crate) struct PageContent<'a> {
    pub(crate) content: Vec<u8>,
    pub(crate) fonts: BTreeSet<StandardFont>,
    /// Images in resource-name order (`Im0`, `Im1`, ...).
    pub(crate) images: Vec<&'a EmbeddedImage>,
}

/// The unit vector pointing right along the displayed page, in document
/// space.
fn display_right(rotation: PageRotation) -> Vec2 {
    match rotation {
        PageRotation::None => Vec2::new(1.0, 0.0),
        PageRotation::Quarter => Vec2::new(0.0, 1.0),
        PageRotation::Half => Vec2::new(-1.0, 0.0),
        PageRotation::ThreeQuarters => Vec2::new(0.0, -1.0),
    }
}

/// Generate the full content stream of a rebuilt page: the original page
/// XObject followed by the overlay instructions in order.
pub(crate) fn generate_page_content<'a>(
    instructions: &[&'a DrawInstruction],
    rotation: PageRotation,
) -> PageContent<'a> {
    let mut content = Content::new();
    let mut fonts = BTreeSet::new();
    let mut images = Vec::new();

    content
        .save_state()
        .x_object(Name(PAGE_XOBJECT))
        .restore_state();

    for instruction in instructions {
        match instruction {
            DrawInstruction::Path(path) => draw_path(&mut content, path),
            DrawInstruction::Text(text) => {
                fonts.insert(text.font);
                draw_text(&mut content, text, rotation);
            }
            DrawInstruction::Image(image) => {
                let name = image_resource_name(images.len());
                images.push(&image.image);
                draw_image(&mut content, image, name.as_bytes());
            }
        }
    }

    PageContent {
        content: content.finish().into_vec(),
        fonts,
        images,
    }
}

/// Stroke a freehand polyline with round caps and joins.
///
/// A single-point path becomes a zero-length segment, which the round cap
/// renders as a dot.
fn draw_path(content: &mut Content, path: &PathDraw) {
    let Some(first) = path.points.first() else {
        return;
    };

    content
        .save_state()
        .set_stroke_rgb(path.color.r, path.color.g, path.color.b)
        .set_line_width(path.width)
        .set_line_cap(LineCapStyle::RoundCap)
        .set_line_join(LineJoinStyle::RoundJoin);

    content.move_to(first.x as f32, first.y as f32);
    if path.points.len() == 1 {
        content.line_to(first.x as f32, first.y as f32);
    } else {
        for point in &path.points[1..] {
            content.line_to(point.x as f32, point.y as f32);
        }
    }

    content.stroke().restore_state();
}

/// The baseline origin for text anchored at its top-left corner.
pub(crate) fn text_baseline(anchor: Point, font_size: f32, rotation: PageRotation) -> Point {
    let right = display_right(rotation);
    // Displayed "down", a clockwise quarter turn from "right".
    let down = Vec2::new(right.y, -right.x);
    anchor + down * f64::from(font_size)
}

fn draw_text(content: &mut Content, text: &TextDraw, rotation: PageRotation) {
    let right = display_right(rotation);
    let baseline = text_baseline(text.anchor, text.font_size, rotation);
    let encoded = encode_win_ansi(&text.text);

    content.begin_text();
    content.set_font(Name(font_resource_name(text.font)), text.font_size);
    content.set_fill_rgb(text.color.r, text.color.g, text.color.b);
    content.set_text_matrix([
        right.x as f32,
        right.y as f32,
        -right.y as f32,
        right.x as f32,
        baseline.x as f32,
        baseline.y as f32,
    ]);
    content.show(Str(&encoded));
    content.end_text();
}

fn draw_image(content: &mut Content, image: &ImageDraw, name: &[u8]) {
    content
        .save_state()
        .transform(image.transform())
        .x_object(Name(name))
        .restore_state();
}

/// Encode text for a standard font using `WinAnsiEncoding`.
///
/// Characters outside the encoding are replaced by `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u8,
            _ => win_ansi_special(c).unwrap_or(b'?'),
        })
        .collect()
}

/// The `0x80..=0x9F` block of `WinAnsiEncoding`.
fn win_ansi_special(c: char) -> Option<u8> {
    let code = match c {
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(code)
}
