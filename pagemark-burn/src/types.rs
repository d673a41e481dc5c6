//! Draw instruction definitions.

use crate::embed::EmbeddedImage;
use kurbo::Point;

/// An RGB color with components in the 0.0..1.0 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
}

impl Color {
    /// Create a new color.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        )
    }

    /// Parse a `#rrggbb` or `rrggbb` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let channel = |range: core::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::from_rgb8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// The color as 8-bit channels.
    pub fn to_rgb8(self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Black.
    pub fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// White.
    pub fn white() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Red.
    pub fn red() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// One of the standard PDF fonts that can be used without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum StandardFont {
    /// Helvetica (sans-serif).
    #[default]
    Helvetica,
    /// Times-Roman (serif).
    TimesRoman,
    /// Courier (monospace).
    Courier,
}

impl StandardFont {
    /// The PostScript name written as `/BaseFont`.
    pub fn base_font(self) -> &'static [u8] {
        match self {
            Self::Helvetica => b"Helvetica",
            Self::TimesRoman => b"Times-Roman",
            Self::Courier => b"Courier",
        }
    }

    /// Map a CSS-like family name onto a standard font.
    ///
    /// Unknown families fall back to Helvetica.
    pub fn from_family(family: &str) -> Self {
        let family = family.to_ascii_lowercase();
        if family.contains("courier") || family.contains("mono") {
            Self::Courier
        } else if family.contains("times") || family == "serif" {
            Self::TimesRoman
        } else {
            Self::Helvetica
        }
    }
}

/// A line of text to burn into a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    /// The text to draw. Must not be empty.
    pub text: String,
    /// The top-left anchor of the text box in document space.
    ///
    /// The baseline is placed one font size below the anchor, measured
    /// along the page's display orientation.
    pub anchor: Point,
    /// The font size in points.
    pub font_size: f32,
    /// The font.
    pub font: StandardFont,
    /// The fill color.
    pub color: Color,
}

/// A freehand polyline to burn into a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDraw {
    /// The polyline vertices in document space. Must not be empty.
    pub points: Vec<Point>,
    /// The stroke color.
    pub color: Color,
    /// The stroke width in points.
    pub width: f32,
}

/// An image to burn into a page.
///
/// The three corners are the displayed bottom-left, bottom-right and
/// top-left of the image, in document space. Together they fully determine
/// the placement, including any page rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDraw {
    /// The decoded image payload.
    pub image: EmbeddedImage,
    /// Displayed bottom-left corner.
    pub bottom_left: Point,
    /// Displayed bottom-right corner.
    pub bottom_right: Point,
    /// Displayed top-left corner.
    pub top_left: Point,
}

impl ImageDraw {
    /// The matrix that maps the unit square onto the image placement.
    pub fn transform(&self) -> [f32; 6] {
        let o = self.bottom_left;
        let u = self.bottom_right - o;
        let v = self.top_left - o;
        [
            u.x as f32, u.y as f32, v.x as f32, v.y as f32, o.x as f32, o.y as f32,
        ]
    }
}

/// A single drawing operation on a page, in document space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawInstruction {
    /// A freehand stroke.
    Path(PathDraw),
    /// A line of text.
    Text(TextDraw),
    /// A raster image.
    Image(ImageDraw),
}

/// The ordered draw instructions for one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageInstructions {
    /// The zero-based page index.
    pub page_index: usize,
    /// The instructions, drawn in order on top of the page content.
    pub instructions: Vec<DrawInstruction>,
}

impl PageInstructions {
    /// Create an empty instruction list for a page.
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            instructions: Vec::new(),
        }
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: DrawInstruction) {
        self.instructions.push(instruction);
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
