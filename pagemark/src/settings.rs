//! Editor configuration and the text metrics used for hit-testing.

use crate::model::{StrokeStyle, TextStyle};
use pagemark_burn::Color;

/// Proportions used to approximate the on-screen box of a line of text.
///
/// Hit-testing does not measure glyphs. A line of `n` characters at font
/// size `s` is assumed to be `n * s * char_width` wide and
/// `s * line_height` tall, which is close enough for Latin text in the
/// standard fonts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Average advance of one character, relative to the font size.
    pub char_width: f64,
    /// Height of one line, relative to the font size.
    pub line_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 0.6,
            line_height: 1.2,
        }
    }
}

/// Settings for an editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    /// The zoom factor (viewport pixels per document unit) a freshly
    /// loaded document starts at.
    pub initial_zoom: f64,
    /// Width and height, in viewport pixels, of a newly placed image.
    pub default_image_size: f64,
    /// Lower bound, in viewport pixels, for image width and height.
    pub min_image_size: f64,
    /// Stroke width, in viewport pixels, of the eraser.
    pub eraser_width: f64,
    /// The page background, used to paint erase strokes.
    pub background: Color,
    /// The ambient text style of a new session.
    pub text_style: TextStyle,
    /// The ambient stroke style of a new session.
    pub stroke_style: StrokeStyle,
    /// Text box approximation used for hit-testing.
    pub text_metrics: TextMetrics,
    /// Edge length, in viewport pixels, of image move/resize/delete handles.
    pub handle_size: f64,
    /// File stem used for exports when the document has no name.
    pub export_stem: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            initial_zoom: 1.0,
            default_image_size: 100.0,
            min_image_size: 20.0,
            eraser_width: 20.0,
            background: Color::white(),
            text_style: TextStyle::default(),
            stroke_style: StrokeStyle::default(),
            text_metrics: TextMetrics::default(),
            handle_size: 12.0,
            export_stem: "document".to_string(),
        }
    }
}
