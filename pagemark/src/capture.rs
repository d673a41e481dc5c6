//! The drawing capture surface of a page.
//!
//! The surface owns a raster the size of the page in the viewport. While a
//! stroke is being captured, each new segment is painted directly onto the
//! raster. Whenever the page's committed paths change, the raster is cleared
//! and every path is replayed in insertion order, so the pixels only ever
//! depend on the committed state.

use crate::model::{PathAnnotation, StrokeKind, StrokeStyle};
use crate::settings::EditorSettings;
use crate::store::EditorContext;
use kurbo::Point;
use pagemark_burn::Color;
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// An error that occurred while creating a capture surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountError {
    /// The requested raster has no pixels.
    ZeroSize {
        /// The requested width.
        width: u32,
        /// The requested height.
        height: u32,
    },
}

impl core::fmt::Display for MountError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroSize { width, height } => {
                write!(f, "cannot create a {width}x{height} drawing surface")
            }
        }
    }
}

impl std::error::Error for MountError {}

/// Color, width and kind of the stroke being captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    /// The stroke color.
    pub color: Color,
    /// The stroke width in viewport pixels.
    pub width: f64,
    /// Ink or erase.
    pub kind: StrokeKind,
}

impl Brush {
    /// The brush for the active tool, if the tool draws at all.
    ///
    /// Ink uses the ambient stroke style. Erasing always paints the opaque
    /// page background with the configured eraser width.
    pub fn for_context(context: &EditorContext, settings: &EditorSettings) -> Option<Self> {
        match context.tool.stroke_kind()? {
            StrokeKind::Ink => Some(Self::ink(context.stroke_style)),
            StrokeKind::Erase => Some(Self {
                color: settings.background,
                width: settings.eraser_width,
                kind: StrokeKind::Erase,
            }),
        }
    }

    fn ink(style: StrokeStyle) -> Self {
        Self {
            color: style.color,
            width: style.width,
            kind: StrokeKind::Ink,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CaptureState {
    Idle,
    /// The button is down but nothing has been captured yet.
    Pressed { origin: Point, brush: Brush },
    Capturing(PathAnnotation),
}

/// The freehand drawing layer of one page.
pub struct CaptureSurface {
    pixmap: Pixmap,
    state: CaptureState,
}

impl core::fmt::Debug for CaptureSurface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CaptureSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("state", &self.state)
            .finish()
    }
}

impl CaptureSurface {
    /// Create a transparent surface of the given pixel size.
    pub fn mount(width: u32, height: u32) -> Result<Self, MountError> {
        let pixmap = Pixmap::new(width, height).ok_or(MountError::ZeroSize { width, height })?;

        Ok(Self {
            pixmap,
            state: CaptureState::Idle,
        })
    }

    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// The raster as premultiplied RGBA bytes, row by row.
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// The raster as straight (non-premultiplied) RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    /// The straight RGBA value of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Whether a stroke is being captured.
    pub fn is_capturing(&self) -> bool {
        !matches!(self.state, CaptureState::Idle)
    }

    /// The points captured so far by the active stroke.
    pub fn captured_points(&self) -> &[Point] {
        match &self.state {
            CaptureState::Capturing(path) => &path.points,
            _ => &[],
        }
    }

    /// Start a stroke at `point`.
    ///
    /// Nothing is captured until the pointer moves; the press point then
    /// becomes the first point of the path.
    pub fn pointer_down(&mut self, point: Point, brush: Brush) {
        self.state = CaptureState::Pressed {
            origin: point,
            brush,
        };
    }

    /// Extend the active stroke and paint the new segment.
    pub fn pointer_move(&mut self, point: Point) {
        match &mut self.state {
            CaptureState::Idle => {}
            CaptureState::Pressed { origin, brush } => {
                let (origin, brush) = (*origin, *brush);
                let path = PathAnnotation {
                    points: vec![origin, point],
                    color: brush.color,
                    width: brush.width,
                    kind: brush.kind,
                };
                paint_segment(&mut self.pixmap, &path, origin, point);
                self.state = CaptureState::Capturing(path);
            }
            CaptureState::Capturing(path) => {
                let Some(last) = path.points.last().copied() else {
                    return;
                };
                path.points.push(point);
                paint_segment(&mut self.pixmap, path, last, point);
            }
        }
    }

    /// Finish the active stroke.
    ///
    /// Returns the path to commit, or `None` if the pointer never moved.
    pub fn pointer_up(&mut self) -> Option<PathAnnotation> {
        match core::mem::replace(&mut self.state, CaptureState::Idle) {
            CaptureState::Capturing(path) => Some(path),
            _ => None,
        }
    }

    /// The pointer left the surface; this finishes the stroke like a
    /// release does.
    pub fn pointer_leave(&mut self) -> Option<PathAnnotation> {
        self.pointer_up()
    }

    /// Clear the raster and repaint `paths` in order.
    pub fn replay(&mut self, paths: &[PathAnnotation]) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        for path in paths {
            paint_path(&mut self.pixmap, path);
        }
    }
}

fn paint_for(color: Color) -> Paint<'static> {
    let [r, g, b] = color.to_rgb8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = true;
    paint
}

fn stroke_for(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

fn paint_segment(pixmap: &mut Pixmap, path: &PathAnnotation, from: Point, to: Point) {
    let mut pb = PathBuilder::new();
    pb.move_to(from.x as f32, from.y as f32);
    pb.line_to(to.x as f32, to.y as f32);
    let Some(segment) = pb.finish() else {
        return;
    };

    pixmap.stroke_path(
        &segment,
        &paint_for(path.color),
        &stroke_for(path.width),
        Transform::identity(),
        None,
    );
}

fn paint_path(pixmap: &mut Pixmap, path: &PathAnnotation) {
    match path.points.as_slice() {
        [] => {}
        [dot] => {
            let radius = (path.width / 2.0) as f32;
            if let Some(circle) = PathBuilder::from_circle(dot.x as f32, dot.y as f32, radius) {
                pixmap.fill_path(
                    &circle,
                    &paint_for(path.color),
                    tiny_skia::FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
        [first, rest @ ..] => {
            let mut pb = PathBuilder::new();
            pb.move_to(first.x as f32, first.y as f32);
            for point in rest {
                pb.line_to(point.x as f32, point.y as f32);
            }
            let Some(polyline) = pb.finish() else {
                return;
            };

            pixmap.stroke_path(
                &polyline,
                &paint_for(path.color),
                &stroke_for(path.width),
                Transform::identity(),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolMode;

    fn ink() -> Brush {
        Brush {
            color: Color::red(),
            width: 4.0,
            kind: StrokeKind::Ink,
        }
    }

    #[test]
    fn zero_size_is_a_mount_error() {
        assert_eq!(
            CaptureSurface::mount(0, 800).unwrap_err(),
            MountError::ZeroSize {
                width: 0,
                height: 800
            }
        );
    }

    #[test]
    fn press_without_move_commits_nothing() {
        let mut surface = CaptureSurface::mount(100, 100).unwrap();
        surface.pointer_down(Point::new(10.0, 10.0), ink());
        assert!(surface.is_capturing());
        assert!(surface.captured_points().is_empty());
        assert_eq!(surface.pointer_up(), None);
        assert!(!surface.is_capturing());
    }

    #[test]
    fn press_point_is_the_first_point() {
        let mut surface = CaptureSurface::mount(100, 100).unwrap();
        surface.pointer_down(Point::new(10.0, 10.0), ink());
        surface.pointer_move(Point::new(30.0, 30.0));
        surface.pointer_move(Point::new(50.0, 50.0));

        let path = surface.pointer_leave().unwrap();
        assert_eq!(
            path.points,
            vec![
                Point::new(10.0, 10.0),
                Point::new(30.0, 30.0),
                Point::new(50.0, 50.0)
            ]
        );
        assert_eq!(path.color, Color::red());
        assert_eq!(path.kind, StrokeKind::Ink);
    }

    #[test]
    fn live_segments_are_painted() {
        let mut surface = CaptureSurface::mount(100, 100).unwrap();
        surface.pointer_down(Point::new(10.0, 50.0), ink());
        surface.pointer_move(Point::new(90.0, 50.0));
        assert_eq!(surface.pixel(50, 50), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(50, 10), Some([0, 0, 0, 0]));
    }

    #[test]
    fn moves_without_press_are_ignored() {
        let mut surface = CaptureSurface::mount(50, 50).unwrap();
        surface.pointer_move(Point::new(10.0, 10.0));
        assert_eq!(surface.pointer_up(), None);
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn replay_is_deterministic() {
        let paths = vec![
            PathAnnotation {
                points: vec![Point::new(5.0, 5.0), Point::new(60.0, 40.0)],
                color: Color::black(),
                width: 3.0,
                kind: StrokeKind::Ink,
            },
            PathAnnotation {
                points: vec![Point::new(30.0, 30.0)],
                color: Color::white(),
                width: 10.0,
                kind: StrokeKind::Erase,
            },
        ];

        let mut surface = CaptureSurface::mount(64, 64).unwrap();
        surface.replay(&paths);
        let first = surface.pixels().to_vec();

        // Leave junk from a live stroke, then replay again.
        surface.pointer_down(Point::new(0.0, 0.0), ink());
        surface.pointer_move(Point::new(63.0, 63.0));
        surface.replay(&paths);

        assert_eq!(surface.pixels(), first.as_slice());
    }

    #[test]
    fn single_point_paths_paint_a_dot() {
        let mut surface = CaptureSurface::mount(20, 20).unwrap();
        surface.replay(&[PathAnnotation {
            points: vec![Point::new(10.0, 10.0)],
            color: Color::black(),
            width: 6.0,
            kind: StrokeKind::Ink,
        }]);
        assert_eq!(surface.pixel(10, 10), Some([0, 0, 0, 255]));
    }

    #[test]
    fn erase_covers_earlier_ink() {
        let mut surface = CaptureSurface::mount(40, 40).unwrap();
        surface.replay(&[
            PathAnnotation {
                points: vec![Point::new(0.0, 20.0), Point::new(40.0, 20.0)],
                color: Color::black(),
                width: 4.0,
                kind: StrokeKind::Ink,
            },
            PathAnnotation {
                points: vec![Point::new(20.0, 0.0), Point::new(20.0, 40.0)],
                color: Color::white(),
                width: 10.0,
                kind: StrokeKind::Erase,
            },
        ]);
        assert_eq!(surface.pixel(20, 20), Some([255, 255, 255, 255]));
        assert_eq!(surface.pixel(5, 20), Some([0, 0, 0, 255]));
    }

    #[test]
    fn brush_follows_the_tool() {
        let settings = EditorSettings::default();
        let mut context = EditorContext::default();
        assert_eq!(Brush::for_context(&context, &settings), None);

        context.tool = ToolMode::Draw;
        let brush = Brush::for_context(&context, &settings).unwrap();
        assert_eq!(brush.width, context.stroke_style.width);

        context.tool = ToolMode::Erase;
        let brush = Brush::for_context(&context, &settings).unwrap();
        assert_eq!(brush.color, settings.background);
        assert_eq!(brush.width, settings.eraser_width);
        assert_eq!(brush.kind, StrokeKind::Erase);
    }
}
