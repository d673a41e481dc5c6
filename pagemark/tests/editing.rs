//! Editing sessions driven through the public API.

use pagemark::kurbo::Point;
use pagemark::*;
use pagemark_burn::{BurnError, DrawInstruction, PageInstructions, TextDraw};

fn blank_pdf(page_count: usize, width: f32, height: f32) -> Vec<u8> {
    use pdf_writer::{Finish, Pdf, Rect, Ref};

    let page_tree_id = Ref::new(2);
    let page_ids: Vec<Ref> = (0..page_count).map(|i| Ref::new(3 + i as i32)).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(Ref::new(1)).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_count as i32);
    for id in page_ids {
        let mut page = pdf.page(id);
        page.parent(page_tree_id);
        page.media_box(Rect::new(0.0, 0.0, width, height));
        page.resources();
        page.finish();
    }

    pdf.finish()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    let img = RgbaImage::from_pixel(width, height, Rgba([30, 30, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// An encoder that keeps what it was asked to encode.
#[derive(Debug, Default)]
struct Recording {
    pages: Vec<PageInstructions>,
}

impl DocumentEncoder for Recording {
    fn encode(
        &mut self,
        _: &DocumentHandle,
        pages: &[PageInstructions],
    ) -> Result<Vec<u8>, BurnError> {
        self.pages = pages.to_vec();
        Ok(Vec::new())
    }
}

fn recording_editor(width: f32, height: f32) -> Editor<Recording> {
    let mut editor = Editor::with_encoder(EditorSettings::default(), Recording::default());
    editor
        .load_document(blank_pdf(1, width, height), Some("scan.pdf"))
        .unwrap();
    editor
}

#[test]
fn freehand_stroke_maps_to_document_space() {
    let mut editor = recording_editor(600.0, 800.0);
    editor.set_tool(ToolMode::Draw);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(10.0, 10.0)));
    editor.handle_pointer(0, PointerEvent::Move(Point::new(50.0, 50.0)));
    editor.handle_pointer(0, PointerEvent::Up(Point::new(50.0, 50.0)));

    let paths = editor.session().page(0).unwrap().paths();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].points[0], Point::new(10.0, 10.0));

    editor.export_document().unwrap();
    let DrawInstruction::Path(path) = &editor.encoder().pages[0].instructions[0] else {
        panic!("expected a path instruction");
    };
    assert_eq!(path.points[0], Point::new(10.0, 790.0));
    assert_eq!(path.points[1], Point::new(50.0, 750.0));
}

#[test]
fn cleared_text_is_removed() {
    let mut editor = recording_editor(600.0, 800.0);
    editor.set_tool(ToolMode::Text);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(100.0, 200.0)));
    editor.edit_text("Total: R$ 10,00");
    editor.commit_text().unwrap();
    assert_eq!(editor.session().annotation_count(), 1);

    editor.handle_pointer(0, PointerEvent::Down(Point::new(105.0, 205.0)));
    assert!(editor.text_editor().unwrap().bound_to().is_some());
    editor.edit_text("");
    // Clicking elsewhere blurs the editor.
    editor.set_tool(ToolMode::Select);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(500.0, 700.0)));

    assert!(editor.text_editor().is_none());
    assert_eq!(editor.session().annotation_count(), 0);
}

#[test]
fn image_placement_uses_the_default_size() {
    let mut editor = recording_editor(600.0, 800.0);
    editor.set_tool(ToolMode::Image);
    let PointerResponse::ImageRequested(request) =
        editor.handle_pointer(0, PointerEvent::Down(Point::new(300.0, 300.0)))
    else {
        panic!("expected an image request");
    };
    assert_eq!(request.point(), Point::new(300.0, 300.0));

    let id = editor
        .complete_image(request, png_bytes(10, 10))
        .unwrap()
        .unwrap();
    let image = editor.session().page(0).unwrap().image(id).unwrap();
    assert_eq!(image.geometry.position, Point::new(250.0, 250.0));
    assert_eq!((image.geometry.width, image.geometry.height), (100.0, 100.0));
}

#[test]
fn text_instruction_carries_the_document_anchor() {
    let mut editor = recording_editor(600.0, 800.0);
    editor.set_tool(ToolMode::Text);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(50.0, 50.0)));
    editor.edit_text("Approved");
    editor.commit_text().unwrap();

    let file = editor.export_document().unwrap();
    assert_eq!(file.file_name, "scan-edited.pdf");
    assert_eq!(
        editor.encoder().pages[0].instructions,
        vec![DrawInstruction::Text(TextDraw {
            text: "Approved".to_string(),
            anchor: Point::new(50.0, 750.0),
            font_size: 16.0,
            font: StandardFont::Helvetica,
            color: Color::black(),
        })]
    );
}

#[test]
fn resizes_never_go_below_the_minimum() {
    let mut editor = recording_editor(600.0, 800.0);
    let request = editor.request_image(0, Point::new(300.0, 300.0)).unwrap();
    let id = editor
        .complete_image(request, png_bytes(10, 10))
        .unwrap()
        .unwrap();

    let pointers = [
        Point::new(340.0, 340.0),
        Point::new(100.0, 360.0),
        Point::new(-50.0, -50.0),
        Point::new(251.0, 900.0),
        Point::new(260.0, 260.0),
    ];
    for (i, end) in pointers.into_iter().enumerate() {
        let g = editor.session().page(0).unwrap().image(id).unwrap().geometry;
        let grip = Point::new(g.position.x + g.width - 1.0, g.position.y + g.height - 1.0);
        editor.begin_drag(0, id, DragKind::Resize, grip).unwrap();
        editor.update_drag(Point::new(end.y, end.x)).unwrap();
        editor.end_drag(end).unwrap();

        let g = editor.session().page(0).unwrap().image(id).unwrap().geometry;
        assert!(g.width >= 20.0 && g.height >= 20.0, "resize {i}: {g:?}");
    }
}

#[test]
fn zooming_keeps_the_document_position() {
    let mut editor = recording_editor(600.0, 800.0);
    editor.set_tool(ToolMode::Text);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(50.0, 50.0)));
    editor.edit_text("zoomed");
    editor.commit_text().unwrap();

    editor.set_zoom(1.75).unwrap();
    let text = &editor.session().page(0).unwrap().texts()[0];
    assert_eq!(text.position, Point::new(87.5, 87.5));

    editor.export_document().unwrap();
    let DrawInstruction::Text(draw) = &editor.encoder().pages[0].instructions[0] else {
        panic!("expected a text instruction");
    };
    assert!((draw.anchor.x - 50.0).abs() < 1e-9);
    assert!((draw.anchor.y - 750.0).abs() < 1e-9);
}

#[test]
fn corrupt_input_leaves_no_document() {
    let mut editor = recording_editor(600.0, 800.0);
    assert!(matches!(
        editor.load_document(b"%PDF-1.7\nnot really".to_vec(), None),
        Err(LoadError::Malformed | LoadError::NoPages)
    ));
    assert!(editor.session().document().is_none());
    assert!(editor.surface(0).is_none());
    assert_eq!(
        editor.export_document().unwrap_err(),
        ExportError::NoDocument
    );
}

#[test]
fn tool_names_come_from_the_toolbar() {
    let mut editor = recording_editor(600.0, 800.0);
    editor.set_tool("erase".parse().unwrap());
    assert_eq!(editor.session().context().tool, ToolMode::Erase);
}
