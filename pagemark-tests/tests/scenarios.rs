//! Whole editing sessions: load a document, annotate it through the editor,
//! export with the PDF encoder and read the result back.

use hayro_syntax::page::Rotation;
use pagemark::kurbo::Point;
use pagemark::*;
use pagemark_burn::DrawInstruction;
use pagemark_tests::*;

fn editor_with(data: Vec<u8>, name: &str) -> Editor {
    let mut editor = Editor::default();
    editor.load_document(data, Some(name)).unwrap();
    editor
}

fn stroke(editor: &mut Editor, page: usize, points: &[(f64, f64)]) {
    let (first, rest) = points.split_first().unwrap();
    editor.handle_pointer(page, PointerEvent::Down(Point::new(first.0, first.1)));
    for &(x, y) in rest {
        editor.handle_pointer(page, PointerEvent::Move(Point::new(x, y)));
    }
    let (x, y) = points[points.len() - 1];
    editor.handle_pointer(page, PointerEvent::Up(Point::new(x, y)));
}

fn type_text(editor: &mut Editor, page: usize, at: Point, text: &str) {
    editor.set_tool(ToolMode::Text);
    editor.handle_pointer(page, PointerEvent::Down(at));
    assert!(editor.edit_text(text));
    editor.commit_text().unwrap();
}

#[test]
fn text_is_burned_into_the_exported_page() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "invoice.PDF");
    type_text(&mut editor, 0, Point::new(100.0, 200.0), "Total: R$ 10,00");

    let file = editor.export_document().unwrap();
    assert_eq!(file.file_name, "invoice-edited.pdf");

    let pdf = parse(file.bytes);
    assert_eq!(pdf.pages().len(), 1);
    assert_eq!(xobject_names(&pdf, 0), vec!["Pg"]);
    assert_eq!(base_font(&pdf, 0, "Helv").as_deref(), Some("Helvetica"));
    assert_eq!(media_box(&pdf, 0), Some([0.0, 0.0, 600.0, 800.0]));
}

#[test]
fn strokes_only_touch_their_page() {
    let mut editor = editor_with(blank_pdf(3, 600.0, 800.0, 0), "form.pdf");
    editor.set_current_page(1).unwrap();
    editor.set_tool(ToolMode::Draw);
    stroke(&mut editor, 1, &[(10.0, 10.0), (50.0, 50.0), (90.0, 20.0)]);

    let pdf = parse(editor.export_document().unwrap().bytes);
    assert_eq!(pdf.pages().len(), 3);
    assert!(xobject_names(&pdf, 0).is_empty());
    assert_eq!(xobject_names(&pdf, 1), vec!["Pg"]);
    assert!(xobject_names(&pdf, 2).is_empty());
}

#[test]
fn eraser_strokes_are_exported_as_paths() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "scan.pdf");
    editor.set_tool(ToolMode::Erase);
    stroke(&mut editor, 0, &[(100.0, 100.0), (200.0, 100.0)]);

    let instructions = build_instructions(editor.session());
    let DrawInstruction::Path(path) = &instructions[0].instructions[0] else {
        panic!("expected a path instruction");
    };
    assert_eq!(path.color, Color::white());
    assert_eq!(path.width, 20.0);

    let pdf = parse(editor.export_document().unwrap().bytes);
    assert_eq!(xobject_names(&pdf, 0), vec!["Pg"]);
}

#[test]
fn placed_jpeg_becomes_an_image_xobject() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "photo.pdf");
    editor.set_tool(ToolMode::Image);
    let PointerResponse::ImageRequested(request) =
        editor.handle_pointer(0, PointerEvent::Down(Point::new(300.0, 300.0)))
    else {
        panic!("expected an image request");
    };
    editor
        .complete_image(request, jpeg_bytes(40, 30))
        .unwrap()
        .unwrap();

    let pdf = parse(editor.export_document().unwrap().bytes);
    assert_eq!(xobject_names(&pdf, 0), vec!["Pg", "Im0"]);
}

#[test]
fn delete_handle_removes_the_image() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "photo.pdf");
    let request = editor.request_image(0, Point::new(300.0, 300.0)).unwrap();
    editor
        .complete_image(request, png_bytes(16, 16))
        .unwrap()
        .unwrap();

    // The image covers (250, 250)..(350, 350); the delete button sits in
    // its top-right corner.
    editor.set_tool(ToolMode::Select);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(345.0, 255.0)));
    assert_eq!(editor.session().annotation_count(), 0);

    let pdf = parse(editor.export_document().unwrap().bytes);
    assert!(xobject_names(&pdf, 0).is_empty());
}

#[test]
fn moved_image_is_exported_at_its_new_place() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "photo.pdf");
    let request = editor.request_image(0, Point::new(300.0, 300.0)).unwrap();
    let id = editor
        .complete_image(request, png_bytes(16, 16))
        .unwrap()
        .unwrap();

    editor.set_tool(ToolMode::Select);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(255.0, 255.0)));
    assert_eq!(editor.drag().map(DragSession::kind), Some(DragKind::Move));
    editor.handle_pointer(0, PointerEvent::Move(Point::new(205.0, 305.0)));
    editor.handle_pointer(0, PointerEvent::Up(Point::new(155.0, 355.0)));

    let geometry = editor.session().page(0).unwrap().image(id).unwrap().geometry;
    assert_eq!(geometry.position, Point::new(150.0, 350.0));

    let instructions = build_instructions(editor.session());
    let DrawInstruction::Image(draw) = &instructions[0].instructions[0] else {
        panic!("expected an image instruction");
    };
    assert_eq!(draw.bottom_left, Point::new(150.0, 350.0));
    assert_eq!(draw.top_left, Point::new(150.0, 450.0));
}

#[test]
fn rotated_pages_keep_their_rotation() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 90), "landscape.pdf");
    assert_eq!(page_pixel_size(editor.session(), 0), Some((800, 600)));

    type_text(&mut editor, 0, Point::new(40.0, 40.0), "sideways");

    let pdf = parse(editor.export_document().unwrap().bytes);
    let page = &pdf.pages()[0];
    assert!(matches!(page.rotation(), Rotation::Horizontal));
    assert_eq!(xobject_names(&pdf, 0), vec!["Pg"]);
    assert_eq!(media_box(&pdf, 0), Some([0.0, 0.0, 600.0, 800.0]));
}

#[test]
fn zoomed_edits_land_at_the_same_document_position() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "zoom.pdf");
    editor.set_zoom(2.0).unwrap();
    editor.set_tool(ToolMode::Draw);
    stroke(&mut editor, 0, &[(20.0, 20.0), (100.0, 100.0)]);

    let instructions = build_instructions(editor.session());
    let DrawInstruction::Path(path) = &instructions[0].instructions[0] else {
        panic!("expected a path instruction");
    };
    assert_eq!(path.points[0], Point::new(10.0, 790.0));
    assert_eq!(path.points[1], Point::new(50.0, 750.0));
    assert_eq!(path.width, 1.0);

    let pdf = parse(editor.export_document().unwrap().bytes);
    assert_eq!(xobject_names(&pdf, 0), vec!["Pg"]);
    let content = content_stream(&pdf, 0);
    assert!(content.contains("10 790 m"));
    assert!(content.contains("50 750 l"));
}

#[test]
fn untouched_documents_export_a_clean_copy() {
    let mut editor = editor_with(blank_pdf(2, 300.0, 400.0, 0), "blank");
    let file = editor.export_document().unwrap();
    assert_eq!(file.file_name, "blank-edited.pdf");

    let pdf = parse(file.bytes);
    assert_eq!(pdf.pages().len(), 2);
    assert!(xobject_names(&pdf, 0).is_empty());
    assert!(xobject_names(&pdf, 1).is_empty());
    assert_eq!(media_box(&pdf, 1), Some([0.0, 0.0, 300.0, 400.0]));
}

#[test]
fn loading_a_new_document_discards_previous_edits() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "first.pdf");
    type_text(&mut editor, 0, Point::new(10.0, 10.0), "stale");

    editor
        .load_document(blank_pdf(1, 600.0, 800.0, 0), Some("second.pdf"))
        .unwrap();
    assert_eq!(editor.session().annotation_count(), 0);

    let file = editor.export_document().unwrap();
    assert_eq!(file.file_name, "second-edited.pdf");
    assert!(xobject_names(&parse(file.bytes), 0).is_empty());
}

#[test]
fn open_text_editor_is_committed_by_export() {
    let mut editor = editor_with(blank_pdf(1, 600.0, 800.0, 0), "draft.pdf");
    editor.set_tool(ToolMode::Text);
    editor.handle_pointer(0, PointerEvent::Down(Point::new(60.0, 60.0)));
    editor.edit_text("unsaved");

    let pdf = parse(editor.export_document().unwrap().bytes);
    assert!(editor.text_editor().is_none());
    assert_eq!(editor.session().annotation_count(), 1);
    assert_eq!(xobject_names(&pdf, 0), vec!["Pg"]);
}
