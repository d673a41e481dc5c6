/*!
A browser front end for pagemark.

[`PagemarkEditor`] wraps a [`pagemark::Editor`] for use from JavaScript. The
page script forwards pointer events and file contents, and paints the
three layers of each page from the data the editor hands back: the hayro
rendered backdrop, the capture surface pixels and the overlay elements.
*/

#![forbid(unsafe_code)]

mod raster;

pub use raster::HayroRasterizer;

use pagemark::kurbo::{Point, Rect};
use pagemark::{
    AnnotationId, Color, DragKind, Editor, EditOutcome, Handle, OverlayElement, PointerEvent,
    PointerResponse, StandardFont, StrokeStyle, TextStyle, ToolMode,
};
use wasm_bindgen::prelude::*;

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            let message = format!(
                "[{}:{}] {}",
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            );

            match record.level() {
                log::Level::Error => web_sys::console::error_1(&message.into()),
                log::Level::Warn => web_sys::console::warn_1(&message.into()),
                _ => web_sys::console::log_1(&message.into()),
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn js_error(e: impl core::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn set(target: &js_sys::Object, key: &str, value: impl Into<JsValue>) {
    let _ = js_sys::Reflect::set(target, &key.into(), &value.into());
}

fn set_rect(target: &js_sys::Object, rect: Rect) {
    set(target, "x", rect.x0);
    set(target, "y", rect.y0);
    set(target, "width", rect.width());
    set(target, "height", rect.height());
}

fn id_value(id: Option<AnnotationId>) -> JsValue {
    id.map_or(JsValue::NULL, |id| JsValue::from_f64(id.get() as f64))
}

/// Create an object URL for `bytes`, suitable as the `href` of a download
/// link. The caller revokes it once the download has started.
#[wasm_bindgen]
pub fn download_url(bytes: &[u8], mime_type: &str) -> Result<String, JsValue> {
    let data = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&data);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime_type);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;

    web_sys::Url::create_object_url_with_blob(&blob)
}

/// An annotation editor bound to a browser page.
#[wasm_bindgen]
pub struct PagemarkEditor {
    editor: Editor,
    rasterizer: HayroRasterizer,
}

#[wasm_bindgen]
impl PagemarkEditor {
    /// Create an editor without a document.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();

        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }

        Self {
            editor: Editor::default(),
            rasterizer: HayroRasterizer::default(),
        }
    }

    /// Load a document and return its page count.
    pub fn load_document(&mut self, data: &[u8], name: Option<String>) -> Result<usize, JsValue> {
        self.rasterizer = HayroRasterizer::default();
        self.editor
            .load_document(data.to_vec(), name.as_deref())
            .map_err(js_error)?;
        self.rasterizer = HayroRasterizer::load(data);

        Ok(self.editor.session().page_count())
    }

    /// Drop the document and every annotation.
    pub fn close_document(&mut self) {
        self.editor.close_document();
        self.rasterizer = HayroRasterizer::default();
    }

    /// The number of pages, or 0 without a document.
    pub fn page_count(&self) -> usize {
        self.editor.session().page_count()
    }

    /// The zero-based index of the page shown to the user.
    pub fn current_page(&self) -> usize {
        self.editor.session().current_page()
    }

    /// Navigate to a page by zero-based index.
    pub fn set_current_page(&mut self, page: usize) -> Result<(), JsValue> {
        self.editor.set_current_page(page).map_err(js_error)
    }

    /// The current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.editor.session().zoom()
    }

    /// Change the zoom factor. Every layer has to be repainted afterwards.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), JsValue> {
        self.editor.set_zoom(zoom).map_err(js_error)
    }

    /// The pixel size of a page's layers as `[width, height]`.
    pub fn page_size(&self, page: usize) -> Option<Vec<u32>> {
        pagemark::page_pixel_size(self.editor.session(), page).map(|(w, h)| vec![w, h])
    }

    /// The name of the active tool.
    pub fn tool(&self) -> String {
        self.editor.session().context().tool.name().to_string()
    }

    /// Switch tools by name (`select`, `draw`, `erase`, `text` or `image`).
    pub fn set_tool(&mut self, name: &str) -> Result<(), JsValue> {
        let tool: ToolMode = name.parse().map_err(js_error)?;
        self.editor.set_tool(tool);
        Ok(())
    }

    /// Set the ambient style for new text. The color is a `#rrggbb` string.
    pub fn set_text_style(
        &mut self,
        font_family: &str,
        font_size: f64,
        color: &str,
    ) -> Result<(), JsValue> {
        let color = parse_color(color)?;
        if !(font_size.is_finite() && font_size > 0.0) {
            return Err(JsValue::from_str("font size must be positive"));
        }

        self.editor.set_text_style(TextStyle {
            font: StandardFont::from_family(font_family),
            font_size,
            color,
        });
        Ok(())
    }

    /// Set the ambient style for new ink strokes.
    pub fn set_stroke_style(&mut self, color: &str, width: f64) -> Result<(), JsValue> {
        let color = parse_color(color)?;
        if !(width.is_finite() && width > 0.0) {
            return Err(JsValue::from_str("stroke width must be positive"));
        }

        self.editor.set_stroke_style(StrokeStyle { color, width });
        Ok(())
    }

    /// A pointer was pressed on a page.
    ///
    /// Returns `true` if the event was handled and `false` if it was
    /// ignored. When the image tool asks for a file, the ticket of the
    /// request is returned instead; answer it with `complete_image` or
    /// `cancel_image`.
    pub fn pointer_down(&mut self, page: usize, x: f64, y: f64) -> JsValue {
        self.pointer(page, PointerEvent::Down(Point::new(x, y)))
    }

    /// The pointer moved over a page.
    pub fn pointer_move(&mut self, page: usize, x: f64, y: f64) -> JsValue {
        self.pointer(page, PointerEvent::Move(Point::new(x, y)))
    }

    /// The pointer was released over a page.
    pub fn pointer_up(&mut self, page: usize, x: f64, y: f64) -> JsValue {
        self.pointer(page, PointerEvent::Up(Point::new(x, y)))
    }

    /// The pointer left a page.
    pub fn pointer_leave(&mut self, page: usize) -> JsValue {
        self.pointer(page, PointerEvent::Leave)
    }

    /// Replace the content of the open text editor.
    pub fn edit_text(&mut self, text: &str) -> bool {
        self.editor.edit_text(text)
    }

    /// Commit the open text editor and report what happened to it.
    pub fn commit_text(&mut self) -> Result<String, JsValue> {
        self.editor
            .commit_text()
            .map(|outcome| outcome_name(outcome).to_string())
            .map_err(js_error)
    }

    /// Delete the annotation behind the open text editor.
    pub fn delete_edited_text(&mut self) -> Result<String, JsValue> {
        self.editor
            .delete_edited_text()
            .map(|outcome| outcome_name(outcome).to_string())
            .map_err(js_error)
    }

    /// Answer an image request with file contents.
    ///
    /// Returns the id of the placed image, or `null` if the request is no
    /// longer outstanding.
    pub fn complete_image(&mut self, ticket: f64, data: Vec<u8>) -> Result<JsValue, JsValue> {
        let Some(request) = self.pending_request(ticket) else {
            log::warn!("ignoring file for unknown image request {ticket}");
            return Ok(JsValue::NULL);
        };

        let id = self.editor.complete_image(request, data).map_err(js_error)?;
        Ok(id_value(id))
    }

    /// The user dismissed the file chooser.
    pub fn cancel_image(&mut self, ticket: f64) -> bool {
        self.pending_request(ticket)
            .is_some_and(|request| self.editor.cancel_image(request))
    }

    /// Remove an image by id.
    pub fn delete_image(&mut self, page: usize, id: f64) -> Result<(), JsValue> {
        match self.image_id(page, id) {
            Some(id) => self.editor.delete_image(page, id).map_err(js_error),
            None => Ok(()),
        }
    }

    /// Start moving (`move`) or resizing (`resize`) an image.
    ///
    /// The following pointer moves update the image and the release ends
    /// the drag.
    pub fn begin_drag(
        &mut self,
        page: usize,
        id: f64,
        kind: &str,
        x: f64,
        y: f64,
    ) -> Result<(), JsValue> {
        let kind = match kind {
            "move" => DragKind::Move,
            "resize" => DragKind::Resize,
            other => return Err(JsValue::from_str(&format!("unknown drag kind: {other}"))),
        };
        let id = self
            .image_id(page, id)
            .ok_or_else(|| JsValue::from_str("unknown image"))?;

        self.editor
            .begin_drag(page, id, kind, Point::new(x, y))
            .map_err(js_error)
    }

    /// Abandon the current drag. The image stays where the last pointer
    /// move put it.
    pub fn cancel_drag(&mut self) -> bool {
        self.editor.cancel_drag()
    }

    /// Render the backdrop of a page as `[width, height, rgba]`.
    pub fn render_backdrop(&self, page: usize) -> Result<js_sys::Array, JsValue> {
        let backdrop = self
            .editor
            .render_backdrop(&self.rasterizer, page)
            .ok_or("Page could not be rendered")?;

        let result = js_sys::Array::new_with_length(3);
        result.set(0, JsValue::from(backdrop.width));
        result.set(1, JsValue::from(backdrop.height));
        result.set(2, JsValue::from(backdrop.rgba));

        Ok(result)
    }

    /// The capture surface of a page as `[width, height, rgba]`, or
    /// `undefined` if the page has no surface yet.
    pub fn surface(&self, page: usize) -> Option<js_sys::Array> {
        let surface = self.editor.surface(page)?;

        let result = js_sys::Array::new_with_length(3);
        result.set(0, JsValue::from(surface.width()));
        result.set(1, JsValue::from(surface.height()));
        result.set(2, JsValue::from(surface.to_rgba()));

        Some(result)
    }

    /// The overlay elements of a page, bottom to top.
    pub fn overlay(&self, page: usize) -> js_sys::Array {
        let result = js_sys::Array::new();

        for element in self.editor.overlay(page).map(|o| o.elements()).unwrap_or_default() {
            result.push(&overlay_element(element));
        }

        result
    }

    /// Burn every annotation into a new document.
    ///
    /// Returns `{ fileName, bytes, url }`, where `url` is an object URL for
    /// the bytes.
    pub fn export_document(&mut self) -> Result<js_sys::Object, JsValue> {
        let file = self.editor.export_document().map_err(js_error)?;
        let url = download_url(&file.bytes, "application/pdf")?;

        let result = js_sys::Object::new();
        set(&result, "fileName", file.file_name);
        set(&result, "bytes", js_sys::Uint8Array::from(file.bytes.as_slice()));
        set(&result, "url", url);

        Ok(result)
    }
}

impl Default for PagemarkEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl PagemarkEditor {
    fn pointer(&mut self, page: usize, event: PointerEvent) -> JsValue {
        match self.editor.handle_pointer(page, event) {
            PointerResponse::Handled => JsValue::TRUE,
            PointerResponse::Ignored => JsValue::FALSE,
            PointerResponse::ImageRequested(request) => JsValue::from_f64(request.ticket() as f64),
        }
    }

    fn pending_request(&self, ticket: f64) -> Option<pagemark::ImageRequest> {
        self.editor
            .pending_image()
            .filter(|request| request.ticket() as f64 == ticket)
            .copied()
    }

    fn image_id(&self, page: usize, raw: f64) -> Option<AnnotationId> {
        self.editor
            .session()
            .page(page)?
            .images()
            .iter()
            .map(|image| image.id)
            .find(|id| id.get() as f64 == raw)
    }
}

fn overlay_element(element: &OverlayElement) -> js_sys::Object {
    let obj = js_sys::Object::new();
    set_rect(&obj, element.bounds());

    match element {
        OverlayElement::Text {
            id,
            text,
            style,
            display_size,
            ..
        } => {
            set(&obj, "kind", "text");
            set(&obj, "id", id_value(Some(*id)));
            set_text(&obj, text, style, *display_size);
        }
        OverlayElement::Image { id, handles, .. } => {
            set(&obj, "kind", "image");
            set(&obj, "id", id_value(Some(*id)));

            let list = js_sys::Array::new();
            for handle in handles {
                let h = js_sys::Object::new();
                set(&h, "handle", handle_name(handle.handle));
                set_rect(&h, handle.bounds);
                list.push(&h);
            }
            set(&obj, "handles", list);
        }
        OverlayElement::Editor {
            bound,
            text,
            style,
            display_size,
            ..
        } => {
            set(&obj, "kind", "editor");
            set(&obj, "id", id_value(*bound));
            set_text(&obj, text, style, *display_size);
        }
    }

    obj
}

fn set_text(obj: &js_sys::Object, text: &str, style: &TextStyle, display_size: f64) {
    set(obj, "text", text);
    set(obj, "fontFamily", font_family(style.font));
    set(obj, "fontSize", display_size);
    set(obj, "color", color_hex(style.color));
}

fn parse_color(hex: &str) -> Result<Color, JsValue> {
    Color::from_hex(hex).ok_or_else(|| JsValue::from_str(&format!("invalid color: {hex}")))
}

fn color_hex(color: Color) -> String {
    let [r, g, b] = color.to_rgb8();
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn font_family(font: StandardFont) -> &'static str {
    match font {
        StandardFont::Helvetica => "Helvetica, Arial, sans-serif",
        StandardFont::TimesRoman => "'Times New Roman', Times, serif",
        StandardFont::Courier => "'Courier New', Courier, monospace",
    }
}

fn handle_name(handle: Handle) -> &'static str {
    match handle {
        Handle::Move => "move",
        Handle::Resize => "resize",
        Handle::Delete => "delete",
    }
}

fn outcome_name(outcome: EditOutcome) -> &'static str {
    match outcome {
        EditOutcome::Created(_) => "created",
        EditOutcome::Updated(_) => "updated",
        EditOutcome::Deleted(_) => "deleted",
        EditOutcome::Discarded => "discarded",
    }
}
