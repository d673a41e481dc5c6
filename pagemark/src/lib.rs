/*!
Interactive annotation of PDF pages.

This crate holds everything between the user's pointer and the exported
document: the session store with its per-page annotations, the freehand
capture surface, the overlay render model for text and images, tool
routing, drag gestures and the export engine that burns the result into a
new PDF through `pagemark-burn`.

Annotations are kept in viewport space, the coordinate system the user
interacts with. They are only converted to document space when exporting.

The crate does not render pages or talk to any UI toolkit; the host
supplies pointer events, a [`PageRasterizer`] for backdrops and file
contents for image placements, and paints the layers this crate exposes.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backdrop;
mod capture;
mod drag;
mod editor;
mod export;
mod model;
mod overlay;
mod settings;
mod store;
mod tool;

pub use backdrop::*;
pub use capture::*;
pub use drag::*;
pub use editor::*;
pub use export::*;
pub use model::*;
pub use overlay::*;
pub use settings::*;
pub use store::*;
pub use tool::*;

pub use pagemark_burn::{
    Color, EmbeddedImage, ImageError, PageFrame, PageRotation, StandardFont, kurbo,
};
