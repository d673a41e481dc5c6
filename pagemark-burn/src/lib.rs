/*!
A crate for burning overlays into PDF pages.

This crate takes freehand strokes, lines of text and raster images that
have already been positioned in document space and fuses them into the
content of the pages they belong to, producing a new PDF. It also provides
the coordinate mapping between an on-screen viewport and document space
that the placement of those overlays depends on.

It builds on `hayro-syntax` for reading the original document,
`hayro-write` for copying its pages, and `pdf-writer` for generating the
new objects.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod content;
mod coord;
mod embed;
mod types;
mod writer;

pub use coord::*;
pub use embed::{EmbeddedImage, ImageError};
pub use types::*;
pub use writer::{BurnError, burn_in, read_page_frames};

pub use kurbo;
