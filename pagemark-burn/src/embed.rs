//! Raster image payloads and their embedding as image XObjects.

use crate::writer::deflate_encode;
use image::{ColorType, DynamicImage, ImageFormat};
use pdf_writer::{Chunk, Filter, Ref};
use std::sync::Arc;

/// An error that occurred while decoding or embedding an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The bytes are not in a recognized image format.
    UnknownFormat,
    /// The image could not be decoded.
    Decode(String),
    /// The image has no pixels.
    Empty,
    /// The image could not be compressed for embedding.
    Encode(String),
}

impl core::fmt::Display for ImageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownFormat => write!(f, "unrecognized image format"),
            Self::Decode(s) => write!(f, "failed to decode image: {s}"),
            Self::Empty => write!(f, "image has no pixels"),
            Self::Encode(s) => write!(f, "failed to encode image: {s}"),
        }
    }
}

impl std::error::Error for ImageError {}

/// How a JPEG can be copied into the output without re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Passthrough {
    Rgb,
    Gray,
}

/// A validated image payload ready to be embedded into a PDF.
///
/// The original file bytes are shared, so cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    data: Arc<[u8]>,
    format: ImageFormat,
    width: u32,
    height: u32,
    passthrough: Option<Passthrough>,
}

impl EmbeddedImage {
    /// Decode image file bytes (PNG, JPEG, GIF, WebP or BMP).
    pub fn decode(data: impl Into<Arc<[u8]>>) -> Result<Self, ImageError> {
        let data = data.into();
        let format = image::guess_format(&data).map_err(|_| ImageError::UnknownFormat)?;
        let decoded = image::load_from_memory_with_format(&data, format)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ImageError::Empty);
        }

        let passthrough = match format {
            ImageFormat::Jpeg => jpeg_passthrough(&data, decoded.color()),
            _ => None,
        };

        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            data,
            format,
            passthrough,
        })
    }

    /// The original file bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The detected file format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    fn decode_pixels(&self) -> Result<DynamicImage, ImageError> {
        image::load_from_memory_with_format(&self.data, self.format)
            .map_err(|e| ImageError::Decode(e.to_string()))
    }
}

/// Write an image XObject (plus a soft mask when the image has
/// transparency) and return the reference of the image XObject.
pub(crate) fn write_image_xobject(
    chunk: &mut Chunk,
    alloc: &mut impl FnMut() -> Ref,
    image: &EmbeddedImage,
) -> Result<Ref, ImageError> {
    let width = image.width as i32;
    let height = image.height as i32;
    let xobj_ref = alloc();

    if let Some(passthrough) = image.passthrough {
        let mut xobj = chunk.image_xobject(xobj_ref, image.data());
        xobj.filter(Filter::DctDecode);
        xobj.width(width);
        xobj.height(height);
        match passthrough {
            Passthrough::Rgb => xobj.color_space().device_rgb(),
            Passthrough::Gray => xobj.color_space().device_gray(),
        };
        xobj.bits_per_component(8);
        return Ok(xobj_ref);
    }

    let rgba = image.decode_pixels()?.to_rgba8();
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let compressed_rgb = deflate_encode(&rgb).map_err(|e| ImageError::Encode(e.to_string()))?;

    let smask_ref = if has_alpha {
        let alpha: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        let compressed_alpha =
            deflate_encode(&alpha).map_err(|e| ImageError::Encode(e.to_string()))?;
        let mask_ref = alloc();
        let mut mask = chunk.image_xobject(mask_ref, &compressed_alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(width);
        mask.height(height);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        Some(mask_ref)
    } else {
        None
    };

    let mut xobj = chunk.image_xobject(xobj_ref, &compressed_rgb);
    xobj.filter(Filter::FlateDecode);
    xobj.width(width);
    xobj.height(height);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }

    Ok(xobj_ref)
}

/// Whether a JPEG can be copied as-is. The decoder converts CMYK and YCCK
/// data to RGB, so the component count in the frame header must agree with
/// the decoded color type.
fn jpeg_passthrough(data: &[u8], color: ColorType) -> Option<Passthrough> {
    match (jpeg_components(data)?, color) {
        (3, ColorType::Rgb8) => Some(Passthrough::Rgb),
        (1, ColorType::L8) => Some(Passthrough::Gray),
        _ => None,
    }
}

/// The number of color components declared in a JPEG's frame header.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    if data.get(..2)? != [0xFF, 0xD8] {
        return None;
    }

    let mut pos = 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        match marker {
            // Fill byte before a marker.
            0xFF => pos += 1,
            0x01 | 0xD0..=0xD7 => pos += 2,
            // Start of scan without a frame header.
            0xDA | 0xD9 => return None,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                // Length, precision, height and width precede the count.
                return data.get(pos + 9).copied();
            }
            _ => {
                let len = u16::from_be_bytes([*data.get(pos + 2)?, *data.get(pos + 3)?]);
                pos += 2 + usize::from(len);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decode_reports_dimensions() {
        let image = EmbeddedImage::decode(png_bytes(10, 7, Rgba([1, 2, 3, 255]))).unwrap();
        assert_eq!((image.width(), image.height()), (10, 7));
        assert_eq!(image.format(), ImageFormat::Png);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = EmbeddedImage::decode(b"definitely not an image".to_vec()).unwrap_err();
        assert_eq!(err, ImageError::UnknownFormat);
    }

    #[test]
    fn opaque_png_has_no_soft_mask() {
        let image = EmbeddedImage::decode(png_bytes(4, 4, Rgba([9, 9, 9, 255]))).unwrap();
        let mut chunk = Chunk::new();
        let mut next = 1;
        let mut alloc = || {
            let r = Ref::new(next);
            next += 1;
            r
        };
        write_image_xobject(&mut chunk, &mut alloc, &image).unwrap();
        assert_eq!(next, 2, "only the image itself should be allocated");
    }

    #[test]
    fn translucent_png_gets_soft_mask() {
        let image = EmbeddedImage::decode(png_bytes(4, 4, Rgba([9, 9, 9, 128]))).unwrap();
        let mut chunk = Chunk::new();
        let mut next = 1;
        let mut alloc = || {
            let r = Ref::new(next);
            next += 1;
            r
        };
        write_image_xobject(&mut chunk, &mut alloc, &image).unwrap();
        assert_eq!(next, 3, "image and soft mask should be allocated");
    }

    fn jpeg_bytes(image: impl Into<DynamicImage>) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.into().write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    /// A JPEG prefix with a baseline frame header declaring `components`.
    fn frame_header(components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // An APP0 segment to skip over.
        data.extend([0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        data.extend([0xFF, 0xC0, 0x00, 0x0B + 3 * (components - 1), 8, 0, 4, 0, 4]);
        data.push(components);
        data
    }

    #[test]
    fn jpeg_component_count_is_read_from_the_frame_header() {
        assert_eq!(jpeg_components(&frame_header(4)), Some(4));
        assert_eq!(jpeg_components(&frame_header(1)), Some(1));
        assert_eq!(jpeg_components(b"\xFF\xD8\xFF\xDA"), None);
        assert_eq!(jpeg_components(b"not a jpeg"), None);
    }

    #[test]
    fn cmyk_jpegs_are_not_copied_as_rgb() {
        assert_eq!(jpeg_passthrough(&frame_header(4), ColorType::Rgb8), None);
        assert_eq!(
            jpeg_passthrough(&frame_header(3), ColorType::Rgb8),
            Some(Passthrough::Rgb)
        );
        assert_eq!(
            jpeg_passthrough(&frame_header(1), ColorType::L8),
            Some(Passthrough::Gray)
        );
    }

    #[test]
    fn encoded_jpegs_are_passed_through() {
        let rgb = EmbeddedImage::decode(jpeg_bytes(RgbImage::from_pixel(
            8,
            8,
            Rgb([200, 10, 10]),
        )))
        .unwrap();
        assert_eq!(rgb.passthrough, Some(Passthrough::Rgb));

        let gray =
            EmbeddedImage::decode(jpeg_bytes(GrayImage::from_pixel(8, 8, Luma([90])))).unwrap();
        assert_eq!(gray.passthrough, Some(Passthrough::Gray));
    }
}
