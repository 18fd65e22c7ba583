//! Cursor state and the three cursor rectangles.
//!
//! Shape, visibility and position arrive as independent rectangles, in any
//! order and in different records:
//!
//! - `WMVd` (cursor shape): a 16-bit type then the bitmap. The rectangle's
//!   `x, y` are the hotspot and its size is the bitmap size.
//! - `WMVe` (cursor visibility): 16-bit flags, bit 0 is visibility.
//! - `WMVf` (cursor position): no payload, the rectangle's `x, y` are the
//!   pointer position.
//!
//! # Shape Payload
//!
//! ```text
//! +------------------+
//! | type             |  2 bytes: 0 = colour, 1 = alpha
//! +------------------+
//! | colour pixels    |  width * height * bpp bytes (colour)
//! | AND mask         |  width * height * bpp bytes (colour)
//! +------------------+
//! | RGBA pixels      |  width * height * 4 bytes (alpha)
//! +------------------+
//! ```

use crate::{pixel_bytes, DecodeError, FormatView, RectDecoder, RectSink, Rectangle, RfbReader};
use rfb_common::{Point, Rect};

/// Wire value of a colour (AND/XOR) cursor.
pub const CURSOR_TYPE_COLOR: u16 = 0;

/// Wire value of an RGBA cursor.
pub const CURSOR_TYPE_ALPHA: u16 = 1;

const VISIBLE_FLAG: u16 = 0x0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// Framebuffer-format pixels combined through an AND mask.
    Color,
    /// Straight RGBA pixels.
    Alpha,
}

/// Cursor bitmap borrowed from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorBitmap<'a> {
    Color { color: &'a [u8], and_mask: &'a [u8] },
    Alpha { rgba: &'a [u8] },
}

/// A decoded cursor shape, still borrowing its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorShape<'a> {
    pub width: u16,
    pub height: u16,
    pub hotspot: Point,
    pub bitmap: CursorBitmap<'a>,
}

impl CursorShape<'_> {
    pub fn kind(&self) -> CursorKind {
        match self.bitmap {
            CursorBitmap::Color { .. } => CursorKind::Color,
            CursorBitmap::Alpha { .. } => CursorKind::Alpha,
        }
    }

    /// Copy the bitmap out into an owned image.
    pub fn to_image(&self) -> CursorImage {
        let pixels = match self.bitmap {
            CursorBitmap::Color { color, and_mask } => CursorPixels::Color {
                color: color.to_vec(),
                and_mask: and_mask.to_vec(),
            },
            CursorBitmap::Alpha { rgba } => CursorPixels::Alpha {
                rgba: rgba.to_vec(),
            },
        };
        CursorImage {
            width: self.width as u32,
            height: self.height as u32,
            hotspot: self.hotspot,
            pixels,
        }
    }
}

/// Owned cursor pixel buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorPixels {
    /// `color` and `and_mask` are each `width * height * bpp` bytes.
    Color { color: Vec<u8>, and_mask: Vec<u8> },
    /// `width * height * 4` bytes.
    Alpha { rgba: Vec<u8> },
}

/// Cursor image data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    pub width: u32,
    pub height: u32,
    /// Offset from the bitmap origin to the pointer tip.
    pub hotspot: Point,
    pub pixels: CursorPixels,
}

impl CursorImage {
    pub fn kind(&self) -> CursorKind {
        match self.pixels {
            CursorPixels::Color { .. } => CursorKind::Color,
            CursorPixels::Alpha { .. } => CursorKind::Alpha,
        }
    }

    /// Where the bitmap's top-left corner lands for a pointer at `position`.
    pub fn origin_at(&self, position: Point) -> Point {
        position.offset_by(self.hotspot.x, self.hotspot.y)
    }

    /// Framebuffer area covered for a pointer at `position`, unclipped.
    pub fn bounds_at(&self, position: Point) -> Rect {
        let origin = self.origin_at(position);
        Rect::new(origin.x, origin.y, self.width, self.height)
    }
}

/// Current cursor state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    /// Pointer position in framebuffer coordinates
    pub position: Point,
    /// Current cursor image (if any)
    pub image: Option<CursorImage>,
    /// Whether cursor is visible
    pub visible: bool,
}

/// Decoder for `WMVd` cursor shape rectangles.
pub struct CursorShapeDecoder;

impl RectDecoder for CursorShapeDecoder {
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        let cursor_type = reader.read_u16()?;
        let bitmap = match cursor_type {
            CURSOR_TYPE_COLOR => {
                let len = pixel_bytes(rect.width, rect.height, view.bytes_per_pixel()?)?;
                reader.ensure(len.saturating_mul(2))?;
                CursorBitmap::Color {
                    color: reader.read_bytes(len)?,
                    and_mask: reader.read_bytes(len)?,
                }
            }
            CURSOR_TYPE_ALPHA => {
                let len = pixel_bytes(rect.width, rect.height, 4)?;
                CursorBitmap::Alpha {
                    rgba: reader.read_bytes(len)?,
                }
            }
            other => {
                return Err(DecodeError::invalid(format!("unknown cursor type {}", other)));
            }
        };

        sink.set_cursor_shape(CursorShape {
            width: rect.width,
            height: rect.height,
            hotspot: Point::new(rect.x as i32, rect.y as i32),
            bitmap,
        });
        Ok(())
    }
}

/// Decoder for `WMVe` cursor visibility rectangles.
pub struct CursorVisibilityDecoder;

impl RectDecoder for CursorVisibilityDecoder {
    fn decode<S: RectSink>(
        &self,
        _rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        _view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        let flags = reader.read_u16()?;
        sink.set_cursor_visible(flags & VISIBLE_FLAG != 0);
        Ok(())
    }
}

/// Decoder for `WMVf` cursor position rectangles.
pub struct CursorPositionDecoder;

impl RectDecoder for CursorPositionDecoder {
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        _reader: &mut RfbReader<'_>,
        _view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        sink.set_cursor_position(Point::new(rect.x as i32, rect.y as i32));
        Ok(())
    }
}
