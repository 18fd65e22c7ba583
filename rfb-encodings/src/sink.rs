//! Effect sinks for the record traversal.
//!
//! Decoders never write to decoder state directly. They report each effect to
//! a [`RectSink`]: [`ProbeSink`] ignores every effect so a record can be
//! measured without side effects, and [`ApplySink`] carries them out on the
//! framebuffer and cursor state.

use crate::cursor::{CursorShape, CursorState};
use crate::{DecodeError, FrameBuffer, PixelFormat};
use rfb_common::{Point, Rect};
use tracing::{debug, trace};

/// Receiver of decoded rectangle effects.
pub trait RectSink {
    /// Write tightly packed pixels into a framebuffer rectangle.
    fn image_rect(&mut self, rect: Rect, pixels: &[u8]) -> Result<(), DecodeError>;

    /// Fill a framebuffer rectangle with one pixel value.
    fn fill_rect(&mut self, rect: Rect, pixel: &[u8]) -> Result<(), DecodeError>;

    /// Copy a `dest`-sized block from `src` within the framebuffer.
    fn copy_rect(&mut self, dest: Rect, src: Point) -> Result<(), DecodeError>;

    /// Replace the pixel format and reallocate the framebuffer.
    fn set_pixel_format(&mut self, format: PixelFormat, width: u32, height: u32);

    /// Replace the cursor image.
    fn set_cursor_shape(&mut self, shape: CursorShape<'_>);

    fn set_cursor_visible(&mut self, visible: bool);

    fn set_cursor_position(&mut self, position: Point);
}

/// Sink that discards every effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbeSink;

impl RectSink for ProbeSink {
    fn image_rect(&mut self, _rect: Rect, _pixels: &[u8]) -> Result<(), DecodeError> {
        Ok(())
    }

    fn fill_rect(&mut self, _rect: Rect, _pixel: &[u8]) -> Result<(), DecodeError> {
        Ok(())
    }

    fn copy_rect(&mut self, _dest: Rect, _src: Point) -> Result<(), DecodeError> {
        Ok(())
    }

    fn set_pixel_format(&mut self, _format: PixelFormat, _width: u32, _height: u32) {}

    fn set_cursor_shape(&mut self, _shape: CursorShape<'_>) {}

    fn set_cursor_visible(&mut self, _visible: bool) {}

    fn set_cursor_position(&mut self, _position: Point) {}
}

/// Sink that mutates the framebuffer and cursor state.
#[derive(Debug)]
pub struct ApplySink<'s> {
    framebuffer: &'s mut Option<FrameBuffer>,
    cursor: &'s mut CursorState,
    format_changed: bool,
}

impl<'s> ApplySink<'s> {
    pub fn new(framebuffer: &'s mut Option<FrameBuffer>, cursor: &'s mut CursorState) -> Self {
        Self {
            framebuffer,
            cursor,
            format_changed: false,
        }
    }

    /// Whether a format rectangle replaced the framebuffer.
    pub fn format_changed(&self) -> bool {
        self.format_changed
    }

    fn framebuffer_mut(&mut self) -> Result<&mut FrameBuffer, DecodeError> {
        self.framebuffer
            .as_mut()
            .ok_or_else(|| DecodeError::invalid("no framebuffer allocated"))
    }
}

fn to_invalid(err: anyhow::Error) -> DecodeError {
    DecodeError::invalid(format!("{:#}", err))
}

impl RectSink for ApplySink<'_> {
    fn image_rect(&mut self, rect: Rect, pixels: &[u8]) -> Result<(), DecodeError> {
        self.framebuffer_mut()?
            .image_rect(rect, pixels)
            .map_err(to_invalid)
    }

    fn fill_rect(&mut self, rect: Rect, pixel: &[u8]) -> Result<(), DecodeError> {
        self.framebuffer_mut()?
            .fill_rect(rect, pixel)
            .map_err(to_invalid)
    }

    fn copy_rect(&mut self, dest: Rect, src: Point) -> Result<(), DecodeError> {
        self.framebuffer_mut()?
            .copy_rect(dest, src)
            .map_err(to_invalid)
    }

    fn set_pixel_format(&mut self, format: PixelFormat, width: u32, height: u32) {
        debug!(
            "Framebuffer reallocated: {}x{} at {} bpp (depth {})",
            width, height, format.bits_per_pixel, format.depth
        );
        *self.framebuffer = Some(FrameBuffer::new(width, height, format));
        self.format_changed = true;
    }

    fn set_cursor_shape(&mut self, shape: CursorShape<'_>) {
        debug!(
            "Cursor image updated: {:?} {}x{} hotspot=({}, {})",
            shape.kind(),
            shape.width,
            shape.height,
            shape.hotspot.x,
            shape.hotspot.y
        );
        self.cursor.image = Some(shape.to_image());
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        if self.cursor.visible != visible {
            debug!("Cursor visibility changed to {}", visible);
            self.cursor.visible = visible;
        }
    }

    fn set_cursor_position(&mut self, position: Point) {
        if self.cursor.position != position {
            trace!("Cursor position changed to {:?}", position);
            self.cursor.position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorBitmap;

    #[test]
    fn test_probe_sink_accepts_everything() {
        let mut sink = ProbeSink;
        assert!(sink.fill_rect(Rect::new(100, 100, 5, 5), &[1, 2, 3]).is_ok());
        assert!(sink.copy_rect(Rect::new(0, 0, 1, 1), Point::new(9, 9)).is_ok());
    }

    #[test]
    fn test_apply_sink_without_framebuffer() {
        let mut framebuffer = None;
        let mut cursor = CursorState::default();
        let mut sink = ApplySink::new(&mut framebuffer, &mut cursor);
        let err = sink.fill_rect(Rect::new(0, 0, 1, 1), &[0]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRecord(_)));
    }

    #[test]
    fn test_apply_sink_format_and_paint() {
        let mut framebuffer = None;
        let mut cursor = CursorState::default();
        let mut sink = ApplySink::new(&mut framebuffer, &mut cursor);
        sink.set_pixel_format(PixelFormat::bgr233(), 2, 2);
        assert!(sink.format_changed());
        sink.fill_rect(Rect::new(1, 1, 1, 1), &[5]).unwrap();

        let fb = framebuffer.unwrap();
        assert_eq!(fb.row(1), &[0, 5]);
    }

    #[test]
    fn test_apply_sink_out_of_bounds_is_invalid() {
        let mut framebuffer = Some(FrameBuffer::new(2, 2, PixelFormat::bgr233()));
        let mut cursor = CursorState::default();
        let mut sink = ApplySink::new(&mut framebuffer, &mut cursor);
        let err = sink.image_rect(Rect::new(1, 1, 2, 1), &[1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRecord(_)));
    }

    #[test]
    fn test_apply_sink_cursor_updates() {
        let mut framebuffer = None;
        let mut cursor = CursorState::default();
        {
            let mut sink = ApplySink::new(&mut framebuffer, &mut cursor);
            sink.set_cursor_position(Point::new(3, 4));
            sink.set_cursor_visible(true);
            sink.set_cursor_shape(CursorShape {
                width: 1,
                height: 1,
                hotspot: Point::new(0, 0),
                bitmap: CursorBitmap::Alpha {
                    rgba: &[1, 2, 3, 4],
                },
            });
        }
        assert_eq!(cursor.position, Point::new(3, 4));
        assert!(cursor.visible);
        assert_eq!(cursor.image.unwrap().width, 1);
    }
}
