//! Cursor compositing.
//!
//! The framebuffer never contains the cursor. Each output frame is a copy of
//! the framebuffer with the cursor drawn on top at the pointer position minus
//! the hotspot, clipped to the framebuffer.
//!
//! Colour cursors use the classic AND/XOR rule on the stored pixel bytes:
//! `dst = (dst & and_mask) ^ color`. Because the rule is bitwise it is the
//! same whether applied per byte, per word or per dword. Alpha cursors are not
//! drawn.

use rfb_encodings::{CursorImage, CursorPixels, CursorState, FrameBuffer};
use tracing::{trace, warn};

/// Draws the cursor over copies of the framebuffer.
#[derive(Debug, Default)]
pub struct Compositor {
    alpha_warned: bool,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget which warnings were already logged.
    pub fn reset(&mut self) {
        self.alpha_warned = false;
    }

    /// Returns the framebuffer bytes with the cursor drawn on top.
    ///
    /// The result has the framebuffer's stride and pixel format.
    pub fn compose(&mut self, framebuffer: &FrameBuffer, cursor: &CursorState) -> Vec<u8> {
        let mut output = framebuffer.data().to_vec();
        if !cursor.visible {
            return output;
        }

        let Some(image) = &cursor.image else {
            trace!("Cursor visible but no shape received yet");
            return output;
        };

        match &image.pixels {
            CursorPixels::Color { color, and_mask } => {
                blend_color(&mut output, framebuffer, cursor, image, color, and_mask);
            }
            CursorPixels::Alpha { .. } => {
                if !self.alpha_warned {
                    warn!("Alpha cursor compositing is not supported, cursor not drawn");
                    self.alpha_warned = true;
                }
            }
        }
        output
    }
}

fn blend_color(
    output: &mut [u8],
    framebuffer: &FrameBuffer,
    cursor: &CursorState,
    image: &CursorImage,
    color: &[u8],
    and_mask: &[u8],
) {
    let bpp = framebuffer.bytes_per_pixel();
    let cursor_len = image.width as usize * image.height as usize * bpp;
    if color.len() != cursor_len || and_mask.len() != cursor_len {
        // The shape was sent under a different pixel format.
        warn!(
            "Cursor bitmap is {} bytes, expected {} at {} bytes per pixel; cursor not drawn",
            color.len(),
            cursor_len,
            bpp
        );
        return;
    }

    let bounds = image.bounds_at(cursor.position);
    let Some(visible) = bounds.clip_to(framebuffer.width(), framebuffer.height()) else {
        return;
    };

    let stride = framebuffer.stride();
    let cursor_stride = image.width as usize * bpp;
    let len = visible.width as usize * bpp;
    let src_x = (visible.x - bounds.x) as usize * bpp;

    for y in visible.y..visible.y + visible.height as i32 {
        let src = (y - bounds.y) as usize * cursor_stride + src_x;
        let dst = y as usize * stride + visible.x as usize * bpp;

        let pixels = &mut output[dst..dst + len];
        let masks = and_mask[src..src + len].iter().zip(&color[src..src + len]);
        for (byte, (and, xor)) in pixels.iter_mut().zip(masks) {
            *byte = (*byte & and) ^ xor;
        }
    }
}
