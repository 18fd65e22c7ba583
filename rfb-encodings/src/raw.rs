//! Raw encoding decoder - uncompressed pixel data.
//!
//! Raw encoding (type 0) transmits pixels as uncompressed data in the active
//! pixel format. The payload is tightly packed even though framebuffer rows
//! are stride-padded; the sink copies it row by row.
//!
//! # Wire Format
//!
//! ```text
//! +-------------+
//! | Pixel data  |  width * height * bytes_per_pixel bytes
//! +-------------+
//! ```

use crate::{pixel_bytes, DecodeError, FormatView, RectDecoder, RectSink, Rectangle, RfbReader};

/// Decoder for raw (uncompressed) pixel data.
pub struct RawDecoder;

impl RectDecoder for RawDecoder {
    fn decode<S: RectSink>(
        &self,
        rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        view: &mut FormatView,
        sink: &mut S,
    ) -> Result<(), DecodeError> {
        let total_bytes = pixel_bytes(rect.width, rect.height, view.bytes_per_pixel()?)?;
        let pixels = reader.read_bytes(total_bytes)?;

        if total_bytes == 0 {
            return Ok(()); // Empty rectangle - nothing to paint
        }
        sink.image_rect(rect.bounds(), pixels)
    }
}
