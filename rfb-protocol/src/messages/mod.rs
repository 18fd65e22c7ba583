//! VMnc record wire types.
//!
//! # Wire Format Rules
//!
//! 1. **Big-endian byte order** - All multi-byte integers use network byte order
//! 2. **Header first** - A record header is followed by `count` rectangles, each a
//!    12-byte header plus an encoding-specific payload
//! 3. **Fail-fast errors** - Invalid data results in errors, no defensive fallbacks
//!
//! Only headers are parsed here; payloads belong to the rectangle decoders in
//! `rfb-encodings`.

pub mod types;

#[cfg(test)]
mod proptest_framing;

pub use types::{
    encoding_name, PixelFormatDescriptor, RecordHeader, Rectangle, ENCODING_COPYRECT,
    ENCODING_CURSOR_POSITION, ENCODING_CURSOR_SHAPE, ENCODING_CURSOR_VISIBILITY,
    ENCODING_HEXTILE, ENCODING_KEYBOARD_STATE, ENCODING_PIXEL_FORMAT, ENCODING_RAW,
    ENCODING_VM_STATE, KEYBOARD_STATE_LEN, PIXEL_FORMAT_LEN, PIXEL_FORMAT_SIGNIFICANT_LEN,
    RECORD_HEADER_LEN, RECORD_TAG_RECTANGLES, RECTANGLE_HEADER_LEN, VM_STATE_LEN,
};
