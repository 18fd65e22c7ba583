//! Keyboard and VM state rectangles.
//!
//! `WMVg` carries 10 bytes of keyboard state and `WMVh` 4 bytes of VM state.
//! Neither affects the image; both are length-checked and skipped.

use crate::{DecodeError, FormatView, RectDecoder, RectSink, Rectangle, RfbReader};
use rfb_protocol::messages::{KEYBOARD_STATE_LEN, VM_STATE_LEN};

/// Decoder for `WMVg` keyboard state rectangles.
pub struct KeyboardStateDecoder;

impl RectDecoder for KeyboardStateDecoder {
    fn decode<S: RectSink>(
        &self,
        _rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        _view: &mut FormatView,
        _sink: &mut S,
    ) -> Result<(), DecodeError> {
        reader.skip(KEYBOARD_STATE_LEN)
    }
}

/// Decoder for `WMVh` VM state rectangles.
pub struct VmStateDecoder;

impl RectDecoder for VmStateDecoder {
    fn decode<S: RectSink>(
        &self,
        _rect: &Rectangle,
        reader: &mut RfbReader<'_>,
        _view: &mut FormatView,
        _sink: &mut S,
    ) -> Result<(), DecodeError> {
        reader.skip(VM_STATE_LEN)
    }
}
