//! Pixel format and framebuffer storage for the VMnc decoder.
//!
//! - [`PixelFormat`] - the active format, built from a format rectangle's descriptor
//! - [`FrameBuffer`] - the persistent, stride-padded image all rectangle decoders write into

pub mod format;
pub mod framebuffer;

pub use format::PixelFormat;
pub use framebuffer::{stride_for, CopyDirection, FrameBuffer};
