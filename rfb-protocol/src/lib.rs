//! VMnc record protocol layer.
//!
//! This crate provides the byte-level vocabulary for decoding VMnc records:
//! a non-blocking reader over delimited byte ranges, the record and rectangle
//! headers, the pixel format descriptor and the encoding tags.
//!
//! # Modules
//!
//! - [`io`] - `RfbReader` / `RfbWriter` over byte slices
//! - [`messages`] - Record, rectangle and pixel-format wire types
//! - [`errors`] - The two decode error kinds
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::{RecordHeader, Rectangle, RfbReader};
//!
//! let bytes = [0u8, 0, 0, 1, 0, 0, 0, 0, 0, 4, 0, 4, 0, 0, 0, 0];
//! let mut reader = RfbReader::new(&bytes);
//! let header = RecordHeader::read_from(&mut reader).unwrap();
//! assert_eq!(header.rectangles, 1);
//! let rect = Rectangle::read_from(&mut reader).unwrap();
//! assert_eq!((rect.width, rect.height), (4, 4));
//! ```

pub mod errors;
pub mod io;
pub mod messages;

// Re-export commonly used types
pub use errors::DecodeError;
pub use io::{RfbReader, RfbWriter};
pub use messages::{PixelFormatDescriptor, RecordHeader, Rectangle};
