/*!
# Detector Protocol

Wire-format types for the photon-counting detector readout protocol: the
8-byte big-endian header and data words, and the per-second photon-count
image they accumulate into.

## Core Types

- [`HeaderWord`] - decoded packet header
- [`DataWord`] - decoded payload word
- [`Image`] - the `XPIX x YPIX` photon-count grid

## Modules

- [`header`] - header word parsing
- [`data`] - data word parsing
- [`image`] - photon-count image
- [`constants`] - shared protocol constants
- [`error`] - common error types
*/

pub mod constants;
pub mod data;
pub mod error;
pub mod header;
pub mod image;

pub use constants::{
    EOF_ROACH, EOF_START, FRAME_MODULUS, HEADER_START, MAX_DATA_WORDS, MAX_PACKET_WORDS, NROACH,
    WORD_BYTES, XPIX, YPIX,
};
pub use data::DataWord;
pub use error::{ProtocolError, Result};
pub use header::HeaderWord;
pub use image::Image;

/// Version of this crate, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
