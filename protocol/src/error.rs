/*!
Common error types for the detector wire protocol.
*/

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while decoding a word or packet off the wire.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("word is {0} bytes, expected 8")]
    InvalidWordLength(usize),

    #[error("packet is {0} bytes, expected a non-empty multiple of 8")]
    InvalidPacketLength(usize),
}
