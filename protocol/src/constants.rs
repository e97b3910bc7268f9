/*!
Wire-protocol constants shared by every module that touches raw words.
*/

/// Number of independent readout boards.
pub const NROACH: usize = 10;

/// Image width in pixels (column count).
pub const XPIX: usize = 80;

/// Image height in pixels (row count).
pub const YPIX: usize = 125;

/// Size of a wire word in bytes.
pub const WORD_BYTES: usize = 8;

/// Maximum number of data words a single packet may carry.
pub const MAX_DATA_WORDS: usize = 103;

/// Maximum packet size in words (one header plus `MAX_DATA_WORDS`).
pub const MAX_PACKET_WORDS: usize = MAX_DATA_WORDS + 1;

/// `start` sentinel marking a fresh packet header.
pub const HEADER_START: u8 = 0xFF;

/// `start` value of the short-packet terminator word.
pub const EOF_START: u8 = 0x7F;

/// `roach` value of the short-packet terminator word.
pub const EOF_ROACH: u8 = 0xFF;

/// Per-board frame sequence numbers wrap modulo this value (12 bits).
pub const FRAME_MODULUS: u16 = 4096;
