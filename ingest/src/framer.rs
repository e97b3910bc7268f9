/*!
Packet reassembly and dispatch — the framing core.

Reconstructs variable-length packets from an unaligned byte stream across
datagram boundaries. The central invariant: at every quiescent moment
between parse passes, the reassembly buffer is empty or begins on an
8-byte boundary that is itself a packet header.
*/

use detector_protocol::{
    DataWord, HeaderWord, Image, EOF_START, FRAME_MODULUS, HEADER_START, MAX_DATA_WORDS, NROACH,
    WORD_BYTES,
};
use tracing::{debug, warn};

/// Byte-stream reassembler and per-board frame-sequence tracker.
pub struct PacketFramer {
    buffer: Vec<u8>,
    expected_frame: [u16; NROACH],
    parsed_packets: u64,
    frame_mismatches: u64,
    oversize_packets: u64,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            expected_frame: [0; NROACH],
            parsed_packets: 0,
            frame_mismatches: 0,
            oversize_packets: 0,
        }
    }

    /// Append freshly-received bytes to the tail of the reassembly buffer.
    /// Safe at any time: appending at the tail never disturbs the header
    /// invariant.
    pub fn ingest(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Current reassembly buffer depth, in bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn parsed_packets(&self) -> u64 {
        self.parsed_packets
    }

    pub fn frame_mismatches(&self) -> u64 {
        self.frame_mismatches
    }

    pub fn oversize_packets(&self) -> u64 {
        self.oversize_packets
    }

    pub fn expected_frame(&self, roach: usize) -> u16 {
        self.expected_frame[roach]
    }

    /// Drain every complete packet currently sitting in the reassembly
    /// buffer, folding each one into `image`. Returns the number of
    /// packets parsed this call. Leaves an in-progress (incomplete) packet
    /// in the buffer for the next call.
    pub fn parse_pass(&mut self, image: &mut Image) -> usize {
        let mut parsed_this_pass = 0;

        loop {
            if self.buffer.len() < 2 * WORD_BYTES {
                break;
            }

            match self.find_boundary() {
                None => break,
                Some(Boundary { word_index, is_eof }) => {
                    let packet_end = word_index * WORD_BYTES;

                    if word_index > MAX_DATA_WORDS {
                        self.oversize_packets += 1;
                        warn!(
                            words = word_index,
                            max = MAX_DATA_WORDS, "oversize packet accepted"
                        );
                    }

                    let packet = self.buffer[..packet_end].to_vec();
                    self.parse_packet(&packet, image);
                    self.parsed_packets += 1;
                    parsed_this_pass += 1;

                    let consumed = if is_eof { packet_end + WORD_BYTES } else { packet_end };
                    self.buffer.drain(0..consumed);
                }
            }
        }

        parsed_this_pass
    }

    /// Scan the buffer word by word, starting after the current packet's
    /// header, looking for the next packet boundary: either a fresh header
    /// (`start == 0xFF`) or the short-packet EOF terminator.
    fn find_boundary(&self) -> Option<Boundary> {
        let word_count = self.buffer.len() / WORD_BYTES;
        for word_index in 1..word_count {
            let offset = word_index * WORD_BYTES;
            let word = be_word(&self.buffer[offset..offset + WORD_BYTES]);
            let header = HeaderWord::from_word(word);

            if header.is_packet_start() {
                return Some(Boundary { word_index, is_eof: false });
            }
            if header.is_eof() {
                return Some(Boundary { word_index, is_eof: true });
            }
        }
        None
    }

    /// Decode one complete packet (header + data words, no terminator) and
    /// fold its data words into `image`.
    fn parse_packet(&mut self, packet: &[u8], image: &mut Image) {
        debug_assert!(packet.len() >= WORD_BYTES && packet.len() % WORD_BYTES == 0);

        let header = HeaderWord::from_word(be_word(&packet[0..WORD_BYTES]));
        if header.roach as usize >= NROACH {
            warn!(raw_roach = header.roach, "roach out of range, aliased");
        }
        let roach = header.roach as usize % NROACH;

        let expected = self.expected_frame[roach];
        if header.frame != expected {
            self.frame_mismatches += 1;
            debug!(
                roach,
                expected, received = header.frame, "frame-sequence mismatch"
            );
        }
        // Advances from the old expectation regardless of the received
        // value: a dropped datagram leaves the counter permanently offset
        // until the next full resync event on the device side.
        self.expected_frame[roach] = (expected + 1) % FRAME_MODULUS;

        for chunk in packet[WORD_BYTES..].chunks_exact(WORD_BYTES) {
            let data = DataWord::from_word(be_word(chunk));
            image.increment(data.pixel_x(), data.pixel_y());
        }
    }
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

struct Boundary {
    /// Word index (not byte offset) at which the next packet begins.
    word_index: usize,
    is_eof: bool,
}

fn be_word(bytes: &[u8]) -> u64 {
    let mut array = [0u8; WORD_BYTES];
    array.copy_from_slice(bytes);
    u64::from_be_bytes(array)
}
