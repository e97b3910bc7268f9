/*!
Aggregator: drains the Ingestor's other byte stream, reframes and parses
packets via [`crate::framer::PacketFramer`], accumulates a photon-count
image, and flushes it every wall-clock second.
*/

use crate::control;
use crate::framer::PacketFramer;
use anyhow::Result;
use crossbeam_channel::{Receiver, TryRecvError};
use detector_protocol::Image;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// How long to back off when the inbound channel has nothing for us. Kept
/// tiny: the detector emits packets at kHz rates and the accumulator must
/// keep running continuously.
const IDLE_BACKOFF: Duration = Duration::from_micros(200);

pub fn run(rx: Receiver<Vec<u8>>, ramdisk_dir: PathBuf, renderer_path: String) -> Result<()> {
    let mut framer = PacketFramer::new();
    let mut image = Image::new();
    let mut accumulation_start = epoch_seconds();
    let mut parsed_since_flush = 0u64;

    loop {
        if control::quit_requested(&ramdisk_dir) {
            info!("aggregator observed QUIT, discarding partial second in flight");
            return Ok(());
        }

        let now = epoch_seconds();
        if now > accumulation_start {
            flush_image(&image, &ramdisk_dir, accumulation_start, &renderer_path);
            debug!(
                parsed_since_flush,
                buffered_bytes = framer.buffered_len(),
                frame_mismatches = framer.frame_mismatches(),
                oversize_packets = framer.oversize_packets(),
                "aggregator second rollover"
            );
            image.clear();
            accumulation_start = now;
            parsed_since_flush = 0;
        }

        match rx.try_recv() {
            Ok(bytes) => framer.ingest(&bytes),
            Err(TryRecvError::Empty) => std::thread::sleep(IDLE_BACKOFF),
            Err(TryRecvError::Disconnected) => return Ok(()),
        }

        parsed_since_flush += framer.parse_pass(&mut image) as u64;
    }
}

fn flush_image(image: &Image, ramdisk_dir: &Path, second: u64, renderer_path: &str) {
    let img_path = ramdisk_dir.join(format!("{second}.img"));
    match std::fs::write(&img_path, image.to_le_bytes()) {
        Ok(()) => {
            if image.overflow_count() > 0 {
                warn!(overflow = image.overflow_count(), path = %img_path.display(), "image cells saturated this interval");
            }
            info!(path = %img_path.display(), sum = image.sum(), "flushed image");
            spawn_renderer(renderer_path, &img_path, ramdisk_dir, second);
        }
        Err(e) => warn!(error = %e, path = %img_path.display(), "failed to write image file"),
    }
}

fn spawn_renderer(renderer_path: &str, img_path: &Path, ramdisk_dir: &Path, second: u64) {
    let png_path = ramdisk_dir.join(format!("{second}.png"));
    match Command::new(renderer_path).arg(img_path).arg(&png_path).spawn() {
        Ok(_) => {}
        Err(e) => warn!(error = %e, renderer = renderer_path, "failed to spawn renderer"),
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use tempfile::tempdir;

    fn header_word(start: u8, roach: u8, frame: u16, timestamp: u64) -> [u8; 8] {
        let word = ((start as u64) << 56)
            | ((roach as u64) << 48)
            | (((frame & 0xFFF) as u64) << 36)
            | (timestamp & 0xF_FFFF_FFFF);
        word.to_be_bytes()
    }

    fn data_word(x: u16, y: u16) -> [u8; 8] {
        ((x as u64 & 0x3FF) << 54 | (y as u64 & 0x3FF) << 44).to_be_bytes()
    }

    #[test]
    fn quit_stops_the_loop_without_flushing_a_partial_second() {
        let ramdisk = tempdir().unwrap();
        // QUIT is already present when the loop starts, so it exits before
        // ever reaching the rollover check.
        std::fs::write(control::quit_path(ramdisk.path()), "").unwrap();

        let (tx, rx) = bounded::<Vec<u8>>(4);
        let mut packet = Vec::new();
        packet.extend_from_slice(&header_word(0xFF, 0, 0, 0));
        packet.extend_from_slice(&data_word(1, 2));
        tx.send(packet).unwrap();
        drop(tx);

        run(rx, ramdisk.path().to_path_buf(), "true".to_string()).unwrap();

        let has_img = std::fs::read_dir(ramdisk.path())
            .unwrap()
            .any(|e| e.unwrap().path().extension().is_some_and(|e| e == "img"));
        assert!(!has_img, "partial second must be discarded, not flushed, on QUIT");
    }

    #[test]
    fn disconnect_stops_the_loop_cleanly() {
        let ramdisk = tempdir().unwrap();
        let (tx, rx) = bounded::<Vec<u8>>(4);
        drop(tx);
        run(rx, ramdisk.path().to_path_buf(), "true".to_string()).unwrap();
    }

    #[test]
    fn second_rollover_flushes_a_full_size_image_with_the_right_sum() {
        let ramdisk = tempdir().unwrap();
        let mut image = Image::new();
        image.increment(25, 39);
        image.increment(25, 39);
        image.increment(0, 0);

        flush_image(&image, ramdisk.path(), 1_700_000_000, "true");

        let img_path = ramdisk.path().join("1700000000.img");
        let bytes = std::fs::read(&img_path).unwrap();
        assert_eq!(bytes.len(), 20000);

        let sum: u64 = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]) as u64).sum();
        assert_eq!(sum, image.sum());
        assert_eq!(sum, 3);
    }
}
