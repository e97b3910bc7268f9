/*!
Recorder: drains the Ingestor's byte stream to timestamped bulk-capture
files, gated by the `START`/`STOP` control files.
*/

use crate::control;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// How long the Recorder blocks on its inbound channel before re-checking
/// the control files and the current wall-clock second. Also the interval
/// at which an idle Recorder notices `START` without waiting on traffic.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

struct ActiveSegment {
    dir: PathBuf,
    file: File,
    opened_second: u64,
    bytes_written: u64,
}

/// Run the Recorder's state machine until `QUIT` is observed or the
/// inbound channel disconnects.
pub fn run(rx: Receiver<Vec<u8>>, ramdisk_dir: PathBuf) -> Result<()> {
    let mut active: Option<ActiveSegment> = None;

    loop {
        if control::quit_requested(&ramdisk_dir) {
            if let Some(segment) = active.take() {
                info!(bytes = segment.bytes_written, "closing capture file on QUIT");
            }
            control::cleanup_all(&ramdisk_dir);
            info!("recorder shutting down");
            return Ok(());
        }

        if active.is_none() {
            if let Some(dest) = control::take_start(&ramdisk_dir)? {
                active = Some(open_segment(Path::new(&dest), epoch_seconds())?);
                info!(dir = %dest, "recorder active");
            }
        } else if control::take_stop(&ramdisk_dir) {
            let finished = active.take().unwrap();
            info!(bytes = finished.bytes_written, "recorder stopped");
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(bytes) => {
                if let Some(segment) = active.as_mut() {
                    match segment.file.write_all(&bytes) {
                        Ok(()) => segment.bytes_written += bytes.len() as u64,
                        Err(e) => warn!(error = %e, "short write to capture file"),
                    }
                }
                // Idle: drain and discard, per the spec's Idle state.
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }

        if let Some(segment) = active.as_mut() {
            let now = epoch_seconds();
            if now > segment.opened_second {
                info!(
                    bytes_per_sec = segment.bytes_written,
                    dir = %segment.dir.display(),
                    "recorder throughput"
                );
                *segment = open_segment(&segment.dir, now)?;
            }
        }
    }
}

fn open_segment(dir: &Path, second: u64) -> Result<ActiveSegment> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("{second}.bin"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    Ok(ActiveSegment {
        dir: dir.to_path_buf(),
        file,
        opened_second: second,
        bytes_written: 0,
    })
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

    #[test]
    fn idle_discards_bytes_without_a_destination() {
        let ramdisk = tempdir().unwrap();
        let (tx, rx) = bounded::<Vec<u8>>(4);
        tx.send(vec![1, 2, 3]).unwrap();
        drop(tx);

        run(rx, ramdisk.path().to_path_buf()).unwrap();
        // No START was ever provided; nothing should have been written anywhere discoverable.
    }

    #[test]
    fn start_then_stop_writes_a_segment_file() {
        let ramdisk = tempdir().unwrap();
        let capture = tempdir().unwrap();
        let (tx, rx) = bounded::<Vec<u8>>(16);

        std::fs::write(control::start_path(ramdisk.path()), capture.path().to_str().unwrap()).unwrap();
        tx.send(b"hello".to_vec()).unwrap();

        let ramdisk_path = ramdisk.path().to_path_buf();
        let handle = std::thread::spawn(move || run(rx, ramdisk_path));

        // Give the recorder a moment to observe START and the byte, then stop it.
        std::thread::sleep(Duration::from_millis(50));
        std::fs::write(control::stop_path(ramdisk.path()), "").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        std::fs::write(control::quit_path(ramdisk.path()), "").unwrap();

        handle.join().unwrap().unwrap();

        let mut found_hello = false;
        for entry in std::fs::read_dir(capture.path()).unwrap() {
            let entry = entry.unwrap();
            let contents = std::fs::read(entry.path()).unwrap();
            if contents == b"hello" {
                found_hello = true;
            }
        }
        assert!(found_hello, "expected a *.bin file containing the captured bytes");
    }
}
