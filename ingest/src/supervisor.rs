/*!
Supervisor: creates the two inter-worker channels, launches the Recorder
and Aggregator, runs the Ingestor on its own thread, and brokers the
global shutdown signal.
*/

use crate::config::AppConfig;
use crate::{aggregator, control, ingestor, recorder};
use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// Run the full pipeline until shutdown. Blocks until the Ingestor returns
/// and every worker thread has been joined.
pub fn run(config: AppConfig) -> Result<()> {
    control::cleanup_all(&config.ramdisk_dir);
    std::fs::create_dir_all(&config.ramdisk_dir)
        .with_context(|| format!("failed to create {}", config.ramdisk_dir.display()))?;

    let (to_recorder, from_ingestor_recorder) = bounded::<Vec<u8>>(config.channel_capacity);
    let (to_aggregator, from_ingestor_aggregator) = bounded::<Vec<u8>>(config.channel_capacity);

    install_ctrlc_handler(&config)?;

    let recorder_ramdisk = config.ramdisk_dir.clone();
    let recorder_handle = thread::spawn(move || recorder::run(from_ingestor_recorder, recorder_ramdisk));

    let aggregator_ramdisk = config.ramdisk_dir.clone();
    let renderer_path = config.renderer_path.clone();
    let aggregator_handle =
        thread::spawn(move || aggregator::run(from_ingestor_aggregator, aggregator_ramdisk, renderer_path));

    info!("supervisor: recorder and aggregator launched, running ingestor");
    let ingestor_result = ingestor::run(&config, to_recorder, to_aggregator);

    if let Err(e) = &ingestor_result {
        error!(error = %e, "ingestor terminated with an error");
    }

    // Ingestor has returned; join whatever workers remain, per the
    // "no restart, crash is a captured-session loss" error policy.
    match recorder_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "recorder terminated with an error"),
        Err(_) => error!("recorder thread panicked"),
    }
    match aggregator_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "aggregator terminated with an error"),
        Err(_) => error!("aggregator thread panicked"),
    }

    ingestor_result
}

/// Ctrl-C materializes the `QUIT` control file so interactive shutdown and
/// an operator-dropped `QUIT` file converge on the same code path instead
/// of being two parallel shutdown mechanisms.
fn install_ctrlc_handler(config: &AppConfig) -> Result<()> {
    let quit_path = control::quit_path(&config.ramdisk_dir);
    let requested = Arc::new(AtomicBool::new(false));
    let requested_for_handler = Arc::clone(&requested);

    ctrlc::set_handler(move || {
        if !requested_for_handler.swap(true, Ordering::SeqCst) {
            info!("received interrupt, requesting shutdown via QUIT");
        }
        let _ = std::fs::File::create(&quit_path);
    })
    .context("failed to install Ctrl-C handler")?;

    Ok(())
}
