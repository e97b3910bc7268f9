/*!
Ingestor: owns the UDP socket and fans every datagram out to the Recorder
and Aggregator channels.
*/

use crate::config::AppConfig;
use crate::control;
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

/// Maximum UDP datagram this protocol ever emits.
const MAX_DATAGRAM_BYTES: usize = 1500;

/// Bind the UDP socket and run the receive loop to completion. Runs on the
/// Supervisor's own thread, on a small dedicated Tokio runtime — spawning a
/// whole multi-threaded runtime for a single blocking-recv loop would be
/// wasted machinery.
pub fn run(config: &AppConfig, to_recorder: Sender<Vec<u8>>, to_aggregator: Sender<Vec<u8>>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build ingestor runtime")?;

    rt.block_on(receive_loop(config, to_recorder, to_aggregator))
}

async fn receive_loop(
    config: &AppConfig,
    to_recorder: Sender<Vec<u8>>,
    to_aggregator: Sender<Vec<u8>>,
) -> Result<()> {
    let bind_addr = format!("{}:{}", config.udp_bind_addr, config.udp_port);
    let socket = UdpSocket::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind UDP socket to {bind_addr}"))?;
    info!(addr = %bind_addr, "ingestor bound");

    let sock_ref = socket2::SockRef::from(&socket);
    sock_ref
        .set_recv_buffer_size(config.recv_buffer_bytes)
        .context("failed to set UDP receive-buffer hint")?;
    info!(bytes = config.recv_buffer_bytes, "receive buffer hint set");

    let timeout = Duration::from_secs(config.recv_timeout_secs);
    let mut buf = [0u8; MAX_DATAGRAM_BYTES];
    let mut datagrams = 0u64;
    let mut recorder_drops = 0u64;
    let mut aggregator_drops = 0u64;
    let started = Instant::now();

    loop {
        if control::quit_requested(&config.ramdisk_dir) {
            info!("ingestor observed QUIT");
            break;
        }

        match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                datagrams += 1;
                let datagram = &buf[..n];

                if to_recorder.try_send(datagram.to_vec()).is_err() {
                    recorder_drops += 1;
                    warn!("recorder channel full, datagram dropped on that side");
                }
                if to_aggregator.try_send(datagram.to_vec()).is_err() {
                    aggregator_drops += 1;
                    warn!("aggregator channel full, datagram dropped on that side");
                }

                if datagrams % 100_000 == 0 {
                    let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
                    info!(
                        datagrams,
                        rate_per_sec = datagrams as f64 / elapsed,
                        recorder_drops,
                        aggregator_drops,
                        "ingestor throughput"
                    );
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "UDP receive failed");
                return Err(e).context("UDP receive failed");
            }
            Err(_) => continue, // recv timeout, loop back to re-check QUIT
        }
    }

    info!(datagrams, recorder_drops, aggregator_drops, "ingestor final stats");
    Ok(())
}
