//! VDL2 feed
//!
//! dumpvdl2 publishes decoded frames as JSON lines over a ZeroMQ PUB
//! socket. ZeroMQ sockets are blocking, so the subscriber lives on a plain
//! thread and hands events to the async side with blocking sends. Socket
//! establishment follows the same backoff and notification policy as the
//! Mode-S feed; once connected the library reconnects by itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::retry_delay;
use crate::assembler::Event;
use crate::config::{Endpoint, ReconnectConfig};
use crate::liveness::Footprint;
use crate::notify::SlackNotifier;
use crate::vdl2::Vdl2Line;

const RECV_TIMEOUT_MS: i32 = 5000;

/// Must be called from within the runtime; the subscriber thread posts
/// notifications back through its handle.
pub fn spawn(
    endpoint: Endpoint,
    reconnect: ReconnectConfig,
    events: mpsc::Sender<Event>,
    footprint: Footprint,
    notifier: SlackNotifier,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    let runtime = Handle::current();
    std::thread::Builder::new()
        .name("vdl2-ingest".to_string())
        .spawn(move || {
            subscriber_loop(
                &endpoint, &reconnect, &events, &footprint, &notifier, &runtime, &shutdown,
            )
        })
}

#[allow(clippy::too_many_arguments)]
fn subscriber_loop(
    endpoint: &Endpoint,
    reconnect: &ReconnectConfig,
    events: &mpsc::Sender<Event>,
    footprint: &Footprint,
    notifier: &SlackNotifier,
    runtime: &Handle,
    shutdown: &AtomicBool,
) {
    let addr = format!("tcp://{}:{}", endpoint.host, endpoint.port);
    let context = zmq::Context::new();

    let mut attempt: u32 = 0;
    let socket = loop {
        attempt += 1;
        match open_socket(&context, &addr) {
            Ok(socket) => break socket,
            Err(err) => {
                if attempt >= reconnect.max_retries {
                    error!(
                        "vdl2 feed {}: {} (attempt {}/{})",
                        addr, err, attempt, reconnect.max_retries
                    );
                    runtime.block_on(notifier.notify_critical(&format!(
                        "vdl2 feed {} unreachable after {} attempts, collector degraded",
                        addr, attempt
                    )));
                    return;
                }
                let delay = retry_delay(reconnect, attempt);
                warn!(
                    "vdl2 feed {}: {}, retry {}/{} in {:?}",
                    addr, err, attempt, reconnect.max_retries, delay
                );
                std::thread::sleep(delay);
                if shutdown.load(Ordering::Relaxed) {
                    return;
                }
            }
        }
    };
    info!("vdl2 feed subscribed to {}", addr);

    while !shutdown.load(Ordering::Relaxed) {
        let line = match socket.recv_string(0) {
            Ok(Ok(line)) => line,
            Ok(Err(_)) => {
                debug!("vdl2 feed: non-utf8 frame dropped");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue, // receive timeout, poll shutdown
            Err(err) => {
                warn!("vdl2 feed {}: {}", addr, err);
                continue;
            }
        };
        footprint.touch();

        for event in decode_line(&line) {
            if events.blocking_send(event).is_err() {
                info!("event channel closed, vdl2 feed stopped");
                return;
            }
        }
    }
    info!("vdl2 feed stopped");
}

fn open_socket(context: &zmq::Context, addr: &str) -> Result<zmq::Socket, zmq::Error> {
    let socket = context.socket(zmq::SUB)?;
    socket.set_subscribe(b"")?;
    socket.set_rcvtimeo(RECV_TIMEOUT_MS)?;
    socket.connect(addr)?;
    Ok(socket)
}

/// Events carried by one JSON line. An XID location precedes any weather
/// from the same line so the backfill can see it.
fn decode_line(line: &str) -> Vec<Event> {
    let Some(parsed) = Vdl2Line::parse(line) else {
        return Vec::new();
    };
    let icao = parsed.icao();
    let received_at = Utc::now();
    let mut out = Vec::new();

    if let (Some(icao), Some(location)) = (icao.as_ref(), parsed.xid_location()) {
        out.push(Event::Vdl2Xid {
            icao: icao.clone(),
            location,
            received_at,
        });
    }
    if let Some(weather) = parsed.weather() {
        out.push(Event::Vdl2Weather {
            icao,
            callsign: parsed.flight().map(str::to_string),
            weather,
            received_at,
        });
    }
    out
}
