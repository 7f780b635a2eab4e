//! Mode-S AVR feed
//!
//! Connects to a dump1090-style decoder on its raw output port and turns
//! AVR lines into assembler events. Dropped connections are retried with
//! exponential backoff; when the retries run out the collector alerts and
//! the task ends.

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{retry_delay, FeedError};
use crate::assembler::Event;
use crate::config::{Endpoint, ReconnectConfig, ReferenceConfig};
use crate::liveness::Footprint;
use crate::modes;
use crate::notify::SlackNotifier;

pub async fn run(
    endpoint: Endpoint,
    reference: ReferenceConfig,
    reconnect: ReconnectConfig,
    events: mpsc::Sender<Event>,
    footprint: Footprint,
    notifier: SlackNotifier,
) -> Result<(), FeedError> {
    let addr = format!("{}:{}", endpoint.host, endpoint.port);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if attempt > 1 {
            let delay = retry_delay(&reconnect, attempt - 1);
            warn!(
                "mode-s feed {}: reconnect attempt {}/{} in {:?}",
                addr, attempt, reconnect.max_retries, delay
            );
            tokio::time::sleep(delay).await;
        }

        let stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(source) => {
                if attempt >= reconnect.max_retries {
                    notifier
                        .notify_critical(&format!(
                            "mode-s feed {} unreachable after {} attempts, collector degraded",
                            addr, attempt
                        ))
                        .await;
                    return Err(FeedError::RetriesExhausted {
                        addr,
                        attempts: attempt,
                    });
                }
                warn!(
                    "{}",
                    FeedError::Connect {
                        addr: addr.clone(),
                        source,
                    }
                );
                continue;
            }
        };
        info!("mode-s feed connected to {}", addr);

        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    // Any received line proves the feed is healthy
                    attempt = 0;
                    footprint.touch();

                    let Some(raw) = modes::parse_avr_line(&line) else {
                        continue;
                    };
                    let Some(message) =
                        modes::decode(&raw, reference.lat_deg, reference.lon_deg)
                    else {
                        continue;
                    };
                    debug!("mode-s {}: {:?}", message.icao(), message);
                    let event = Event::ModeS {
                        message,
                        received_at: Utc::now(),
                    };
                    if events.send(event).await.is_err() {
                        info!("event channel closed, mode-s feed stopped");
                        return Ok(());
                    }
                }
                Ok(None) => {
                    warn!("mode-s feed {} closed by peer", addr);
                    break;
                }
                Err(source) => {
                    warn!(
                        "mode-s feed {}: {}",
                        addr,
                        FeedError::Read {
                            addr: addr.clone(),
                            source,
                        }
                    );
                    break;
                }
            }
        }
    }
}
