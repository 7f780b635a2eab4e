//! Feed ingest tasks
//!
//! One task per upstream decoder. Each task owns its connection, retries
//! with exponential backoff, and forwards decoded events to the assembler
//! over a bounded channel.

pub mod modes;
pub mod vdl2;

use std::time::Duration;

use thiserror::Error;

use crate::config::ReconnectConfig;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("read from {addr}: {source}")]
    Read {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("feed {addr} gave up after {attempts} attempts")]
    RetriesExhausted { addr: String, attempts: u32 },
}

/// Backoff before reconnect attempt `attempt` (1-based):
/// base * factor^(attempt-1), capped.
pub fn retry_delay(config: &ReconnectConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(63);
    let delay = config.base_delay_s * config.factor.powi(exponent as i32);
    Duration::from_secs_f64(delay.min(config.max_delay_s))
}
