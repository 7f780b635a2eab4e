//! Collector entry point: wire the feeds, the assembler and the store
//! together and run until a shutdown signal arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use amdar_collector::assembler::Assembler;
use amdar_collector::config::Settings;
use amdar_collector::ingest;
use amdar_collector::liveness::Footprint;
use amdar_collector::notify::SlackNotifier;
use amdar_collector::store::{self, ObservationStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("AMDAR_CONFIG").ok());
    let settings = Settings::load(config_path.as_deref())?;

    info!("amdar collector starting");
    info!(
        "reference point {:.4} {:.4}, radius {} km, backfill window {} s",
        settings.reference.lat_deg,
        settings.reference.lon_deg,
        settings.reference.distance_km,
        settings.window_seconds,
    );
    info!(
        "mode-s feed {}:{}, vdl2 feed {}",
        settings.source.mode_s.host,
        settings.source.mode_s.port,
        settings
            .source
            .vdl2
            .as_ref()
            .map(|e| format!("{}:{}", e.host, e.port))
            .unwrap_or_else(|| "disabled".to_string()),
    );

    let notifier = SlackNotifier::new(settings.slack.clone());
    let observation_store = ObservationStore::new(settings.database.as_ref())?;

    let mut assembler = Assembler::new(&settings);
    match observation_store
        .recent_history(settings.outlier.history_size as i64)
        .await
    {
        Ok(pairs) if !pairs.is_empty() => assembler.seed_outlier(pairs),
        Ok(_) => {}
        Err(err) => warn!("outlier history seed skipped: {:#}", err),
    }

    let (event_tx, event_rx) = mpsc::channel(settings.channels.event_buffer);
    let (obs_tx, obs_rx) = mpsc::channel(settings.channels.observation_buffer);
    let shutdown = Arc::new(AtomicBool::new(false));

    let vdl2_thread = settings
        .source
        .vdl2
        .clone()
        .map(|endpoint| {
            ingest::vdl2::spawn(
                endpoint,
                settings.reconnect.clone(),
                event_tx.clone(),
                Footprint::new(&settings.liveness.vdl2),
                notifier.clone(),
                shutdown.clone(),
            )
        })
        .transpose()?;

    let mut modes_task = tokio::spawn(ingest::modes::run(
        settings.source.mode_s.clone(),
        settings.reference.clone(),
        settings.reconnect.clone(),
        event_tx,
        Footprint::new(&settings.liveness.mode_s),
        notifier.clone(),
    ));

    let assembler_task = tokio::spawn(assembler.run(event_rx, obs_tx));
    let store_task = tokio::spawn(store::run(
        observation_store,
        obs_rx,
        Footprint::new(&settings.liveness.store),
        notifier,
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        result = &mut modes_task => {
            match result {
                Ok(Ok(())) => info!("mode-s feed finished"),
                Ok(Err(err)) => error!("mode-s feed failed: {}", err),
                Err(err) => error!("mode-s feed task failed: {}", err),
            }
        }
    }

    // Stop the feeds; closing the event channel drains the rest of the
    // pipeline in order.
    shutdown.store(true, Ordering::Relaxed);
    modes_task.abort();
    let _ = assembler_task.await;
    let _ = store_task.await;
    if let Some(handle) = vdl2_thread {
        let _ = handle.join();
    }

    info!("amdar collector stopped");
    Ok(())
}
