//! Observation persistence
//!
//! Accepted observations go into a TimescaleDB/PostgreSQL table through a
//! connection pool. Without database configuration the store runs in
//! log-only mode, which keeps local development free of infrastructure.

use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Pool, Runtime};
use tokio::sync::mpsc;
use tokio_postgres::NoTls;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::liveness::Footprint;
use crate::notify::SlackNotifier;
use crate::types::Observation;

const INSERT_SQL: &str = "INSERT INTO meteorological_data \
     (time, icao, callsign, latitude, longitude, altitude, temperature, \
      wind_x, wind_y, wind_angle, wind_speed, distance, method, altitude_source) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)";

const HISTORY_SQL: &str = "SELECT altitude, temperature FROM meteorological_data \
     WHERE temperature IS NOT NULL ORDER BY time DESC LIMIT $1";

const INSERT_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct ObservationStore {
    pool: Option<Pool>,
}

impl ObservationStore {
    /// Build a pooled store, or a log-only one when no database is
    /// configured.
    pub fn new(config: Option<&DatabaseConfig>) -> Result<Self> {
        let Some(config) = config else {
            info!("no database configured, observations are logged only");
            return Ok(Self { pool: None });
        };

        let mut pg = deadpool_postgres::Config::new();
        pg.host = Some(config.host.clone());
        pg.port = Some(config.port);
        pg.dbname = Some(config.name.clone());
        pg.user = Some(config.user.clone());
        pg.password = Some(config.password.clone());

        let pool = pg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("creating database pool")?;
        info!("database pool ready for {}:{}", config.host, config.port);
        Ok(Self { pool: Some(pool) })
    }

    pub fn is_persistent(&self) -> bool {
        self.pool.is_some()
    }

    /// Recent (altitude, temperature) pairs for outlier-history seeding,
    /// newest first. Empty in log-only mode.
    pub async fn recent_history(&self, limit: i64) -> Result<Vec<(f64, f64)>> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };
        let client = pool.get().await.context("getting pool connection")?;
        let rows = client
            .query(HISTORY_SQL, &[&limit])
            .await
            .context("loading observation history")?;
        Ok(rows
            .iter()
            .map(|row| (row.get::<_, f64>(0), row.get::<_, f64>(1)))
            .collect())
    }

    pub async fn insert(&self, obs: &Observation) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let client = pool.get().await.context("getting pool connection")?;
        client
            .execute(
                INSERT_SQL,
                &[
                    &obs.timestamp,
                    &obs.icao,
                    &obs.callsign,
                    &obs.latitude,
                    &obs.longitude,
                    &obs.altitude_m,
                    &obs.temperature_c,
                    &obs.wind.map(|w| w.east_ms),
                    &obs.wind.map(|w| w.north_ms),
                    &obs.wind.map(|w| w.direction_from_deg),
                    &obs.wind.map(|w| w.speed_ms),
                    &obs.distance_km,
                    &obs.source.as_str(),
                    &obs.altitude_source.as_str(),
                ],
            )
            .await
            .context("inserting observation")?;
        Ok(())
    }
}

/// Drain the observation channel, retrying failed inserts a few times
/// before alerting and dropping the row.
pub async fn run(
    store: ObservationStore,
    mut observations: mpsc::Receiver<Observation>,
    footprint: Footprint,
    notifier: SlackNotifier,
) {
    let mut stored: u64 = 0;
    while let Some(obs) = observations.recv().await {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match store.insert(&obs).await {
                Ok(()) => {
                    stored += 1;
                    footprint.touch();
                    if stored % 100 == 0 {
                        info!("{} observations stored", stored);
                    }
                    break;
                }
                Err(err) if attempt < INSERT_RETRIES => {
                    warn!(
                        "insert attempt {}/{} failed: {:#}",
                        attempt, INSERT_RETRIES, err
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) => {
                    error!("observation dropped after {} attempts: {:#}", attempt, err);
                    notifier
                        .notify_critical(&format!(
                            "database insert failing after {} attempts: {}",
                            attempt, err
                        ))
                        .await;
                    break;
                }
            }
        }
    }
    info!("observation channel closed, store stopped ({} rows)", stored);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AltitudeSource, ObservationSource};
    use chrono::Utc;

    fn obs() -> Observation {
        Observation {
            timestamp: Utc::now(),
            source: ObservationSource::Vdl2Acars,
            altitude_source: AltitudeSource::Acars,
            icao: Some("84C27A".to_string()),
            callsign: Some("JL123".to_string()),
            altitude_m: 7317.6,
            latitude: Some(35.123),
            longitude: Some(136.555),
            distance_km: 50.0,
            temperature_c: Some(-33.0),
            wind: None,
        }
    }

    #[tokio::test]
    async fn test_log_only_store_accepts_everything() {
        let store = ObservationStore::new(None).unwrap();
        assert!(!store.is_persistent());
        store.insert(&obs()).await.unwrap();
        assert!(store.recent_history(100).await.unwrap().is_empty());
    }
}
