//! Two-stage temperature outlier rejection
//!
//! Stage A fits a linear lapse-rate model over the whole history and
//! accepts anything close to it. Stage B compares the sample against the
//! temperatures of the nearest-altitude neighbors. The filter fails open:
//! degenerate statistics never reject a sample.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::config::OutlierConfig;

/// Standard atmospheric lapse rate (C per m)
const LAPSE_RATE_C_PER_M: f64 = 0.0065;
/// Altitude half-window the lapse tolerance is scaled by (m)
const TOLERANCE_WINDOW_M: f64 = 200.0;

pub struct OutlierFilter {
    history: VecDeque<(f64, f64)>,
    history_size: usize,
    min_samples: usize,
    n_neighbors: usize,
    deviation_threshold_c: f64,
    sigma_threshold: f64,
    tolerance_factor: f64,
}

impl OutlierFilter {
    pub fn new(config: &OutlierConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_size),
            history_size: config.history_size,
            min_samples: config.min_samples,
            n_neighbors: config.n_neighbors,
            deviation_threshold_c: config.deviation_threshold_c,
            sigma_threshold: config.sigma_threshold,
            tolerance_factor: config.tolerance_factor,
        }
    }

    /// Seed the history, typically from recently stored observations.
    pub fn seed<I: IntoIterator<Item = (f64, f64)>>(&mut self, pairs: I) {
        for (altitude_m, temperature_c) in pairs {
            self.add_history(altitude_m, temperature_c);
        }
        info!("outlier history seeded with {} samples", self.history.len());
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Append an accepted observation. Rejected ones must never be added.
    pub fn add_history(&mut self, altitude_m: f64, temperature_c: f64) {
        if self.history.len() >= self.history_size {
            self.history.pop_front();
        }
        self.history.push_back((altitude_m, temperature_c));
    }

    /// Decide whether (altitude, temperature) is an outlier. The callsign
    /// is only for logging.
    pub fn is_outlier(&self, altitude_m: f64, temperature_c: f64, callsign: &str) -> bool {
        if self.history.len() < self.min_samples {
            return false;
        }

        // Stage A: distance from the fitted lapse-rate line
        let predicted = self.predict_by_regression(altitude_m);
        let tolerance = LAPSE_RATE_C_PER_M * TOLERANCE_WINDOW_M * self.tolerance_factor;
        if (temperature_c - predicted).abs() <= tolerance {
            return false;
        }

        // Stage B: local neighborhood statistics
        let Some((mean, std)) = self.neighborhood_stats(altitude_m) else {
            return false;
        };

        let deviation = (temperature_c - mean).abs();
        if deviation > self.deviation_threshold_c {
            info!(
                "outlier rejected: {} {:.0} m {:+.1} C deviates {:.1} C from neighborhood mean {:+.1} C",
                callsign, altitude_m, temperature_c, deviation, mean
            );
            return true;
        }

        if std > 0.0 && deviation / std > self.sigma_threshold {
            info!(
                "outlier rejected: {} {:.0} m {:+.1} C is {:.1} sigma from neighborhood mean {:+.1} C",
                callsign, altitude_m, temperature_c, deviation / std, mean
            );
            return true;
        }

        false
    }

    /// Ordinary least squares T = a + b * altitude over the whole history.
    /// A history without altitude variance degenerates to the mean.
    fn predict_by_regression(&self, altitude_m: f64) -> f64 {
        let n = self.history.len() as f64;
        let mean_alt = self.history.iter().map(|(a, _)| a).sum::<f64>() / n;
        let mean_temp = self.history.iter().map(|(_, t)| t).sum::<f64>() / n;

        let mut var = 0.0;
        let mut cov = 0.0;
        for (alt, temp) in &self.history {
            let da = alt - mean_alt;
            var += da * da;
            cov += da * (temp - mean_temp);
        }
        if var <= f64::EPSILON {
            debug!("no altitude variance in history, predicting the mean");
            return mean_temp;
        }

        let slope = cov / var;
        let intercept = mean_temp - slope * mean_alt;
        intercept + slope * altitude_m
    }

    /// Mean and population standard deviation of the temperatures of the
    /// nearest-altitude neighbors.
    fn neighborhood_stats(&self, altitude_m: f64) -> Option<(f64, f64)> {
        let mut by_distance: Vec<(f64, f64)> = self
            .history
            .iter()
            .map(|&(alt, temp)| ((alt - altitude_m).abs(), temp))
            .collect();

        let k = self.n_neighbors.min(by_distance.len());
        if k == 0 {
            return None;
        }
        if k < by_distance.len() {
            by_distance.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
            by_distance.truncate(k);
        }

        let mean = by_distance.iter().map(|(_, t)| t).sum::<f64>() / k as f64;
        let var = by_distance
            .iter()
            .map(|(_, t)| (t - mean) * (t - mean))
            .sum::<f64>()
            / k as f64;
        Some((mean, var.sqrt()))
    }
}
