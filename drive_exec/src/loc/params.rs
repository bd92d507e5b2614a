//! Parameters structure for localisation

use serde::Deserialize;

/// Parameters for the odometry estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Number of samples in the moving average applied to the magnitude of
    /// the gyro derived heading rate.
    pub rate_avg_window: usize,

    /// Smoothed gyro rates below this are treated as drift, and the wheel
    /// derived rotation rate is used instead.
    ///
    /// Units: degrees/second
    pub fusion_threshold_degs: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            rate_avg_window: 10,
            fusion_threshold_degs: 1.0,
        }
    }
}
