//! Sensor monitoring
//!
//! Checks each sensor channel for plausibility and holds the last good value
//! of any channel that fails, so that a faulty sensor degrades the estimate
//! rather than stopping the control cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::Serialize;

use crate::hal::EncoderSample;
use crate::kinematics::NUM_MODULES;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plausibility limits applied to the sensor readings.
#[derive(Debug, Clone, Copy)]
pub struct SensLimits {
    /// Units: meters/second
    pub max_drv_speed_ms: f64,

    /// Units: degrees/second
    pub max_str_rate_degs: f64,
}

/// Fault flags of every sensor channel, true if faulted this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensFaults {
    pub heading: bool,
    pub str_abs_pos: [bool; NUM_MODULES],
    pub str_rate: [bool; NUM_MODULES],
    pub drv_speed: [bool; NUM_MODULES],
    pub drv_pos: [bool; NUM_MODULES],
}

/// Sensor data after monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensData {
    /// Heading, field zeroed and clockwise positive.
    ///
    /// Units: degrees
    pub heading_deg: f64,

    pub encoders: [EncoderSample; NUM_MODULES],

    pub faults: SensFaults,
}

/// Sensor monitor.
#[derive(Debug, Clone)]
pub struct SensMon {
    limits: SensLimits,

    /// Offset subtracted from the raw heading reading.
    ///
    /// Units: degrees
    heading_offset_deg: f64,

    /// Last raw heading that passed the checks.
    last_raw_heading_deg: f64,

    /// Last known good data, and the faults of the previous cycle.
    last: SensData,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A monitored reading, either good or faulted. A faulted reading carries the
/// last known good value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<T> {
    Ok(T),
    Fault(T),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: Copy> Reading<T> {
    pub fn value(&self) -> T {
        match self {
            Reading::Ok(v) | Reading::Fault(v) => *v,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Reading::Fault(_))
    }
}

impl SensFaults {
    pub fn any(&self) -> bool {
        self.heading
            || self
                .str_abs_pos
                .iter()
                .chain(self.str_rate.iter())
                .chain(self.drv_speed.iter())
                .chain(self.drv_pos.iter())
                .any(|f| *f)
    }

    pub fn count(&self) -> usize {
        let modules = self
            .str_abs_pos
            .iter()
            .chain(self.str_rate.iter())
            .chain(self.drv_speed.iter())
            .chain(self.drv_pos.iter())
            .filter(|f| **f)
            .count();

        modules + self.heading as usize
    }
}

impl SensMon {
    pub fn new(limits: SensLimits) -> Self {
        Self {
            limits,
            heading_offset_deg: 0.0,
            last_raw_heading_deg: 0.0,
            last: SensData::default(),
        }
    }

    /// Move the heading zero so that the last good heading reading becomes
    /// zero.
    pub fn zero_heading(&mut self) {
        self.heading_offset_deg = self.last_raw_heading_deg;
        self.last.heading_deg = 0.0;
    }

    /// Check the raw readings of one cycle.
    pub fn check(
        &mut self,
        raw_heading_deg: Option<f64>,
        raw_encoders: &[Option<EncoderSample>; NUM_MODULES],
    ) -> SensData {
        let mut data = SensData::default();

        // Heading only needs to be finite
        let heading = match raw_heading_deg {
            Some(h) if h.is_finite() => {
                self.last_raw_heading_deg = h;
                Reading::Ok(h - self.heading_offset_deg)
            }
            _ => Reading::Fault(self.last.heading_deg),
        };
        data.heading_deg = heading.value();
        data.faults.heading = heading.is_fault();
        if data.faults.heading && !self.last.faults.heading {
            warn!("Heading sensor fault, holding {:.2} deg", data.heading_deg);
        }

        for i in 0..NUM_MODULES {
            let raw = raw_encoders[i];
            let last = self.last.encoders[i];

            let str_abs_pos = check_channel(raw.map(|e| e.str_abs_pos_deg), None, last.str_abs_pos_deg);
            let str_rate = check_channel(
                raw.map(|e| e.str_rate_degs),
                Some(self.limits.max_str_rate_degs),
                last.str_rate_degs,
            );
            let drv_speed = check_channel(
                raw.map(|e| e.drv_speed_ms),
                Some(self.limits.max_drv_speed_ms),
                last.drv_speed_ms,
            );
            let drv_pos = check_channel(raw.map(|e| e.drv_pos_m), None, last.drv_pos_m);

            data.encoders[i] = EncoderSample {
                str_abs_pos_deg: str_abs_pos.value(),
                str_rate_degs: str_rate.value(),
                drv_speed_ms: drv_speed.value(),
                drv_pos_m: drv_pos.value(),
            };

            data.faults.str_abs_pos[i] = str_abs_pos.is_fault();
            data.faults.str_rate[i] = str_rate.is_fault();
            data.faults.drv_speed[i] = drv_speed.is_fault();
            data.faults.drv_pos[i] = drv_pos.is_fault();

            let was_faulted = self.last.faults.str_abs_pos[i]
                || self.last.faults.str_rate[i]
                || self.last.faults.drv_speed[i]
                || self.last.faults.drv_pos[i];
            let is_faulted = data.faults.str_abs_pos[i]
                || data.faults.str_rate[i]
                || data.faults.drv_speed[i]
                || data.faults.drv_pos[i];
            if is_faulted && !was_faulted {
                warn!(
                    "Module {} encoder fault, holding last good values {:?}",
                    i, data.encoders[i]
                );
            }
        }

        self.last = data;

        data
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check a single channel, which must be present, finite, and if a limit is
/// given have a magnitude no greater than the limit.
fn check_channel(raw: Option<f64>, limit: Option<f64>, last_good: f64) -> Reading<f64> {
    match raw {
        Some(v) if v.is_finite() && limit.map_or(true, |l| v.abs() <= l) => Reading::Ok(v),
        _ => Reading::Fault(last_good),
    }
}
