//! Simple discrete time signal filters used by odometry
//!
//! None of these allocate once constructed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Running rectangular integral of a rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integral {
    value: f64,
}

/// Finite difference derivative of a signal.
///
/// The first sample after construction or a reset only seeds the filter and
/// produces a zero rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Derivative {
    prev: Option<f64>,
    rate: f64,
}

/// Moving average over a fixed number of samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Integral {
    pub fn new(initial: f64) -> Self {
        Self { value: initial }
    }

    /// Accumulate `rate` over `dt_s` and return the new value.
    pub fn sample(&mut self, rate: f64, dt_s: f64) -> f64 {
        self.value += rate * dt_s;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set(&mut self, value: f64) {
        self.value = value;
    }
}

impl Derivative {
    /// Add a new sample taken `dt_s` after the previous one and return the
    /// rate of change.
    ///
    /// A zero time step cannot be differentiated over, the previous rate is
    /// returned and the sample is not recorded.
    pub fn sample(&mut self, value: f64, dt_s: f64) -> f64 {
        if dt_s <= 0.0 {
            return self.rate;
        }

        self.rate = match self.prev {
            Some(p) => (value - p) / dt_s,
            None => 0.0,
        };
        self.prev = Some(value);

        self.rate
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Forget the previous sample, for use when the signal jumps.
    pub fn reset(&mut self) {
        self.prev = None;
        self.rate = 0.0;
    }
}

impl MovingAverage {
    /// Create a new moving average. `window` must be at least 1.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// Add a sample and return the mean of the samples in the window.
    pub fn sample(&mut self, value: f64) -> f64 {
        if self.samples.len() >= self.window {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        self.samples.push_back(value);
        self.sum += value;

        self.mean()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }
}
