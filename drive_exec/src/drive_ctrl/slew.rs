//! Slew rate limiting of manual demands

/// Limits the rate of change of a signal.
#[derive(Debug, Clone, Copy)]
pub struct SlewRateLimiter {
    /// Units: signal units/second
    rate: f64,

    value: f64,
}

impl SlewRateLimiter {
    pub fn new(rate: f64) -> Self {
        Self { rate, value: 0.0 }
    }

    /// Move towards `input` by no more than the rate allows over `dt_s`, and
    /// return the new value.
    pub fn calculate(&mut self, input: f64, dt_s: f64) -> f64 {
        let max_step = self.rate * dt_s;
        self.value += (input - self.value).clamp(-max_step, max_step);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }
}
