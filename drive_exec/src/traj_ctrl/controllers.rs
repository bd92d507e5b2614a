//! # Trajectory controllers module
//!
//! This module provides the PID controllers used for TrajCtrl.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// The trajectory controllers
#[derive(Debug, Serialize, Clone)]
pub struct TrajControllers {
    /// Field X error controller
    pub x_ctrl: PidController,

    /// Field Y error controller
    pub y_ctrl: PidController,

    /// Heading error controller
    pub head_ctrl: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// True if all gains are finite.
    pub fn is_finite(&self) -> bool {
        self.k_p.is_finite() && self.k_i.is_finite() && self.k_d.is_finite()
    }

    /// Get the value of the controller for the given error, `dt_s` seconds
    /// after the previous call.
    ///
    /// Angular errors must already be wrapped by the caller.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // With no time step there is nothing to integrate or differentiate
        // over, only the proportional term applies.
        let deriv = if dt_s > 0f64 {
            self.integral += error * dt_s;

            match self.prev_error {
                Some(e) => (error - e) / dt_s,
                None => 0f64,
            }
        } else {
            0f64
        };

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

impl TrajControllers {
    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            x_ctrl: PidController::new(params.x_k_p, params.x_k_i, params.x_k_d),
            y_ctrl: PidController::new(params.y_k_p, params.y_k_i, params.y_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x_ctrl.is_finite() && self.y_ctrl.is_finite() && self.head_ctrl.is_finite()
    }

    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.head_ctrl.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(2.0, 0.5, 0.1);

        // First call has no derivative
        assert_abs_diff_eq!(pid.get(1.0, 0.1), 2.0 + 0.5 * 0.1, epsilon = 1e-12);

        // Error falls to 0.5, derivative is -5
        assert_abs_diff_eq!(
            pid.get(0.5, 0.1),
            2.0 * 0.5 + 0.5 * 0.15 + 0.1 * -5.0,
            epsilon = 1e-12
        );

        // Zero dt only applies the proportional term
        assert_abs_diff_eq!(
            pid.get(0.5, 0.0),
            2.0 * 0.5 + 0.5 * 0.15,
            epsilon = 1e-12
        );

        pid.reset();
        assert_abs_diff_eq!(pid.get(-1.0, 0.1), -2.0 - 0.05, epsilon = 1e-12);
    }
}
