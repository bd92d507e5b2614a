//! Steering angle solver
//!
//! Steer axes are continuous, their absolute position keeps counting up (or
//! down) through full turns. A canonical wheel direction therefore has to be
//! turned into the absolute position nearest to where the axis already is,
//! otherwise the module would unwind a full turn whenever the demand crosses
//! the +/-180 degree boundary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::ang_dist_180;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the absolute steer position which points the wheel in
/// `desired_deg` with the least rotation from `current_abs_deg`.
///
/// The result is within half a turn of the current position and equivalent
/// to `desired_deg` modulo 360. When the desired direction is exactly half a
/// turn away the positive (counter clockwise) rotation is chosen.
///
/// Units: degrees
pub fn solve_str_abs_pos_deg(current_abs_deg: f64, desired_deg: f64) -> f64 {
    current_abs_deg + ang_dist_180(current_abs_deg, desired_deg)
}
