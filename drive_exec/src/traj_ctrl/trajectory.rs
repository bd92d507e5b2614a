//! Time parameterised trajectories
//!
//! A trajectory is an ordered list of points, each giving the pose the robot
//! should be at and the field frame velocity it should be moving with at a
//! given time since following began. Trajectories are immutable once built
//! and are shared between owners with an `Arc`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Internal
use crate::kinematics::{ChassisVel, Frame};
use crate::loc::Pose;
use util::maths::ang_dist_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point on a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajPoint {
    /// Time since the start of following.
    ///
    /// Units: seconds
    pub t_s: f64,

    /// Reference pose in the field.
    pub pose: Pose,

    /// Feedforward velocity, which must be in the field frame.
    pub vel: ChassisVel,
}

/// An immutable trajectory with strictly increasing point times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    points: Vec<TrajPoint>,
}

/// On-disk layout of a trajectory file.
#[derive(Deserialize)]
struct TrajFile {
    points: Vec<TrajPoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while building a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("A trajectory must contain at least one point")]
    Empty,

    #[error("Point {0} is not finite")]
    NonFinitePoint(usize),

    #[error("The first point's time must not be negative, got {0} s")]
    NegativeStartTime(f64),

    #[error("Point {0} is not strictly later than the point before it")]
    NonIncreasingTime(usize),

    #[error("Point {0} has a velocity in the robot frame, trajectory velocities must be in the field frame")]
    RobotFrameVel(usize),

    #[error("Could not read trajectory file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Could not parse trajectory: {0}")]
    DeserialiseError(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory from its points, validating them.
    pub fn new(points: Vec<TrajPoint>) -> Result<Self, TrajError> {
        let first = points.first().ok_or(TrajError::Empty)?;

        if first.t_s < 0.0 {
            return Err(TrajError::NegativeStartTime(first.t_s));
        }

        for (i, p) in points.iter().enumerate() {
            let finite = p.t_s.is_finite()
                && p.pose.is_finite()
                && p.vel.vx_ms.is_finite()
                && p.vel.vy_ms.is_finite()
                && p.vel.omega_rads.is_finite();
            if !finite {
                return Err(TrajError::NonFinitePoint(i));
            }

            if p.vel.frame != Frame::Field {
                return Err(TrajError::RobotFrameVel(i));
            }

            if i > 0 && p.t_s <= points[i - 1].t_s {
                return Err(TrajError::NonIncreasingTime(i));
            }
        }

        Ok(Self { points })
    }

    /// Parse a trajectory from a JSON string of the form
    /// `{"points": [{"t_s": .., "pose": {..}, "vel": {..}}, ..]}`.
    pub fn from_json(s: &str) -> Result<Self, TrajError> {
        let file: TrajFile = serde_json::from_str(s)?;
        Self::new(file.points)
    }

    /// Load a trajectory from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrajError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| TrajError::FileLoadError(path.to_path_buf(), e))?;
        Self::from_json(&s)
    }

    pub fn points(&self) -> &[TrajPoint] {
        &self.points
    }

    /// Time of the final point, after which the trajectory is complete.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        // Points can't be empty once constructed
        self.points.last().map(|p| p.t_s).unwrap_or(0.0)
    }

    /// Sample the trajectory at the given time.
    ///
    /// Times before the first point or after the last are clamped to those
    /// points. Otherwise the two points bracketing the time are linearly
    /// interpolated, with the heading taking the shortest way round.
    pub fn sample(&self, t_s: f64) -> TrajPoint {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        // Negated comparison so that a NaN time clamps to the start
        if !(t_s > first.t_s) {
            return first;
        }
        if t_s >= last.t_s {
            return last;
        }

        // Index of the first point later than t, which is at least 1 since
        // t is after the first point and less than len since t is before the
        // last.
        let i = self.points.partition_point(|p| p.t_s <= t_s);
        let a = &self.points[i - 1];
        let b = &self.points[i];

        let f = (t_s - a.t_s) / (b.t_s - a.t_s);
        let lerp = |x0: f64, x1: f64| x0 + f * (x1 - x0);

        TrajPoint {
            t_s,
            pose: Pose {
                x_m: lerp(a.pose.x_m, b.pose.x_m),
                y_m: lerp(a.pose.y_m, b.pose.y_m),
                heading_rad: a.pose.heading_rad
                    + f * ang_dist_pi(a.pose.heading_rad, b.pose.heading_rad),
            },
            vel: ChassisVel::new_fld(
                lerp(a.vel.vx_ms, b.vel.vx_ms),
                lerp(a.vel.vy_ms, b.vel.vy_ms),
                lerp(a.vel.omega_rads, b.vel.omega_rads),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn point(t_s: f64, x_m: f64, heading_rad: f64, vx_ms: f64) -> TrajPoint {
        TrajPoint {
            t_s,
            pose: Pose::new(x_m, 0.0, heading_rad),
            vel: ChassisVel::new_fld(vx_ms, 0.0, 0.0),
        }
    }

    #[test]
    fn test_sample() {
        let traj = Trajectory::new(vec![
            point(0.0, 0.0, 0.0, 0.0),
            point(1.0, 0.5, 0.0, 1.0),
            point(2.0, 1.5, 0.0, 1.0),
        ])
        .unwrap();

        assert_eq!(traj.total_time_s(), 2.0);

        // Clamped ends
        assert_eq!(traj.sample(-1.0), traj.points()[0]);
        assert_eq!(traj.sample(f64::NAN), traj.points()[0]);
        assert_eq!(traj.sample(2.0), traj.points()[2]);
        assert_eq!(traj.sample(10.0), traj.points()[2]);

        // Exactly on an interior point
        let s = traj.sample(1.0);
        assert_abs_diff_eq!(s.pose.x_m, 0.5);
        assert_abs_diff_eq!(s.vel.vx_ms, 1.0);

        // Interpolated
        let s = traj.sample(0.5);
        assert_abs_diff_eq!(s.t_s, 0.5);
        assert_abs_diff_eq!(s.pose.x_m, 0.25);
        assert_abs_diff_eq!(s.vel.vx_ms, 0.5);
        assert_eq!(s.vel.frame, Frame::Field);

        let s = traj.sample(1.75);
        assert_abs_diff_eq!(s.pose.x_m, 1.25);
    }

    #[test]
    fn test_heading_across_seam() {
        let traj = Trajectory::new(vec![
            point(0.0, 0.0, PI - 0.1, 0.0),
            point(1.0, 0.0, -PI + 0.1, 0.0),
        ])
        .unwrap();

        // Halfway between the two is pointing straight back, not forwards
        let s = traj.sample(0.5);
        assert_abs_diff_eq!(s.pose.heading_rad, PI, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(Trajectory::new(vec![]), Err(TrajError::Empty)));
        assert!(matches!(
            Trajectory::new(vec![point(0.0, 0.0, 0.0, 0.0), point(0.0, 1.0, 0.0, 0.0)]),
            Err(TrajError::NonIncreasingTime(1))
        ));
        assert!(matches!(
            Trajectory::new(vec![
                point(0.0, 0.0, 0.0, 0.0),
                point(1.0, 1.0, 0.0, 0.0),
                point(0.5, 1.0, 0.0, 0.0)
            ]),
            Err(TrajError::NonIncreasingTime(2))
        ));
        assert!(matches!(
            Trajectory::new(vec![point(-1.0, 0.0, 0.0, 0.0)]),
            Err(TrajError::NegativeStartTime(_))
        ));
        assert!(matches!(
            Trajectory::new(vec![point(0.0, f64::INFINITY, 0.0, 0.0)]),
            Err(TrajError::NonFinitePoint(0))
        ));

        let mut p = point(0.0, 0.0, 0.0, 0.0);
        p.vel = ChassisVel::new_rb(1.0, 0.0, 0.0);
        assert!(matches!(
            Trajectory::new(vec![p]),
            Err(TrajError::RobotFrameVel(0))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "points": [
                {
                    "t_s": 0.0,
                    "pose": {"x_m": 0.0, "y_m": 0.0, "heading_rad": 0.0},
                    "vel": {"vx_ms": 0.0, "vy_ms": 0.0, "omega_rads": 0.0, "frame": "Field"}
                },
                {
                    "t_s": 2.0,
                    "pose": {"x_m": 1.0, "y_m": 0.0, "heading_rad": 0.0},
                    "vel": {"vx_ms": 0.5, "vy_ms": 0.0, "omega_rads": 0.0, "frame": "Field"}
                }
            ]
        }"#;

        let traj = Trajectory::from_json(json).unwrap();
        assert_eq!(traj.points().len(), 2);
        assert_eq!(traj.total_time_s(), 2.0);

        assert!(matches!(
            Trajectory::from_json("{\"points\": 3}"),
            Err(TrajError::DeserialiseError(_))
        ));
    }
}
