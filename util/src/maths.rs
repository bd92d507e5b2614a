//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range `[-half_turn, half_turn)`.
///
/// `half_turn` is `180` for degrees or `pi` for radians.
pub fn wrap<T>(value: T, half_turn: T) -> T
where
    T: Float,
{
    let full_turn = half_turn + half_turn;
    let wrapped = rem_euclid(value + half_turn, full_turn) - half_turn;

    // Catch the round-off case of `rem_euclid` landing on the full turn
    if wrapped >= half_turn {
        wrapped - full_turn
    } else {
        wrapped
    }
}

/// Wrap an angle in degrees into `[-180, 180)`.
pub fn wrap_180<T>(value_deg: T) -> T
where
    T: Float,
{
    wrap(value_deg, T::from(180.0).unwrap())
}

/// Get the signed shortest angular distance travelled going from `from` to
/// `to`.
///
/// The result is in `(-half_turn, half_turn]`, an exact half turn is always
/// reported as positive so that the result doesn't flip sign between calls.
pub fn ang_dist<T>(from: T, to: T, half_turn: T) -> T
where
    T: Float,
{
    let dist = wrap(to - from, half_turn);

    if dist <= -half_turn {
        half_turn
    } else {
        dist
    }
}

/// Shortest signed angular distance in degrees, in `(-180, 180]`.
pub fn ang_dist_180<T>(from_deg: T, to_deg: T) -> T
where
    T: Float,
{
    ang_dist(from_deg, to_deg, T::from(180.0).unwrap())
}

/// Shortest signed angular distance in radians, in `(-pi, pi]`.
pub fn ang_dist_pi<T>(from_rad: T, to_rad: T) -> T
where
    T: Float,
{
    ang_dist(from_rad, to_rad, T::from(std::f64::consts::PI).unwrap())
}
