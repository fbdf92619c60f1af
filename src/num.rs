//! The engine's tolerance, and comparisons against it.

/// The tolerance used for every approximate comparison in this crate.
///
/// Coordinates, parameters and areas are all compared against this single
/// absolute threshold. Changing it changes which points are considered
/// coincident, which parameters snap to segment endpoints, and which loops
/// are discarded as degenerate, so it is intentionally not configurable
/// per call.
pub const EPSILON: f64 = 1e-8;

/// Is `x` within [`EPSILON`] of zero?
#[inline]
pub fn almost_zero(x: f64) -> bool {
    x.abs() <= EPSILON
}

/// Are `x` and `y` within [`EPSILON`] of one another?
#[inline]
pub fn almost_equal(x: f64, y: f64) -> bool {
    almost_zero(x - y)
}

/// Are two points within [`EPSILON`] of one another?
#[inline]
pub fn points_coincide(p: kurbo::Point, q: kurbo::Point) -> bool {
    (p - q).hypot2() <= EPSILON * EPSILON
}

/// Snaps a curve parameter to exactly `0.0` or `1.0` if it is close enough.
///
/// Returns `None` if the parameter is outside `[0, 1]` even after snapping.
pub fn snap_param(t: f64) -> Option<f64> {
    if almost_zero(t) {
        Some(0.0)
    } else if almost_equal(t, 1.0) {
        Some(1.0)
    } else if (0.0..=1.0).contains(&t) {
        Some(t)
    } else {
        None
    }
}
