//! Single boundary pieces: lines, quadratic and cubic Béziers.
//!
//! A [`Segment`] doesn't know where it starts: its start point is carried by
//! whatever contains it. Inside the engine, every boundary piece is stored as a
//! [`kurbo::PathSeg`], which is exactly a segment together with its start point,
//! and the helpers in this module work on that representation.

use kurbo::{
    CubicBez, Line, ParamCurve, ParamCurveDeriv, ParamCurveNearest, PathSeg, Point, QuadBez,
    Vec2,
};

use crate::{
    num::{almost_zero, points_coincide, EPSILON},
    poly::Poly,
};

/// Accuracy passed to kurbo's nearest-point solver.
pub(crate) const NEAREST_ACCURACY: f64 = 1e-12;

/// A curve piece, without its start point.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Segment {
    /// A straight line to the end point.
    Line(Point),
    /// A quadratic Bézier with one control point.
    Quad(Point, Point),
    /// A cubic Bézier with two control points.
    Cubic(Point, Point, Point),
}

impl Segment {
    /// The end point.
    pub fn end(&self) -> Point {
        match *self {
            Segment::Line(p) | Segment::Quad(_, p) | Segment::Cubic(_, _, p) => p,
        }
    }

    /// Attaches a start point, producing a kurbo segment.
    pub fn with_start(self, start: Point) -> PathSeg {
        match self {
            Segment::Line(p1) => PathSeg::Line(Line::new(start, p1)),
            Segment::Quad(p1, p2) => PathSeg::Quad(QuadBez::new(start, p1, p2)),
            Segment::Cubic(p1, p2, p3) => PathSeg::Cubic(CubicBez::new(start, p1, p2, p3)),
        }
    }

    /// Evaluates the segment at parameter `t`, given its start point.
    pub fn eval(self, start: Point, t: f64) -> Point {
        self.with_start(start).eval(t)
    }

    /// Splits the segment at parameter `t`, given its start point.
    ///
    /// The second half starts at the first half's end point.
    pub fn split(self, start: Point, t: f64) -> (Segment, Segment) {
        let seg = self.with_start(start);
        (
            Segment::from(seg.subsegment(0.0..t)),
            Segment::from(seg.subsegment(t..1.0)),
        )
    }

    /// Does every coordinate of this segment satisfy `f`?
    pub(crate) fn all_coords(&self, f: impl Fn(f64) -> bool) -> bool {
        let ok = |p: &Point| f(p.x) && f(p.y);
        match self {
            Segment::Line(p) => ok(p),
            Segment::Quad(p1, p2) => ok(p1) && ok(p2),
            Segment::Cubic(p1, p2, p3) => ok(p1) && ok(p2) && ok(p3),
        }
    }
}

impl From<PathSeg> for Segment {
    fn from(seg: PathSeg) -> Self {
        match seg {
            PathSeg::Line(l) => Segment::Line(l.p1),
            PathSeg::Quad(q) => Segment::Quad(q.p1, q.p2),
            PathSeg::Cubic(c) => Segment::Cubic(c.p1, c.p2, c.p3),
        }
    }
}

/// Coefficients of a segment's power-basis form `c0 + c1 t + c2 t² + c3 t³`.
///
/// Lines and quadratics have zero high-order coefficients.
pub(crate) fn power_basis(seg: &PathSeg) -> [Vec2; 4] {
    match *seg {
        PathSeg::Line(Line { p0, p1 }) => [p0.to_vec2(), p1 - p0, Vec2::ZERO, Vec2::ZERO],
        PathSeg::Quad(QuadBez { p0, p1, p2 }) => {
            let (p0, p1, p2) = (p0.to_vec2(), p1.to_vec2(), p2.to_vec2());
            [p0, 2.0 * (p1 - p0), p2 - 2.0 * p1 + p0, Vec2::ZERO]
        }
        PathSeg::Cubic(CubicBez { p0, p1, p2, p3 }) => {
            let (p0, p1, p2, p3) = (p0.to_vec2(), p1.to_vec2(), p2.to_vec2(), p3.to_vec2());
            [
                p0,
                3.0 * (p1 - p0),
                3.0 * (p2 - 2.0 * p1 + p0),
                p3 - 3.0 * p2 + 3.0 * p1 - p0,
            ]
        }
    }
}

/// The degree of a power-basis curve once negligible leading coefficients are dropped.
///
/// A cubic whose control points are evenly spaced along a line is really a
/// line, and treating it as one keeps the resultant from degenerating. Returns
/// zero for a curve that doesn't move.
pub(crate) fn effective_degree(coeffs: &[Vec2; 4], threshold: f64) -> usize {
    (1..4)
        .rev()
        .find(|&i| coeffs[i].hypot() > threshold)
        .unwrap_or(0)
}

/// Is this segment shorter than the tolerance, in the sense that all of its
/// control points coincide with its start?
pub(crate) fn is_degenerate(seg: &PathSeg) -> bool {
    let start = seg.start();
    match *seg {
        PathSeg::Line(l) => points_coincide(start, l.p1),
        PathSeg::Quad(q) => points_coincide(start, q.p1) && points_coincide(start, q.p2),
        PathSeg::Cubic(c) => {
            points_coincide(start, c.p1)
                && points_coincide(start, c.p2)
                && points_coincide(start, c.p3)
        }
    }
}

/// Replaces a segment's start point, leaving everything else alone.
pub(crate) fn with_start_point(seg: PathSeg, start: Point) -> PathSeg {
    match seg {
        PathSeg::Line(l) => PathSeg::Line(Line::new(start, l.p1)),
        PathSeg::Quad(q) => PathSeg::Quad(QuadBez::new(start, q.p1, q.p2)),
        PathSeg::Cubic(c) => PathSeg::Cubic(CubicBez::new(start, c.p1, c.p2, c.p3)),
    }
}

/// The tangent direction at parameter `t` (not normalized).
///
/// Where the derivative vanishes (a cusp, or a control point doubled up
/// with an end point), falls back to a short chord around `t`.
pub(crate) fn tangent(seg: &PathSeg, t: f64) -> Vec2 {
    let d = match *seg {
        PathSeg::Line(l) => l.p1 - l.p0,
        PathSeg::Quad(q) => q.deriv().eval(t).to_vec2(),
        PathSeg::Cubic(c) => c.deriv().eval(t).to_vec2(),
    };
    if d.hypot2() > EPSILON * EPSILON {
        d
    } else {
        seg.eval((t + 1e-3).min(1.0)) - seg.eval((t - 1e-3).max(0.0))
    }
}

/// Distance from `p` to the segment, along with the parameter of the nearest point.
pub(crate) fn nearest(seg: &PathSeg, p: Point) -> (f64, f64) {
    let n = seg.nearest(p, NEAREST_ACCURACY);
    (n.distance_sq.sqrt(), n.t)
}

/// Bisection steps for locating a ray crossing on a monotone piece.
const CROSSING_BISECTIONS: usize = 64;

/// Signed crossings of the segment with the ray from `p` towards positive x.
///
/// The segment is split at the zeros of y'(t) into pieces that are monotone
/// in y. An increasing piece counts +1 and a decreasing one −1 if it crosses
/// the ray, and each piece covers the heights from its lower end point up to
/// (but not including) its upper one. Pieces meeting at a vertex therefore
/// count a ray through that vertex once if the boundary passes through, and
/// zero or twice (cancelling) if it turns back.
pub(crate) fn ray_crossings(seg: &PathSeg, p: Point) -> i32 {
    let hull = control_box(seg);
    if p.y < hull.0 || p.y > hull.1 || p.x >= hull.2 {
        return 0;
    }

    let [_, c1, c2, c3] = power_basis(seg);
    let dy = Poly::new([c1.y, 2.0 * c2.y, 3.0 * c3.y]);
    let mut breaks = vec![0.0];
    breaks.extend(
        dy.roots_between(0.0, 1.0, 0.0)
            .into_iter()
            .filter(|&t| t > 0.0 && t < 1.0),
    );
    breaks.push(1.0);

    let mut ret = 0;
    for w in breaks.windows(2) {
        let (a, b) = (w[0], w[1]);
        let (ya, yb) = (seg.eval(a).y, seg.eval(b).y);
        let dir = if ya <= p.y && p.y < yb {
            1
        } else if yb <= p.y && p.y < ya {
            -1
        } else {
            continue;
        };

        // `lo` stays on the side of the ray that `a` is on.
        let (mut lo, mut hi) = (a, b);
        for _ in 0..CROSSING_BISECTIONS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if (seg.eval(mid).y <= p.y) == (dir > 0) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        if seg.eval(0.5 * (lo + hi)).x > p.x {
            ret += dir;
        }
    }
    ret
}

// (min y, max y, max x) over the control points.
fn control_box(seg: &PathSeg) -> (f64, f64, f64) {
    let bounds = |pts: &[Point]| {
        pts.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(y0, y1, x1), q| (y0.min(q.y), y1.max(q.y), x1.max(q.x)),
        )
    };
    match *seg {
        PathSeg::Line(l) => bounds(&[l.p0, l.p1]),
        PathSeg::Quad(q) => bounds(&[q.p0, q.p1, q.p2]),
        PathSeg::Cubic(c) => bounds(&[c.p0, c.p1, c.p2, c.p3]),
    }
}

/// Finds the double point of a cubic that loops over itself.
///
/// Returns the two parameters `(s, t)` with `s < t` at which the cubic
/// passes through the same point, or `None` if there is no such pair strictly
/// inside the segment.
pub fn cubic_self_intersection(c: &CubicBez) -> Option<(f64, f64)> {
    let [_, c1, c2, c3] = power_basis(&PathSeg::Cubic(*c));

    // With p(t) = c3 t³ + c2 t² + c1 t + c0, p(s) = p(t) for s != t means
    // c3 (s² + st + t²) + c2 (s + t) + c1 = 0. In terms of the sum σ and
    // product π of s and t, that's c3 (σ² - π) + c2 σ + c1 = 0. Crossing with
    // c3 gives σ, and dotting with c3 gives π.
    let a_cross_b = c3.cross(c2);
    let scale = c3.hypot() * c2.hypot();
    if a_cross_b.abs() <= 1e-12 * scale.max(f64::MIN_POSITIVE) || c3.hypot2() == 0.0 {
        return None;
    }
    let sigma = -c3.cross(c1) / a_cross_b;
    let pi = sigma * sigma + (c2 * sigma + c1).dot(c3) / c3.hypot2();
    let disc = sigma * sigma - 4.0 * pi;
    if disc <= 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let s = (sigma - root) / 2.0;
    let t = (sigma + root) / 2.0;
    let inside = |x: f64| x > 0.0 && x < 1.0 && !almost_zero(x) && !almost_zero(1.0 - x);
    (inside(s) && inside(t)).then_some((s, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::tests::Reasonable;
    use proptest::prelude::*;

    #[test]
    fn split_preserves_endpoints() {
        let start = Point::new(0.0, 0.0);
        let seg = Segment::Cubic(
            Point::new(1.0, 2.0),
            Point::new(3.0, 2.0),
            Point::new(4.0, 0.0),
        );
        let (a, b) = seg.split(start, 0.5);
        assert!(points_coincide(a.end(), seg.eval(start, 0.5)));
        assert!(points_coincide(b.end(), seg.end()));
    }

    #[test]
    fn elevated_line_has_degree_one() {
        let c = CubicBez::new((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0));
        assert_eq!(effective_degree(&power_basis(&PathSeg::Cubic(c)), 1e-9), 1);

        let q = QuadBez::new((0.0, 0.0), (1.0, 3.0), (2.0, 0.0));
        assert_eq!(effective_degree(&power_basis(&PathSeg::Quad(q)), 1e-9), 2);
    }

    #[test]
    fn looped_cubic() {
        let c = CubicBez::new((0.0, 0.0), (3.0, 3.0), (-2.0, 3.0), (1.0, 0.0));
        let (s, t) = cubic_self_intersection(&c).unwrap();
        assert!(s < t);
        assert!((c.eval(s) - c.eval(t)).hypot() < 1e-9);
    }

    #[test]
    fn arch_has_no_loop() {
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        assert_eq!(cubic_self_intersection(&c), None);
    }

    #[test]
    fn tangent_at_doubled_control_point() {
        let c = CubicBez::new((0.0, 0.0), (0.0, 0.0), (1.0, 1.0), (2.0, 0.0));
        let d = tangent(&PathSeg::Cubic(c), 0.0);
        assert!(d.hypot() > 0.0);
        assert!(d.x > 0.0);
    }

    #[test]
    fn crossings_near_a_pointed_end() {
        let drop = PathSeg::Cubic(CubicBez::new(
            (0.0, 0.0),
            (10.0, 10.0),
            (-10.0, 10.0),
            (0.0, 0.0),
        ));
        assert_eq!(ray_crossings(&drop, Point::new(1.677, 0.203)), 0);
        assert_eq!(ray_crossings(&drop, Point::new(1.0, 0.01)), 0);
        assert_eq!(ray_crossings(&drop, Point::new(0.0, 4.0)), 1);
        assert_eq!(ray_crossings(&drop, Point::new(-3.0, 4.0)), 0);
        // The top of the drop is at height 7.5.
        assert_eq!(ray_crossings(&drop, Point::new(-1.0, 7.5)), 0);
    }

    proptest! {
        #[test]
        fn power_basis_agrees_with_eval(
            p0 in Point::reasonable(),
            p1 in Point::reasonable(),
            p2 in Point::reasonable(),
            p3 in Point::reasonable(),
            t in 0.0f64..=1.0,
        ) {
            let seg = PathSeg::Cubic(CubicBez::new(p0, p1, p2, p3));
            let [c0, c1, c2, c3] = power_basis(&seg);
            let p = c0 + c1 * t + c2 * (t * t) + c3 * (t * t * t);
            prop_assert!((p - seg.eval(t).to_vec2()).hypot() < 1e-9);
        }

        #[test]
        fn double_points_coincide(
            p0 in Point::reasonable(),
            p1 in Point::reasonable(),
            p2 in Point::reasonable(),
            p3 in Point::reasonable(),
        ) {
            let c = CubicBez::new(p0, p1, p2, p3);
            if let Some((s, t)) = cubic_self_intersection(&c) {
                let size = c.p0.distance(c.p1) + c.p1.distance(c.p2) + c.p2.distance(c.p3);
                prop_assert!((c.eval(s) - c.eval(t)).hypot() <= 1e-4 * size.max(1.0));
            }
        }
    }
}
