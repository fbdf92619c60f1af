//! Pairwise segment intersection.
//!
//! Lines against lines are solved in closed form. For everything else, the
//! segment of lower degree is implicitized with a Bézout matrix and the
//! other one is substituted into it, giving a polynomial (the resultant) whose
//! roots are the intersection parameters along the substituted segment. The
//! matching parameter on the implicitized segment is recovered by nearest-point
//! projection, and a pair is kept only if both segments really pass within
//! [`EPSILON`] of one another there.

use arrayvec::ArrayVec;
use kurbo::{Affine, ParamCurve, ParamCurveExtrema, PathSeg, Vec2};

use crate::{
    num::{points_coincide, snap_param, EPSILON},
    poly::Poly,
    segment::{effective_degree, is_degenerate, nearest, power_basis},
    space::rects_overlap,
};

/// The maximum number of isolated intersections between two segments (two cubics).
pub const MAX_INTERSECTIONS: usize = 9;

/// Leading power-basis coefficients smaller than this (after normalizing both
/// segments into a unit box) are treated as zero.
const DEGREE_THRESHOLD: f64 = 1e-9;

/// A resultant whose coefficients are all smaller than this is treated as
/// identically zero.
const VANISHING_RESULTANT: f64 = 1e-10;

/// How far outside `[0, 1]` a candidate parameter may stray before it is
/// rejected outright (instead of clamped and checked).
const PARAM_SLACK: f64 = 1e-6;

/// Candidates closer than this in both parameters are the same intersection.
const DUPLICATE_PARAM: f64 = 1e-6;

/// Pairs of parameters `(t_a, t_b)` at which two segments meet.
pub type IntersectionParams = ArrayVec<(f64, f64), MAX_INTERSECTIONS>;

/// The result of intersecting two segments.
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentIntersection {
    /// The segments don't meet.
    NoIntersection,
    /// The segments meet at finitely many points, given as `(t_a, t_b)`
    /// parameter pairs sorted by `t_a`. Parameters within [`EPSILON`] of an
    /// endpoint are exactly `0.0` or `1.0`.
    FiniteSet(IntersectionParams),
    /// The segments run along one another for a positive length. Use
    /// [`overlap_params`] to find where the shared part starts and ends.
    Overlapping,
}

/// Intersects two segments.
pub fn intersect(a: &PathSeg, b: &PathSeg) -> SegmentIntersection {
    let a_box = a.bounding_box().inflate(EPSILON, EPSILON);
    if !rects_overlap(a_box, b.bounding_box()) {
        return SegmentIntersection::NoIntersection;
    }

    let ret = intersect_inner(a, b);
    log::trace!("intersecting {a:?} and {b:?}: {ret:?}");
    ret
}

fn intersect_inner(a: &PathSeg, b: &PathSeg) -> SegmentIntersection {
    // Endpoints go first, so that vertex contacts get exact parameters and
    // win the deduplication against their approximate interior versions.
    let mut found = IntersectionParams::new();
    endpoint_contacts(a, b, &mut found);

    if is_degenerate(a) || is_degenerate(b) {
        return finish(found);
    }

    let bbox = a.bounding_box().union(b.bounding_box());
    let extent = bbox.width().max(bbox.height());
    let to_unit = Affine::scale(1.0 / extent) * Affine::translate(-bbox.center().to_vec2());
    let na = power_basis(&(to_unit * *a));
    let nb = power_basis(&(to_unit * *b));
    let deg_a = effective_degree(&na, DEGREE_THRESHOLD);
    let deg_b = effective_degree(&nb, DEGREE_THRESHOLD);
    if deg_a == 0 || deg_b == 0 {
        return finish(found);
    }

    if deg_a == 1 && deg_b == 1 {
        let (p, r) = (na[0], na[1]);
        let (q, u) = (nb[0], nb[1]);
        let denom = r.cross(u);
        if denom.abs() <= 1e-12 * r.hypot() * u.hypot() {
            return coincident_or(a, b, found);
        }
        let s = (q - p).cross(u) / denom;
        let t = (q - p).cross(r) / denom;
        push_candidate(a, b, s, t, &mut found);
        return finish(found);
    }

    // Implicitize the lower-degree segment, substitute the other.
    let swapped = deg_a < deg_b;
    let (sub, sub_deg, imp, imp_deg) = if swapped {
        (&nb, deg_b, &na, deg_a)
    } else {
        (&na, deg_a, &nb, deg_b)
    };
    let resultant = if imp_deg == 1 {
        line_resultant(sub, sub_deg, imp)
    } else {
        bezout_resultant(sub, sub_deg, imp, imp_deg)
    };

    let size = resultant.max_abs();
    if size <= VANISHING_RESULTANT && overlaps(a, b) {
        return SegmentIntersection::Overlapping;
    }

    let (sub_seg, imp_seg) = if swapped { (b, a) } else { (a, b) };
    for s in resultant.roots_between(-PARAM_SLACK, 1.0 + PARAM_SLACK, size * 1e-9) {
        let s = s.clamp(0.0, 1.0);
        let (_, t) = nearest(imp_seg, sub_seg.eval(s));
        if swapped {
            push_candidate(a, b, t, s, &mut found);
        } else {
            push_candidate(a, b, s, t, &mut found);
        }
    }

    finish(found)
}

/// Finds the parameters bounding the part that two segments share.
///
/// Every endpoint of either segment that lies on the other one contributes a
/// `(t_a, t_b)` pair. The result is sorted by `t_a`; if the segments overlap,
/// the first and last pairs bound the overlapping part.
pub fn overlap_params(a: &PathSeg, b: &PathSeg) -> IntersectionParams {
    let mut ret = IntersectionParams::new();
    endpoint_contacts(a, b, &mut ret);
    ret.sort_by(|x, y| x.0.total_cmp(&y.0));
    ret
}

/// Do the two segments run along one another for a positive length?
fn overlaps(a: &PathSeg, b: &PathSeg) -> bool {
    let params = overlap_params(a, b);
    let (Some(first), Some(last)) = (params.first(), params.last()) else {
        return false;
    };
    if points_coincide(a.eval(first.0), a.eval(last.0)) {
        return false;
    }
    // Two pieces of the same curve can meet at both ends without sharing
    // anything in between.
    let mid = a.eval((first.0 + last.0) / 2.0);
    nearest(b, mid).0 <= EPSILON
}

fn coincident_or(a: &PathSeg, b: &PathSeg, found: IntersectionParams) -> SegmentIntersection {
    if overlaps(a, b) {
        SegmentIntersection::Overlapping
    } else {
        finish(found)
    }
}

fn finish(mut found: IntersectionParams) -> SegmentIntersection {
    if found.is_empty() {
        SegmentIntersection::NoIntersection
    } else {
        found.sort_by(|x, y| x.0.total_cmp(&y.0));
        SegmentIntersection::FiniteSet(found)
    }
}

fn endpoint_contacts(a: &PathSeg, b: &PathSeg, found: &mut IntersectionParams) {
    for s in [0.0, 1.0] {
        let (dist, t) = nearest(b, a.eval(s));
        if dist <= EPSILON {
            push_candidate(a, b, s, t, found);
        }
    }
    for t in [0.0, 1.0] {
        let (dist, s) = nearest(a, b.eval(t));
        if dist <= EPSILON {
            push_candidate(a, b, s, t, found);
        }
    }
}

fn push_candidate(a: &PathSeg, b: &PathSeg, s: f64, t: f64, found: &mut IntersectionParams) {
    let range = -PARAM_SLACK..=1.0 + PARAM_SLACK;
    if !range.contains(&s) || !range.contains(&t) {
        return;
    }
    let s = snap_param(s.clamp(0.0, 1.0)).unwrap_or(s);
    let t = snap_param(t.clamp(0.0, 1.0)).unwrap_or(t);
    if !points_coincide(a.eval(s), b.eval(t)) {
        return;
    }
    let duplicate = found
        .iter()
        .any(|&(s0, t0)| (s0 - s).abs() < DUPLICATE_PARAM && (t0 - t).abs() < DUPLICATE_PARAM);
    if !duplicate && found.try_push((s, t)).is_err() {
        log::warn!("too many intersections between {a:?} and {b:?}");
    }
}

/// The implicit equation of the line `q0 + t q1`, evaluated along the curve
/// with power-basis coefficients `sub`.
fn line_resultant(sub: &[Vec2; 4], sub_deg: usize, line: &[Vec2; 4]) -> Poly {
    let (q0, q1) = (line[0], line[1]);
    let mut coeffs = Vec::with_capacity(sub_deg + 1);
    coeffs.push((sub[0] - q0).cross(q1));
    coeffs.extend(sub[1..=sub_deg].iter().map(|c| c.cross(q1)));
    Poly::new(coeffs)
}

/// The determinant of the Bézout matrix of `imp(t) - sub(s)`, as a polynomial in `s`.
///
/// Writing the x and y components of `imp(t) - sub(s)` as polynomials
/// `p(t) = p_0 + p_1 t + ...` and `q(t) = q_0 + ...` whose constant terms
/// depend on `s`, entry `(i, j)` of the `m × m` Bézout matrix is the sum over
/// `k` of `p_{i+j+1-k} q_k - p_k q_{i+j+1-k}`, for `k` from
/// `max(0, i+j+1-m)` to `min(i, j)`. It vanishes exactly when `sub(s)` lies
/// on the algebraic curve through `imp`.
fn bezout_resultant(sub: &[Vec2; 4], sub_deg: usize, imp: &[Vec2; 4], m: usize) -> Poly {
    let constant_term = |comp: fn(&Vec2) -> f64| {
        let mut coeffs = Vec::with_capacity(sub_deg + 1);
        coeffs.push(comp(&imp[0]) - comp(&sub[0]));
        coeffs.extend(sub[1..=sub_deg].iter().map(|c| -comp(c)));
        Poly::new(coeffs)
    };
    let p: Vec<Poly> = std::iter::once(constant_term(|v| v.x))
        .chain(imp[1..=m].iter().map(|c| Poly::constant(c.x)))
        .collect();
    let q: Vec<Poly> = std::iter::once(constant_term(|v| v.y))
        .chain(imp[1..=m].iter().map(|c| Poly::constant(c.y)))
        .collect();

    let entry = |i: usize, j: usize| {
        let n = i + j + 1;
        let lo = n.saturating_sub(m);
        (lo..=i.min(j)).fold(Poly::default(), |acc, k| {
            &acc + &(&(&p[n - k] * &q[k]) - &(&p[k] * &q[n - k]))
        })
    };

    match m {
        2 => &(&entry(0, 0) * &entry(1, 1)) - &(&entry(0, 1) * &entry(1, 0)),
        _ => {
            let b: Vec<Vec<Poly>> = (0..3)
                .map(|i| (0..3).map(|j| entry(i, j)).collect())
                .collect();
            let minor = |r0: usize, r1: usize, c0: usize, c1: usize| {
                &(&b[r0][c0] * &b[r1][c1]) - &(&b[r0][c1] * &b[r1][c0])
            };
            let t0 = &b[0][0] * &minor(1, 2, 1, 2);
            let t1 = &b[0][1] * &minor(1, 2, 0, 2);
            let t2 = &b[0][2] * &minor(1, 2, 0, 1);
            &(&t0 - &t1) + &t2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use kurbo::{CubicBez, Line, ParamCurve, Point, QuadBez};

    fn line(p0: (f64, f64), p1: (f64, f64)) -> PathSeg {
        PathSeg::Line(Line::new(p0, p1))
    }

    fn assert_meets(a: &PathSeg, b: &PathSeg, params: &IntersectionParams) {
        for &(s, t) in params {
            assert!(
                points_coincide(a.eval(s), b.eval(t)),
                "{:?} vs {:?}",
                a.eval(s),
                b.eval(t)
            );
        }
    }

    #[test]
    fn crossing_lines() {
        let a = line((0.0, 0.0), (1.0, 1.0));
        let b = line((0.0, 1.0), (1.0, 0.0));
        assert_matches!(intersect(&a, &b), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.len(), 1);
            assert!((p[0].0 - 0.5).abs() < 1e-12);
            assert!((p[0].1 - 0.5).abs() < 1e-12);
        });
    }

    #[test]
    fn shared_vertex_is_exact() {
        let a = line((0.0, 0.0), (1.0, 0.0));
        let b = line((1.0, 0.0), (1.0, 1.0));
        assert_matches!(intersect(&a, &b), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.as_slice(), &[(1.0, 0.0)]);
        });
    }

    #[test]
    fn parallel_lines() {
        let a = line((0.0, 0.0), (1.0, 0.0));
        let b = line((0.0, 1e-3), (1.0, 1e-3));
        assert_eq!(intersect(&a, &b), SegmentIntersection::NoIntersection);
    }

    #[test]
    fn collinear_lines() {
        let a = line((0.0, 0.0), (2.0, 0.0));
        let b = line((1.0, 0.0), (3.0, 0.0));
        assert_eq!(intersect(&a, &b), SegmentIntersection::Overlapping);
        assert_eq!(overlap_params(&a, &b).as_slice(), &[(0.5, 0.0), (1.0, 0.5)]);

        let c = line((2.0, 0.0), (3.0, 0.0));
        assert_matches!(intersect(&a, &c), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.as_slice(), &[(1.0, 0.0)]);
        });
    }

    #[test]
    fn line_and_quad() {
        let q = PathSeg::Quad(QuadBez::new((0.0, 0.0), (0.5, 1.0), (1.0, 0.0)));
        let l = line((-1.0, 0.25), (2.0, 0.25));
        assert_matches!(intersect(&l, &q), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.len(), 2);
            assert_meets(&l, &q, &p);
            let expected = (1.0 - 0.5f64.sqrt()) / 2.0;
            assert!((p[0].1 - expected).abs() < 1e-9);
        });
    }

    #[test]
    fn tangent_line_and_quad() {
        let q = PathSeg::Quad(QuadBez::new((0.0, 0.0), (0.5, 1.0), (1.0, 0.0)));
        let l = line((-1.0, 0.5), (2.0, 0.5));
        assert_matches!(intersect(&q, &l), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.len(), 1);
            assert!((p[0].0 - 0.5).abs() < 1e-6);
        });
    }

    #[test]
    fn crossing_arches() {
        let a = PathSeg::Cubic(CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)));
        let b = PathSeg::Cubic(CubicBez::new((0.5, 0.0), (0.5, 1.0), (1.5, 1.0), (1.5, 0.0)));
        assert_matches!(intersect(&a, &b), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.len(), 1);
            assert_meets(&a, &b, &p);
            assert!((a.eval(p[0].0).x - 0.75).abs() < 1e-9);
        });
    }

    #[test]
    fn quad_and_cubic() {
        let a = PathSeg::Quad(QuadBez::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0)));
        let b = PathSeg::Cubic(CubicBez::new((0.0, 0.5), (1.0, -0.5), (1.0, 1.5), (2.0, 0.5)));
        assert_matches!(intersect(&a, &b), SegmentIntersection::FiniteSet(p) => {
            assert!(!p.is_empty());
            assert_meets(&a, &b, &p);
        });
    }

    #[test]
    fn overlapping_curves() {
        let a = PathSeg::Cubic(CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)));
        let b = a.subsegment(0.25..0.75);
        assert_eq!(intersect(&a, &b), SegmentIntersection::Overlapping);
        let params = overlap_params(&a, &b);
        assert_eq!(params.len(), 2);
        assert!((params[0].0 - 0.25).abs() < 1e-9);
        assert!((params[1].0 - 0.75).abs() < 1e-9);
    }

    #[test]
    fn same_curve_without_overlap() {
        // Two consecutive pieces of the parabola y = (1 - x²) / 2.
        let a = PathSeg::Quad(QuadBez::new((-1.0, 0.0), (0.0, 1.0), (1.0, 0.0)));
        let b = PathSeg::Quad(QuadBez::new((1.0, 0.0), (2.0, -1.0), (3.0, -4.0)));
        assert_matches!(intersect(&a, &b), SegmentIntersection::FiniteSet(p) => {
            assert_eq!(p.as_slice(), &[(1.0, 0.0)]);
        });
    }

    #[test]
    fn far_apart() {
        let a = line((0.0, 0.0), (1.0, 0.0));
        let b = PathSeg::Cubic(CubicBez::new(
            Point::new(5.0, 5.0),
            Point::new(6.0, 6.0),
            Point::new(7.0, 5.0),
            Point::new(8.0, 6.0),
        ));
        assert_eq!(intersect(&a, &b), SegmentIntersection::NoIntersection);
    }

    #[test]
    fn arbtest_intersections_are_real() {
        arbtest::arbtest(|u| {
            let a = crate::arbitrary::segment(u)?;
            let b = crate::arbitrary::segment(u)?;
            if let SegmentIntersection::FiniteSet(p) = intersect(&a, &b) {
                for (s, t) in p {
                    assert!((0.0..=1.0).contains(&s));
                    assert!((0.0..=1.0).contains(&t));
                    assert!(points_coincide(a.eval(s), b.eval(t)));
                }
            }
            Ok(())
        })
        .budget_ms(2_000);
    }
}
