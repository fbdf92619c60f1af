//! Utilities for fuzz and/or property testing using `arbitrary`.

use arbitrary::Unstructured;
use kurbo::{ParamCurve, PathSeg, Point};

use crate::{contour::Contour, poly::Poly, segment::Segment};

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

fn float(u: &mut Unstructured<'_>) -> Result<f64, arbitrary::Error> {
    float_in_range(-100.0, 100.0, u)
}

/// Generate a float in some range, but give it a chance to be close to another float.
fn another_float_in_range(
    orig: f64,
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let close: bool = u.arbitrary()?;
    if close {
        let ulps: i32 = u.int_in_range(-32..=32)?;
        let scale = 1.0f64 + ulps as f64 * f64::EPSILON;
        Ok((orig * scale).clamp(start, end))
    } else {
        float_in_range(start, end, u)
    }
}

fn point(u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(float(u)?, float(u)?))
}

/// Generate a point with a chance of landing exactly on, or very near, `orig`.
fn another_point(orig: Point, u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    if u.ratio(1, 4)? {
        return Ok(orig);
    }
    Ok(Point::new(
        another_float_in_range(orig.x, -100.0, 100.0, u)?,
        another_float_in_range(orig.y, -100.0, 100.0, u)?,
    ))
}

/// Generate an arbitrary line, quadratic or cubic segment.
pub fn segment(u: &mut Unstructured<'_>) -> Result<PathSeg, arbitrary::Error> {
    let start = point(u)?;
    segment_from(start, u)
}

/// Generate an arbitrary segment starting at `start`.
pub fn segment_from(start: Point, u: &mut Unstructured<'_>) -> Result<PathSeg, arbitrary::Error> {
    let seg = match u.int_in_range(0..=2)? {
        0 => Segment::Line(point(u)?),
        1 => {
            let ctrl = point(u)?;
            Segment::Quad(ctrl, another_point(ctrl, u)?)
        }
        _ => {
            let c1 = point(u)?;
            let c2 = another_point(c1, u)?;
            Segment::Cubic(c1, c2, another_point(start, u)?)
        }
    };
    Ok(seg.with_start(start))
}

/// Generate an arbitrary polynomial of degree at most 9, with coefficients of
/// roughly the scale `size`.
///
/// Half of the time the polynomial is built from its roots, with a bias
/// towards almost-repeated ones.
pub fn poly(size: f64, u: &mut Unstructured<'_>) -> Result<Poly, arbitrary::Error> {
    let degree = u.int_in_range(0..=9)?;
    let use_coeffs: bool = u.arbitrary()?;
    if use_coeffs {
        let mut coeffs = Vec::with_capacity(degree + 1);
        let mut prev = float_in_range(-size, size, u)?;
        coeffs.push(prev);
        for _ in 0..degree {
            prev = another_float_in_range(prev, -size, size, u)?;
            coeffs.push(prev);
        }
        Ok(Poly::new(coeffs))
    } else {
        let scale = float_in_range(-size, size, u)?;
        let mut ret = Poly::constant(scale);
        let mut prev = float_in_range(-1.0, 2.0, u)?;
        for _ in 0..degree {
            prev = another_float_in_range(prev, -1.0, 2.0, u)?;
            ret = ret * Poly::new([-prev, 1.0]);
        }
        Ok(ret)
    }
}

/// Generate a closed contour made of between 1 and 8 segments.
///
/// The contour may cross and touch itself; vertices have a chance of
/// repeating earlier ones exactly.
pub fn contour(u: &mut Unstructured<'_>) -> Result<Contour, arbitrary::Error> {
    let start = point(u)?;
    let count = u.int_in_range(1..=8)?;
    let mut vertices = vec![start];
    let mut segs = Vec::with_capacity(count);
    for _ in 0..count {
        let from = vertices.last().copied().unwrap_or(start);
        let seg = if u.ratio(1, 3)? {
            let &to = u.choose(&vertices)?;
            Segment::Line(to).with_start(from)
        } else {
            segment_from(from, u)?
        };
        vertices.push(seg.end());
        segs.push(seg);
    }
    Contour::from_path_segs(segs, true).ok_or(arbitrary::Error::IncorrectFormat)
}

/// Generate a simple polygon: a star-shaped one around a random center, with
/// one vertex in each of a few equal sectors.
pub fn polygon(u: &mut Unstructured<'_>) -> Result<Contour, arbitrary::Error> {
    let center = point(u)?;
    let count = u.int_in_range(3..=8)?;
    let sector = std::f64::consts::TAU / count as f64;

    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let a = (i as f64 + float_in_range(0.3, 0.7, u)?) * sector;
        let r = float_in_range(1.0, 50.0, u)?;
        points.push(center + r * kurbo::Vec2::new(a.cos(), a.sin()));
    }
    let segs = points[1..]
        .iter()
        .chain(std::iter::once(&points[0]))
        .map(|&p| Segment::Line(p));
    Contour::new(points[0], segs, true).map_err(|_| arbitrary::Error::IncorrectFormat)
}
