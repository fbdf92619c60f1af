#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
pub mod cache;
pub mod contour;
pub mod graph;
pub mod intersect;
pub mod loop_breaker;
pub mod num;
pub mod poly;
pub mod region;
pub mod segment;
pub mod solid;
pub mod space;
pub mod table;

#[cfg(feature = "generators")]
pub mod generators;

use kurbo::{BezPath, Rect};

pub use contour::Contour;
pub use region::{Region, Shape};
pub use segment::Segment;
pub use solid::Solid;
pub use table::Overlap;

/// A fill rule tells us how to decide whether a point is "inside" a set of contours.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FillRule {
    /// The point is "inside" if its winding number is odd.
    EvenOdd,
    /// The point is "inside" if its winding number is non-zero.
    NonZero,
}

/// Binary operations between sets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    /// A point is in the union of two sets if it is in either one.
    Union,
    /// A point is in the intersection of two sets if it is in both.
    Intersection,
    /// A point is in the difference of two sets if it is in the first but not the second.
    Difference,
    /// A point is in the exclusive-or of two sets if it is in one or the other, but not both.
    Xor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The inputs were faulty.
pub enum Error {
    /// At least one of the inputs was infinite.
    Infinity,
    /// At least one of the inputs was not a number.
    NaN,
    /// A contour had no segments.
    EmptyContour,
    /// A transformation squashed a contour flat.
    DegenerateTransform,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Infinity => write!(f, "one of the inputs was infinite"),
            Error::NaN => write!(f, "one of the inputs had a NaN"),
            Error::EmptyContour => write!(f, "one of the contours had no segments"),
            Error::DegenerateTransform => write!(f, "the transformation was degenerate"),
        }
    }
}

impl std::error::Error for Error {}

/// Checks that every coordinate of a bounding box is finite.
pub(crate) fn check_bbox(bbox: Rect) -> Result<(), Error> {
    let coords = [bbox.x0, bbox.y0, bbox.x1, bbox.y1];
    if coords.iter().any(|x| x.is_nan()) {
        return Err(Error::NaN);
    }
    if coords.iter().any(|x| x.is_infinite()) {
        return Err(Error::Infinity);
    }
    Ok(())
}

/// Computes a boolean operation between two sets, each of which is described
/// as a collection of closed paths filled with the same fill rule.
///
/// Use [`Region::to_bez_path`] or [`Region::to_contours`] to get at the boundary of the result.
pub fn binary_op(
    set_a: &BezPath,
    set_b: &BezPath,
    fill_rule: FillRule,
    op: BinaryOp,
) -> Result<Region, Error> {
    let a = Region::from_path(set_a, fill_rule)?;
    let b = Region::from_path(set_b, fill_rule)?;
    let ret = a.apply(op, &b);
    log::debug!(
        "{op:?} of regions with {} and {} solids has {} solids",
        a.solids().len(),
        b.solids().len(),
        ret.solids().len()
    );

    #[cfg(feature = "debug-svg")]
    if let Err(e) = svg::save("out.svg", &ret.dump_svg()) {
        log::warn!("failed to save out.svg: {e}");
    }

    Ok(ret)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use kurbo::BezPath;

    use super::*;

    fn to_bez(mut points: impl Iterator<Item = (f64, f64)>) -> BezPath {
        let p = points.next().unwrap();
        let mut ret = BezPath::default();
        ret.move_to(p);
        for q in points {
            ret.line_to(q);
        }
        ret.close_path();
        ret
    }

    #[test]
    fn two_squares() {
        let a = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let b = vec![(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
        let output = binary_op(
            &to_bez(a.into_iter()),
            &to_bez(b.into_iter()),
            FillRule::EvenOdd,
            BinaryOp::Intersection,
        )
        .unwrap();

        assert_eq!(output.solids().len(), 1);
        assert!((output.area() - 0.25).abs() < 1e-9);
        let bbox = output.bounding_box();
        assert!((bbox.x0 - 0.0).abs() < 1e-9 && (bbox.x1 - 0.5).abs() < 1e-9);
    }

    // Two not-quite-axis-aligned crosses. The arms meet at points that are
    // very close to one another, and the result shouldn't pick up spurious
    // segments there.
    #[test]
    fn path_blowup() {
        let path1 = "M-90.03662872314453,-212 L-90.03662872314453,212 L90.03565216064453,212 L90.03565216064453,-212 L-90.03662872314453,-212 Z";
        let path2 = "M211.99964904785156,-90.03582000732422 L-212.00035095214844,-90.03646087646484 L-212.00062561035156,90.03582000732422 L211.99937438964844,90.03646087646484 L211.99964904785156,-90.03582000732422 Z";
        let output = binary_op(
            &BezPath::from_svg(path1).unwrap(),
            &BezPath::from_svg(path2).unwrap(),
            FillRule::NonZero,
            BinaryOp::Union,
        )
        .unwrap();
        assert_eq!(output.solids().len(), 1);
        let contour = output.solids()[0].outer();
        assert!(contour.len() <= 12);
        assert!(output.solids()[0].holes().is_empty());
    }

    #[test]
    fn bad_input() {
        let nan = to_bez([(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0)].into_iter());
        let inf = to_bez([(0.0, 0.0), (f64::INFINITY, 1.0), (1.0, 1.0)].into_iter());
        let fine = to_bez([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)].into_iter());
        assert_matches!(
            binary_op(&nan, &fine, FillRule::NonZero, BinaryOp::Union),
            Err(Error::NaN)
        );
        assert_matches!(
            binary_op(&fine, &inf, FillRule::NonZero, BinaryOp::Union),
            Err(Error::Infinity)
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(Error::NaN.to_string(), "one of the inputs had a NaN");
        assert_eq!(
            Error::EmptyContour.to_string(),
            "one of the contours had no segments"
        );
    }
}
