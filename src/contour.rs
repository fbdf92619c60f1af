//! Closed boundary loops.

use kurbo::{
    Affine, BezPath, ParamCurve, ParamCurveArclen, ParamCurveArea, ParamCurveExtrema, PathEl,
    PathSeg, Point, Rect,
};

use crate::{
    check_bbox,
    num::{almost_zero, points_coincide},
    segment::{is_degenerate, nearest, ray_crossings, with_start_point, Segment},
    Error,
};

/// A closed sequence of segments.
///
/// The end of each segment is the start of the next one, and the end of the
/// last segment is the start of the first. Zero-length segments are dropped
/// on construction, and a contour that doesn't close up gets a straight line
/// added to close it.
#[derive(Clone, Debug)]
pub struct Contour {
    segs: Vec<PathSeg>,
    closed: bool,
    area: f64,
    bbox: Rect,
    path: BezPath,
}

impl Contour {
    /// Creates a contour from a start point and a sequence of segments.
    ///
    /// `closed` records whether the caller explicitly closed the contour; the
    /// boundary is closed with a line either way.
    ///
    /// Fails if any coordinate is infinite or NaN, or if there are no
    /// segments of positive length.
    pub fn new(
        start: Point,
        segments: impl IntoIterator<Item = Segment>,
        closed: bool,
    ) -> Result<Contour, Error> {
        let mut segs = Vec::new();
        let mut cur = start;
        for seg in segments {
            if !seg.all_coords(f64::is_finite) {
                return Err(if seg.all_coords(|x| !x.is_nan()) {
                    Error::Infinity
                } else {
                    Error::NaN
                });
            }
            segs.push(seg.with_start(cur));
            cur = seg.end();
        }
        if start.x.is_nan() || start.y.is_nan() {
            return Err(Error::NaN);
        }
        if !start.x.is_finite() || !start.y.is_finite() {
            return Err(Error::Infinity);
        }
        Contour::from_path_segs(segs, closed).ok_or(Error::EmptyContour)
    }

    /// Splits a path into its subpaths, one contour each.
    ///
    /// Subpaths without any segments of positive length are skipped.
    pub fn from_bez_path(path: &BezPath) -> Result<Vec<Contour>, Error> {
        // Bounding boxes lose NaNs (`f64::min` ignores them), so look at every point.
        let points = path.elements().iter().flat_map(|el| match *el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => vec![p],
            PathEl::QuadTo(p1, p2) => vec![p1, p2],
            PathEl::CurveTo(p1, p2, p3) => vec![p1, p2, p3],
            PathEl::ClosePath => vec![],
        });
        for p in points {
            check_bbox(Rect::from_points(p, p))?;
        }

        let mut ret = Vec::new();
        let mut segs = Vec::new();
        let mut closed = false;
        let mut start = Point::ZERO;
        let mut cur = Point::ZERO;
        let mut flush = |segs: &mut Vec<PathSeg>, closed: bool| {
            if let Some(c) = Contour::from_path_segs(segs.drain(..), closed) {
                ret.push(c);
            }
        };
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    flush(&mut segs, closed);
                    closed = false;
                    start = p;
                    cur = p;
                }
                PathEl::LineTo(p) => {
                    segs.push(Segment::Line(p).with_start(cur));
                    cur = p;
                }
                PathEl::QuadTo(p1, p2) => {
                    segs.push(Segment::Quad(p1, p2).with_start(cur));
                    cur = p2;
                }
                PathEl::CurveTo(p1, p2, p3) => {
                    segs.push(Segment::Cubic(p1, p2, p3).with_start(cur));
                    cur = p3;
                }
                PathEl::ClosePath => {
                    closed = true;
                    cur = start;
                }
            }
        }
        flush(&mut segs, closed);
        Ok(ret)
    }

    /// Builds a contour from kurbo segments, repairing small gaps and closing it up.
    ///
    /// Returns `None` if nothing of positive length is left.
    pub(crate) fn from_path_segs(
        segs: impl IntoIterator<Item = PathSeg>,
        closed: bool,
    ) -> Option<Contour> {
        let mut out: Vec<PathSeg> = Vec::new();
        for seg in segs {
            if is_degenerate(&seg) {
                continue;
            }
            let seg = match out.last() {
                Some(prev) if points_coincide(prev.end(), seg.start()) => {
                    with_start_point(seg, prev.end())
                }
                Some(prev) => {
                    let gap = Segment::Line(seg.start()).with_start(prev.end());
                    out.push(gap);
                    seg
                }
                None => seg,
            };
            out.push(seg);
        }

        let first = out.first()?.start();
        let last = out.last()?.end();
        if points_coincide(first, last) {
            out[0] = with_start_point(out[0], last);
        } else {
            out.push(Segment::Line(first).with_start(last));
        }
        // Snapping may have collapsed the first segment.
        if out.len() > 1 && is_degenerate(&out[0]) {
            let start = out[0].start();
            out.remove(0);
            let end = out[out.len() - 1].end();
            if !points_coincide(start, end) {
                return None;
            }
            out[0] = with_start_point(out[0], end);
        }

        Some(Contour::from_closed_segs(out, closed))
    }

    fn from_closed_segs(segs: Vec<PathSeg>, closed: bool) -> Contour {
        let area = segs.iter().map(|s| s.signed_area()).sum();
        let bbox = segs
            .iter()
            .map(ParamCurveExtrema::bounding_box)
            .reduce(|a, b| a.union(b))
            .unwrap_or_default();
        let mut path = BezPath::from_path_segments(segs.iter().copied());
        path.close_path();
        Contour {
            segs,
            closed,
            area,
            bbox,
            path,
        }
    }

    /// The start (and end) point.
    pub fn start(&self) -> Point {
        self.segs[0].start()
    }

    /// The segments, without their start points.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.segs.iter().map(|s| Segment::from(*s))
    }

    /// The segments, with their start points.
    pub fn path_segs(&self) -> &[PathSeg] {
        &self.segs
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.segs.len()
    }

    /// Contours always have at least one segment.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Was this contour explicitly closed when it was created?
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The signed area enclosed, positive for counter-clockwise contours
    /// (in a y-up coordinate system).
    pub fn signed_area(&self) -> f64 {
        self.area
    }

    /// The bounding box.
    pub fn bounding_box(&self) -> Rect {
        self.bbox
    }

    /// The contour as a closed kurbo path.
    pub fn to_bez_path(&self) -> BezPath {
        self.path.clone()
    }

    /// How many times this contour winds around `p`.
    pub fn winding(&self, p: Point) -> i32 {
        if !self.bbox.contains(p) {
            return 0;
        }
        self.segs.iter().map(|s| ray_crossings(s, p)).sum()
    }

    /// Does this contour wind around `p` a non-zero number of times?
    pub fn contains(&self, p: Point) -> bool {
        self.winding(p) != 0
    }

    /// The same contour, traversed the other way.
    pub fn reversed(&self) -> Contour {
        let segs = self.segs.iter().rev().map(|s| s.reverse()).collect();
        Contour::from_closed_segs(segs, self.closed)
    }

    /// Applies an affine transformation.
    ///
    /// Fails if the transformation is degenerate (its determinant is within
    /// tolerance of zero) or if it overflows. Transformations with negative
    /// determinant reverse the orientation, and so the sign of the area.
    pub fn transformed(&self, transform: &Affine) -> Result<Contour, Error> {
        if almost_zero(transform.determinant()) {
            return Err(Error::DegenerateTransform);
        }
        let segs: Vec<PathSeg> = self.segs.iter().map(|s| *transform * *s).collect();
        let c = Contour::from_path_segs(segs, self.closed).ok_or(Error::DegenerateTransform)?;
        check_bbox(c.bbox)?;
        Ok(c)
    }

    /// A point on the boundary, in the middle of the longest segment.
    pub(crate) fn boundary_point(&self) -> Point {
        let longest = self
            .segs
            .iter()
            .max_by(|a, b| a.arclen(1e-6).total_cmp(&b.arclen(1e-6)))
            .unwrap_or(&self.segs[0]);
        longest.eval(0.5)
    }

    /// The distance from `p` to the boundary, along with the index and
    /// parameter of the nearest point.
    pub(crate) fn nearest(&self, p: Point) -> (f64, usize, f64) {
        let mut best = (f64::INFINITY, 0, 0.0);
        for (i, seg) in self.segs.iter().enumerate() {
            // The distance to the box is a lower bound.
            let b = ParamCurveExtrema::bounding_box(seg);
            let dx = (b.x0 - p.x).max(p.x - b.x1).max(0.0);
            let dy = (b.y0 - p.y).max(p.y - b.y1).max(0.0);
            if dx.hypot(dy) > best.0 {
                continue;
            }
            let (dist, t) = nearest(seg, p);
            if dist < best.0 {
                best = (dist, i, t);
            }
        }
        best
    }
}
